//! Live adapter for Google Cloud Storage uploads and V4 signed URLs.

use std::time::Duration;

use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::StudioError;
use crate::ports::{ObjectStore, PortFuture, StoredObject, UploadRequest};

const SIGNING_ALGORITHM: &str = "GOOG4-RSA-SHA256";
const SIGNED_URL_HOST: &str = "storage.googleapis.com";
const MAX_URL_TTL_SECS: u64 = 604_800;

/// Live object store that writes to one bucket.
pub struct GcsStore {
    client: Client,
    access_token: String,
    bucket: String,
    storage_base: String,
    iam_base: String,
    signer: Option<Signer>,
}

struct Signer {
    email: String,
    ttl: Duration,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignBlobResponse {
    signed_blob: String,
}

impl GcsStore {
    /// Create a store for `bucket` using a bearer access token.
    #[must_use]
    pub fn new(access_token: String, bucket: String, storage_base: &str, iam_base: &str) -> Self {
        Self {
            client: Client::new(),
            access_token,
            bucket,
            storage_base: storage_base.trim_end_matches('/').to_string(),
            iam_base: iam_base.trim_end_matches('/').to_string(),
            signer: None,
        }
    }

    /// Sign retrieval URLs as `email` through the IAM credentials API.
    #[must_use]
    pub fn with_signer(mut self, email: String, ttl: Duration) -> Self {
        self.signer = Some(Signer { email, ttl });
        self
    }

    async fn put_object(&self, request: &UploadRequest) -> Result<(), StudioError> {
        let url = format!(
            "{}/upload/storage/v1/b/{}/o",
            self.storage_base, self.bucket
        );
        debug!(%url, object = %request.object_name, bytes = request.data.len(), "POST");

        let response = self
            .client
            .post(&url)
            .query(&[
                ("uploadType", "media"),
                ("name", request.object_name.as_str()),
            ])
            .bearer_auth(&self.access_token)
            .header(reqwest::header::CONTENT_TYPE, &request.content_type)
            .body(request.data.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(StudioError::from_google_response(status.as_u16(), &body));
        }
        Ok(())
    }

    async fn sign_blob(&self, email: &str, payload: &[u8]) -> Result<Vec<u8>, StudioError> {
        let url = format!(
            "{}/projects/-/serviceAccounts/{email}:signBlob",
            self.iam_base
        );
        let b64 = base64::engine::general_purpose::STANDARD;

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "payload": b64.encode(payload) }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StudioError::from_google_response(status.as_u16(), &body));
        }

        let malformed = |message: String| StudioError::Api {
            status: status.as_u16(),
            message,
        };
        let parsed: SignBlobResponse = serde_json::from_str(&body)
            .map_err(|e| malformed(format!("Failed to parse signBlob response: {e}")))?;
        b64.decode(parsed.signed_blob.trim())
            .map_err(|e| malformed(format!("signBlob returned invalid base64: {e}")))
    }

    async fn signed_url(
        &self,
        signer: &Signer,
        object_name: &str,
        now: DateTime<Utc>,
    ) -> Result<(String, DateTime<Utc>), StudioError> {
        let ttl = signer.ttl.as_secs().clamp(1, MAX_URL_TTL_SECS);
        let parts = SignedUrlParts::new(&self.bucket, object_name, &signer.email, now, ttl);
        let to_sign = parts.string_to_sign();
        let signature = self.sign_blob(&signer.email, to_sign.as_bytes()).await?;
        let expires_at = now + chrono::Duration::seconds(i64::try_from(ttl).unwrap_or(i64::MAX));
        Ok((parts.url(&hex::encode(signature)), expires_at))
    }

    /// A signed URL, or `None` when signing fails.
    async fn try_sign(
        &self,
        signer: &Signer,
        object_name: &str,
    ) -> Option<(String, DateTime<Utc>)> {
        match self.signed_url(signer, object_name, Utc::now()).await {
            Ok(signed) => Some(signed),
            Err(e) => {
                warn!(error = %e, "URL signing failed, using authenticated URL");
                None
            }
        }
    }
}

impl ObjectStore for GcsStore {
    fn upload(&self, request: &UploadRequest) -> PortFuture<'_, StoredObject> {
        let request = request.clone();
        Box::pin(async move {
            self.put_object(&request).await?;
            let path = format!("gs://{}/{}", self.bucket, request.object_name);

            let signed = match &self.signer {
                Some(signer) => self.try_sign(signer, &request.object_name).await,
                None => None,
            };
            let (url, expires_at) = match signed {
                Some((url, expires_at)) => (url, Some(expires_at)),
                None => (authenticated_url(&self.bucket, &request.object_name), None),
            };
            Ok(StoredObject {
                path,
                url,
                expires_at,
            })
        })
    }
}

/// Browser URL that requires a Google login with read access to the bucket.
fn authenticated_url(bucket: &str, object_name: &str) -> String {
    format!(
        "https://storage.cloud.google.com/{bucket}/{}",
        encode_object_path(object_name)
    )
}

/// Percent-encode each `/`-separated segment of an object name.
fn encode_object_path(object_name: &str) -> String {
    object_name
        .split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

/// The pieces of a V4 signed GET URL that do not depend on the signature.
struct SignedUrlParts {
    resource: String,
    query: String,
    timestamp: String,
    scope: String,
}

impl SignedUrlParts {
    fn new(
        bucket: &str,
        object_name: &str,
        email: &str,
        now: DateTime<Utc>,
        ttl_secs: u64,
    ) -> Self {
        let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();
        let scope = format!("{}/auto/storage/goog4_request", now.format("%Y%m%d"));
        let credential = format!("{email}/{scope}");

        // Sorted by name, as the canonical query requires.
        let query = [
            ("X-Goog-Algorithm", SIGNING_ALGORITHM.to_string()),
            ("X-Goog-Credential", credential),
            ("X-Goog-Date", timestamp.clone()),
            ("X-Goog-Expires", ttl_secs.to_string()),
            ("X-Goog-SignedHeaders", "host".to_string()),
        ]
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

        Self {
            resource: format!("/{bucket}/{}", encode_object_path(object_name)),
            query,
            timestamp,
            scope,
        }
    }

    fn canonical_request(&self) -> String {
        format!(
            "GET\n{}\n{}\nhost:{SIGNED_URL_HOST}\n\nhost\nUNSIGNED-PAYLOAD",
            self.resource, self.query
        )
    }

    fn string_to_sign(&self) -> String {
        let digest = hex::encode(Sha256::digest(self.canonical_request().as_bytes()));
        format!(
            "{SIGNING_ALGORITHM}\n{}\n{}\n{digest}",
            self.timestamp, self.scope
        )
    }

    fn url(&self, signature_hex: &str) -> String {
        format!(
            "https://{SIGNED_URL_HOST}{}?{}&X-Goog-Signature={signature_hex}",
            self.resource, self.query
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{body_bytes, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SIGNER: &str = "signer@p.iam.gserviceaccount.com";
    const SIGN_PATH: &str = "/projects/-/serviceAccounts/signer@p.iam.gserviceaccount.com:signBlob";
    const PLAIN_URL: &str = "https://storage.cloud.google.com/bkt/studio/a%20cat.png";

    fn upload_request() -> UploadRequest {
        UploadRequest {
            object_name: "studio/a cat.png".into(),
            content_type: "image/png".into(),
            data: b"\x89PNG\r\n\x1a\n".to_vec(),
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap()
    }

    fn store(server: &MockServer) -> GcsStore {
        GcsStore::new("tok".into(), "bkt".into(), &server.uri(), &server.uri())
    }

    async fn mount_upload_ok(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/upload/storage/v1/b/bkt/o"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(server)
            .await;
    }

    #[test]
    fn object_paths_keep_slashes() {
        assert_eq!(encode_object_path("a b/c~d"), "a%20b/c~d");
        assert_eq!(encode_object_path("x/é+y"), "x/%C3%A9%2By");
        assert_eq!(encode_object_path("plain.png"), "plain.png");
    }

    #[test]
    fn signed_url_parts() {
        let parts = SignedUrlParts::new("bkt", "studio/a cat.png", SIGNER, fixed_now(), 3600);
        assert_eq!(parts.resource, "/bkt/studio/a%20cat.png");
        assert_eq!(parts.timestamp, "20260304T050607Z");
        assert_eq!(parts.scope, "20260304/auto/storage/goog4_request");

        let query = &parts.query;
        assert!(query.starts_with("X-Goog-Algorithm=GOOG4-RSA-SHA256&"));
        assert!(query.contains("X-Goog-Credential=signer%40p.iam"));
        assert!(query.contains("%2F20260304%2Fauto%2Fstorage%2Fgoog4_request"));
        assert!(query.contains("X-Goog-Expires=3600"));
        assert!(query.ends_with("X-Goog-SignedHeaders=host"));

        let canonical = parts.canonical_request();
        assert!(canonical.starts_with("GET\n/bkt/studio/a%20cat.png\n"));
        assert!(canonical.ends_with("\nhost:storage.googleapis.com\n\nhost\nUNSIGNED-PAYLOAD"));

        let to_sign = parts.string_to_sign();
        let lines: Vec<&str> = to_sign.lines().collect();
        assert_eq!(lines[0], "GOOG4-RSA-SHA256");
        assert_eq!(lines[1], "20260304T050607Z");
        assert_eq!(lines[2], "20260304/auto/storage/goog4_request");
        assert_eq!(lines[3].len(), 64);

        let url = parts.url("abcd");
        assert!(url.starts_with("https://storage.googleapis.com/bkt/studio/a%20cat.png?"));
        assert!(url.ends_with("&X-Goog-Signature=abcd"));
    }

    #[tokio::test]
    async fn upload_without_signer_uses_authenticated_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload/storage/v1/b/bkt/o"))
            .and(query_param("uploadType", "media"))
            .and(query_param("name", "studio/a cat.png"))
            .and(header("authorization", "Bearer tok"))
            .and(header("content-type", "image/png"))
            .and(body_bytes(b"\x89PNG\r\n\x1a\n".to_vec()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "x"})))
            .expect(1)
            .mount(&server)
            .await;

        let stored = store(&server).upload(&upload_request()).await.unwrap();
        assert_eq!(stored.path, "gs://bkt/studio/a cat.png");
        assert_eq!(stored.url, PLAIN_URL);
        assert!(stored.expires_at.is_none());
    }

    #[tokio::test]
    async fn upload_with_signer_returns_signed_url() {
        let server = MockServer::start().await;
        mount_upload_ok(&server).await;
        let signature = [0xde, 0xad, 0xbe, 0xef];
        let signed_blob = base64::engine::general_purpose::STANDARD.encode(signature);
        Mock::given(method("POST"))
            .and(path(SIGN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "keyId": "k1",
                "signedBlob": signed_blob,
            })))
            .mount(&server)
            .await;

        let store = store(&server).with_signer(SIGNER.into(), Duration::from_secs(900));
        let before = Utc::now();
        let stored = store.upload(&upload_request()).await.unwrap();

        let url = &stored.url;
        assert!(url.starts_with("https://storage.googleapis.com/bkt/studio/a%20cat.png?"));
        assert!(url.contains("X-Goog-Expires=900"));
        assert!(url.ends_with("X-Goog-Signature=deadbeef"));
        let expires = stored.expires_at.unwrap();
        assert!(expires >= before + chrono::Duration::seconds(899));
    }

    #[tokio::test]
    async fn signing_failure_falls_back() {
        let server = MockServer::start().await;
        mount_upload_ok(&server).await;
        Mock::given(method("POST"))
            .and(path(SIGN_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let store = store(&server).with_signer(SIGNER.into(), Duration::from_secs(900));
        let stored = store.upload(&upload_request()).await.unwrap();
        assert_eq!(stored.url, PLAIN_URL);
        assert!(stored.expires_at.is_none());
    }

    #[tokio::test]
    async fn upload_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": 403, "message": "no write access"}
            })))
            .mount(&server)
            .await;

        let err = store(&server).upload(&upload_request()).await.unwrap_err();
        assert_eq!(err.to_string(), "API error (403): no write access");
    }
}
