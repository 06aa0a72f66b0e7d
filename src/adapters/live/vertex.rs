//! Live adapter for the Vertex AI upscaling endpoint.

use base64::Engine;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{truncate, StudioError};
use crate::extract::extract_image;
use crate::ports::{PortFuture, UpscaleRequest, UpscaledImage, Upscaler};
use crate::response::Response;

/// Live upscaler backed by a Vertex AI `:predict` call.
pub struct VertexUpscaler {
    client: Client,
    access_token: String,
    model: String,
    endpoint_template: String,
}

impl VertexUpscaler {
    /// Create an upscaler. `endpoint_template` may contain `{region}`.
    #[must_use]
    pub fn new(access_token: String, model: &str, endpoint_template: &str) -> Self {
        Self {
            client: Client::new(),
            access_token,
            model: model.to_string(),
            endpoint_template: endpoint_template.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, request: &UpscaleRequest) -> String {
        let base = self.endpoint_template.replace("{region}", &request.region);
        format!(
            "{base}/projects/{}/locations/{}/publishers/google/models/{}:predict",
            request.project, request.region, self.model
        )
    }
}

impl Upscaler for VertexUpscaler {
    fn upscale(&self, request: &UpscaleRequest) -> PortFuture<'_, UpscaledImage> {
        let request = request.clone();
        Box::pin(async move {
            let url = self.endpoint(&request);
            debug!(%url, factor = %request.factor, "POST");

            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.access_token)
                .json(&upscale_body(&request))
                .send()
                .await?;

            let status = response.status();
            let response_text = response.text().await?;
            if !status.is_success() {
                return Err(StudioError::from_google_response(status.as_u16(), &response_text));
            }

            let parsed: Value = serde_json::from_str(&response_text).map_err(|e| StudioError::Api {
                status: status.as_u16(),
                message: format!(
                    "Failed to parse response: {e}. Body: {}",
                    truncate(&response_text, 500)
                ),
            })?;

            let data = extract_image(&Response::from_json(&parsed))
                .ok_or_else(|| StudioError::NoImage("upscaler".into()))?;
            Ok(UpscaledImage { data })
        })
    }
}

fn upscale_body(request: &UpscaleRequest) -> Value {
    let image = base64::engine::general_purpose::STANDARD.encode(&request.image);
    json!({
        "instances": [{
            "prompt": "",
            "image": { "bytesBase64Encoded": image },
        }],
        "parameters": {
            "mode": "upscale",
            "upscaleConfig": { "upscaleFactor": request.factor.as_str() },
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::UpscaleFactor;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(factor: UpscaleFactor) -> UpscaleRequest {
        UpscaleRequest {
            project: "demo".into(),
            region: "us-central1".into(),
            factor,
            image: b"\x89PNG\r\n\x1a\nsmall".to_vec(),
        }
    }

    #[test]
    fn endpoint_fills_region_and_project() {
        let upscaler = VertexUpscaler::new(
            "t".into(),
            "imagen-4.0-upscale-preview",
            "https://{region}-aiplatform.googleapis.com/v1",
        );
        assert_eq!(
            upscaler.endpoint(&request(UpscaleFactor::X2)),
            "https://us-central1-aiplatform.googleapis.com/v1/projects/demo/locations/us-central1/publishers/google/models/imagen-4.0-upscale-preview:predict"
        );
    }

    #[test]
    fn body_carries_factor_and_image() {
        let body = upscale_body(&request(UpscaleFactor::X4));
        assert_eq!(body["parameters"]["mode"], "upscale");
        assert_eq!(body["parameters"]["upscaleConfig"]["upscaleFactor"], "x4");
        let image = &body["instances"][0]["image"];
        assert!(image["bytesBase64Encoded"].is_string());
    }

    #[tokio::test]
    async fn upscale_extracts_prediction() {
        let server = MockServer::start().await;
        let big = b"\x89PNG\r\n\x1a\nlarge".to_vec();
        let b64 = base64::engine::general_purpose::STANDARD.encode(&big);
        let factor = json!({"parameters": {"upscaleConfig": {"upscaleFactor": "x2"}}});
        Mock::given(method("POST"))
            .and(path(
                "/projects/demo/locations/us-central1/publishers/google/models/upscaler:predict",
            ))
            .and(header("authorization", "Bearer token"))
            .and(body_partial_json(factor))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "predictions": [{"mimeType": "image/png", "bytesBase64Encoded": b64}]
            })))
            .mount(&server)
            .await;

        let upscaler = VertexUpscaler::new("token".into(), "upscaler", &server.uri());
        let image = upscaler.upscale(&request(UpscaleFactor::X2)).await.unwrap();
        assert_eq!(image.data, big);
    }

    #[tokio::test]
    async fn empty_predictions_is_no_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"predictions": []})))
            .mount(&server)
            .await;

        let upscaler = VertexUpscaler::new("token".into(), "upscaler", &server.uri());
        let request = request(UpscaleFactor::X2);
        let err = upscaler.upscale(&request).await.unwrap_err();
        assert!(matches!(err, StudioError::NoImage(ref who) if who == "upscaler"));
    }

    #[tokio::test]
    async fn permission_denied_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {
                    "code": 403,
                    "message": "Permission denied",
                    "status": "PERMISSION_DENIED"
                }
            })))
            .mount(&server)
            .await;

        let upscaler = VertexUpscaler::new("token".into(), "upscaler", &server.uri());
        let request = request(UpscaleFactor::X2);
        let err = upscaler.upscale(&request).await.unwrap_err();
        assert!(matches!(err, StudioError::Api { status: 403, .. }));
        assert_eq!(err.to_string(), "API error (403): Permission denied");
    }
}
