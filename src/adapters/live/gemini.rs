//! Live adapter for the Gemini / Imagen generation endpoints.

use base64::Engine;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{truncate, StudioError};
use crate::model::{detect_family, ModelFamily};
use crate::ports::{GenerationRequest, ImageGenerator, PortFuture, RawResponse};

/// Live generator that calls the Generative Language API.
pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiGenerator {
    /// Create a new generator with the given API key and API base URL.
    #[must_use]
    pub fn new(api_key: String, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl ImageGenerator for GeminiGenerator {
    fn generate(&self, request: &GenerationRequest) -> PortFuture<'_, RawResponse> {
        let request = request.clone();
        Box::pin(async move {
            let family = detect_family(&request.model).map_err(StudioError::InvalidArgument)?;
            let (method, body) = match family {
                ModelFamily::GenerateContent => {
                    ("generateContent", generate_content_body(&request))
                }
                ModelFamily::Predict => ("predict", predict_body(&request)),
            };
            let url = format!("{}/models/{}:{method}", self.base_url, request.model);
            debug!(%url, "POST");

            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            let is_image = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.starts_with("image/"));

            if status.is_success() && is_image {
                return Ok(RawResponse::Bytes(response.bytes().await?.to_vec()));
            }

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
            Ok(RawResponse::Json(parsed))
        })
    }
}

/// Body for `:generateContent`: the prompt, then each reference image inline.
fn generate_content_body(request: &GenerationRequest) -> Value {
    let mut parts = vec![json!({ "text": request.prompt })];
    for reference in &request.references {
        parts.push(json!({
            "inlineData": {
                "mimeType": reference.mime_type,
                "data": base64::engine::general_purpose::STANDARD.encode(&reference.data),
            }
        }));
    }

    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": {
            "responseModalities": ["IMAGE"],
            "imageConfig": {
                "aspectRatio": request.aspect_ratio,
                "imageSize": request.size,
            }
        }
    })
}

/// Body for Imagen `:predict`.
fn predict_body(request: &GenerationRequest) -> Value {
    json!({
        "instances": [{ "prompt": request.prompt }],
        "parameters": {
            "sampleCount": 1,
            "aspectRatio": request.aspect_ratio,
            "sampleImageSize": request.size,
        }
    })
}
