//! Image generator port for hosted image generation APIs.

use serde::{Deserialize, Serialize};

use super::{base64_bytes, PortFuture};
use crate::response::Response;

/// A reference image sent alongside the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceImage {
    /// MIME type of the image (e.g., `"image/png"`).
    pub mime_type: String,
    /// Raw image bytes.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

/// A request to generate one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The resolved model identifier (e.g., `"gemini-3-pro-image-preview"`).
    pub model: String,
    /// The full prompt, including any composed suffixes.
    pub prompt: String,
    /// Aspect ratio hint (e.g., `"1:1"`, `"16:9"`).
    pub aspect_ratio: String,
    /// Image size (`"1K"`, `"2K"`, `"4K"`).
    pub size: String,
    /// Optional reference images.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<ReferenceImage>,
}

/// The body returned by a generation service, before any interpretation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawResponse {
    /// A decoded JSON body.
    Json(serde_json::Value),
    /// A raw binary body.
    Bytes(#[serde(with = "base64_bytes")] Vec<u8>),
}

impl From<&RawResponse> for Response {
    fn from(raw: &RawResponse) -> Self {
        match raw {
            RawResponse::Json(value) => Response::from_json(value),
            RawResponse::Bytes(data) => Response::from_bytes(data.clone()),
        }
    }
}

/// Generates images from text prompts via an external API.
pub trait ImageGenerator: Send + Sync {
    /// Generate an image for the given request.
    fn generate(&self, request: &GenerationRequest) -> PortFuture<'_, RawResponse>;
}
