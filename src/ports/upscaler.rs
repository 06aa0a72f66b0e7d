//! Upscaler port for a hosted image upscaling API.

use serde::{Deserialize, Serialize};

use super::{base64_bytes, PortFuture};
use crate::params::UpscaleFactor;

/// A validated request to upscale one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpscaleRequest {
    /// Cloud project that owns the upscaling endpoint.
    pub project: String,
    /// Region of the upscaling endpoint (e.g., `"us-central1"`).
    pub region: String,
    /// Upscale multiplier.
    pub factor: UpscaleFactor,
    /// Source image bytes.
    #[serde(with = "base64_bytes")]
    pub image: Vec<u8>,
}

/// The upscaled image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpscaledImage {
    /// Raw image bytes.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

/// Increases the resolution of an image via an external API.
pub trait Upscaler: Send + Sync {
    /// Upscale the image in `request`.
    fn upscale(&self, request: &UpscaleRequest) -> PortFuture<'_, UpscaledImage>;
}
