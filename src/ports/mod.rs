//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the studio core and an external
//! service. Implementations live in `src/adapters/`.

pub mod image_generator;
pub mod object_store;
pub mod upscaler;

use std::future::Future;
use std::pin::Pin;

use crate::error::StudioError;

pub use image_generator::{GenerationRequest, ImageGenerator, RawResponse, ReferenceImage};
pub use object_store::{ObjectStore, StoredObject, UploadRequest};
pub use upscaler::{UpscaleRequest, UpscaledImage, Upscaler};

/// Boxed future type returned by every port method.
pub type PortFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StudioError>> + Send + 'a>>;

/// Serde helper for serializing `Vec<u8>` as base64 strings in cassettes.
pub(crate) mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as base64 string.
    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(data);
        serializer.serialize_str(&encoded)
    }

    /// Deserialize base64 string to bytes.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(&s)
            .map_err(serde::de::Error::custom)
    }
}
