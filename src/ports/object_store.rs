//! Object store port for persisting generated images.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{base64_bytes, PortFuture};

/// An object to upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRequest {
    /// Object name inside the bucket (e.g., `"studio/a-cat-<id>.png"`).
    pub object_name: String,
    /// Content type stored with the object.
    pub content_type: String,
    /// Object body.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

/// Where an uploaded object landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    /// Storage path, e.g. `gs://bucket/studio/a-cat.png`.
    pub path: String,
    /// Retrieval URL.
    pub url: String,
    /// When `url` stops working, if it is time-limited.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Stores image bytes under an object name.
pub trait ObjectStore: Send + Sync {
    /// Upload an object and return its location.
    fn upload(&self, request: &UploadRequest) -> PortFuture<'_, StoredObject>;
}
