//! Recording adapter for the `ObjectStore` port.

use std::sync::{Arc, Mutex};

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::{ObjectStore, PortFuture, StoredObject, UploadRequest};

/// Records uploads while delegating to an inner implementation.
pub struct RecordingStore {
    inner: Box<dyn ObjectStore>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingStore {
    /// Creates a new recording store wrapping the given implementation.
    pub fn new(inner: Box<dyn ObjectStore>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl ObjectStore for RecordingStore {
    fn upload(&self, request: &UploadRequest) -> PortFuture<'_, StoredObject> {
        let request = request.clone();
        Box::pin(async move {
            let result = self.inner.upload(&request).await;
            record_result(&self.recorder, "object_store", "upload", &request, &result);
            result
        })
    }
}
