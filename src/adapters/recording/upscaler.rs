//! Recording adapter for the `Upscaler` port.

use std::sync::{Arc, Mutex};

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::{PortFuture, UpscaleRequest, UpscaledImage, Upscaler};

/// Records upscale interactions while delegating to an inner implementation.
pub struct RecordingUpscaler {
    inner: Box<dyn Upscaler>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingUpscaler {
    /// Creates a new recording upscaler wrapping the given implementation.
    pub fn new(inner: Box<dyn Upscaler>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl Upscaler for RecordingUpscaler {
    fn upscale(&self, request: &UpscaleRequest) -> PortFuture<'_, UpscaledImage> {
        let request = request.clone();
        Box::pin(async move {
            let result = self.inner.upscale(&request).await;
            record_result(&self.recorder, "upscaler", "upscale", &request, &result);
            result
        })
    }
}
