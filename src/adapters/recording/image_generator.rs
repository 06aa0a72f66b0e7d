//! Recording adapter for the `ImageGenerator` port.

use std::sync::{Arc, Mutex};

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::{GenerationRequest, ImageGenerator, PortFuture, RawResponse};

/// Records generation interactions while delegating to an inner implementation.
pub struct RecordingGenerator {
    inner: Box<dyn ImageGenerator>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingGenerator {
    /// Creates a new recording generator wrapping the given implementation.
    pub fn new(inner: Box<dyn ImageGenerator>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl ImageGenerator for RecordingGenerator {
    fn generate(&self, request: &GenerationRequest) -> PortFuture<'_, RawResponse> {
        let request = request.clone();
        Box::pin(async move {
            let result = self.inner.generate(&request).await;
            record_result(
                &self.recorder,
                "image_generator",
                "generate",
                &request,
                &result,
            );
            result
        })
    }
}
