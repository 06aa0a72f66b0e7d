//! Replaying adapter for the `ImageGenerator` port.

use std::sync::{Arc, Mutex};

use super::{next_output, replay_result};
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{GenerationRequest, ImageGenerator, PortFuture, RawResponse};

/// Serves recorded generation responses from a cassette.
pub struct ReplayingGenerator {
    replayer: Arc<Mutex<CassetteReplayer>>,
}

impl ReplayingGenerator {
    /// Create a replaying generator backed by the given replayer.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer }
    }
}

impl ImageGenerator for ReplayingGenerator {
    fn generate(&self, _request: &GenerationRequest) -> PortFuture<'_, RawResponse> {
        let output = next_output(&self.replayer, "image_generator", "generate");
        Box::pin(async move { replay_result(output?) })
    }
}
