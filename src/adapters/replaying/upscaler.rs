//! Replaying adapter for the `Upscaler` port.

use std::sync::{Arc, Mutex};

use super::{next_output, replay_result};
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{PortFuture, UpscaleRequest, UpscaledImage, Upscaler};

/// Serves recorded upscale results from a cassette.
pub struct ReplayingUpscaler {
    replayer: Arc<Mutex<CassetteReplayer>>,
}

impl ReplayingUpscaler {
    /// Create a replaying upscaler backed by the given replayer.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer }
    }
}

impl Upscaler for ReplayingUpscaler {
    fn upscale(&self, _request: &UpscaleRequest) -> PortFuture<'_, UpscaledImage> {
        let output = next_output(&self.replayer, "upscaler", "upscale");
        Box::pin(async move { replay_result(output?) })
    }
}
