//! Replaying adapter for the `ObjectStore` port.

use std::sync::{Arc, Mutex};

use super::{next_output, replay_result};
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{ObjectStore, PortFuture, StoredObject, UploadRequest};

/// Serves recorded upload results from a cassette.
pub struct ReplayingStore {
    replayer: Arc<Mutex<CassetteReplayer>>,
}

impl ReplayingStore {
    /// Create a replaying store backed by the given replayer.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer }
    }
}

impl ObjectStore for ReplayingStore {
    fn upload(&self, _request: &UploadRequest) -> PortFuture<'_, StoredObject> {
        let output = next_output(&self.replayer, "object_store", "upload");
        Box::pin(async move { replay_result(output?) })
    }
}
