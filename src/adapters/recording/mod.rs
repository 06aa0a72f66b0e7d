//! Recording adapters that capture interactions to cassettes.

mod image_generator;
mod object_store;
mod upscaler;

pub use image_generator::RecordingGenerator;
pub use object_store::RecordingStore;
pub use upscaler::RecordingUpscaler;

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::warn;

use crate::cassette::format::RecordedError;
use crate::cassette::recorder::CassetteRecorder;
use crate::error::StudioError;

/// Record a port call using the Ok/Err JSON convention. Errors keep their
/// variant so replay can rebuild them.
pub(crate) fn record_result<T, I>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, StudioError>,
) where
    T: Serialize,
    I: Serialize,
{
    let to_json = |value: Result<serde_json::Value, serde_json::Error>| {
        value.unwrap_or_else(|e| serde_json::json!({ "unserializable": e.to_string() }))
    };
    let input_json = to_json(serde_json::to_value(input));
    let output_json = match result {
        Ok(v) => serde_json::json!({ "Ok": to_json(serde_json::to_value(v)) }),
        Err(e) => {
            let recorded = RecordedError::from(e);
            serde_json::json!({ "Err": to_json(serde_json::to_value(recorded)) })
        }
    };

    match recorder.lock() {
        Ok(mut guard) => guard.record(port, method, input_json, output_json),
        Err(e) => warn!(port, method, error = %e, "recorder lock poisoned; interaction dropped"),
    }
}
