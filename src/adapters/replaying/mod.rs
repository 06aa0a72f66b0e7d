//! Replaying adapters that serve recorded interactions from cassettes.

mod image_generator;
mod object_store;
mod upscaler;

pub use image_generator::ReplayingGenerator;
pub use object_store::ReplayingStore;
pub use upscaler::ReplayingUpscaler;

use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::cassette::format::RecordedError;
use crate::cassette::replayer::CassetteReplayer;
use crate::error::StudioError;

/// Retrieve the next recorded output for a given port and method.
pub(crate) fn next_output(
    replayer: &Arc<Mutex<CassetteReplayer>>,
    port: &str,
    method: &str,
) -> Result<Value, StudioError> {
    let mut guard = replayer
        .lock()
        .map_err(|e| StudioError::Replay(format!("replayer lock poisoned: {e}")))?;
    let interaction = guard
        .next_interaction(port, method)
        .map_err(StudioError::Replay)?;
    Ok(interaction.output.clone())
}

/// Deserialize a replayed output as `Result<T, StudioError>`.
///
/// A recorded `Err` is rebuilt as the variant that was recorded. A bare
/// message string comes back as [`StudioError::Api`] with status 0.
pub(crate) fn replay_result<T: serde::de::DeserializeOwned>(
    output: Value,
) -> Result<T, StudioError> {
    if let Some(err_val) = output.get("Err").or_else(|| output.get("err")) {
        return Err(replay_error(err_val));
    }
    let value = match output.get("Ok").or_else(|| output.get("ok")) {
        Some(ok_val) => ok_val.clone(),
        None => output,
    };
    serde_json::from_value(value)
        .map_err(|e| StudioError::Replay(format!("recorded output does not match: {e}")))
}

fn replay_error(err_val: &Value) -> StudioError {
    if let Some(message) = err_val.as_str() {
        return StudioError::Api {
            status: 0,
            message: message.to_string(),
        };
    }
    match serde_json::from_value::<RecordedError>(err_val.clone()) {
        Ok(recorded) => recorded.into(),
        Err(e) => StudioError::Replay(format!("recorded error does not match: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::StoredObject;
    use serde_json::json;

    #[test]
    fn ok_output_is_deserialized() {
        let output = json!({"Ok": {"path": "gs://b/o", "url": "https://u"}});
        let stored: StoredObject = replay_result(output).unwrap();
        assert_eq!(stored.path, "gs://b/o");
        assert!(stored.expires_at.is_none());
    }

    #[test]
    fn message_only_err_becomes_api_error() {
        let err = replay_result::<StoredObject>(json!({"Err": "denied"})).unwrap_err();
        assert!(matches!(err, StudioError::Api { status: 0, ref message } if message == "denied"));
    }

    #[test]
    fn recorded_quota_error_is_rebuilt() {
        let output = json!({"Err": {"kind": "quota_exhausted", "message": "slow down"}});
        let err = replay_result::<StoredObject>(output).unwrap_err();
        assert!(matches!(err, StudioError::QuotaExhausted(ref m) if m == "slow down"));
    }

    #[test]
    fn recorded_api_error_keeps_status() {
        let output = json!({"Err": {"kind": "api", "status": 500, "message": "backend down"}});
        let err = replay_result::<StoredObject>(output).unwrap_err();
        assert_eq!(err.to_string(), "API error (500): backend down");
    }

    #[test]
    fn malformed_err_is_replay_error() {
        let err = replay_result::<StoredObject>(json!({"Err": {"kind": 7}})).unwrap_err();
        assert!(matches!(err, StudioError::Replay(_)));
    }

    #[test]
    fn mismatched_output_is_replay_error() {
        let err = replay_result::<StoredObject>(json!({"Ok": 42})).unwrap_err();
        assert!(matches!(err, StudioError::Replay(_)));
    }
}
