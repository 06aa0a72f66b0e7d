//! On-disk cassette format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StudioError;

/// A recorded sequence of port interactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cassette {
    /// Human-readable name.
    pub name: String,
    /// When the recording finished.
    pub recorded_at: DateTime<Utc>,
    /// Commit the recording was made from.
    pub commit: String,
    /// Interactions in call order.
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

/// One call through a port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    /// Position across the whole cassette.
    pub seq: u64,
    /// Port name, e.g. `"image_generator"`.
    pub port: String,
    /// Method name, e.g. `"generate"`.
    pub method: String,
    /// Serialized request.
    #[serde(default)]
    pub input: serde_json::Value,
    /// `{"Ok": value}` or `{"Err": RecordedError}`.
    pub output: serde_json::Value,
}

/// The `Err` side of an output: which error it was, and what it said.
///
/// Older cassettes store a bare message string; those replay as
/// [`StudioError::Api`] with status 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedError {
    /// Error variant in snake case, e.g. `"quota_exhausted"`.
    pub kind: String,
    /// HTTP status, for `api` errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// The variant's message.
    pub message: String,
}

impl From<&StudioError> for RecordedError {
    fn from(err: &StudioError) -> Self {
        let (kind, status, message) = match err {
            StudioError::QuotaExhausted(m) => ("quota_exhausted", None, m.clone()),
            StudioError::Api { status, message } => ("api", Some(*status), message.clone()),
            StudioError::Config(m) => ("config", None, m.clone()),
            StudioError::InvalidArgument(m) => ("invalid_argument", None, m.clone()),
            StudioError::NoImage(m) => ("no_image", None, m.clone()),
            StudioError::UpscalePrecondition(m) => ("upscale_precondition", None, m.clone()),
            StudioError::Auth(m) => ("auth", None, m.clone()),
            StudioError::ImageConversion(m) => ("image_conversion", None, m.clone()),
            StudioError::Replay(m) => ("replay", None, m.clone()),
            StudioError::Io(e) => ("io", None, e.to_string()),
            StudioError::Network(_) | StudioError::MissingApiKey { .. } => {
                ("other", None, err.to_string())
            }
        };
        Self {
            kind: kind.to_string(),
            status,
            message,
        }
    }
}

impl From<RecordedError> for StudioError {
    fn from(recorded: RecordedError) -> Self {
        let RecordedError {
            kind,
            status,
            message,
        } = recorded;
        match kind.as_str() {
            "quota_exhausted" => Self::QuotaExhausted(message),
            "config" => Self::Config(message),
            "invalid_argument" => Self::InvalidArgument(message),
            "no_image" => Self::NoImage(message),
            "upscale_precondition" => Self::UpscalePrecondition(message),
            "auth" => Self::Auth(message),
            "image_conversion" => Self::ImageConversion(message),
            "replay" => Self::Replay(message),
            "io" => Self::Io(std::io::Error::other(message)),
            _ => Self::Api {
                status: status.unwrap_or(0),
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_errors_keep_their_variant() {
        let err = StudioError::QuotaExhausted("Resource has been exhausted".into());
        let yaml = serde_yaml::to_string(&RecordedError::from(&err)).unwrap();
        assert!(yaml.contains("kind: quota_exhausted"));
        assert!(!yaml.contains("status"));

        let recorded: RecordedError = serde_yaml::from_str(&yaml).unwrap();
        let replayed = StudioError::from(recorded);
        assert!(matches!(replayed, StudioError::QuotaExhausted(_)));
        assert_eq!(
            replayed.to_string(),
            "Quota exhausted: Resource has been exhausted"
        );
    }

    #[test]
    fn api_errors_keep_status() {
        let err = StudioError::Api {
            status: 403,
            message: "no write access".into(),
        };
        let replayed = StudioError::from(RecordedError::from(&err));
        assert_eq!(replayed.to_string(), "API error (403): no write access");
    }

    #[test]
    fn unknown_kinds_become_api_errors() {
        let recorded = RecordedError {
            kind: "network".into(),
            status: None,
            message: "connection reset".into(),
        };
        let replayed = StudioError::from(recorded);
        assert!(matches!(replayed, StudioError::Api { status: 0, .. }));
    }
}
