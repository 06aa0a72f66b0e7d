//! Unified error type for imagen-studio.

use thiserror::Error;

/// Errors that can occur while generating, upscaling, or storing images.
#[derive(Debug, Error)]
pub enum StudioError {
    /// The generation service reported quota or rate-limit exhaustion.
    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),

    /// An API returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// A network error occurred.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The call succeeded but no image payload was found in the response.
    #[error("No image returned by {0}")]
    NoImage(String),

    /// An upscale request failed its local checks and was never sent.
    #[error("Cannot upscale: {0}")]
    UpscalePrecondition(String),

    /// No credential configured for a service.
    #[error("No credential for {service}. Set {env_var} or add it to config file.")]
    MissingApiKey {
        /// The service name.
        service: String,
        /// The environment variable name.
        env_var: String,
    },

    /// Login required or rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Image decoding or re-encoding error.
    #[error("Image conversion error: {0}")]
    ImageConversion(String),

    /// A replayed interaction could not be served.
    #[error("Replay error: {0}")]
    Replay(String),
}

impl StudioError {
    /// Classify a non-success HTTP response from a Google API.
    ///
    /// Status 429 and `RESOURCE_EXHAUSTED` bodies become [`StudioError::QuotaExhausted`];
    /// everything else is an [`StudioError::Api`] carrying the error message.
    #[must_use]
    pub fn from_google_response(status: u16, body: &str) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
        let error = parsed.as_ref().and_then(|v| v.get("error"));
        let message = error
            .and_then(|e| e.get("message"))
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| truncate(body, 500), str::to_string);
        let exhausted = error
            .and_then(|e| e.get("status"))
            .and_then(serde_json::Value::as_str)
            .is_some_and(|s| s == "RESOURCE_EXHAUSTED");

        if status == 429 || exhausted {
            Self::QuotaExhausted(message)
        } else {
            Self::Api { status, message }
        }
    }
}

/// Truncate a response body for inclusion in an error message.
pub(crate) fn truncate(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_429_is_quota() {
        let err = StudioError::from_google_response(429, "slow down");
        assert!(matches!(err, StudioError::QuotaExhausted(ref m) if m == "slow down"));
    }

    #[test]
    fn resource_exhausted_body_is_quota() {
        let body = r#"{"error":{"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = StudioError::from_google_response(400, body);
        assert!(matches!(err, StudioError::QuotaExhausted(ref m) if m == "Quota exceeded"));
    }

    #[test]
    fn other_errors_keep_status_and_message() {
        let body = r#"{"error":{"code":400,"message":"Bad prompt","status":"INVALID_ARGUMENT"}}"#;
        match StudioError::from_google_response(400, body) {
            StudioError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Bad prompt");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "é".repeat(10);
        let t = truncate(&s, 5);
        assert!(t.ends_with("..."));
        assert_eq!(truncate("short", 10), "short");
    }
}
