//! Service context that bundles all port trait objects.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;

use crate::adapters::live::gcs::GcsStore;
use crate::adapters::live::gemini::GeminiGenerator;
use crate::adapters::live::vertex::VertexUpscaler;
use crate::adapters::recording::{RecordingGenerator, RecordingStore, RecordingUpscaler};
use crate::adapters::replaying::{ReplayingGenerator, ReplayingStore, ReplayingUpscaler};
use crate::cassette::config::load_cassette;
use crate::cassette::recorder::CassetteRecorder;
use crate::config::Config;
use crate::error::StudioError;
use crate::ports::{ImageGenerator, ObjectStore, Upscaler};

/// Bundles all port trait objects into a single context.
///
/// A port is `None` when its service is not configured; the session turns
/// that into an error only when the port is actually needed.
pub struct ServiceContext {
    /// Image generator port.
    pub generator: Option<Box<dyn ImageGenerator>>,
    /// Upscaler port.
    pub upscaler: Option<Box<dyn Upscaler>>,
    /// Object store port.
    pub store: Option<Box<dyn ObjectStore>>,
}

/// Handle to a recording session that must be finished after use.
pub struct RecordingSession {
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingSession {
    /// Write everything recorded so far to the cassette file.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be written.
    pub fn finish(self) -> Result<PathBuf, String> {
        let recorder = self
            .recorder
            .lock()
            .map_err(|e| format!("Recorder lock poisoned: {e}"))?;
        recorder
            .write()
            .map_err(|e| format!("Failed to write cassette: {e}"))
    }
}

impl ServiceContext {
    /// Create a live context from configuration.
    #[must_use]
    pub fn live(config: &Config) -> Self {
        let endpoints = &config.endpoints;

        let generator = config.gemini_key().map(|key| {
            Box::new(GeminiGenerator::new(key, &endpoints.generative_language))
                as Box<dyn ImageGenerator>
        });

        let token = config.access_token();
        let upscaler = token.clone().map(|token| {
            Box::new(VertexUpscaler::new(token, &config.upscale.model, &endpoints.vertex))
                as Box<dyn Upscaler>
        });

        let store = match (config.bucket(), token) {
            (Some(bucket), Some(token)) => {
                let mut store = GcsStore::new(token, bucket, &endpoints.storage, &endpoints.iam);
                if let Some(email) = &config.storage.signer_email {
                    let ttl = Duration::from_secs(config.storage.url_ttl_secs);
                    store = store.with_signer(email.clone(), ttl);
                }
                Some(Box::new(store) as Box<dyn ObjectStore>)
            }
            _ => None,
        };

        debug!(
            generator = generator.is_some(),
            upscaler = upscaler.is_some(),
            store = store.is_some(),
            "live context"
        );
        Self {
            generator,
            upscaler,
            store,
        }
    }

    /// Create a recording context that wraps each live adapter with a recorder.
    #[must_use]
    pub fn recording(config: &Config) -> (Self, RecordingSession) {
        let live = Self::live(config);

        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let file_name = format!("{timestamp}.cassette.yaml");
        let path = PathBuf::from(".imagen-studio/cassettes").join(file_name);
        let recorder = CassetteRecorder::new(path, timestamp, get_commit_hash());
        let recorder = Arc::new(Mutex::new(recorder));

        let generator = live.generator.map(|inner| {
            Box::new(RecordingGenerator::new(inner, Arc::clone(&recorder)))
                as Box<dyn ImageGenerator>
        });
        let upscaler = live.upscaler.map(|inner| {
            Box::new(RecordingUpscaler::new(inner, Arc::clone(&recorder))) as Box<dyn Upscaler>
        });
        let store = live.store.map(|inner| {
            Box::new(RecordingStore::new(inner, Arc::clone(&recorder))) as Box<dyn ObjectStore>
        });

        let context = Self {
            generator,
            upscaler,
            store,
        };
        (context, RecordingSession { recorder })
    }

    /// Create a replaying context from a cassette file; every port is available.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be loaded.
    pub fn replaying(path: &Path) -> Result<Self, StudioError> {
        let replayer = load_cassette(path)
            .map_err(|e| StudioError::Config(format!("Failed to load cassette: {e}")))?;
        let replayer = Arc::new(Mutex::new(replayer));
        Ok(Self {
            generator: Some(Box::new(ReplayingGenerator::new(Arc::clone(&replayer)))),
            upscaler: Some(Box::new(ReplayingUpscaler::new(Arc::clone(&replayer)))),
            store: Some(Box::new(ReplayingStore::new(replayer))),
        })
    }
}

/// Get the current git commit hash, or "unknown" if unavailable.
fn get_commit_hash() -> String {
    std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map_or_else(|| "unknown".to_string(), |s| s.trim().to_string())
}
