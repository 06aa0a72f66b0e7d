//! Records interactions into a cassette file.

use std::path::PathBuf;

use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::format::{Cassette, Interaction};

/// Input strings longer than this are stored as their digest.
const INPUT_INLINE_LIMIT: usize = 256;

/// Collects interactions from every port and writes them as one YAML cassette.
///
/// Outputs are kept verbatim since replay serves them back. Inputs are only
/// for reading, so embedded image payloads are reduced to `sha256:<hex>`.
#[derive(Debug)]
pub struct CassetteRecorder {
    path: PathBuf,
    name: String,
    commit: String,
    interactions: Vec<Interaction>,
}

impl CassetteRecorder {
    /// Create a recorder that will write to `path`.
    pub fn new(
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        commit: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            commit: commit.into(),
            interactions: Vec::new(),
        }
    }

    /// Append one call. `seq` counts across all ports.
    pub fn record(
        &mut self,
        port: impl Into<String>,
        method: impl Into<String>,
        input: Value,
        output: Value,
    ) {
        let seq = self.interactions.len() as u64;
        self.interactions.push(Interaction {
            seq,
            port: port.into(),
            method: method.into(),
            input: compact_input(input),
            output,
        });
    }

    /// Number of interactions recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    /// Write everything recorded so far, creating parent directories.
    ///
    /// Can be called repeatedly; each call rewrites the whole file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self) -> Result<PathBuf, std::io::Error> {
        let cassette = Cassette {
            name: self.name.clone(),
            recorded_at: Utc::now(),
            commit: self.commit.clone(),
            interactions: self.interactions.clone(),
        };
        let yaml = serde_yaml::to_string(&cassette).map_err(std::io::Error::other)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, yaml)?;
        Ok(self.path.clone())
    }
}

fn compact_input(value: Value) -> Value {
    match value {
        Value::String(s) if s.len() > INPUT_INLINE_LIMIT => {
            Value::String(format!("sha256:{}", hex::encode(Sha256::digest(s.as_bytes()))))
        }
        Value::Array(items) => Value::Array(items.into_iter().map(compact_input).collect()),
        Value::Object(fields) => {
            let fields = fields.into_iter().map(|(k, v)| (k, compact_input(v)));
            Value::Object(fields.collect())
        }
        other => other,
    }
}
