//! Configuration file loading with environment variable overrides.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::prompt::default_suffixes;
use crate::session::Credentials;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API key configuration.
    pub keys: KeysConfig,
    /// Default parameter values, used when CLI flags are omitted.
    pub defaults: DefaultsConfig,
    /// Prompt composition.
    pub prompt: PromptConfig,
    /// Upscaling endpoint.
    pub upscale: UpscaleConfig,
    /// Object storage.
    pub storage: StorageConfig,
    /// Google Cloud credentials shared by upscaling and storage.
    pub google: GoogleConfig,
    /// Optional login gate for interactive sessions.
    pub auth: AuthConfig,
    /// Base URLs of the remote services.
    pub endpoints: EndpointsConfig,
}

/// API key configuration.
#[derive(Debug, Default, Deserialize)]
pub struct KeysConfig {
    /// Gemini API key.
    pub gemini: Option<String>,
}

/// Default parameter values from config file.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Default model name or alias.
    pub model: String,
    /// Default aspect ratio.
    pub aspect_ratio: String,
    /// Default image size.
    pub size: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            model: "nano-banana-pro".to_string(),
            aspect_ratio: "1:1".to_string(),
            size: "1K".to_string(),
        }
    }
}

/// Prompt composition settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Suffixes appended to every prompt, one per line.
    pub suffixes: Vec<String>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            suffixes: default_suffixes(),
        }
    }
}

/// Upscaling endpoint settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct UpscaleConfig {
    /// Google Cloud project.
    pub project: Option<String>,
    /// Google Cloud region.
    pub region: Option<String>,
    /// Upscaling model.
    pub model: String,
}

impl Default for UpscaleConfig {
    fn default() -> Self {
        Self {
            project: None,
            region: None,
            model: "imagen-4.0-upscale-preview".to_string(),
        }
    }
}

/// Object storage settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bucket name.
    pub bucket: Option<String>,
    /// Prefix prepended to every object name.
    pub prefix: String,
    /// Service account used to sign retrieval URLs.
    pub signer_email: Option<String>,
    /// Lifetime of signed retrieval URLs, in seconds.
    pub url_ttl_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            prefix: "imagen-studio".to_string(),
            signer_email: None,
            url_ttl_secs: 3600,
        }
    }
}

/// Google Cloud credentials.
#[derive(Debug, Default, Deserialize)]
pub struct GoogleConfig {
    /// OAuth access token.
    pub access_token: Option<String>,
}

/// Login gate credentials.
#[derive(Debug, Default, Deserialize)]
pub struct AuthConfig {
    /// Expected user name.
    pub username: Option<String>,
    /// Expected password.
    pub password: Option<String>,
}

/// Base URLs of the remote services.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Generative Language API.
    pub generative_language: String,
    /// Vertex AI; `{region}` is substituted.
    pub vertex: String,
    /// Cloud Storage.
    pub storage: String,
    /// IAM Credentials API.
    pub iam: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            generative_language: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            vertex: "https://{region}-aiplatform.googleapis.com/v1".to_string(),
            storage: "https://storage.googleapis.com".to_string(),
            iam: "https://iamcredentials.googleapis.com/v1".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the given path, or return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
        toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
    }

    /// Get the Gemini API key: `GEMINI_API_KEY`, then `GOOGLE_API_KEY`, then the file.
    #[must_use]
    pub fn gemini_key(&self) -> Option<String> {
        env_or("GEMINI_API_KEY", None)
            .or_else(|| env_or("GOOGLE_API_KEY", self.keys.gemini.as_ref()))
    }

    /// Google Cloud project for upscaling.
    #[must_use]
    pub fn project(&self) -> Option<String> {
        env_or("GOOGLE_CLOUD_PROJECT", self.upscale.project.as_ref())
    }

    /// Google Cloud region for upscaling.
    #[must_use]
    pub fn region(&self) -> Option<String> {
        env_or("GOOGLE_CLOUD_REGION", self.upscale.region.as_ref())
    }

    /// Storage bucket.
    #[must_use]
    pub fn bucket(&self) -> Option<String> {
        env_or("IMAGEN_STUDIO_BUCKET", self.storage.bucket.as_ref())
    }

    /// OAuth access token for Google Cloud APIs.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        env_or("GOOGLE_ACCESS_TOKEN", self.google.access_token.as_ref())
    }

    /// Login credentials, if both halves are configured.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        let username = env_or("IMAGEN_STUDIO_USERNAME", self.auth.username.as_ref())?;
        let password = env_or("IMAGEN_STUDIO_PASSWORD", self.auth.password.as_ref())?;
        Some(Credentials { username, password })
    }
}

/// Non-blank environment variable, else the trimmed fallback value.
fn env_or(var: &str, fallback: Option<&String>) -> Option<String> {
    let non_blank = |v: &str| Some(v.trim().to_string()).filter(|v| !v.is_empty());
    std::env::var(var)
        .ok()
        .and_then(|v| non_blank(&v))
        .or_else(|| fallback.and_then(|v| non_blank(v)))
}

/// Discover the config file path using the resolution order:
/// 1. Explicit path (from `--config` flag)
/// 2. `IMAGEN_STUDIO_CONFIG` environment variable
/// 3. `~/.config/imagen-studio/config.toml`
#[must_use]
pub fn discover_config_path(explicit: Option<&str>) -> PathBuf {
    if let Some(p) = explicit {
        return PathBuf::from(p);
    }

    if let Ok(p) = std::env::var("IMAGEN_STUDIO_CONFIG") {
        return PathBuf::from(p);
    }

    default_config_path()
}

/// Default config path: `~/.config/imagen-studio/config.toml`.
fn default_config_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config/imagen-studio/config.toml")
    } else {
        PathBuf::from("imagen-studio.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.keys.gemini.is_none());
        assert_eq!(config.defaults.model, "nano-banana-pro");
        assert_eq!(config.defaults.aspect_ratio, "1:1");
        assert_eq!(config.defaults.size, "1K");
        assert_eq!(config.prompt.suffixes.len(), 2);
        assert_eq!(config.storage.url_ttl_secs, 3600);
        assert!(config.endpoints.vertex.contains("{region}"));
    }

    #[test]
    fn load_nonexistent_returns_defaults() {
        let config = Config::load(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert_eq!(config.defaults.model, "nano-banana-pro");
    }

    #[test]
    fn load_valid_toml() {
        let dir = std::env::temp_dir().join("imagen_studio_config_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            r#"
[keys]
gemini = "test-gemini-key"

[defaults]
model = "imagen-4"
aspect_ratio = "16:9"

[prompt]
suffixes = []

[upscale]
project = "my-project"
region = "us-central1"

[storage]
bucket = "my-bucket"
prefix = "renders"

[auth]
username = "alice"
password = "secret"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.keys.gemini.as_deref(), Some("test-gemini-key"));
        assert_eq!(config.defaults.model, "imagen-4");
        assert_eq!(config.defaults.aspect_ratio, "16:9");
        assert_eq!(config.defaults.size, "1K");
        assert!(config.prompt.suffixes.is_empty());
        assert_eq!(config.upscale.project.as_deref(), Some("my-project"));
        assert_eq!(config.upscale.model, "imagen-4.0-upscale-preview");
        assert_eq!(config.storage.bucket.as_deref(), Some("my-bucket"));
        assert_eq!(config.storage.prefix, "renders");
        assert_eq!(config.auth.username.as_deref(), Some("alice"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_invalid_toml() {
        let dir = std::env::temp_dir().join("imagen_studio_config_bad_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();

        assert!(Config::load(&path).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn blank_fallback_is_none() {
        let unset = "IMAGEN_STUDIO_TEST_UNSET_VAR";
        let blank = "  ".to_string();
        let padded = " value ".to_string();
        assert_eq!(env_or(unset, Some(&blank)), None);
        assert_eq!(env_or(unset, Some(&padded)).as_deref(), Some("value"));
    }

    #[test]
    fn credentials_need_both_halves() {
        let config = Config {
            auth: AuthConfig {
                username: Some("alice".into()),
                password: None,
            },
            ..Config::default()
        };
        if std::env::var("IMAGEN_STUDIO_PASSWORD").is_err() {
            assert!(config.credentials().is_none());
        }
    }

    #[test]
    fn discover_explicit_path() {
        let path = discover_config_path(Some("/tmp/my-config.toml"));
        assert_eq!(path, PathBuf::from("/tmp/my-config.toml"));
    }
}
