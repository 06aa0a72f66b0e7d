//! Interactive session: login gate, history, and the generate/upscale flows.
//!
//! Every flow is linear: validate, call one external service, extract the
//! image, optionally upload it, then record a [`HistoryEntry`] at the front
//! of the session's [`History`]. Upload failures never undo a successful
//! generation; they only leave `storage` empty.

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::context::ServiceContext;
use crate::error::StudioError;
use crate::extract::extract_image;
use crate::model::{detect_family, ModelFamily};
use crate::output::object_name;
use crate::params::{validate_aspect_ratio, validate_size, UpscaleFactor};
use crate::ports::{
    GenerationRequest, ReferenceImage, StoredObject, UploadRequest, UpscaleRequest,
};
use crate::prompt::compose_prompt;
use crate::response::Response;

/// MIME type every stored payload is labelled with.
pub const PAYLOAD_MIME: &str = "image/png";

/// Expected login.
#[derive(Clone)]
pub struct Credentials {
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One generation or upscale result.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Unique id; a nil id is replaced on insertion.
    pub id: Uuid,
    /// The prompt as the user typed it.
    pub prompt: String,
    /// Image bytes.
    pub image: Vec<u8>,
    /// Model that produced the image. Upscales of history entries keep the
    /// source's model; upscales of outside bytes record the upscaler's.
    pub model: String,
    /// Aspect ratio requested.
    pub aspect_ratio: Option<String>,
    /// Set on upscale results.
    pub upscale_factor: Option<UpscaleFactor>,
    /// Whether reference images were sent.
    pub used_reference: bool,
    /// Entry this one was upscaled from.
    pub source_id: Option<Uuid>,
    /// Where the image was uploaded, if it was.
    pub storage: Option<StoredObject>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Ordered history, newest first.
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    /// Insert at the front, backfilling a nil id.
    pub fn insert(&mut self, mut entry: HistoryEntry) -> &HistoryEntry {
        if entry.id.is_nil() {
            entry.id = Uuid::new_v4();
        }
        self.entries.insert(0, entry);
        &self.entries[0]
    }

    /// All entries, newest first.
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Find an entry by id.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// The most recent entry.
    #[must_use]
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.first()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Settings a session carries for its whole lifetime.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Login gate; `None` leaves the session open.
    pub credentials: Option<Credentials>,
    /// Suffixes appended to prompts.
    pub suffixes: Vec<String>,
    /// Prefix for uploaded object names.
    pub storage_prefix: String,
    /// Project for upscaling.
    pub project: Option<String>,
    /// Region for upscaling.
    pub region: Option<String>,
    /// Upscaling model, recorded on entries upscaled from outside bytes.
    pub upscale_model: String,
}

impl SessionConfig {
    /// Collect session settings from the loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            credentials: config.credentials(),
            suffixes: config.prompt.suffixes.clone(),
            storage_prefix: config.storage.prefix.clone(),
            project: config.project(),
            region: config.region(),
            upscale_model: config.upscale.model.clone(),
        }
    }
}

/// Parameters for one generation.
#[derive(Debug, Clone)]
pub struct GenerateParams {
    /// The user's prompt.
    pub prompt: String,
    /// Resolved model id.
    pub model: String,
    /// Aspect ratio.
    pub aspect_ratio: String,
    /// Image size.
    pub size: String,
    /// Reference images.
    pub references: Vec<ReferenceImage>,
    /// Send the prompt without suffixes.
    pub raw_prompt: bool,
    /// Upload the result to object storage.
    pub upload: bool,
}

impl GenerateParams {
    /// Check the parameters without contacting any service.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::InvalidArgument`] describing the first problem.
    pub fn validate(&self) -> Result<(), StudioError> {
        if self.prompt.trim().is_empty() {
            return Err(StudioError::InvalidArgument("Prompt is empty".into()));
        }
        let family = detect_family(&self.model).map_err(StudioError::InvalidArgument)?;
        validate_aspect_ratio(&self.aspect_ratio).map_err(StudioError::InvalidArgument)?;
        validate_size(&self.size).map_err(StudioError::InvalidArgument)?;
        if family == ModelFamily::Predict && !self.references.is_empty() {
            return Err(StudioError::InvalidArgument(format!(
                "Reference images are not supported by '{}'",
                self.model
            )));
        }
        Ok(())
    }
}

/// Which image to upscale.
#[derive(Debug, Clone)]
pub enum UpscaleSource {
    /// The most recent history entry.
    Latest,
    /// A specific history entry.
    Entry(Uuid),
    /// Bytes from outside the history.
    Bytes {
        /// Image bytes.
        data: Vec<u8>,
        /// Label recorded as the entry's prompt.
        label: String,
    },
}

/// Parameters for one upscale.
#[derive(Debug, Clone)]
pub struct UpscaleParams {
    /// Source image.
    pub source: UpscaleSource,
    /// Requested factor, unparsed.
    pub factor: String,
    /// Upload the result to object storage.
    pub upload: bool,
}

/// One user's session. Owns the history; nothing else holds entries.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    authenticated: bool,
    history: History,
}

impl Session {
    /// Start a session; it is unlocked when no credentials are configured.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        let authenticated = config.credentials.is_none();
        Self {
            config,
            authenticated,
            history: History::default(),
        }
    }

    /// Whether generation is allowed.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Unlock the session.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Auth`] when the credentials do not match.
    pub fn login(&mut self, username: &str, password: &str) -> Result<(), StudioError> {
        let Some(expected) = &self.config.credentials else {
            self.authenticated = true;
            return Ok(());
        };
        let user_ok = constant_time_eq(username.as_bytes(), expected.username.as_bytes());
        let pass_ok = constant_time_eq(password.as_bytes(), expected.password.as_bytes());
        if user_ok && pass_ok {
            info!(user = username, "session unlocked");
            self.authenticated = true;
            Ok(())
        } else {
            warn!(user = username, "login rejected");
            Err(StudioError::Auth("ID or password is incorrect".into()))
        }
    }

    /// The session history, newest first.
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Generate an image and record it.
    ///
    /// # Errors
    ///
    /// Fails on invalid parameters, API errors, or when the response holds
    /// no image. Upload failures are not errors.
    pub async fn generate(
        &mut self,
        ctx: &ServiceContext,
        params: GenerateParams,
    ) -> Result<&HistoryEntry, StudioError> {
        self.require_login()?;
        params.validate()?;

        let full_prompt = if params.raw_prompt {
            params.prompt.clone()
        } else {
            compose_prompt(&params.prompt, &self.config.suffixes)
        };
        let request = GenerationRequest {
            model: params.model.clone(),
            prompt: full_prompt,
            aspect_ratio: params.aspect_ratio.clone(),
            size: params.size.clone(),
            references: params.references,
        };
        let used_reference = !request.references.is_empty();

        let generator = ctx
            .generator
            .as_deref()
            .ok_or_else(|| StudioError::MissingApiKey {
                service: "Gemini".into(),
                env_var: "GEMINI_API_KEY".into(),
            })?;

        debug!(model = %request.model, references = request.references.len(), "generating");
        let raw = generator.generate(&request).await?;
        let image = extract_image(&Response::from(&raw))
            .ok_or_else(|| StudioError::NoImage(request.model.clone()))?;
        info!(model = %request.model, bytes = image.len(), "image generated");

        let id = Uuid::new_v4();
        let storage = if params.upload {
            let name = object_name(&self.config.storage_prefix, &params.prompt, id);
            upload(ctx, name, &image).await
        } else {
            None
        };

        Ok(self.history.insert(HistoryEntry {
            id,
            prompt: params.prompt,
            image,
            model: request.model,
            aspect_ratio: Some(request.aspect_ratio),
            upscale_factor: None,
            used_reference,
            source_id: None,
            storage,
            created_at: Utc::now(),
        }))
    }

    /// Upscale an image and record the result.
    ///
    /// All local checks run before the upscaler is called.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::UpscalePrecondition`] for an invalid factor,
    /// missing source, or missing project/region/service; otherwise the
    /// upscaler's error.
    pub async fn upscale(
        &mut self,
        ctx: &ServiceContext,
        params: UpscaleParams,
    ) -> Result<&HistoryEntry, StudioError> {
        self.require_login()?;
        let factor: UpscaleFactor = params
            .factor
            .parse()
            .map_err(StudioError::UpscalePrecondition)?;

        let source = match params.source {
            UpscaleSource::Bytes { data, label } => SourceImage {
                image: data,
                prompt: label,
                model: self.config.upscale_model.clone(),
                aspect_ratio: None,
                id: None,
            },
            UpscaleSource::Latest => SourceImage::from_entry(self.history.latest())?,
            UpscaleSource::Entry(id) => SourceImage::from_entry(self.history.get(id))?,
        };
        let SourceImage {
            image,
            prompt,
            model,
            aspect_ratio,
            id: source_id,
        } = source;
        if image.is_empty() {
            return Err(StudioError::UpscalePrecondition("Source image is empty".into()));
        }
        let project = self.config.project.clone().ok_or_else(|| {
            StudioError::UpscalePrecondition("No project configured (GOOGLE_CLOUD_PROJECT)".into())
        })?;
        let region = self.config.region.clone().ok_or_else(|| {
            StudioError::UpscalePrecondition("No region configured (GOOGLE_CLOUD_REGION)".into())
        })?;
        let upscaler = ctx.upscaler.as_deref().ok_or_else(|| {
            StudioError::UpscalePrecondition(
                "No upscaling service configured (GOOGLE_ACCESS_TOKEN)".into(),
            )
        })?;

        debug!(%factor, %project, %region, "upscaling");
        let request = UpscaleRequest {
            project,
            region,
            factor,
            image,
        };
        let upscaled = upscaler.upscale(&request).await?;
        if upscaled.data.is_empty() {
            return Err(StudioError::NoImage("upscaler".into()));
        }

        let id = Uuid::new_v4();
        let storage = if params.upload {
            let label = format!("{prompt} {factor}");
            let name = object_name(&self.config.storage_prefix, &label, id);
            upload(ctx, name, &upscaled.data).await
        } else {
            None
        };

        Ok(self.history.insert(HistoryEntry {
            id,
            prompt,
            image: upscaled.data,
            model,
            aspect_ratio,
            upscale_factor: Some(factor),
            used_reference: false,
            source_id,
            storage,
            created_at: Utc::now(),
        }))
    }

    fn require_login(&self) -> Result<(), StudioError> {
        if self.authenticated {
            Ok(())
        } else {
            Err(StudioError::Auth("Login required".into()))
        }
    }
}

/// The image an upscale starts from, detached from the history borrow.
struct SourceImage {
    image: Vec<u8>,
    prompt: String,
    model: String,
    aspect_ratio: Option<String>,
    id: Option<Uuid>,
}

impl SourceImage {
    fn from_entry(entry: Option<&HistoryEntry>) -> Result<Self, StudioError> {
        let entry = entry.ok_or_else(|| {
            StudioError::UpscalePrecondition("No source image in history".into())
        })?;
        Ok(Self {
            image: entry.image.clone(),
            prompt: entry.prompt.clone(),
            model: entry.model.clone(),
            aspect_ratio: entry.aspect_ratio.clone(),
            id: Some(entry.id),
        })
    }
}

/// Upload best-effort; failures are logged and yield `None`.
async fn upload(ctx: &ServiceContext, object_name: String, data: &[u8]) -> Option<StoredObject> {
    let Some(store) = ctx.store.as_deref() else {
        warn!("upload requested but no object store is configured");
        return None;
    };
    let request = UploadRequest {
        object_name,
        content_type: PAYLOAD_MIME.to_string(),
        data: data.to_vec(),
    };
    match store.upload(&request).await {
        Ok(stored) => {
            info!(path = %stored.path, "image uploaded");
            Some(stored)
        }
        Err(e) => {
            warn!(error = %e, object = %request.object_name, "upload failed; keeping result");
            None
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
