//! CLI argument parsing with clap.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::config::Config;
use crate::error::StudioError;
use crate::model::resolve_model;
use crate::output::sniff_mime;
use crate::ports::ReferenceImage;
use crate::session::GenerateParams;

/// Prompt-to-image studio: Gemini/Imagen generation, Vertex upscaling, GCS storage.
#[derive(Parser, Debug)]
#[command(name = "imagen-studio", version, about)]
pub struct Cli {
    /// Config file path override.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate one image from a prompt.
    Generate(GenerateArgs),
    /// Upscale an image file by x2 or x4.
    Upscale(UpscaleArgs),
    /// Interactive session with history.
    Session(SessionArgs),
}

/// Model and parameter choices shared by `generate` and `session`.
#[derive(Args, Debug, Clone)]
pub struct ImageOptions {
    /// Model name or short alias (default from config).
    #[arg(short, long)]
    pub model: Option<String>,

    /// Aspect ratio (e.g., 1:1, 16:9, 9:16).
    #[arg(short, long)]
    pub aspect_ratio: Option<String>,

    /// Image size: 1K, 2K, 4K.
    #[arg(short, long)]
    pub size: Option<String>,

    /// Send the prompt exactly as typed, without the configured suffixes.
    #[arg(long)]
    pub raw_prompt: bool,

    /// Upload results to the configured storage bucket.
    #[arg(long)]
    pub upload: bool,
}

impl ImageOptions {
    /// Build generation parameters, filling unset options from config defaults.
    #[must_use]
    pub fn params(&self, config: &Config, prompt: String) -> GenerateParams {
        let model = self.model.as_deref().unwrap_or(&config.defaults.model);
        GenerateParams {
            prompt,
            model: resolve_model(model),
            aspect_ratio: self
                .aspect_ratio
                .clone()
                .unwrap_or_else(|| config.defaults.aspect_ratio.clone()),
            size: self
                .size
                .clone()
                .unwrap_or_else(|| config.defaults.size.clone()),
            references: Vec::new(),
            raw_prompt: self.raw_prompt,
            upload: self.upload,
        }
    }
}

/// Arguments for `generate`.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Text prompt describing the desired image.
    #[arg(conflicts_with = "prompt_file")]
    pub prompt: Option<String>,

    /// Path to a file containing the prompt text.
    #[arg(short = 'p', long, conflicts_with = "prompt")]
    pub prompt_file: Option<String>,

    /// Reference image to guide generation (repeatable).
    #[arg(short, long = "reference")]
    pub references: Vec<PathBuf>,

    /// Output file path (auto-generated if not specified).
    #[arg(short, long)]
    pub output: Option<String>,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub options: ImageOptions,
}

impl GenerateArgs {
    /// Resolve the prompt from either the positional argument or the file flag.
    ///
    /// # Errors
    ///
    /// Returns an error if neither prompt nor prompt-file is provided,
    /// or if the file cannot be read.
    pub fn resolve_prompt(&self) -> Result<String, std::io::Error> {
        if let Some(ref text) = self.prompt {
            Ok(text.clone())
        } else if let Some(ref path) = self.prompt_file {
            std::fs::read_to_string(path)
        } else {
            Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Provide a prompt string or use -p/--prompt-file",
            ))
        }
    }

    /// Resolve prompt, defaults, and reference files into generation parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt or a reference image cannot be read.
    pub fn to_params(&self, config: &Config) -> Result<GenerateParams, StudioError> {
        let prompt = self.resolve_prompt()?;
        let mut params = self.options.params(config, prompt);
        params.references = self
            .references
            .iter()
            .map(|path| load_reference(path))
            .collect::<Result<_, _>>()?;
        Ok(params)
    }
}

/// Arguments for `upscale`.
#[derive(Args, Debug)]
pub struct UpscaleArgs {
    /// Image file to upscale.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Upscale factor: x2 or x4.
    #[arg(short, long, default_value = "x2")]
    pub factor: String,

    /// Output file path (defaults to `<input-stem>-<factor>.png`).
    #[arg(short, long)]
    pub output: Option<String>,

    /// Upload the result to the configured storage bucket.
    #[arg(long)]
    pub upload: bool,
}

/// Arguments for `session`.
#[derive(Args, Debug)]
pub struct SessionArgs {
    #[command(flatten)]
    #[allow(missing_docs)]
    pub options: ImageOptions,
}

/// Read a reference image, rejecting formats the API cannot take.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not PNG/JPEG/WebP/GIF.
pub fn load_reference(path: &Path) -> Result<ReferenceImage, StudioError> {
    let data = std::fs::read(path)?;
    let mime_type = sniff_mime(&data).ok_or_else(|| {
        StudioError::InvalidArgument(format!(
            "Unsupported reference image format: {}",
            path.display()
        ))
    })?;
    Ok(ReferenceImage {
        mime_type: mime_type.to_string(),
        data,
    })
}
