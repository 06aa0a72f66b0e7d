//! imagen-studio - prompt-to-image CLI.

mod adapters;
mod cassette;
mod cli;
mod config;
mod context;
mod error;
mod extract;
mod model;
mod output;
mod params;
mod ports;
mod prompt;
mod repl;
mod response;
mod session;

use std::path::Path;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, GenerateArgs, SessionArgs, UpscaleArgs};
use crate::config::Config;
use crate::context::{RecordingSession, ServiceContext};
use crate::error::StudioError;
use crate::output::{resolve_output_path, save_png, upscaled_path};
use crate::params::UpscaleFactor;
use crate::session::{HistoryEntry, Session, SessionConfig, UpscaleParams, UpscaleSource};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "imagen_studio=debug"
    } else {
        "imagen_studio=warn"
    };
    let filter = if verbose {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), StudioError> {
    let config_path = config::discover_config_path(cli.config.as_deref());
    let config = Config::load(&config_path).map_err(StudioError::Config)?;
    tracing::debug!(path = %config_path.display(), "config loaded");

    // Validate everything local before any adapter exists
    let command = match cli.command {
        Command::Generate(args) => {
            let params = args.to_params(&config)?;
            params.validate()?;
            Prepared::Generate(args, params)
        }
        Command::Upscale(args) => {
            let factor: UpscaleFactor = args
                .factor
                .parse()
                .map_err(StudioError::UpscalePrecondition)?;
            let data = std::fs::read(&args.input)?;
            Prepared::Upscale(args, factor, data)
        }
        Command::Session(args) => Prepared::Session(args),
    };

    let (ctx, recording) = build_context(&config)?;
    let result = command.execute(&config, &ctx).await;

    if let Some(recording) = recording {
        match recording.finish() {
            Ok(path) => eprintln!("Cassette saved: {}", path.display()),
            Err(e) => eprintln!("Warning: failed to save cassette: {e}"),
        }
    }
    result
}

/// Pick live, recording, or replaying adapters from the environment.
fn build_context(
    config: &Config,
) -> Result<(ServiceContext, Option<RecordingSession>), StudioError> {
    let replay_path = std::env::var("IMAGEN_STUDIO_REPLAY").ok();
    let is_recording = std::env::var("IMAGEN_STUDIO_REC").is_ok_and(|v| v == "true" || v == "1");

    if let Some(cassette_path) = replay_path {
        tracing::info!(cassette = %cassette_path, "replaying");
        Ok((ServiceContext::replaying(Path::new(&cassette_path))?, None))
    } else if is_recording {
        tracing::info!("recording");
        let (ctx, session) = ServiceContext::recording(config);
        Ok((ctx, Some(session)))
    } else {
        Ok((ServiceContext::live(config), None))
    }
}

/// A command whose arguments passed local validation.
enum Prepared {
    Generate(GenerateArgs, session::GenerateParams),
    Upscale(UpscaleArgs, UpscaleFactor, Vec<u8>),
    Session(SessionArgs),
}

impl Prepared {
    async fn execute(self, config: &Config, ctx: &ServiceContext) -> Result<(), StudioError> {
        match self {
            Self::Generate(args, params) => {
                let mut session = one_shot_session(config);
                let entry = session.generate(ctx, params).await?;
                let path = resolve_output_path(args.output.as_deref(), &entry.prompt);
                save_png(&entry.image, &path)?;
                eprintln!("Saved: {}", path.display());
                report_upload(entry);
                Ok(())
            }
            Self::Upscale(args, factor, data) => {
                let mut session = one_shot_session(config);
                let label = match args.input.file_stem() {
                    Some(stem) => stem.to_string_lossy().into_owned(),
                    None => "image".to_string(),
                };
                let params = UpscaleParams {
                    source: UpscaleSource::Bytes { data, label },
                    factor: factor.to_string(),
                    upload: args.upload,
                };
                let entry = session.upscale(ctx, params).await?;
                let path = args
                    .output
                    .as_deref()
                    .map_or_else(|| upscaled_path(&args.input, factor), Into::into);
                save_png(&entry.image, &path)?;
                eprintln!("Saved: {}", path.display());
                report_upload(entry);
                Ok(())
            }
            Self::Session(args) => {
                let mut session = Session::new(SessionConfig::from_config(config));
                let template = args.options.params(config, String::new());
                let stdin = std::io::stdin();
                repl::run(&mut session, ctx, template, stdin.lock(), std::io::stdout()).await
            }
        }
    }
}

/// One-shot commands run as the local user; the login gate guards `session` only.
fn one_shot_session(config: &Config) -> Session {
    let mut session_config = SessionConfig::from_config(config);
    session_config.credentials = None;
    Session::new(session_config)
}

fn report_upload(entry: &HistoryEntry) {
    if let Some(stored) = &entry.storage {
        eprintln!("Uploaded: {}", stored.path);
        match stored.expires_at {
            Some(expires) => eprintln!("URL (expires {}): {}", expires.to_rfc3339(), stored.url),
            None => eprintln!("URL: {}", stored.url),
        }
    }
}
