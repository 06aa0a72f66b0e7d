//! Interactive session loop: plain lines generate, slash commands manage
//! history and settings.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use uuid::Uuid;

use crate::cli::load_reference;
use crate::context::ServiceContext;
use crate::error::StudioError;
use crate::model::resolve_model;
use crate::output::save_png;
use crate::params::{validate_aspect_ratio, validate_size};
use crate::session::{GenerateParams, History, HistoryEntry, Session, UpscaleParams, UpscaleSource};

const LOGIN_ATTEMPTS: usize = 3;

const HELP: &str = "\
Type a prompt to generate an image, or one of:
  /upscale [n|id] [x2|x4]   upscale an entry (default: latest, x2)
  /save [n|id] <path>       write an entry to a PNG file
  /history                  list entries, newest first
  /model <name>             switch model
  /aspect <ratio>           switch aspect ratio
  /size <1K|2K|4K>          switch image size
  /ref <path> | /ref clear  attach reference images to later prompts
  /upload on|off            upload results to storage
  /raw on|off               send prompts without suffixes
  /help                     show this list
  /quit                     leave the session";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Blank line.
    Noop,
    /// Generate from the line's text.
    Generate(String),
    /// Upscale an entry.
    Upscale {
        /// Entry index (1 = newest) or id; latest when absent.
        target: Option<String>,
        /// Requested factor, unparsed.
        factor: String,
    },
    /// Save an entry to a file.
    Save {
        /// Entry index or id; latest when absent.
        target: Option<String>,
        /// Destination path.
        path: PathBuf,
    },
    /// List history.
    History,
    /// Change the model.
    Model(String),
    /// Change the aspect ratio.
    Aspect(String),
    /// Change the size.
    Size(String),
    /// Attach a reference image.
    Reference(PathBuf),
    /// Drop attached references.
    ClearReferences,
    /// Toggle uploads.
    Upload(bool),
    /// Toggle raw prompts.
    Raw(bool),
    /// Show help.
    Help,
    /// Leave the session.
    Quit,
    /// Slash command that could not be parsed.
    Invalid(String),
}

/// Parse one input line.
#[must_use]
pub fn parse_command(line: &str) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Noop;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return ReplCommand::Generate(line.to_string());
    };

    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or_default().to_ascii_lowercase();
    let args: Vec<&str> = words.collect();

    match (name.as_str(), args.as_slice()) {
        ("quit" | "exit", []) => ReplCommand::Quit,
        ("help", _) => ReplCommand::Help,
        ("history", []) => ReplCommand::History,
        ("upscale", args) if args.len() <= 2 => {
            let (factors, targets): (Vec<&str>, Vec<&str>) = args
                .iter()
                .copied()
                .partition(|a| a.starts_with(['x', 'X']));
            if factors.len() > 1 || targets.len() > 1 {
                return ReplCommand::Invalid("usage: /upscale [n|id] [x2|x4]".into());
            }
            ReplCommand::Upscale {
                target: targets.first().map(|t| (*t).to_string()),
                factor: factors.first().copied().unwrap_or("x2").to_string(),
            }
        }
        ("save", [path]) => ReplCommand::Save {
            target: None,
            path: PathBuf::from(*path),
        },
        ("save", [target, path]) => ReplCommand::Save {
            target: Some((*target).to_string()),
            path: PathBuf::from(*path),
        },
        ("model", [model]) => ReplCommand::Model((*model).to_string()),
        ("aspect", [ratio]) => ReplCommand::Aspect((*ratio).to_string()),
        ("size", [size]) => ReplCommand::Size((*size).to_string()),
        ("ref", ["clear"]) => ReplCommand::ClearReferences,
        ("ref", [path]) => ReplCommand::Reference(PathBuf::from(*path)),
        ("upload", [flag]) => {
            parse_switch(flag).map_or_else(|| invalid("/upload on|off"), ReplCommand::Upload)
        }
        ("raw", [flag]) => {
            parse_switch(flag).map_or_else(|| invalid("/raw on|off"), ReplCommand::Raw)
        }
        _ => ReplCommand::Invalid(format!("Unknown command '/{name}'. Type /help for commands.")),
    }
}

fn invalid(usage: &str) -> ReplCommand {
    ReplCommand::Invalid(format!("usage: {usage}"))
}

fn parse_switch(flag: &str) -> Option<bool> {
    match flag.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Run the session loop until `/quit` or end of input.
///
/// `template` supplies model, aspect ratio, size and toggles for every
/// generation; its prompt is ignored.
///
/// # Errors
///
/// Returns [`StudioError::Auth`] when login fails, or an I/O error from the
/// terminal. Command failures are printed and the loop continues.
pub async fn run<R: BufRead, W: Write>(
    session: &mut Session,
    ctx: &ServiceContext,
    mut template: GenerateParams,
    mut input: R,
    mut out: W,
) -> Result<(), StudioError> {
    if !session.is_authenticated() {
        login(session, &mut input, &mut out)?;
    }

    writeln!(
        out,
        "Session started ({}). Type /help for commands.",
        template.model
    )?;
    let mut line = String::new();
    loop {
        write!(out, "> ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        let command = parse_command(&line);
        if command == ReplCommand::Quit {
            break;
        }
        if let Err(e) = execute(session, ctx, &mut template, command, &mut out).await {
            writeln!(out, "Error: {e}")?;
        }
    }
    Ok(())
}

fn login<R: BufRead, W: Write>(
    session: &mut Session,
    input: &mut R,
    out: &mut W,
) -> Result<(), StudioError> {
    for _ in 0..LOGIN_ATTEMPTS {
        let Some(username) = prompt_line(input, out, "ID: ")? else {
            break;
        };
        let Some(password) = prompt_line(input, out, "Password: ")? else {
            break;
        };
        match session.login(&username, &password) {
            Ok(()) => return Ok(()),
            Err(e) => writeln!(out, "{e}")?,
        }
    }
    Err(StudioError::Auth("Login required".into()))
}

fn prompt_line<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    label: &str,
) -> Result<Option<String>, StudioError> {
    write!(out, "{label}")?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
}

async fn execute<W: Write>(
    session: &mut Session,
    ctx: &ServiceContext,
    template: &mut GenerateParams,
    command: ReplCommand,
    out: &mut W,
) -> Result<(), StudioError> {
    match command {
        ReplCommand::Noop | ReplCommand::Quit => {}
        ReplCommand::Help => writeln!(out, "{HELP}")?,
        ReplCommand::Invalid(message) => writeln!(out, "{message}")?,
        ReplCommand::Generate(prompt) => {
            let params = GenerateParams {
                prompt,
                ..template.clone()
            };
            let entry = session.generate(ctx, params).await?;
            writeln!(out, "Generated {}", describe(1, entry))?;
        }
        ReplCommand::Upscale { target, factor } => {
            let source = match target {
                Some(target) => UpscaleSource::Entry(resolve_target(session.history(), &target)?),
                None => UpscaleSource::Latest,
            };
            let params = UpscaleParams {
                source,
                factor,
                upload: template.upload,
            };
            let entry = session.upscale(ctx, params).await?;
            writeln!(out, "Upscaled {}", describe(1, entry))?;
        }
        ReplCommand::Save { target, path } => {
            let history = session.history();
            let id = match target {
                Some(target) => resolve_target(history, &target).ok(),
                None => history.latest().map(|e| e.id),
            };
            let entry = id
                .and_then(|id| history.get(id))
                .ok_or_else(|| StudioError::InvalidArgument("No such history entry".into()))?;
            save_png(&entry.image, &path)?;
            writeln!(out, "Saved: {}", path.display())?;
        }
        ReplCommand::History => {
            if session.history().is_empty() {
                writeln!(out, "No images yet.")?;
            }
            for (i, entry) in session.history().entries().iter().enumerate() {
                writeln!(out, "{}", describe(i + 1, entry))?;
            }
        }
        ReplCommand::Model(name) => {
            template.model = resolve_model(&name);
            writeln!(out, "Model set to {}", template.model)?;
        }
        ReplCommand::Aspect(ratio) => {
            validate_aspect_ratio(&ratio).map_err(StudioError::InvalidArgument)?;
            writeln!(out, "Aspect ratio set to {ratio}")?;
            template.aspect_ratio = ratio;
        }
        ReplCommand::Size(size) => {
            validate_size(&size).map_err(StudioError::InvalidArgument)?;
            writeln!(out, "Size set to {size}")?;
            template.size = size;
        }
        ReplCommand::Reference(path) => {
            template.references.push(load_reference(&path)?);
            let count = template.references.len();
            writeln!(out, "{count} reference image(s) attached")?;
        }
        ReplCommand::ClearReferences => {
            template.references.clear();
            writeln!(out, "References cleared")?;
        }
        ReplCommand::Upload(on) => {
            template.upload = on;
            writeln!(out, "Upload {}", if on { "on" } else { "off" })?;
        }
        ReplCommand::Raw(on) => {
            template.raw_prompt = on;
            writeln!(out, "Raw prompts {}", if on { "on" } else { "off" })?;
        }
    }
    Ok(())
}

/// Entry by 1-based position (newest first) or by id.
fn resolve_target(history: &History, target: &str) -> Result<Uuid, StudioError> {
    let found = match target.parse::<usize>() {
        Ok(n) if n >= 1 => history.entries().get(n - 1).map(|e| e.id),
        Ok(_) => None,
        Err(_) => Uuid::parse_str(target)
            .ok()
            .filter(|id| history.get(*id).is_some()),
    };
    found.ok_or_else(|| StudioError::InvalidArgument(format!("No history entry '{target}'")))
}

fn describe(position: usize, entry: &HistoryEntry) -> String {
    let factor = entry
        .upscale_factor
        .map(|f| format!(" {f}"))
        .unwrap_or_default();
    let url = entry
        .storage
        .as_ref()
        .map(|s| format!(" -> {}", s.url))
        .unwrap_or_default();
    format!(
        "#{position} {} {}{factor} \"{}\"{url}",
        entry.id, entry.model, entry.prompt
    )
}
