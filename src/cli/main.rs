//! Remote background removal CLI
//!
//! Runs every input through one [`Workflow`]: select, submit, download, reset.
//! The credential is set once and survives the reset between inputs.

use super::config::CliConfigBuilder;
use crate::{
    composite::CompositeColor,
    config::{DEFAULT_ENDPOINT, DEFAULT_SIZE},
    error::BgRemovalError,
    services::{format::DOWNLOAD_SUFFIX, ImageIOService},
    tracing_config::{events, init_cli_tracing, spans},
    types::SessionStatus,
    workflow::Workflow,
};
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn, Instrument};
use walkdir::WalkDir;

/// Remove image backgrounds through the remove.bg API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "remote-bgremove")]
pub struct Cli {
    /// Input image files or directories
    #[arg(value_name = "INPUT", required = true)]
    pub input: Vec<PathBuf>,

    /// API key for the removal service
    #[arg(short = 'k', long, env = "REMOVE_BG_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Output file (single input) or directory (several inputs) [default: next to each input]
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Flat color painted beneath the result in the preview (e.g. "#ffffff", "white")
    #[arg(long, value_name = "COLOR")]
    pub composite: Option<CompositeColor>,

    /// Write the composited preview PNG here (file for one input, directory otherwise)
    #[arg(long, value_name = "PATH")]
    pub preview: Option<PathBuf>,

    /// Service endpoint
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Value of the `size` field sent to the service
    #[arg(long, default_value = DEFAULT_SIZE)]
    pub size: String,

    /// Request timeout in seconds [default: none]
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Descend into directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Print a JSON session snapshot per input on stdout
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Suffix of preview files written next to a download
const PREVIEW_SUFFIX: &str = "-preview";

/// What happened to one input
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InputOutcome {
    Saved(PathBuf),
    Skipped,
    Failed(String),
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    let inputs = collect_inputs(&cli.input, cli.recursive)?;
    if inputs.is_empty() {
        anyhow::bail!("No image files found in the given inputs");
    }

    let workflow = Workflow::remote(config).context("Failed to create service client")?;
    if let Some(key) = &cli.api_key {
        workflow.set_api_key(key.clone());
    }

    info!(inputs = inputs.len(), endpoint = %cli.endpoint, "Starting background removal");

    let batch = inputs.len() > 1;
    let outcomes = process_inputs(&cli, &workflow, &inputs, batch)
        .instrument(spans::batch_processing(inputs.len()))
        .await?;

    let saved = outcomes.iter().filter(|o| matches!(o, InputOutcome::Saved(_))).count();
    let failed = outcomes.iter().filter(|o| matches!(o, InputOutcome::Failed(_))).count();
    info!(saved, failed, skipped = outcomes.len() - saved - failed, "Finished");

    if failed > 0 {
        anyhow::bail!("{} of {} input(s) failed", failed, outcomes.len());
    }
    Ok(())
}

async fn process_inputs(
    cli: &Cli,
    workflow: &Workflow,
    inputs: &[PathBuf],
    batch: bool,
) -> Result<Vec<InputOutcome>> {
    let mut outcomes = Vec::with_capacity(inputs.len());
    let mut claimed = ClaimedTargets::reserving(inputs);

    for input in inputs {
        let span = spans::file_processing(input, &workflow.snapshot().session_id);
        let outcome = process_input(cli, workflow, input, batch, &mut claimed)
            .instrument(span)
            .await;

        if cli.json {
            println!("{}", serde_json::to_string(&workflow.snapshot())?);
        }
        workflow.reset();

        outcomes.push(outcome?);
    }

    Ok(outcomes)
}

async fn process_input(
    cli: &Cli,
    workflow: &Workflow,
    input: &Path,
    batch: bool,
    claimed: &mut ClaimedTargets,
) -> Result<InputOutcome> {
    let image = match ImageIOService::load_selection(input) {
        Ok(image) => image,
        Err(e) => {
            events::error_with_context(&e, "loading input");
            return Ok(InputOutcome::Failed(e.to_string()));
        },
    };

    if let Err(e) = workflow.select_image(image) {
        warn!(input = %input.display(), error = %e, "Skipping input");
        return Ok(InputOutcome::Skipped);
    }

    let spinner = create_spinner(input, cli.json);
    let submitted = workflow.submit().await;
    spinner.finish_and_clear();

    match submitted {
        Ok(SessionStatus::Done) => {},
        Ok(_) => {
            let message = workflow
                .snapshot()
                .error_message
                .unwrap_or_else(|| "request did not complete".to_string());
            warn!(input = %input.display(), error = %message, "Background removal failed");
            return Ok(InputOutcome::Failed(message));
        },
        Err(e @ BgRemovalError::Precondition(_)) => {
            return Err(anyhow::Error::new(e)
                .context("An API key is required: pass --api-key or set REMOVE_BG_API_KEY"));
        },
        Err(e) => return Err(e.into()),
    }

    let artifact = workflow.download()?;
    let output = claimed.claim(resolve_target(
        cli.output.as_deref(),
        input,
        &artifact.file_name,
        batch,
    ));
    ImageIOService::save_artifact(&artifact, &output)?;
    if !cli.json {
        println!("{} -> {}", input.display(), output.display());
    }

    if let Some(preview_target) = &cli.preview {
        workflow.toggle_composite(cli.composite);
        let output_name = output
            .file_name()
            .map_or_else(|| artifact.file_name.clone(), |name| name.to_string_lossy().into_owned());
        let preview_name = preview_file_name(&output_name);
        let preview_path = claimed.claim(resolve_target(Some(preview_target), input, &preview_name, batch));
        match workflow
            .render_composite()
            .and_then(|preview| ImageIOService::save_preview(&preview, &preview_path))
        {
            Ok(()) => debug!(preview = %preview_path.display(), "Preview written"),
            Err(e) => events::warning_with_recommendation(
                &format!("Preview not written: {e}"),
                "the result is saved; check that the service returned a decodable image",
            ),
        }
    }

    Ok(InputOutcome::Saved(output))
}

fn create_spinner(input: &Path, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Removing background from {}", input.display()));
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Expand directories into their image files; plain files pass through untouched
///
/// Files this tool wrote on an earlier run (`*-no-bg*`, `*-no-bg*-preview`)
/// are left out of directory expansion.
pub(crate) fn collect_inputs(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let max_depth = if recursive { usize::MAX } else { 1 };
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .min_depth(1)
                .max_depth(max_depth)
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .map(walkdir::DirEntry::into_path)
                .filter(|path| ImageIOService::is_supported_format(path))
                .filter(|path| {
                    let generated = is_generated_output(path);
                    if generated {
                        debug!(path = %path.display(), "Skipping previous output");
                    }
                    !generated
                })
                .collect();
            found.sort();
            debug!(directory = %input.display(), files = found.len(), "Expanded directory");
            files.extend(found);
        } else if input.exists() {
            files.push(input.clone());
        } else {
            anyhow::bail!("Input not found: {}", input.display());
        }
    }

    Ok(files)
}

/// Where to write `file_name` for `input`
///
/// Without a target the file lands next to the input. A single input with a
/// target that is not an existing directory writes to the target itself;
/// otherwise the target is treated as a directory.
pub(crate) fn resolve_target(target: Option<&Path>, input: &Path, file_name: &str, batch: bool) -> PathBuf {
    match target {
        None => input
            .parent()
            .map_or_else(|| PathBuf::from(file_name), |dir| dir.join(file_name)),
        Some(target) if !batch && !target.is_dir() => target.to_path_buf(),
        Some(dir) => dir.join(file_name),
    }
}

fn preview_file_name(download_name: &str) -> String {
    let stem = download_name.rsplit_once('.').map_or(download_name, |(stem, _)| stem);
    format!("{stem}{PREVIEW_SUFFIX}.png")
}

/// Whether `path` is named like a download or preview this tool produces
pub(crate) fn is_generated_output(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    let base = name.split('.').next().unwrap_or_default();
    let base = base.strip_suffix(PREVIEW_SUFFIX).unwrap_or(base);
    let base = match base.rsplit_once('-') {
        Some((head, n)) if !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) => head,
        _ => base,
    };
    base.ends_with(DOWNLOAD_SUFFIX)
}

/// Output paths owned by the current run
///
/// Inputs are reserved up front so no output overwrites a file still to be
/// read, and every written path is claimed so two inputs sharing a base name
/// (`a.jpg`, `a.png`) never write over each other.
#[derive(Debug, Default)]
pub(crate) struct ClaimedTargets {
    paths: HashSet<PathBuf>,
}

impl ClaimedTargets {
    pub(crate) fn reserving(inputs: &[PathBuf]) -> Self {
        Self {
            paths: inputs.iter().cloned().collect(),
        }
    }

    /// Claim `path`, appending `-1`, `-2`, ... to its stem while it is taken
    pub(crate) fn claim(&mut self, path: PathBuf) -> PathBuf {
        if self.paths.insert(path.clone()) {
            return path;
        }

        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned());

        let mut n: u32 = 1;
        loop {
            let name = match &extension {
                Some(ext) => format!("{stem}-{n}.{ext}"),
                None => format!("{stem}-{n}"),
            };
            let candidate = path.with_file_name(name);
            if self.paths.insert(candidate.clone()) {
                warn!(
                    requested = %path.display(),
                    written = %candidate.display(),
                    "Output name already used in this run; writing to a numbered file"
                );
                return candidate;
            }
            n += 1;
        }
    }
}
