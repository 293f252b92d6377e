//! Command-line front end: run one generation and fetch its result.
//!
//! Reads input files from disk, drives a
//! [`GenerationSession`](mediagen_runninghub::session::GenerationSession)
//! against the configured RunningHub proxy, logs progress as it
//! arrives and saves the result to `--out`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;

use mediagen_core::job::JobResult;
use mediagen_core::media::UploadedMedia;
use mediagen_core::params::{InputShape, JobParams};
use mediagen_core::tools::ToolKind;
use mediagen_core::types::TaskId;
use mediagen_runninghub::api::RunningHubApi;
use mediagen_runninghub::config::RunningHubConfig;
use mediagen_runninghub::events::GenerationEvent;
use mediagen_runninghub::presenter::{DownloadOutcome, ResultPresenter};
use mediagen_runninghub::session::GenerationSession;

#[derive(Debug, Parser)]
#[command(name = "mediagen", about = "Generate images and videos with RunningHub tools")]
pub struct Cli {
    /// Tool to run, e.g. `image-enhance`, `face-swap` or `image-to-video`.
    #[arg(long, value_name = "SLUG")]
    pub tool: ToolKind,

    /// Primary input image (the source face for swap tools).
    #[arg(long, value_name = "PATH")]
    pub image: Option<PathBuf>,

    /// Second input image (swap target or style reference).
    #[arg(long, value_name = "PATH")]
    pub second_image: Option<PathBuf>,

    #[arg(long, value_name = "TEXT")]
    pub prompt: Option<String>,

    /// Directory the result is saved into.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub out: PathBuf,

    /// Print the result URL instead of downloading it.
    #[arg(long)]
    pub no_download: bool,
}

/// Parse arguments and run one generation to completion.
pub async fn run_from_env() -> Result<()> {
    run(Cli::parse()).await
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = RunningHubConfig::from_env().context("invalid RunningHub configuration")?;
    let profile = cli.tool.profile();

    let image = load_optional(cli.image.as_deref()).await?;
    let second = load_optional(cli.second_image.as_deref()).await?;
    let params = build_params(profile.input, image, second, cli.prompt)?;

    tracing::info!(
        tool = %cli.tool,
        base_url = %config.base_url,
        max_wait_secs = profile.policy.time_budget().as_secs(),
        "Starting generation",
    );

    let presenter = ResultPresenter::new(config.request_timeout);
    let webapp_id = config.webapp_id.clone();
    let session = GenerationSession::new(Arc::new(RunningHubApi::new(config)), profile)
        .with_webapp_id(webapp_id);

    let mut events = session.events();
    let task_id = session.start(params).await?;

    let result = tokio::select! {
        result = follow_events(&mut events) => result?,
        _ = tokio::signal::ctrl_c() => {
            session.abandon();
            bail!("interrupted; task {task_id} keeps running on the server");
        }
    };

    present(&presenter, &result, &task_id, &cli.out, cli.no_download).await;
    Ok(())
}

/// Assemble the parameters `shape` needs from the command-line inputs.
///
/// Inputs the tool does not take are rejected rather than ignored.
pub fn build_params(
    shape: InputShape,
    image: Option<UploadedMedia>,
    second: Option<UploadedMedia>,
    prompt: Option<String>,
) -> Result<JobParams<UploadedMedia>> {
    let require = |media: Option<UploadedMedia>, flag: &str| {
        media.ok_or_else(|| anyhow!("{shape} tools need --{flag}"))
    };
    let unused = |present: bool, flag: &str| -> Result<()> {
        if present {
            bail!("{shape} tools do not take --{flag}");
        }
        Ok(())
    };

    let params = match shape {
        InputShape::SingleImage => {
            unused(second.is_some(), "second-image")?;
            unused(prompt.is_some(), "prompt")?;
            JobParams::SingleImage {
                image: require(image, "image")?,
            }
        }
        InputShape::TwoImages => {
            unused(prompt.is_some(), "prompt")?;
            JobParams::TwoImages {
                source: require(image, "image")?,
                target: require(second, "second-image")?,
            }
        }
        InputShape::ImageWithPrompt => {
            unused(second.is_some(), "second-image")?;
            JobParams::ImageWithPrompt {
                image: require(image, "image")?,
                prompt: prompt.ok_or_else(|| anyhow!("{shape} tools need --prompt"))?,
            }
        }
        InputShape::TextOnly => {
            unused(image.is_some(), "image")?;
            unused(second.is_some(), "second-image")?;
            JobParams::TextOnly {
                prompt: prompt.ok_or_else(|| anyhow!("{shape} tools need --prompt"))?,
            }
        }
        InputShape::ImagePair => JobParams::ImagePair {
            first: require(image, "image")?,
            second: require(second, "second-image")?,
            prompt,
        },
    };
    Ok(params)
}

// ---- private helpers ----

async fn load_optional(path: Option<&Path>) -> Result<Option<UploadedMedia>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let media = UploadedMedia::from_bytes(name, bytes)
        .with_context(|| format!("{} is not a supported image", path.display()))?;
    Ok(Some(media))
}

/// Log progress until the job reaches a terminal event.
async fn follow_events(
    events: &mut tokio::sync::broadcast::Receiver<GenerationEvent>,
) -> Result<JobResult> {
    loop {
        match events.recv().await {
            Ok(GenerationEvent::Progress {
                percent,
                phase_label,
                ..
            }) => tracing::info!(percent, phase = %phase_label, "Generating"),
            Ok(GenerationEvent::Completed { result, .. }) => return Ok(result),
            Ok(GenerationEvent::Failed { error, .. }) => bail!(error),
            Ok(GenerationEvent::TimedOut { task_id, attempts }) => {
                bail!("task {task_id} still running after {attempts} status checks")
            }
            Ok(GenerationEvent::Abandoned { task_id }) => bail!("task {task_id} was abandoned"),
            Ok(GenerationEvent::Submitted { .. }) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Progress events skipped");
            }
            Err(RecvError::Closed) => bail!("generation session closed unexpectedly"),
        }
    }
}

async fn present(
    presenter: &ResultPresenter,
    result: &JobResult,
    task_id: &TaskId,
    out: &Path,
    no_download: bool,
) {
    if no_download {
        println!("{}", ResultPresenter::preview_url(result));
        return;
    }
    match presenter.download(result, task_id, out).await {
        DownloadOutcome::Saved { path, .. } => println!("{}", path.display()),
        DownloadOutcome::Fallback { url, reason } => {
            eprintln!("Could not save the result ({reason}). Open it directly:");
            println!("{url}");
        }
    }
}
