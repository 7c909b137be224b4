//! reelsmith: drive photo analysis and video generation from the command line.
//!
//! Talks to a running analysis/generation backend. Every setting can come
//! from the environment (or `.env`); flags take precedence.

mod audio;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use reelsmith_client::{ClientConfig, HttpBackend};
use reelsmith_jobs::{
    EventBus, JobKind, JobOutcome, JobPayload, JobRun, NotificationLevel, OrchestratorConfig,
    PersonId, PipelineEvent, Resolution, Studio,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::audio::{probe_duration, HeadlessSessions};

#[derive(Parser)]
#[command(name = "reelsmith")]
#[command(author, version, about = "Turn photo folders into short videos")]
#[command(propagate_version = true)]
struct Cli {
    /// Backend base URL (overrides REELSMITH_BACKEND_URL)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Progress poll interval in milliseconds (overrides REELSMITH_POLL_INTERVAL_MS)
    #[arg(long, global = true)]
    poll_interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse folders and list the people and themes found
    Analyze {
        /// Folders to analyse
        #[arg(required = true, num_args = 1..)]
        folders: Vec<String>,
    },

    /// Analyse, filter, trim and generate a video in one go
    Run {
        /// Folders to analyse (can specify multiple)
        #[arg(short, long = "folder", required = true, num_args = 1..)]
        folders: Vec<String>,

        /// Only use images containing this person (cluster id)
        #[arg(long)]
        person: Option<String>,

        /// Only use images tagged with this theme
        #[arg(long)]
        theme: Option<String>,

        /// Background audio track
        #[arg(long)]
        audio: Option<String>,

        /// Trim start in seconds (default: start of track)
        #[arg(long, requires = "audio")]
        trim_start: Option<f64>,

        /// Trim end in seconds (default: end of track)
        #[arg(long, requires = "audio")]
        trim_end: Option<f64>,

        /// Output video path
        #[arg(short, long)]
        output: Option<String>,

        /// Aspect ratio: 1080p (16:9) or 9:16
        #[arg(long, default_value = "1080p")]
        resolution: Resolution,

        /// Seconds per image (1-10)
        #[arg(long)]
        image_duration: Option<f64>,

        /// Title shown at the start of the video
        #[arg(long)]
        title: Option<String>,

        /// Force the Ken Burns effect on or off (backend default when unset)
        #[arg(long)]
        ken_burns: Option<bool>,
    },

    /// Ask the backend to show a picker and print the choice
    Browse {
        #[arg(value_enum, default_value_t = BrowseTarget::Folder)]
        target: BrowseTarget,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BrowseTarget {
    Folder,
    File,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = init_tracing();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Install the tracing subscriber.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
///   RUST_LOG    - standard env filter (default: "reelsmith=info")
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "reelsmith=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("reelsmith.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console output goes to stderr; stdout carries results.
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut client_config = ClientConfig::from_env();
    if let Some(url) = cli.backend_url {
        client_config = client_config.with_base_url(url);
    }
    let mut orchestrator_config = OrchestratorConfig::from_env();
    if let Some(ms) = cli.poll_interval_ms {
        orchestrator_config = orchestrator_config.with_poll_interval(ms);
    }
    orchestrator_config.validate()?;

    let backend = Arc::new(HttpBackend::new(client_config)?);
    info!(backend_url = %backend.config().base_url, "Using backend");

    match cli.command {
        Commands::Analyze { folders } => {
            let mut studio = Studio::new(backend, Box::new(HeadlessSessions), orchestrator_config);
            let printer = spawn_event_printer(studio.events());
            let result = cmd_analyze(&mut studio, &folders).await;
            studio.shutdown().await;
            printer.abort();
            result
        }
        Commands::Run {
            folders,
            person,
            theme,
            audio,
            trim_start,
            trim_end,
            output,
            resolution,
            image_duration,
            title,
            ken_burns,
        } => {
            let mut studio = Studio::new(backend, Box::new(HeadlessSessions), orchestrator_config);
            let printer = spawn_event_printer(studio.events());

            let store = studio.store_mut();
            store.set_resolution(resolution);
            store.set_ken_burns(ken_burns);
            if let Some(output) = output {
                store.set_output_path(output);
            }
            if let Some(secs) = image_duration {
                let applied = store.set_image_duration(secs);
                if applied != secs {
                    warn!(requested = secs, applied, "Image duration clamped");
                }
            }
            if let Some(title) = title {
                store.set_title(title);
            }

            let options = RunOptions {
                person,
                theme,
                audio,
                trim_start,
                trim_end,
            };
            let result = cmd_run(&mut studio, &folders, options).await;
            studio.shutdown().await;
            printer.abort();
            result
        }
        Commands::Browse { target } => cmd_browse(backend.as_ref(), target).await,
    }
}

struct RunOptions {
    person: Option<String>,
    theme: Option<String>,
    audio: Option<String>,
    trim_start: Option<f64>,
    trim_end: Option<f64>,
}

/// Print progress and notifications to stderr as they arrive.
fn spawn_event_printer(events: &EventBus) -> tokio::task::JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(envelope) => match envelope.payload {
                    PipelineEvent::JobProgress {
                        kind,
                        percent,
                        message,
                        ..
                    } => {
                        if message.is_empty() {
                            eprintln!("[{}] {:.0}%", kind, percent);
                        } else {
                            eprintln!("[{}] {:.0}% {}", kind, percent, message);
                        }
                    }
                    PipelineEvent::Notification { level, message } => {
                        let tag = match level {
                            NotificationLevel::Success => "ok",
                            NotificationLevel::Error => "error",
                        };
                        eprintln!("[{}] {}", tag, message);
                    }
                    _ => {}
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "Event printer lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

async fn analyse(studio: &mut Studio<HttpBackend>, folders: &[String]) -> anyhow::Result<()> {
    for folder in folders {
        studio.add_folder(folder.as_str());
    }
    if studio.start_analysis().await?.is_none() {
        studio.wait_for(JobKind::Analysis).await;
    }
    ensure_completed(studio.job(JobKind::Analysis))
}

fn ensure_completed(run: &JobRun) -> anyhow::Result<()> {
    match run.status {
        reelsmith_jobs::JobStatus::Completed => Ok(()),
        _ => Err(anyhow!("{} failed: {}", run.kind, run.display_message())),
    }
}

async fn cmd_analyze(studio: &mut Studio<HttpBackend>, folders: &[String]) -> anyhow::Result<()> {
    analyse(studio, folders).await?;

    let filter = studio.filter();
    println!("{} images", filter.results().len());

    let people = filter.people_for_display();
    if !people.is_empty() {
        println!("\nPeople:");
        for person in people {
            println!("  {:>6}  {:<20} {} images", person.id, person.name, person.count);
        }
    }

    let themes = filter.themes_for_display();
    if !themes.is_empty() {
        println!("\nThemes:");
        for theme in themes {
            println!("  {:<20} {}", theme.name, theme.count);
        }
    }
    Ok(())
}

async fn cmd_run(
    studio: &mut Studio<HttpBackend>,
    folders: &[String],
    options: RunOptions,
) -> anyhow::Result<()> {
    analyse(studio, folders).await?;

    if let Some(person) = options.person.as_deref() {
        if studio.toggle_person(&PersonId::from(person)).is_none() {
            bail!("no person with id {} in the analysis results", person);
        }
    }
    if let Some(theme) = options.theme.as_deref() {
        if studio.toggle_theme(theme).is_none() {
            bail!("no theme named {} in the analysis results", theme);
        }
    }
    if let Some(message) = studio.filter().deficit_message() {
        bail!(message);
    }
    println!("{} images selected", studio.filter().visible_count());

    if let Some(path) = options.audio {
        prepare_audio(studio, &path, options.trim_start, options.trim_end).await?;
    }

    let immediate = studio.start_generation().await?;
    let outcome = match immediate {
        Some(outcome) => Some(outcome),
        None => studio.wait_for(JobKind::Generation).await,
    };
    match outcome {
        Some(JobOutcome::Completed { .. }) => {}
        Some(JobOutcome::Failed { message, .. }) => bail!("generation failed: {}", message),
        None => ensure_completed(studio.job(JobKind::Generation))?,
    }

    match studio.video() {
        Some(video) => {
            println!("Video: {}", video.output_path);
            println!("Preview: {}", video.preview_url);
        }
        None => match &studio.job(JobKind::Generation).result {
            Some(JobPayload::Video(path)) => println!("Video: {}", path),
            _ => println!("Generation finished without reporting an output path"),
        },
    }
    Ok(())
}

/// Open the track, probe its length and apply the requested trim.
async fn prepare_audio(
    studio: &mut Studio<HttpBackend>,
    path: &str,
    trim_start: Option<f64>,
    trim_end: Option<f64>,
) -> anyhow::Result<()> {
    let Some(session) = studio.set_audio_path(path)? else {
        return Ok(());
    };

    let bytes = studio
        .backend()
        .fetch_media(path)
        .await
        .with_context(|| format!("failed to fetch audio track {}", path))?;
    let duration = probe_duration(bytes, path)?;
    studio.audio_mut().on_ready(session, duration)?;

    if trim_start.is_some() || trim_end.is_some() {
        let start = trim_start.unwrap_or(0.0);
        let end = trim_end.unwrap_or(duration);
        if studio
            .audio_mut()
            .on_region_updated(session, start, end)
            .is_none()
        {
            bail!("invalid trim range {}..{}", start, end);
        }
    }

    let trim = studio.audio().trim();
    println!(
        "Audio: {} [{:.1}s - {:.1}s of {:.1}s]",
        path, trim.start, trim.end, duration
    );
    Ok(())
}

async fn cmd_browse(backend: &HttpBackend, target: BrowseTarget) -> anyhow::Result<()> {
    use reelsmith_jobs::JobBackend;

    let picked = match target {
        BrowseTarget::Folder => backend.browse_folder().await?,
        BrowseTarget::File => backend.browse_file().await?,
    };
    match picked {
        Some(path) => println!("{}", path),
        None => eprintln!("Selection cancelled"),
    }
    Ok(())
}
