//! Reelguard CLI: run a moderation over a local video file.
//!
//! Configuration is read from the environment (and `.env`). Without DATABASE_URL
//! jobs are kept in memory for the lifetime of the process.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use reelguard_cli::{
    build_orchestrator, frame_source, open_job_store, render_event, render_result,
    resolve_mime, sampler_config,
};
use reelguard_core::models::Job;
use reelguard_core::{validate_source, ModerationConfig};
use reelguard_infra::{init_telemetry, shutdown_telemetry, ProgressEmitter, TelemetryConfig};
use reelguard_processing::{sample_timestamps, FrameSampler};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser)]
#[command(name = "reelguard", about = "Video content moderation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Moderate a video file and print its sensitivity result
    Moderate {
        /// Path to the video file
        file: PathBuf,
        /// Number of frames to sample (defaults to FRAME_COUNT)
        #[arg(long)]
        frames: Option<usize>,
        /// MIME type of the file; guessed from the extension when omitted
        #[arg(long)]
        mime: Option<String>,
        /// Print the job record as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Print the timestamps frames would be sampled at
    Plan {
        /// Path to the video file
        file: PathBuf,
        /// Number of frames to sample (defaults to FRAME_COUNT)
        #[arg(long)]
        frames: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ModerationConfig::from_env()?;
    if let Commands::Moderate {
        frames: Some(frames),
        ..
    }
    | Commands::Plan {
        frames: Some(frames),
        ..
    } = &cli.command
    {
        config.frame_count = *frames;
    }
    config.validate()?;

    init_telemetry(&TelemetryConfig::from_env("reelguard", &config.environment))
        .map_err(|e| anyhow!("Failed to initialize telemetry: {}", e))?;

    let result = match cli.command {
        Commands::Moderate {
            file, mime, json, ..
        } => moderate(&config, &file, mime.as_deref(), json).await,
        Commands::Plan { file, .. } => plan(&config, &file).await,
    };

    shutdown_telemetry().await;
    result
}

async fn moderate(
    config: &ModerationConfig,
    file: &Path,
    mime: Option<&str>,
    json: bool,
) -> Result<()> {
    let metadata = tokio::fs::metadata(file)
        .await
        .with_context(|| format!("Cannot read {}", file.display()))?;
    let mime_type = resolve_mime(file, mime)?;
    validate_source(&mime_type, metadata.len())?;

    let (source_path, stored_filename) = stage_source(config, file).await?;

    let jobs = open_job_store(config).await?;
    let events = Arc::new(ProgressEmitter::default());
    let orchestrator = build_orchestrator(config, jobs.clone(), events.clone()).await?;

    let job = Job::new(source_path.display().to_string(), stored_filename, mime_type);
    jobs.insert(&job).await?;
    tracing::info!(job_id = %job.id, source = %file.display(), "Job created");

    let mut rx = events.subscribe(job.id);
    let printer = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if !json {
                        println!("{}", render_event(&event));
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let run = orchestrator.run(job.id).await;
    // Failures before the job is claimed publish nothing, so end the stream explicitly
    events.close(job.id);
    let _ = printer.await;
    let outcome = run.context("Moderation failed")?;

    if json {
        let stored = jobs
            .get(job.id)
            .await?
            .ok_or_else(|| anyhow!("Job {} disappeared", job.id))?;
        println!("{}", serde_json::to_string_pretty(&stored)?);
    } else {
        println!();
        print!("{}", render_result(&outcome.result));
        match &outcome.storage_key {
            Some(key) => println!("Storage: {} ({})", outcome.storage_tier, key),
            None => println!("Storage: {}", outcome.storage_tier),
        }
    }

    Ok(())
}

/// Pick the path the job runs against.
///
/// Migration deletes the local copy after upload, so when durable storage is
/// configured the file is copied into an intake directory first.
async fn stage_source(config: &ModerationConfig, file: &Path) -> Result<(PathBuf, String)> {
    let basename = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("Invalid file name: {}", file.display()))?
        .to_string();

    if !config.storage_backend.is_configured() {
        return Ok((file.to_path_buf(), basename));
    }

    let intake_dir = config.frame_temp_dir.join("reelguard-intake");
    tokio::fs::create_dir_all(&intake_dir)
        .await
        .with_context(|| format!("Cannot create {}", intake_dir.display()))?;

    let stored_filename = format!("{}-{}", uuid::Uuid::new_v4(), basename);
    let staged = intake_dir.join(&stored_filename);
    tokio::fs::copy(file, &staged)
        .await
        .with_context(|| format!("Cannot stage {}", file.display()))?;

    Ok((staged, stored_filename))
}

async fn plan(config: &ModerationConfig, file: &Path) -> Result<()> {
    let sampler = FrameSampler::new(frame_source(config)?, sampler_config(config));
    let duration = sampler.resolve_duration(file).await;
    let timestamps = sample_timestamps(duration, config.frame_count);

    println!("Duration: {:.3}s", duration);
    for (i, timestamp) in timestamps.iter().enumerate() {
        println!("frame_{:03}  {:>10.3}s", i + 1, timestamp);
    }
    Ok(())
}
