//! Wiring and output helpers for the `reelguard` binary.

use anyhow::{anyhow, Context, Result};
use reelguard_core::models::{JobEvent, SensitivityResult};
use reelguard_core::validation::mime_from_extension;
use reelguard_core::ModerationConfig;
use reelguard_db::{setup_database, JobRepository, JobStore, MemoryJobStore};
use reelguard_infra::ProgressEmitter;
use reelguard_plugins::{FrameClassifier, RekognitionModerationClassifier};
use reelguard_processing::{
    ClassifierPool, ClassifierPoolConfig, FfmpegFrameSource, FrameSampler, OrchestratorConfig,
    PipelineOrchestrator, SamplerConfig, ScoreAggregator, StorageMigrator,
};
use reelguard_storage::{create_blob_store, BlobStore};
use std::path::Path;
use std::sync::Arc;

/// MIME type for a source file: the explicit value, else a guess from the extension.
pub fn resolve_mime(path: &Path, explicit: Option<&str>) -> Result<String> {
    if let Some(mime) = explicit {
        return Ok(mime.to_string());
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(mime_from_extension)
        .map(String::from)
        .ok_or_else(|| anyhow!("Cannot guess video type of {}, pass --mime", path.display()))
}

/// Open the PostgreSQL job store when DATABASE_URL is set, else an in-memory one.
pub async fn open_job_store(config: &ModerationConfig) -> Result<Arc<dyn JobStore>> {
    match &config.database_url {
        Some(url) => {
            let pool = setup_database(url, config.db_max_connections).await?;
            Ok(Arc::new(JobRepository::new(pool)))
        }
        None => Ok(Arc::new(MemoryJobStore::new())),
    }
}

pub fn frame_source(config: &ModerationConfig) -> Result<Arc<FfmpegFrameSource>> {
    let source = FfmpegFrameSource::new(&config.ffmpeg_path, &config.ffprobe_path)
        .context("ffmpeg is required for frame extraction")?;
    Ok(Arc::new(source))
}

pub fn sampler_config(config: &ModerationConfig) -> SamplerConfig {
    SamplerConfig {
        temp_root: config.frame_temp_dir.clone(),
        default_duration_secs: config.frame_default_duration_secs,
        max_concurrent_extractions: config.max_concurrent_extractions,
    }
}

/// Build the orchestrator with the production collaborators.
pub async fn build_orchestrator(
    config: &ModerationConfig,
    jobs: Arc<dyn JobStore>,
    events: Arc<ProgressEmitter>,
) -> Result<PipelineOrchestrator> {
    let sampler = FrameSampler::new(frame_source(config)?, sampler_config(config));

    let classifier = Arc::new(
        RekognitionModerationClassifier::from_env(
            config.aws_region.clone(),
            config.rekognition_min_confidence,
        )
        .await,
    );
    let aggregator = ScoreAggregator::new(classifier.name());
    let pool = ClassifierPool::new(
        classifier,
        ClassifierPoolConfig {
            max_workers: config.classifier_max_workers,
            call_timeout: config.classifier_timeout(),
            max_throttle_retries: config.classifier_max_throttle_retries,
            backoff_base: config.classifier_backoff_base(),
        },
    );

    let mut orchestrator = PipelineOrchestrator::new(
        jobs,
        sampler,
        pool,
        aggregator,
        events,
        OrchestratorConfig {
            frame_count: config.frame_count,
        },
    );

    if let Some(store) = create_blob_store(config)
        .await
        .context("Failed to initialize durable storage")?
    {
        tracing::info!(backend = %store.backend_type(), "Durable storage migration enabled");
        orchestrator = orchestrator.with_migrator(StorageMigrator::new(store));
    }

    Ok(orchestrator)
}

/// One line per event, as printed while a run is in progress.
pub fn render_event(event: &JobEvent) -> String {
    match event {
        JobEvent::Progress {
            percent, message, ..
        } => format!("[{:>3}%] {}", percent, message),
        JobEvent::Complete { status, score } => format!("done: {} (score {})", status, score),
        JobEvent::Error { message } => format!("error: {}", message),
    }
}

pub fn render_result(result: &SensitivityResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Overall score: {}{}\n",
        result.overall_score,
        if result.is_flagged { " (FLAGGED)" } else { "" }
    ));
    out.push_str(&format!(
        "Frames analyzed: {} via {}\n",
        result.frames_analyzed, result.analysis_method
    ));
    out.push_str("Categories:\n");
    for (category, score) in &result.categories {
        out.push_str(&format!("  {:<20} {:>3}\n", category.as_str(), score));
    }
    if !result.detected_labels.is_empty() {
        out.push_str("Labels:\n");
        for label in &result.detected_labels {
            match &label.parent {
                Some(parent) => out.push_str(&format!(
                    "  {} / {} ({})\n",
                    parent, label.name, label.confidence
                )),
                None => out.push_str(&format!("  {} ({})\n", label.name, label.confidence)),
            }
        }
    }
    out
}
