//! Frame sampling: evenly spaced still frames from a source video.

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reelguard_core::models::FrameSample;
use reelguard_core::{ModerationError, ModerationResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

/// External tool able to probe and cut frames from a video.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Duration of the source in seconds.
    async fn probe_duration(&self, source: &Path) -> Result<f64>;

    /// Write the frame at `timestamp` seconds to `output` as a JPEG.
    async fn extract_frame_at(&self, source: &Path, timestamp: f64, output: &Path) -> Result<()>;
}

/// Timestamps for `count` frames over a video of `duration` seconds.
///
/// Frames are spaced `max(duration / (count + 1), 1)` seconds apart and only
/// timestamps strictly inside `(0, duration)` are kept. A clip too short to fit any
/// sample at that spacing gets a single frame at its midpoint.
pub fn sample_timestamps(duration: f64, count: usize) -> Vec<f64> {
    if count == 0 || !duration.is_finite() || duration <= 0.0 {
        return Vec::new();
    }

    let interval = (duration / (count as f64 + 1.0)).max(1.0);
    let timestamps: Vec<f64> = (1..=count)
        .map(|i| i as f64 * interval)
        .take_while(|t| *t < duration)
        .collect();

    if timestamps.is_empty() {
        vec![duration / 2.0]
    } else {
        timestamps
    }
}

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Directory job workspaces are created in.
    pub temp_root: PathBuf,
    /// Duration assumed when probing fails.
    pub default_duration_secs: f64,
    pub max_concurrent_extractions: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            temp_root: std::env::temp_dir(),
            default_duration_secs: 10.0,
            max_concurrent_extractions: 4,
        }
    }
}

pub struct FrameSampler {
    source: Arc<dyn FrameSource>,
    config: SamplerConfig,
}

impl FrameSampler {
    pub fn new(source: Arc<dyn FrameSource>, config: SamplerConfig) -> Self {
        Self { source, config }
    }

    /// Create the job-scoped directory frames are written to.
    ///
    /// The directory is removed when the returned handle is dropped or closed.
    pub fn create_workspace(&self, job_id: Uuid) -> ModerationResult<TempDir> {
        std::fs::create_dir_all(&self.config.temp_root)?;
        tempfile::Builder::new()
            .prefix(&format!("reelguard-{}-", job_id))
            .tempdir_in(&self.config.temp_root)
            .map_err(|e| {
                ModerationError::Extraction(format!("Failed to create frame directory: {}", e))
            })
    }

    /// Source duration, falling back to the configured default when probing fails.
    pub async fn resolve_duration(&self, source: &Path) -> f64 {
        match self.source.probe_duration(source).await {
            Ok(duration) if duration.is_finite() && duration > 0.0 => duration,
            Ok(duration) => {
                tracing::warn!(
                    source = %source.display(),
                    duration,
                    fallback = self.config.default_duration_secs,
                    "Probed duration unusable, using default"
                );
                self.config.default_duration_secs
            }
            Err(e) => {
                tracing::warn!(
                    source = %source.display(),
                    error = %e,
                    fallback = self.config.default_duration_secs,
                    "Failed to probe duration, using default"
                );
                self.config.default_duration_secs
            }
        }
    }

    /// Extract up to `count` frames into `out_dir`, in timestamp order.
    ///
    /// A failed extraction only drops that frame. Fails with
    /// [`ModerationError::Extraction`] when no frame at all could be produced.
    #[tracing::instrument(skip(self, source, out_dir), fields(source = %source.display()))]
    pub async fn extract(
        &self,
        source: &Path,
        count: usize,
        out_dir: &Path,
    ) -> ModerationResult<Vec<FrameSample>> {
        let duration = self.resolve_duration(source).await;
        let timestamps = sample_timestamps(duration, count);
        let planned = timestamps.len();

        let extractions = timestamps.into_iter().enumerate().map(|(i, timestamp)| {
            let index = i + 1;
            let path = out_dir.join(format!("frame_{:03}.jpg", index));
            async move {
                match self.extract_one(source, timestamp, &path).await {
                    Ok(()) => Some(FrameSample {
                        index,
                        timestamp_seconds: timestamp,
                        path,
                    }),
                    Err(e) => {
                        tracing::warn!(
                            frame_index = index,
                            timestamp,
                            error = %e,
                            "Frame extraction failed, skipping frame"
                        );
                        None
                    }
                }
            }
        });

        // buffered keeps plan order while bounding concurrent ffmpeg processes
        let frames: Vec<FrameSample> = stream::iter(extractions)
            .buffered(self.config.max_concurrent_extractions.max(1))
            .filter_map(|frame| async move { frame })
            .collect()
            .await;

        if frames.is_empty() {
            return Err(ModerationError::Extraction(format!(
                "Could not extract frames ({} planned)",
                planned
            )));
        }

        tracing::info!(
            duration,
            planned,
            extracted = frames.len(),
            "Frames extracted"
        );

        Ok(frames)
    }

    async fn extract_one(&self, source: &Path, timestamp: f64, output: &Path) -> Result<()> {
        self.source.extract_frame_at(source, timestamp, output).await?;

        // ffmpeg exits 0 without writing anything when seeking past the last frame
        let metadata = tokio::fs::metadata(output).await?;
        if metadata.len() == 0 {
            anyhow::bail!("empty frame written to {}", output.display());
        }
        Ok(())
    }
}
