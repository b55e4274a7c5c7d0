//! Frame source backed by the ffmpeg and ffprobe executables.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::moderation::FrameSource;

/// Validate that an executable path doesn't contain shell metacharacters
fn validate_executable(path: &str) -> Result<()> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.is_empty() || path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(anyhow!("Executable path contains dangerous characters: {}", path));
    }

    if !path
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '/' | '-' | '_' | '.' | '\\' | ':'))
    {
        return Err(anyhow!("Executable path contains unsafe characters: {}", path));
    }

    Ok(())
}

/// Read `format.duration` from ffprobe's JSON output.
fn parse_probe_duration(stdout: &[u8]) -> Result<f64> {
    let probe_data: serde_json::Value =
        serde_json::from_slice(stdout).context("Failed to parse ffprobe output")?;

    probe_data["format"]["duration"]
        .as_str()
        .and_then(|d| d.trim().parse::<f64>().ok())
        .ok_or_else(|| anyhow!("Could not parse duration"))
}

#[derive(Debug, Clone)]
pub struct FfmpegFrameSource {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl FfmpegFrameSource {
    pub fn new(ffmpeg_path: impl Into<String>, ffprobe_path: impl Into<String>) -> Result<Self> {
        let ffmpeg_path = ffmpeg_path.into();
        let ffprobe_path = ffprobe_path.into();
        validate_executable(&ffmpeg_path).context("Invalid ffmpeg_path")?;
        validate_executable(&ffprobe_path).context("Invalid ffprobe_path")?;

        Ok(Self {
            ffmpeg_path,
            ffprobe_path,
        })
    }
}

#[async_trait]
impl FrameSource for FfmpegFrameSource {
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffprobe",
        process.executable.path = %self.ffprobe_path,
        ffmpeg.operation = "probe"
    ))]
    async fn probe_duration(&self, source: &Path) -> Result<f64> {
        let start = std::time::Instant::now();

        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(source)
            .stdin(Stdio::null())
            .output()
            .await
            .context("Failed to execute ffprobe")?;

        if !output.status.success() {
            return Err(anyhow!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let duration = parse_probe_duration(&output.stdout)?;

        tracing::debug!(
            duration_ms = start.elapsed().as_millis(),
            video_duration = duration,
            "Video probe completed"
        );

        Ok(duration)
    }

    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffmpeg",
        process.executable.path = %self.ffmpeg_path,
        ffmpeg.operation = "extract_frame"
    ))]
    async fn extract_frame_at(&self, source: &Path, timestamp: f64, output: &Path) -> Result<()> {
        let output_status = Command::new(&self.ffmpeg_path)
            .arg("-ss")
            .arg(format!("{:.3}", timestamp))
            .arg("-i")
            .arg(source)
            .args(["-vframes", "1", "-q:v", "2", "-y"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to execute ffmpeg")?;

        if !output_status.status.success() {
            let stderr = String::from_utf8_lossy(&output_status.stderr);
            return Err(anyhow!("FFmpeg frame extraction failed: {}", stderr.trim()));
        }

        Ok(())
    }
}
