use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

use super::moderation::SensitivityResult;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "job_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Safe,
    Flagged,
    Error,
}

impl JobStatus {
    /// Terminal states a finished run leaves the job in.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Safe | JobStatus::Flagged | JobStatus::Error)
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Safe => write!(f, "safe"),
            JobStatus::Flagged => write!(f, "flagged"),
            JobStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "safe" => Ok(JobStatus::Safe),
            "flagged" => Ok(JobStatus::Flagged),
            "error" => Ok(JobStatus::Error),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// Where the source file of a job currently lives.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "storage_tier", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum StorageTier {
    #[default]
    Local,
    Remote,
}

impl Display for StorageTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageTier::Local => write!(f, "local"),
            StorageTier::Remote => write!(f, "remote"),
        }
    }
}

/// One moderation run over a single source video.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub source_path: String,
    /// Name the source was stored under at intake; durable storage keys derive from it.
    pub stored_filename: String,
    pub mime_type: String,
    pub status: JobStatus,
    #[serde(rename = "processingProgress")]
    pub progress: u8,
    pub sensitivity_details: Option<SensitivityResult>,
    pub storage_tier: StorageTier,
    pub storage_key: Option<String>,
    /// Last durable-storage migration failure, if any.
    pub storage_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a pending job for a source file already written to local storage.
    pub fn new(
        source_path: impl Into<String>,
        stored_filename: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_path: source_path.into(),
            stored_filename: stored_filename.into(),
            mime_type: mime_type.into(),
            status: JobStatus::Pending,
            progress: 0,
            sensitivity_details: None,
            storage_tier: StorageTier::Local,
            storage_key: None,
            storage_error: None,
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    pub fn source_path(&self) -> &Path {
        Path::new(&self.source_path)
    }
}

/// Partial update of a job record. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    /// `Some(None)` drops the verdict of an earlier run.
    pub sensitivity_details: Option<Option<SensitivityResult>>,
    pub storage_tier: Option<StorageTier>,
    pub storage_key: Option<String>,
    /// `Some(None)` clears a previously recorded failure.
    pub storage_error: Option<Option<String>>,
    pub processed_at: Option<Option<DateTime<Utc>>>,
}

impl JobUpdate {
    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress.min(100)),
            ..Default::default()
        }
    }

    /// Terminal failure: status `error`, progress reset to 0 and no verdict.
    pub fn failed() -> Self {
        Self {
            status: Some(JobStatus::Error),
            progress: Some(0),
            sensitivity_details: Some(None),
            processed_at: Some(None),
            ..Default::default()
        }
    }

    /// Apply this update to an in-memory job.
    pub fn apply_to(&self, job: &mut Job) {
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(progress) = self.progress {
            job.progress = progress.min(100);
        }
        if let Some(details) = &self.sensitivity_details {
            job.sensitivity_details = details.clone();
        }
        if let Some(tier) = self.storage_tier {
            job.storage_tier = tier;
        }
        if let Some(key) = &self.storage_key {
            job.storage_key = Some(key.clone());
        }
        if let Some(storage_error) = &self.storage_error {
            job.storage_error = storage_error.clone();
        }
        if let Some(processed_at) = self.processed_at {
            job.processed_at = processed_at;
        }
    }
}

/// A still image taken from the source video at a specific timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSample {
    /// 1-based position in the sampling plan.
    pub index: usize,
    pub timestamp_seconds: f64,
    pub path: PathBuf,
}
