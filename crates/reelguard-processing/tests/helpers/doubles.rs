//! Test doubles for the pipeline's external collaborators.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reelguard_core::models::ModerationLabel;
use reelguard_plugins::{ClassifierError, FrameClassifier};
use reelguard_processing::FrameSource;
use reelguard_storage::{BlobStore, StorageBackend, StorageError, StorageResult};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Frame source with a fixed duration that writes a small fake JPEG per frame.
pub struct ScriptedFrameSource {
    duration: Option<f64>,
    fail_extraction: AtomicBool,
    requested: Mutex<Vec<f64>>,
}

impl ScriptedFrameSource {
    pub fn with_duration(duration: f64) -> Self {
        Self {
            duration: Some(duration),
            fail_extraction: AtomicBool::new(false),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Probing fails; the sampler falls back to its default duration.
    pub fn unprobeable() -> Self {
        Self {
            duration: None,
            fail_extraction: AtomicBool::new(false),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Every extraction fails, as with an unreadable source.
    pub fn broken() -> Self {
        Self {
            duration: Some(30.0),
            fail_extraction: AtomicBool::new(true),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Make every later extraction fail.
    pub fn start_failing(&self) {
        self.fail_extraction.store(true, Ordering::SeqCst);
    }

    /// Timestamps requested so far, sorted.
    pub fn requested_timestamps(&self) -> Vec<f64> {
        let mut timestamps = self.requested.lock().unwrap().clone();
        timestamps.sort_by(|a, b| a.partial_cmp(b).unwrap());
        timestamps
    }
}

#[async_trait]
impl FrameSource for ScriptedFrameSource {
    async fn probe_duration(&self, _source: &Path) -> Result<f64> {
        self.duration.ok_or_else(|| anyhow!("ffprobe failed"))
    }

    async fn extract_frame_at(&self, _source: &Path, timestamp: f64, output: &Path) -> Result<()> {
        self.requested.lock().unwrap().push(timestamp);
        if self.fail_extraction.load(Ordering::SeqCst) {
            return Err(anyhow!("moov atom not found"));
        }
        tokio::fs::write(output, format!("jpeg@{timestamp}")).await?;
        Ok(())
    }
}

/// Classifier returning the same labels for every frame.
pub struct ScriptedClassifier {
    labels: Vec<ModerationLabel>,
    fail: bool,
    gate: Option<Arc<Semaphore>>,
    pub calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn returning(labels: Vec<ModerationLabel>) -> Self {
        Self {
            labels,
            fail: false,
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn clean() -> Self {
        Self::returning(Vec::new())
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::clean()
        }
    }

    /// Blocks every call until the gate receives permits.
    pub fn gated(labels: Vec<ModerationLabel>, gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::returning(labels)
        }
    }
}

#[async_trait]
impl FrameClassifier for ScriptedClassifier {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn classify(&self, image: &[u8]) -> Result<Vec<ModerationLabel>, ClassifierError> {
        assert!(image.starts_with(b"jpeg@"));
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| ClassifierError::Backend(e.to_string()))?;
        }
        if self.fail {
            return Err(ClassifierError::Backend("internal server error".into()));
        }
        Ok(self.labels.clone())
    }
}

/// Blob store kept in memory.
#[derive(Default)]
pub struct MemoryBlobStore {
    pub blobs: Mutex<HashMap<String, Vec<u8>>>,
    fail_uploads: bool,
}

impl MemoryBlobStore {
    pub fn failing() -> Self {
        Self {
            fail_uploads: true,
            ..Default::default()
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, key: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<String> {
        if self.fail_uploads {
            return Err(StorageError::UploadFailed("bucket unreachable".into()));
        }
        self.blobs.lock().unwrap().insert(key.to_string(), data);
        Ok(key.to_string())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.blobs.lock().unwrap().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.contains(key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
