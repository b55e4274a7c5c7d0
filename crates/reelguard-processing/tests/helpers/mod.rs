pub mod doubles;

use reelguard_core::models::{Job, JobEvent};
use reelguard_db::{JobStore, MemoryJobStore};
use reelguard_infra::ProgressEmitter;
use reelguard_plugins::FrameClassifier;
use reelguard_processing::{
    ClassifierPool, ClassifierPoolConfig, FrameSampler, FrameSource, OrchestratorConfig,
    PipelineOrchestrator, SamplerConfig, ScoreAggregator, StorageMigrator,
};
use reelguard_storage::BlobStore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;

/// A fully wired pipeline over in-memory collaborators.
pub struct TestPipeline {
    pub orchestrator: Arc<PipelineOrchestrator>,
    pub store: Arc<MemoryJobStore>,
    pub events: Arc<ProgressEmitter>,
    pub frames_root: TempDir,
    pub uploads: TempDir,
}

impl TestPipeline {
    pub fn new(source: Arc<dyn FrameSource>, classifier: Arc<dyn FrameClassifier>) -> Self {
        Self::build(source, classifier, None, 10)
    }

    pub fn with_frame_count(
        source: Arc<dyn FrameSource>,
        classifier: Arc<dyn FrameClassifier>,
        frame_count: usize,
    ) -> Self {
        Self::build(source, classifier, None, frame_count)
    }

    pub fn with_blob_store(
        source: Arc<dyn FrameSource>,
        classifier: Arc<dyn FrameClassifier>,
        blob_store: Arc<dyn BlobStore>,
    ) -> Self {
        Self::build(source, classifier, Some(blob_store), 10)
    }

    fn build(
        source: Arc<dyn FrameSource>,
        classifier: Arc<dyn FrameClassifier>,
        blob_store: Option<Arc<dyn BlobStore>>,
        frame_count: usize,
    ) -> Self {
        let frames_root = tempfile::tempdir().unwrap();
        let uploads = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryJobStore::new());
        let events = Arc::new(ProgressEmitter::default());

        let sampler = FrameSampler::new(
            source,
            SamplerConfig {
                temp_root: frames_root.path().to_path_buf(),
                default_duration_secs: 10.0,
                max_concurrent_extractions: 3,
            },
        );
        let aggregator = ScoreAggregator::new(classifier.name());
        let pool = ClassifierPool::new(
            classifier,
            ClassifierPoolConfig {
                max_workers: 3,
                call_timeout: Duration::from_secs(5),
                max_throttle_retries: 1,
                backoff_base: Duration::from_millis(1),
            },
        );

        let mut orchestrator = PipelineOrchestrator::new(
            store.clone(),
            sampler,
            pool,
            aggregator,
            events.clone(),
            OrchestratorConfig { frame_count },
        );
        if let Some(blob_store) = blob_store {
            orchestrator = orchestrator.with_migrator(StorageMigrator::new(blob_store));
        }

        Self {
            orchestrator: Arc::new(orchestrator),
            store,
            events,
            frames_root,
            uploads,
        }
    }

    /// Write a fake source video and insert a pending job for it.
    pub async fn create_job(&self) -> Job {
        let stored_filename = format!("{}-clip.mp4", uuid::Uuid::new_v4());
        let path = self.uploads.path().join(&stored_filename);
        tokio::fs::write(&path, b"fake video bytes").await.unwrap();

        let job = Job::new(path.display().to_string(), stored_filename, "video/mp4");
        self.store.insert(&job).await.unwrap();
        job
    }

    pub async fn job(&self, id: uuid::Uuid) -> Job {
        self.store.get(id).await.unwrap().unwrap()
    }

    /// Whether any job frame directory is left behind.
    pub fn frame_dirs_left(&self) -> usize {
        std::fs::read_dir(self.frames_root.path()).unwrap().count()
    }
}

/// Drain every event already published on a subscription.
pub fn drain(rx: &mut broadcast::Receiver<JobEvent>) -> Vec<JobEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Progress percentages in publication order.
pub fn progress_percents(events: &[JobEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|event| match event {
            JobEvent::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect()
}
