//! Video moderation pipeline

pub mod classifier_pool;
pub mod migrator;
pub mod orchestration;
pub mod sampler;
pub mod scoring;

pub use classifier_pool::{ClassifierPool, ClassifierPoolConfig};
pub use migrator::StorageMigrator;
pub use orchestration::{OrchestratorConfig, PipelineOrchestrator, RunOutcome};
pub use sampler::{sample_timestamps, FrameSampler, FrameSource, SamplerConfig};
pub use scoring::ScoreAggregator;
