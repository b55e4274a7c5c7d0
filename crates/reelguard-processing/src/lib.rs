//! Reelguard Processing Library
//!
//! This crate implements the video moderation pipeline: frame sampling through
//! ffmpeg, bounded-concurrency classification, score aggregation, durable storage
//! migration, and the orchestrator that drives a job through them.

pub mod moderation;
pub mod video;

// Re-export commonly used types
pub use moderation::{
    sample_timestamps, ClassifierPool, ClassifierPoolConfig, FrameSampler, FrameSource,
    OrchestratorConfig, PipelineOrchestrator, RunOutcome, SamplerConfig, ScoreAggregator,
    StorageMigrator,
};
pub use video::FfmpegFrameSource;
