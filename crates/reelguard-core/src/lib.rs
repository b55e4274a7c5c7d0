//! Reelguard Core Library
//!
//! This crate provides the domain models, error taxonomy, configuration and intake
//! validation shared by every Reelguard component: the job record, moderation labels
//! and category scores, the sensitivity result, and the lifecycle events published
//! while a job runs.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::ModerationConfig;
pub use error::{ErrorMetadata, LogLevel, ModerationError, ModerationResult};
pub use storage_types::StorageBackend;
pub use validation::validate_source;
