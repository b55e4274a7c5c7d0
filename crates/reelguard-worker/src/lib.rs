//! Reelguard worker
//!
//! Runs moderation jobs in the background so intake can return as soon as a job
//! is created.

pub mod queue;

pub use queue::{ModerationQueue, ModerationQueueConfig};
