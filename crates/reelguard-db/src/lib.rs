//! Reelguard database layer
//!
//! Job persistence behind the [`JobStore`] trait: a PostgreSQL repository for
//! deployments and an in-memory store for the CLI and tests.

pub mod db;
pub mod setup;

pub use db::{JobRepository, JobStore, MemoryJobStore};
pub use setup::setup_database;
