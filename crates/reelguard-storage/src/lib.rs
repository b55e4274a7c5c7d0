//! Reelguard Storage Library
//!
//! This crate provides the durable blob store finished source videos are migrated
//! to. It includes the BlobStore trait and implementations for S3 (and S3-compatible
//! providers) and the local filesystem.
//!
//! # Storage key format
//!
//! Source videos are stored under `videos/{stored_filename}`, where the filename is
//! the name the source was stored under at intake. Keys must not contain `..` or a
//! leading `/`. Key generation is centralized in the `keys` module so all backends
//! stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_blob_store;
pub use keys::job_source_key;
#[cfg(feature = "storage-local")]
pub use local::LocalBlobStore;
pub use reelguard_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3BlobStore;
pub use traits::{BlobStore, StorageError, StorageResult};
