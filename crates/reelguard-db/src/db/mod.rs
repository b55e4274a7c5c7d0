//! Job repositories
//
// Store abstraction shared by the orchestrator and the worker
pub mod store;
//
// PostgreSQL and in-memory implementations
pub mod job;
pub mod memory;

pub use job::JobRepository;
pub use memory::MemoryJobStore;
pub use store::JobStore;
