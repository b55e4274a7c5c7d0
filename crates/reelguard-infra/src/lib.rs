//! Reelguard Infrastructure Library
//!
//! Shared infrastructure used by the pipeline and its entry points:
//! - Telemetry initialization (tracing subscriber)
//! - Per-job progress event channels

#[cfg(feature = "observability-basic")]
pub mod telemetry;

#[cfg(feature = "events")]
pub mod events;

// Re-export commonly used types
#[cfg(feature = "events")]
pub use events::{ProgressEmitter, DEFAULT_EVENT_BUFFER};
#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry, LogFormat, TelemetryConfig};
