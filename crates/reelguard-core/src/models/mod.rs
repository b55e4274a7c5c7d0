pub mod event;
pub mod job;
pub mod moderation;

pub use event::JobEvent;
pub use job::{FrameSample, Job, JobStatus, JobUpdate, StorageTier};
pub use moderation::{
    CategoryScoreTable, DetectedLabel, ModerationCategory, ModerationLabel, SensitivityResult,
};
