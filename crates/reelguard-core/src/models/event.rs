use serde::{Deserialize, Serialize};

use super::job::JobStatus;

/// Lifecycle message published on a job's channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JobEvent {
    Progress {
        status: JobStatus,
        percent: u8,
        message: String,
    },
    Complete {
        status: JobStatus,
        score: u32,
    },
    Error {
        message: String,
    },
}

impl JobEvent {
    pub fn progress(percent: u8, message: impl Into<String>) -> Self {
        JobEvent::Progress {
            status: JobStatus::Processing,
            percent,
            message: message.into(),
        }
    }

    /// Whether this is the last event of a run.
    pub fn is_final(&self) -> bool {
        matches!(self, JobEvent::Complete { .. } | JobEvent::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let event = JobEvent::progress(15, "Extracting frames...");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "progress");
        assert_eq!(value["status"], "processing");
        assert_eq!(value["percent"], 15);

        let event = JobEvent::Complete {
            status: JobStatus::Flagged,
            score: 60,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "complete");
        assert_eq!(value["status"], "flagged");
        assert!(event.is_final());
    }
}
