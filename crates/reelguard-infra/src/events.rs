//! Per-job progress channels.
//!
//! Observers subscribe to a job id and receive its [`JobEvent`]s in publication
//! order. Publishing never blocks the pipeline: an event sent while nobody is
//! subscribed is dropped, and a subscriber that falls more than the buffer size
//! behind loses the oldest events.

use reelguard_core::models::JobEvent;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

pub const DEFAULT_EVENT_BUFFER: usize = 64;

pub struct ProgressEmitter {
    channels: Mutex<HashMap<Uuid, broadcast::Sender<JobEvent>>>,
    buffer: usize,
}

impl Default for ProgressEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}

impl ProgressEmitter {
    pub fn new(buffer: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            buffer: buffer.max(1),
        }
    }

    /// Receive every event published for `job_id` from now on.
    pub fn subscribe(&self, job_id: Uuid) -> broadcast::Receiver<JobEvent> {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        channels
            .entry(job_id)
            .or_insert_with(|| broadcast::channel(self.buffer).0)
            .subscribe()
    }

    /// Publish an event for `job_id`.
    pub fn emit(&self, job_id: Uuid, event: JobEvent) {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let Some(sender) = channels.get(&job_id) else {
            tracing::trace!(job_id = %job_id, "No subscribers for job event");
            return;
        };

        let is_final = event.is_final();
        if sender.send(event).is_err() || sender.receiver_count() == 0 {
            channels.remove(&job_id);
        } else if is_final {
            // Receivers keep buffered events after the sender is dropped
            channels.remove(&job_id);
        }
    }

    /// End the job's stream. Receivers still get events already published, then
    /// see the channel closed.
    pub fn close(&self, job_id: Uuid) {
        self.channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&job_id);
    }

    /// Number of jobs with a live channel.
    pub fn active_channels(&self) -> usize {
        self.channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelguard_core::models::JobStatus;

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let emitter = ProgressEmitter::default();
        let job_id = Uuid::new_v4();
        let mut rx = emitter.subscribe(job_id);

        emitter.emit(job_id, JobEvent::progress(0, "Starting analysis..."));
        emitter.emit(job_id, JobEvent::progress(15, "Extracting frames..."));
        emitter.emit(
            job_id,
            JobEvent::Complete {
                status: JobStatus::Safe,
                score: 0,
            },
        );

        assert_eq!(
            rx.recv().await.unwrap(),
            JobEvent::progress(0, "Starting analysis...")
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            JobEvent::progress(15, "Extracting frames...")
        );
        assert!(rx.recv().await.unwrap().is_final());
        // Channel closed after the final event
        assert!(rx.recv().await.is_err());
        assert_eq!(emitter.active_channels(), 0);
    }

    #[tokio::test]
    async fn test_close_delivers_pending_events_then_ends_stream() {
        let emitter = ProgressEmitter::default();
        let job_id = Uuid::new_v4();
        let mut rx = emitter.subscribe(job_id);

        emitter.emit(job_id, JobEvent::progress(15, "Extracting frames..."));
        emitter.close(job_id);
        // Closing twice, or after a final event, is harmless
        emitter.close(job_id);

        assert_eq!(
            rx.recv().await.unwrap(),
            JobEvent::progress(15, "Extracting frames...")
        );
        assert!(rx.recv().await.is_err());
        assert_eq!(emitter.active_channels(), 0);
    }

    #[test]
    fn test_emit_without_subscribers_is_dropped() {
        let emitter = ProgressEmitter::default();
        emitter.emit(Uuid::new_v4(), JobEvent::progress(0, "Starting analysis..."));
        assert_eq!(emitter.active_channels(), 0);
    }

    #[test]
    fn test_dropped_receivers_prune_channel() {
        let emitter = ProgressEmitter::default();
        let job_id = Uuid::new_v4();
        drop(emitter.subscribe(job_id));
        assert_eq!(emitter.active_channels(), 1);

        emitter.emit(job_id, JobEvent::progress(15, "Extracting frames..."));
        assert_eq!(emitter.active_channels(), 0);
    }

    #[tokio::test]
    async fn test_jobs_are_isolated() {
        let emitter = ProgressEmitter::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut rx_a = emitter.subscribe(a);
        let mut rx_b = emitter.subscribe(b);

        emitter.emit(b, JobEvent::progress(30, "Sending to analysis..."));
        emitter.emit(a, JobEvent::progress(15, "Extracting frames..."));

        assert_eq!(
            rx_a.recv().await.unwrap(),
            JobEvent::progress(15, "Extracting frames...")
        );
        assert_eq!(
            rx_b.recv().await.unwrap(),
            JobEvent::progress(30, "Sending to analysis...")
        );
    }
}
