mod helpers;

use helpers::doubles::{MemoryBlobStore, ScriptedClassifier, ScriptedFrameSource};
use helpers::{drain, progress_percents, TestPipeline};
use reelguard_core::models::{JobEvent, JobStatus, ModerationCategory, ModerationLabel, StorageTier};
use reelguard_core::ModerationError;
use reelguard_db::JobStore;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

fn explicit_nudity(confidence: f64) -> ModerationLabel {
    ModerationLabel::new("Explicit Nudity", None, confidence)
}

#[tokio::test]
async fn test_frames_sampled_evenly_across_duration() {
    let source = Arc::new(ScriptedFrameSource::with_duration(30.0));
    let pipeline =
        TestPipeline::with_frame_count(source.clone(), Arc::new(ScriptedClassifier::clean()), 5);
    let job = pipeline.create_job().await;

    let outcome = pipeline.orchestrator.run(job.id).await.unwrap();

    assert_eq!(
        source.requested_timestamps(),
        vec![5.0, 10.0, 15.0, 20.0, 25.0]
    );
    assert_eq!(outcome.result.frames_analyzed, 5);
}

#[tokio::test]
async fn test_explicit_content_is_flagged() {
    let pipeline = TestPipeline::new(
        Arc::new(ScriptedFrameSource::with_duration(30.0)),
        Arc::new(ScriptedClassifier::returning(vec![explicit_nudity(60.0)])),
    );
    let job = pipeline.create_job().await;
    let mut rx = pipeline.events.subscribe(job.id);

    let outcome = pipeline.orchestrator.run(job.id).await.unwrap();

    assert_eq!(outcome.status, JobStatus::Flagged);
    assert_eq!(outcome.result.overall_score, 60);
    assert!(outcome.result.is_flagged);
    assert_eq!(
        outcome.result.categories[&ModerationCategory::ExplicitNudity],
        60
    );

    let stored = pipeline.job(job.id).await;
    assert_eq!(stored.status, JobStatus::Flagged);
    assert_eq!(stored.progress, 100);
    assert!(stored.processed_at.is_some());
    assert_eq!(stored.sensitivity_details.unwrap().overall_score, 60);

    let events = drain(&mut rx);
    assert!(events.contains(&JobEvent::Progress {
        status: JobStatus::Flagged,
        percent: 100,
        message: "FLAGGED: Explicit Nudity".to_string(),
    }));
    assert_eq!(
        events.last(),
        Some(&JobEvent::Complete {
            status: JobStatus::Flagged,
            score: 60,
        })
    );
}

#[tokio::test]
async fn test_clean_video_is_safe() {
    let pipeline = TestPipeline::new(
        Arc::new(ScriptedFrameSource::with_duration(30.0)),
        Arc::new(ScriptedClassifier::clean()),
    );
    let job = pipeline.create_job().await;
    let mut rx = pipeline.events.subscribe(job.id);

    let outcome = pipeline.orchestrator.run(job.id).await.unwrap();

    assert_eq!(outcome.status, JobStatus::Safe);
    assert_eq!(outcome.result.overall_score, 0);
    assert_eq!(outcome.result.average_label_confidence, 100);
    assert!(outcome.result.detected_labels.is_empty());
    assert!(outcome.result.categories.values().all(|v| *v == 0));

    let events = drain(&mut rx);
    assert_eq!(
        events.last(),
        Some(&JobEvent::Complete {
            status: JobStatus::Safe,
            score: 0,
        })
    );
}

#[tokio::test]
async fn test_unreadable_source_fails_job() {
    let pipeline = TestPipeline::new(
        Arc::new(ScriptedFrameSource::broken()),
        Arc::new(ScriptedClassifier::clean()),
    );
    let job = pipeline.create_job().await;
    let mut rx = pipeline.events.subscribe(job.id);

    let err = pipeline.orchestrator.run(job.id).await.unwrap_err();
    assert!(matches!(err, ModerationError::Extraction(_)));

    let stored = pipeline.job(job.id).await;
    assert_eq!(stored.status, JobStatus::Error);
    assert_eq!(stored.progress, 0);
    assert!(stored.sensitivity_details.is_none());

    let events = drain(&mut rx);
    assert_eq!(
        events.last(),
        Some(&JobEvent::Error {
            message: "Analysis failed".to_string(),
        })
    );
    assert_eq!(pipeline.frame_dirs_left(), 0);
}

#[tokio::test]
async fn test_concurrent_run_is_rejected() {
    let gate = Arc::new(Semaphore::new(0));
    let pipeline = TestPipeline::new(
        Arc::new(ScriptedFrameSource::with_duration(30.0)),
        Arc::new(ScriptedClassifier::gated(Vec::new(), gate.clone())),
    );
    let job = pipeline.create_job().await;

    let orchestrator = pipeline.orchestrator.clone();
    let first = tokio::spawn(async move { orchestrator.run(job.id).await });

    // Wait until the first run is blocked in classification
    let mut claimed = false;
    for _ in 0..200 {
        let current = pipeline.job(job.id).await;
        if current.status == JobStatus::Processing && current.progress >= 30 {
            claimed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(claimed, "first run never reached classification");

    let before = pipeline.job(job.id).await;
    let err = pipeline.orchestrator.run(job.id).await.unwrap_err();
    assert!(matches!(err, ModerationError::ConcurrencyConflict(id) if id == job.id));

    let after = pipeline.job(job.id).await;
    assert_eq!(after.status, JobStatus::Processing);
    assert_eq!(after.progress, before.progress);

    gate.add_permits(100);
    let outcome = first.await.unwrap().unwrap();
    assert_eq!(outcome.status, JobStatus::Safe);
}

#[tokio::test]
async fn test_progress_never_decreases() {
    let pipeline = TestPipeline::new(
        Arc::new(ScriptedFrameSource::with_duration(30.0)),
        Arc::new(ScriptedClassifier::returning(vec![ModerationLabel::new(
            "Graphic Violence",
            Some("Violence"),
            40.0,
        )])),
    );
    let job = pipeline.create_job().await;
    let mut rx = pipeline.events.subscribe(job.id);

    pipeline.orchestrator.run(job.id).await.unwrap();

    let percents = progress_percents(&drain(&mut rx));
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");
    for checkpoint in [0, 15, 30, 85, 100] {
        assert!(percents.contains(&checkpoint), "missing {checkpoint}");
    }
    assert_eq!(percents.iter().filter(|p| (31..=80).contains(*p)).count(), 10);
}

#[tokio::test]
async fn test_frame_directory_removed_after_success() {
    let pipeline = TestPipeline::new(
        Arc::new(ScriptedFrameSource::with_duration(30.0)),
        Arc::new(ScriptedClassifier::clean()),
    );
    let job = pipeline.create_job().await;

    pipeline.orchestrator.run(job.id).await.unwrap();

    assert_eq!(pipeline.frame_dirs_left(), 0);
}

#[tokio::test]
async fn test_probe_failure_uses_default_duration() {
    let source = Arc::new(ScriptedFrameSource::unprobeable());
    let pipeline = TestPipeline::new(source.clone(), Arc::new(ScriptedClassifier::clean()));
    let job = pipeline.create_job().await;

    let outcome = pipeline.orchestrator.run(job.id).await.unwrap();

    // 10s default at a 1s minimum spacing leaves t = 1..9
    assert_eq!(outcome.result.frames_analyzed, 9);
    assert_eq!(source.requested_timestamps().first(), Some(&1.0));
}

#[tokio::test]
async fn test_classifier_outage_degrades_to_safe() {
    let classifier = Arc::new(ScriptedClassifier::failing());
    let pipeline = TestPipeline::new(
        Arc::new(ScriptedFrameSource::with_duration(30.0)),
        classifier.clone(),
    );
    let job = pipeline.create_job().await;

    let outcome = pipeline.orchestrator.run(job.id).await.unwrap();

    assert_eq!(outcome.status, JobStatus::Safe);
    assert_eq!(outcome.result.frames_analyzed, 10);
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn test_failed_job_can_be_rerun() {
    let pipeline = TestPipeline::new(
        Arc::new(ScriptedFrameSource::with_duration(30.0)),
        Arc::new(ScriptedClassifier::clean()),
    );
    let job = pipeline.create_job().await;
    pipeline
        .store
        .compare_and_set_status(job.id, JobStatus::Pending, JobStatus::Error)
        .await
        .unwrap();

    let outcome = pipeline.orchestrator.run(job.id).await.unwrap();
    assert_eq!(outcome.status, JobStatus::Safe);
}

#[tokio::test]
async fn test_failed_rerun_drops_earlier_verdict() {
    let source = Arc::new(ScriptedFrameSource::with_duration(30.0));
    let pipeline = TestPipeline::new(
        source.clone(),
        Arc::new(ScriptedClassifier::returning(vec![explicit_nudity(60.0)])),
    );
    let job = pipeline.create_job().await;

    pipeline.orchestrator.run(job.id).await.unwrap();
    let flagged = pipeline.job(job.id).await;
    assert!(flagged.sensitivity_details.is_some());
    assert!(flagged.processed_at.is_some());

    source.start_failing();
    pipeline.orchestrator.run(job.id).await.unwrap_err();

    let stored = pipeline.job(job.id).await;
    assert_eq!(stored.status, JobStatus::Error);
    assert!(stored.sensitivity_details.is_none());
    assert!(stored.processed_at.is_none());
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let pipeline = TestPipeline::new(
        Arc::new(ScriptedFrameSource::with_duration(30.0)),
        Arc::new(ScriptedClassifier::clean()),
    );

    let id = uuid::Uuid::new_v4();
    let err = pipeline.orchestrator.run(id).await.unwrap_err();
    assert!(matches!(err, ModerationError::JobNotFound(missing) if missing == id));
}

#[tokio::test]
async fn test_source_migrated_after_scoring() {
    let blobs = Arc::new(MemoryBlobStore::default());
    let pipeline = TestPipeline::with_blob_store(
        Arc::new(ScriptedFrameSource::with_duration(30.0)),
        Arc::new(ScriptedClassifier::clean()),
        blobs.clone(),
    );
    let job = pipeline.create_job().await;
    let mut rx = pipeline.events.subscribe(job.id);

    let outcome = pipeline.orchestrator.run(job.id).await.unwrap();

    let expected_key = format!("videos/{}", job.stored_filename);
    assert_eq!(outcome.storage_tier, StorageTier::Remote);
    assert_eq!(outcome.storage_key.as_deref(), Some(expected_key.as_str()));
    assert!(blobs.contains(&expected_key));
    assert!(!job.source_path().exists());

    let stored = pipeline.job(job.id).await;
    assert_eq!(stored.storage_tier, StorageTier::Remote);
    assert!(stored.storage_error.is_none());

    assert!(progress_percents(&drain(&mut rx)).contains(&90));
}

#[tokio::test]
async fn test_migration_failure_keeps_local_copy() {
    let pipeline = TestPipeline::with_blob_store(
        Arc::new(ScriptedFrameSource::with_duration(30.0)),
        Arc::new(ScriptedClassifier::returning(vec![explicit_nudity(60.0)])),
        Arc::new(MemoryBlobStore::failing()),
    );
    let job = pipeline.create_job().await;

    let outcome = pipeline.orchestrator.run(job.id).await.unwrap();

    // The verdict stands even though the upload failed
    assert_eq!(outcome.status, JobStatus::Flagged);
    assert_eq!(outcome.storage_tier, StorageTier::Local);
    assert!(job.source_path().exists());

    let stored = pipeline.job(job.id).await;
    assert_eq!(stored.storage_tier, StorageTier::Local);
    assert!(stored.storage_key.is_none());
    assert!(stored
        .storage_error
        .as_deref()
        .is_some_and(|e| e.contains("bucket unreachable")));
}
