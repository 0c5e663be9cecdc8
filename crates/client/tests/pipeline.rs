//! Developer-side flow: stage, submit, initiate, track, fetch.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use common::{as_dyn, RecordingListener, ScriptedExecutor};
use fedeval_client::board::StatusBoard;
use fedeval_client::initiator::JobInitiator;
use fedeval_client::retriever::ResultRetriever;
use fedeval_client::submission::SubmissionManager;
use fedeval_client::tracker::{JobStatusTracker, TrackingOutcome};
use fedeval_core::artifact::{ArtifactBlob, ArtifactRole};
use fedeval_core::error::EvalError;
use fedeval_core::job::JobState;
use fedeval_core::wire::UploadResponse;
use serde_json::json;

// ---------------------------------------------------------------------------
// Test: full happy path
// ---------------------------------------------------------------------------

/// Config and weights are accepted, the job runs to completion and the
/// result is returned exactly as the executor produced it.
#[tokio::test(start_paused = true)]
async fn submit_track_and_fetch_completed_job() {
    let payload = json!({
        "accuracy": 0.91,
        "precision": 0.9,
        "recall": 0.91,
        "f1": 0.9,
        "support": 200
    });
    let executor = ScriptedExecutor::new()
        .with_upload(Ok(UploadResponse {
            bundle_id: "bundle-1".into(),
            accepted_roles: vec![ArtifactRole::Config, ArtifactRole::Weights],
        }))
        .with_job_ids(&["job-1"])
        .with_statuses(vec![
            Ok(JobState::Pending),
            Ok(JobState::Running),
            Ok(JobState::Completed),
        ])
        .with_result("job-1", Ok(payload.clone()))
        .into_arc();
    let board = Arc::new(StatusBoard::new());

    let mut manager = SubmissionManager::new(as_dyn(&executor));
    manager.stage(ArtifactRole::Config, ArtifactBlob::new("config.json", b"{}".to_vec()));
    manager.stage(ArtifactRole::Weights, ArtifactBlob::new("model.bin", vec![7; 32]));
    manager.stage(ArtifactRole::Vocabulary, ArtifactBlob::new("vocab.json", b"{}".to_vec()));
    let submission = manager.submit(&manager.validate()).await.unwrap();

    let job_id = JobInitiator::new(as_dyn(&executor))
        .initiate_for(&submission)
        .await
        .unwrap();
    assert_eq!(job_id, "job-1");
    assert_eq!(
        executor.created(),
        vec![(
            "bundle-1".to_string(),
            vec![ArtifactRole::Config, ArtifactRole::Weights]
        )]
    );

    let listener = RecordingListener::new();
    let tracker = JobStatusTracker::new(as_dyn(&executor), Arc::clone(&board));
    let outcome = tracker
        .track(&job_id, Duration::from_millis(100), listener.clone())
        .unwrap()
        .join()
        .await
        .unwrap();
    assert_eq!(outcome, TrackingOutcome::Finished(JobState::Completed));
    assert_eq!(listener.terminals(), vec![JobState::Completed]);

    let result = ResultRetriever::new(as_dyn(&executor), board)
        .fetch(&job_id)
        .await
        .unwrap();
    assert_eq!(result, payload);
}

// ---------------------------------------------------------------------------
// Test: result fetch before completion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_before_completion_is_not_ready_without_network_call() {
    let executor = ScriptedExecutor::new()
        .with_result("job-1", Ok(json!({"accuracy": 1.0})))
        .into_arc();
    let board = Arc::new(StatusBoard::new());
    let retriever = ResultRetriever::new(as_dyn(&executor), Arc::clone(&board));

    assert_matches!(retriever.fetch("job-1").await, Err(EvalError::NotReady(id)) if id == "job-1");

    board.record("job-1", JobState::Running);
    assert_matches!(retriever.fetch("job-1").await, Err(EvalError::NotReady(_)));

    board.record("job-1", JobState::Failed);
    assert_matches!(retriever.fetch("job-1").await, Err(EvalError::NotReady(_)));

    assert_eq!(executor.result_calls.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Test: result evicted after completion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn evicted_result_is_not_found() {
    let executor = ScriptedExecutor::new()
        .with_statuses(vec![Ok(JobState::Completed)])
        .into_arc();
    let board = Arc::new(StatusBoard::new());
    let tracker = JobStatusTracker::new(as_dyn(&executor), Arc::clone(&board));

    let mut session = tracker.session("job-1", RecordingListener::new()).unwrap();
    session.step().await.unwrap();
    assert_eq!(board.get("job-1"), JobState::Completed);

    let result = ResultRetriever::new(as_dyn(&executor), board)
        .fetch("job-1")
        .await;
    assert_matches!(result, Err(EvalError::NotFound(_)));
    assert_eq!(executor.result_calls.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// Test: unknown job id
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn unknown_job_ends_tracking_and_has_no_result() {
    let executor = ScriptedExecutor::new()
        .with_statuses(vec![Ok(JobState::NotFound)])
        .into_arc();
    let board = Arc::new(StatusBoard::new());
    let tracker = JobStatusTracker::new(as_dyn(&executor), Arc::clone(&board));

    let outcome = tracker
        .track("job-missing", Duration::from_secs(1), RecordingListener::new())
        .unwrap()
        .join()
        .await
        .unwrap();
    assert_eq!(outcome, TrackingOutcome::Finished(JobState::NotFound));

    let result = ResultRetriever::new(as_dyn(&executor), board)
        .fetch("job-missing")
        .await;
    assert_matches!(result, Err(EvalError::NotReady(_)));
    assert_eq!(executor.result_calls.load(Ordering::SeqCst), 0);
}
