//! Integration tests for job initiation.

mod common;

use std::sync::atomic::Ordering;

use assert_matches::assert_matches;
use common::{as_dyn, ScriptedExecutor};
use fedeval_client::initiator::JobInitiator;
use fedeval_client::submission::Submission;
use fedeval_core::artifact::ArtifactRole;
use fedeval_core::error::EvalError;

// ---------------------------------------------------------------------------
// Test: empty accepted-role list never reaches the executor
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_role_list_fails_without_network_call() {
    let executor = ScriptedExecutor::new().into_arc();
    let initiator = JobInitiator::new(as_dyn(&executor));

    let result = initiator.initiate(&"bundle-1".to_string(), &[]).await;

    assert_matches!(result, Err(EvalError::InvalidRequest(_)));
    assert_eq!(executor.create_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_bundle_id_fails_without_network_call() {
    let executor = ScriptedExecutor::new().into_arc();
    let initiator = JobInitiator::new(as_dyn(&executor));

    let result = initiator
        .initiate(&String::new(), &[ArtifactRole::Config])
        .await;

    assert_matches!(result, Err(EvalError::InvalidRequest(_)));
    assert_eq!(executor.create_calls.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Test: the exact accepted roles are forwarded
// ---------------------------------------------------------------------------

#[tokio::test]
async fn forwards_bundle_and_accepted_roles() {
    let executor = ScriptedExecutor::new().with_job_ids(&["job-1"]).into_arc();
    let initiator = JobInitiator::new(as_dyn(&executor));
    let submission = Submission {
        bundle_id: "bundle-4".into(),
        accepted_roles: vec![ArtifactRole::Config, ArtifactRole::Weights],
    };

    let job_id = initiator.initiate_for(&submission).await.unwrap();

    assert_eq!(job_id, "job-1");
    assert_eq!(
        executor.created(),
        vec![(
            "bundle-4".to_string(),
            vec![ArtifactRole::Config, ArtifactRole::Weights]
        )]
    );
}

// ---------------------------------------------------------------------------
// Test: repeated initiation creates distinct jobs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn initiate_twice_creates_two_jobs() {
    let executor = ScriptedExecutor::new()
        .with_job_ids(&["job-1", "job-2"])
        .into_arc();
    let initiator = JobInitiator::new(as_dyn(&executor));
    let roles = [ArtifactRole::Config, ArtifactRole::Weights];
    let bundle_id = "bundle-1".to_string();

    let first = initiator.initiate(&bundle_id, &roles).await.unwrap();
    let second = initiator.initiate(&bundle_id, &roles).await.unwrap();

    assert_ne!(first, second);
    assert_eq!(executor.create_calls.load(Ordering::SeqCst), 2);
}

// ---------------------------------------------------------------------------
// Test: executor refusal propagates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rejection_propagates() {
    let executor = ScriptedExecutor::new()
        .with_create_error(EvalError::Rejected("Unknown bundle 'bundle-x'".into()))
        .into_arc();
    let initiator = JobInitiator::new(as_dyn(&executor));

    let result = initiator
        .initiate(&"bundle-x".to_string(), &[ArtifactRole::Config])
        .await;

    assert_matches!(result, Err(EvalError::Rejected(msg)) if msg.contains("bundle-x"));
}
