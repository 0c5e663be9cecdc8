use std::sync::Arc;

use fedeval_core::artifact::ArtifactRole;
use fedeval_core::error::EvalError;
use fedeval_core::types::{BundleId, JobId};

use crate::executor::EvaluationExecutor;
use crate::submission::Submission;

/// Requests evaluation jobs for uploaded bundles.
///
/// Not idempotent: every call to [`initiate`](Self::initiate) asks the
/// executor for a new, independent job, even for a bundle that already
/// has one running.
pub struct JobInitiator {
    executor: Arc<dyn EvaluationExecutor>,
}

impl JobInitiator {
    pub fn new(executor: Arc<dyn EvaluationExecutor>) -> Self {
        Self { executor }
    }

    /// Create a job for `bundle_id` over exactly the roles the upload
    /// accepted.
    ///
    /// An empty role list or bundle id fails with `InvalidRequest`
    /// before anything is sent.
    pub async fn initiate(
        &self,
        bundle_id: &BundleId,
        accepted_roles: &[ArtifactRole],
    ) -> Result<JobId, EvalError> {
        if accepted_roles.is_empty() {
            return Err(EvalError::InvalidRequest(
                "Accepted role list must not be empty".to_string(),
            ));
        }
        if bundle_id.trim().is_empty() {
            return Err(EvalError::InvalidRequest(
                "Bundle id must not be empty".to_string(),
            ));
        }

        let job_id = self
            .executor
            .create_job(bundle_id, accepted_roles)
            .await
            .map_err(|e| {
                tracing::warn!(bundle_id = %bundle_id, error = %e, "Job creation failed");
                e
            })?;

        tracing::info!(bundle_id = %bundle_id, job_id = %job_id, "Evaluation job created");
        Ok(job_id)
    }

    /// [`initiate`](Self::initiate) for the outcome of an upload.
    pub async fn initiate_for(&self, submission: &Submission) -> Result<JobId, EvalError> {
        self.initiate(&submission.bundle_id, &submission.accepted_roles)
            .await
    }
}
