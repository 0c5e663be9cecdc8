//! Boundary to the data-owner side Evaluation Executor.
//!
//! Every developer-side component talks to the executor through
//! [`EvaluationExecutor`]. [`HttpExecutor`](crate::http::HttpExecutor)
//! is the production binding; tests substitute scripted fakes.

use async_trait::async_trait;
use fedeval_core::artifact::{ArtifactBundle, ArtifactRole};
use fedeval_core::error::EvalError;
use fedeval_core::job::{EvaluationResult, JobState};
use fedeval_core::types::BundleId;
use fedeval_core::wire::UploadResponse;

#[async_trait]
pub trait EvaluationExecutor: Send + Sync {
    /// Upload a bundle. Returns the executor-assigned bundle id and the
    /// roles it accepted.
    ///
    /// Fails with `Transport` or `Validation`.
    async fn upload_bundle(&self, bundle: &ArtifactBundle) -> Result<UploadResponse, EvalError>;

    /// Create a job for an uploaded bundle. Fails with `Transport` or
    /// `Rejected`.
    async fn create_job(
        &self,
        bundle_id: &BundleId,
        accepted_roles: &[ArtifactRole],
    ) -> Result<String, EvalError>;

    /// Sample the current state of a job. Unknown ids report
    /// [`JobState::NotFound`]; only `Transport` failures are expected.
    async fn job_status(&self, job_id: &str) -> Result<JobState, EvalError>;

    /// Fetch the result payload. Fails with `Transport`, `NotReady` or
    /// `NotFound`.
    async fn job_result(&self, job_id: &str) -> Result<EvaluationResult, EvalError>;
}
