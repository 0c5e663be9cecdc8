//! In-memory bundle and job registry.
//!
//! Nothing outlives the process. Job ids are random UUIDs and are never
//! reused. Job state is only ever advanced through [`EvaluationJob`],
//! which refuses backward moves.

use std::collections::HashMap;
use std::sync::Arc;

use fedeval_core::artifact::{ArtifactBundle, ArtifactRole};
use fedeval_core::error::EvalError;
use fedeval_core::job::{EvaluationJob, EvaluationResult, JobState};
use fedeval_core::types::{BundleId, JobId, Timestamp};
use tokio::sync::RwLock;

/// An accepted upload.
#[derive(Debug)]
pub struct StoredBundle {
    pub bundle_id: BundleId,
    pub bundle: ArtifactBundle,
    pub received_at: Timestamp,
}

/// Counts removed by one retention pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Evicted {
    pub jobs: usize,
    pub bundles: usize,
}

#[derive(Debug, Default)]
pub struct JobStore {
    bundles: RwLock<HashMap<BundleId, Arc<StoredBundle>>>,
    jobs: RwLock<HashMap<JobId, EvaluationJob>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /* ----------------------------------------------------------------------
    Bundles
    ---------------------------------------------------------------------- */

    /// Register an upload and return its new id.
    pub async fn insert_bundle(&self, bundle: ArtifactBundle) -> BundleId {
        let bundle_id = uuid::Uuid::new_v4().to_string();
        let stored = Arc::new(StoredBundle {
            bundle_id: bundle_id.clone(),
            bundle,
            received_at: chrono::Utc::now(),
        });
        self.bundles.write().await.insert(bundle_id.clone(), stored);
        bundle_id
    }

    pub async fn bundle(&self, bundle_id: &str) -> Option<Arc<StoredBundle>> {
        self.bundles.read().await.get(bundle_id).cloned()
    }

    /* ----------------------------------------------------------------------
    Jobs
    ---------------------------------------------------------------------- */

    /// Create a `pending` job over the accepted roles of a stored bundle.
    ///
    /// Returns the job id and the bundle subset the evaluator should see.
    /// Fails with `Rejected` for an unknown bundle, an empty role list or
    /// a role the bundle does not hold.
    pub async fn create_job(
        &self,
        bundle_id: &str,
        accepted_roles: &[ArtifactRole],
    ) -> Result<(JobId, ArtifactBundle), EvalError> {
        if accepted_roles.is_empty() {
            return Err(EvalError::Rejected(
                "accepted_roles must not be empty".to_string(),
            ));
        }

        let stored = self
            .bundle(bundle_id)
            .await
            .ok_or_else(|| EvalError::Rejected(format!("Unknown bundle '{bundle_id}'")))?;

        if let Some(role) = accepted_roles.iter().find(|r| !stored.bundle.contains(**r)) {
            return Err(EvalError::Rejected(format!(
                "Bundle '{bundle_id}' has no '{role}' artifact"
            )));
        }

        let job_id = uuid::Uuid::new_v4().to_string();
        let job = EvaluationJob::new(job_id.clone(), stored.bundle_id.clone());
        self.jobs.write().await.insert(job_id.clone(), job);

        Ok((job_id, stored.bundle.select(accepted_roles)))
    }

    /// Current state. Ids never issued, or already evicted, report
    /// [`JobState::NotFound`].
    pub async fn state(&self, job_id: &str) -> JobState {
        self.jobs
            .read()
            .await
            .get(job_id)
            .map(EvaluationJob::state)
            .unwrap_or(JobState::NotFound)
    }

    /// A copy of the job record, if held.
    pub async fn job(&self, job_id: &str) -> Option<EvaluationJob> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// Result of a completed job.
    ///
    /// `NotFound` for unknown or evicted jobs and for failed jobs, which
    /// never produce one. `NotReady` while the job is still running.
    pub async fn result(&self, job_id: &str) -> Result<EvaluationResult, EvalError> {
        let jobs = self.jobs.read().await;
        let job = jobs
            .get(job_id)
            .ok_or_else(|| EvalError::NotFound(format!("Job '{job_id}' not found")))?;

        match (job.state(), job.result()) {
            (JobState::Completed, Some(result)) => Ok(result.clone()),
            (JobState::Failed, _) => Err(EvalError::NotFound(format!(
                "Job '{job_id}' failed and has no result"
            ))),
            _ => Err(EvalError::NotReady(job_id.to_string())),
        }
    }

    pub async fn start(&self, job_id: &str) -> Result<(), EvalError> {
        self.update(job_id, |job| job.start()).await
    }

    pub async fn complete(&self, job_id: &str, result: EvaluationResult) -> Result<(), EvalError> {
        self.update(job_id, |job| job.complete(result)).await
    }

    pub async fn fail(&self, job_id: &str, error: impl Into<String>) -> Result<(), EvalError> {
        let error = error.into();
        self.update(job_id, |job| job.fail(error)).await
    }

    async fn update(
        &self,
        job_id: &str,
        apply: impl FnOnce(&mut EvaluationJob) -> Result<(), EvalError>,
    ) -> Result<(), EvalError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| EvalError::NotFound(format!("Job '{job_id}' not found")))?;
        apply(job)
    }

    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /* ----------------------------------------------------------------------
    Retention
    ---------------------------------------------------------------------- */

    /// Drop finished jobs that ended at or before `cutoff`, then bundles
    /// received at or before `cutoff` that no remaining job refers to.
    pub async fn evict_before(&self, cutoff: Timestamp) -> Evicted {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| !matches!(job.finished_at, Some(at) if at <= cutoff));
        let evicted_jobs = before - jobs.len();

        let mut bundles = self.bundles.write().await;
        let before = bundles.len();
        bundles.retain(|bundle_id, stored| {
            stored.received_at > cutoff || jobs.values().any(|j| &j.bundle_id == bundle_id)
        });

        Evicted {
            jobs: evicted_jobs,
            bundles: before - bundles.len(),
        }
    }
}
