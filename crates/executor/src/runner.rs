//! Background execution of accepted jobs.
//!
//! Each job gets its own task. A semaphore caps how many evaluations run
//! at once; a job waiting for a permit stays `pending`. Once it holds a
//! permit the job moves to `running`, then to `completed` with an
//! anonymised metrics payload or to `failed` with the error message.

use std::sync::Arc;

use fedeval_core::artifact::ArtifactBundle;
use fedeval_core::job::EvaluationResult;
use fedeval_core::types::JobId;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::evaluator::Evaluator;
use crate::metrics::{anonymize, classification_metrics};
use crate::store::JobStore;

pub struct JobRunner {
    store: Arc<JobStore>,
    evaluator: Arc<dyn Evaluator>,
    permits: Arc<Semaphore>,
}

impl JobRunner {
    pub fn new(store: Arc<JobStore>, evaluator: Arc<dyn Evaluator>, max_concurrent: usize) -> Self {
        Self {
            store,
            evaluator,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Run `job_id` in the background.
    pub fn spawn(&self, job_id: JobId, bundle: ArtifactBundle) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let evaluator = Arc::clone(&self.evaluator);
        let permits = Arc::clone(&self.permits);

        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                tracing::error!(job_id = %job_id, "Runner closed before job could start");
                return;
            };
            run_job(&store, evaluator.as_ref(), &job_id, &bundle).await;
        })
    }
}

async fn run_job(store: &JobStore, evaluator: &dyn Evaluator, job_id: &str, bundle: &ArtifactBundle) {
    if let Err(e) = store.start(job_id).await {
        tracing::warn!(job_id, error = %e, "Job could not be started");
        return;
    }
    tracing::info!(job_id, roles = ?bundle.roles(), bytes = bundle.total_bytes(), "Evaluation started");

    let outcome = evaluate(evaluator, job_id, bundle).await;

    let recorded = match outcome {
        Ok(result) => {
            tracing::info!(job_id, "Evaluation completed");
            store.complete(job_id, result).await
        }
        Err(message) => {
            tracing::warn!(job_id, error = %message, "Evaluation failed");
            store.fail(job_id, message).await
        }
    };

    if let Err(e) = recorded {
        tracing::error!(job_id, error = %e, "Failed to record evaluation outcome");
    }
}

async fn evaluate(
    evaluator: &dyn Evaluator,
    job_id: &str,
    bundle: &ArtifactBundle,
) -> Result<EvaluationResult, String> {
    let predictions = evaluator
        .evaluate(job_id, bundle)
        .await
        .map_err(|e| e.to_string())?;

    let metrics = classification_metrics(&predictions)
        .ok_or_else(|| "Evaluator returned no predictions".to_string())?;

    let value = serde_json::to_value(&metrics).map_err(|e| e.to_string())?;
    Ok(anonymize(value))
}
