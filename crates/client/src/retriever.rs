use std::sync::Arc;

use fedeval_core::error::EvalError;
use fedeval_core::job::{EvaluationResult, JobState};

use crate::board::StatusBoard;
use crate::executor::EvaluationExecutor;

/// Fetches result payloads for jobs the tracker has seen complete.
pub struct ResultRetriever {
    executor: Arc<dyn EvaluationExecutor>,
    board: Arc<StatusBoard>,
}

impl ResultRetriever {
    pub fn new(executor: Arc<dyn EvaluationExecutor>, board: Arc<StatusBoard>) -> Self {
        Self { executor, board }
    }

    /// Fetch the result of `job_id`, unmodified.
    ///
    /// Fails with `NotReady` without contacting the executor unless the
    /// job was last observed `completed`. Fails with `NotFound` if the
    /// executor no longer holds the result and `Transport` on delivery
    /// failure.
    pub async fn fetch(&self, job_id: &str) -> Result<EvaluationResult, EvalError> {
        let tracked = self.board.get(job_id);
        if tracked != JobState::Completed {
            tracing::debug!(job_id = %job_id, state = %tracked, "Result requested before completion");
            return Err(EvalError::NotReady(job_id.to_string()));
        }

        let result = self.executor.job_result(job_id).await.map_err(|e| {
            tracing::warn!(job_id = %job_id, error = %e, "Result fetch failed");
            e
        })?;

        tracing::info!(job_id = %job_id, "Evaluation result retrieved");
        Ok(result)
    }
}
