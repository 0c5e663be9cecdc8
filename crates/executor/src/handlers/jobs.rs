//! Handlers for the `/jobs` resource.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use fedeval_core::job::EvaluationResult;
use fedeval_core::wire::{CreateJobRequest, CreateJobResponse, JobStatusResponse};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /jobs
///
/// Create a job over the accepted roles of an uploaded bundle and start
/// it in the background. Every call creates a new job.
pub async fn create_job(
    State(state): State<AppState>,
    payload: Result<Json<CreateJobRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CreateJobResponse>)> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let (job_id, bundle) = state
        .store
        .create_job(&request.bundle_id, &request.accepted_roles)
        .await
        .inspect_err(|e| {
            tracing::info!(bundle_id = %request.bundle_id, error = %e, "Job creation refused");
        })?;

    tracing::info!(
        job_id = %job_id,
        bundle_id = %request.bundle_id,
        roles = ?request.accepted_roles,
        "Job created",
    );
    state.runner.spawn(job_id.clone(), bundle);

    Ok((StatusCode::CREATED, Json(CreateJobResponse { job_id })))
}

/// GET /jobs/{job_id}/status
///
/// Always 200. Unknown and evicted ids report `not_found`.
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Json<JobStatusResponse> {
    let job_state = state.store.state(&job_id).await;
    Json(JobStatusResponse {
        job_id,
        state: job_state,
    })
}

/// GET /jobs/{job_id}/result
pub async fn job_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<EvaluationResult>> {
    let result = state.store.result(&job_id).await?;
    Ok(Json(result))
}
