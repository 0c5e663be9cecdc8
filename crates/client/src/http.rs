//! REST binding of [`EvaluationExecutor`] using [`reqwest`].
//!
//! Wraps the executor HTTP API (bundle upload, job creation, status
//! sampling, result retrieval) and maps non-2xx responses back into
//! [`EvalError`] variants via the `code` field of the error body.

use async_trait::async_trait;
use fedeval_core::artifact::{ArtifactBundle, ArtifactRole};
use fedeval_core::error::EvalError;
use fedeval_core::job::{EvaluationResult, JobState};
use fedeval_core::types::BundleId;
use fedeval_core::wire::{
    CreateJobRequest, CreateJobResponse, ErrorBody, JobStatusResponse, UploadResponse,
    CODE_BAD_REQUEST, CODE_NOT_FOUND, CODE_NOT_READY, CODE_REJECTED, CODE_VALIDATION_ERROR,
};
use reqwest::StatusCode;

use crate::executor::EvaluationExecutor;

/// HTTP client for a single executor instance.
pub struct HttpExecutor {
    client: reqwest::Client,
    base_url: String,
}

impl HttpExecutor {
    /// Create a client for an executor.
    ///
    /// * `base_url` - e.g. `http://host:5001`. A trailing slash is ignored.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`] (timeouts,
    /// connection pooling).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `{base_url}/jobs/{job_id}/{leaf}` with `job_id` percent-encoded as a
    /// single path segment.
    fn job_url(&self, job_id: &str, leaf: &str) -> Result<reqwest::Url, EvalError> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            EvalError::Transport(format!("Invalid executor URL '{}': {e}", self.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                EvalError::Transport(format!("Executor URL '{}' cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(["jobs", job_id, leaf]);
        Ok(url)
    }

    /// Return the response unchanged on success, or the classified error
    /// built from its status and body.
    async fn ensure_success(
        response: reqwest::Response,
        job_id: Option<&str>,
    ) -> Result<reqwest::Response, EvalError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let raw = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        let body = serde_json::from_str::<ErrorBody>(&raw).ok();
        Err(classify_error(status, body, &raw, job_id))
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        job_id: Option<&str>,
    ) -> Result<T, EvalError> {
        let response = Self::ensure_success(response, job_id).await?;
        response.json::<T>().await.map_err(transport)
    }
}

#[async_trait]
impl EvaluationExecutor for HttpExecutor {
    /// `POST /bundles` with one multipart part per role.
    async fn upload_bundle(&self, bundle: &ArtifactBundle) -> Result<UploadResponse, EvalError> {
        let mut form = reqwest::multipart::Form::new();
        for (role, blob) in bundle.iter() {
            let part = reqwest::multipart::Part::bytes(blob.data.clone())
                .file_name(blob.file_name.clone());
            form = form.part(role.as_str(), part);
        }

        let response = self
            .client
            .post(self.url("/bundles"))
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;

        Self::parse_response(response, None).await
    }

    /// `POST /jobs`.
    async fn create_job(
        &self,
        bundle_id: &BundleId,
        accepted_roles: &[ArtifactRole],
    ) -> Result<String, EvalError> {
        let body = CreateJobRequest {
            bundle_id: bundle_id.clone(),
            accepted_roles: accepted_roles.to_vec(),
        };

        let response = self
            .client
            .post(self.url("/jobs"))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let created: CreateJobResponse = Self::parse_response(response, None).await?;
        Ok(created.job_id)
    }

    /// `GET /jobs/{job_id}/status`.
    async fn job_status(&self, job_id: &str) -> Result<JobState, EvalError> {
        let response = self
            .client
            .get(self.job_url(job_id, "status")?)
            .send()
            .await
            .map_err(transport)?;

        let status: JobStatusResponse = Self::parse_response(response, Some(job_id)).await?;
        Ok(status.state)
    }

    /// `GET /jobs/{job_id}/result`. The body is returned as-is.
    async fn job_result(&self, job_id: &str) -> Result<EvaluationResult, EvalError> {
        let response = self
            .client
            .get(self.job_url(job_id, "result")?)
            .send()
            .await
            .map_err(transport)?;

        Self::parse_response(response, Some(job_id)).await
    }
}

fn transport(e: reqwest::Error) -> EvalError {
    EvalError::Transport(e.to_string())
}

/// Map a non-2xx response to an [`EvalError`].
///
/// The `code` field decides when present; otherwise the HTTP status
/// does. Server errors are treated as transport failures.
fn classify_error(
    status: StatusCode,
    body: Option<ErrorBody>,
    raw: &str,
    job_id: Option<&str>,
) -> EvalError {
    let message = body
        .as_ref()
        .map(|b| b.error.clone())
        .unwrap_or_else(|| format!("HTTP {}: {raw}", status.as_u16()));
    let not_ready = || EvalError::NotReady(job_id.unwrap_or_default().to_string());

    match body.as_ref().map(|b| b.code.as_str()) {
        Some(CODE_VALIDATION_ERROR) => EvalError::Validation(message),
        Some(CODE_REJECTED) | Some(CODE_BAD_REQUEST) => EvalError::Rejected(message),
        Some(CODE_NOT_FOUND) => EvalError::NotFound(message),
        Some(CODE_NOT_READY) => not_ready(),
        _ => match status {
            StatusCode::NOT_FOUND => EvalError::NotFound(message),
            StatusCode::CONFLICT => not_ready(),
            StatusCode::UNPROCESSABLE_ENTITY => EvalError::Validation(message),
            s if s.is_client_error() => EvalError::Rejected(message),
            _ => EvalError::Transport(message),
        },
    }
}
