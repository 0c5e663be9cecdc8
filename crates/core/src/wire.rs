//! JSON bodies exchanged between the developer client and the executor.

use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactRole;
use crate::job::JobState;
use crate::types::{BundleId, JobId};

/* --------------------------------------------------------------------------
Error codes
-------------------------------------------------------------------------- */

/// Upload rejected: missing required role, empty or oversized blob.
pub const CODE_VALIDATION_ERROR: &str = "VALIDATION_ERROR";

/// Job creation refused (unknown bundle, bad role list).
pub const CODE_REJECTED: &str = "REJECTED";

/// Malformed request body.
pub const CODE_BAD_REQUEST: &str = "BAD_REQUEST";

/// Job or result does not exist (never existed or evicted).
pub const CODE_NOT_FOUND: &str = "NOT_FOUND";

/// Result requested before the job completed.
pub const CODE_NOT_READY: &str = "NOT_READY";

pub const CODE_INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/* --------------------------------------------------------------------------
Bodies
-------------------------------------------------------------------------- */

/// `POST /bundles` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub bundle_id: BundleId,
    /// Roles the executor kept. May be a strict subset of what was sent.
    pub accepted_roles: Vec<ArtifactRole>,
}

/// `POST /jobs` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub bundle_id: BundleId,
    pub accepted_roles: Vec<ArtifactRole>,
}

/// `POST /jobs` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateJobResponse {
    pub job_id: JobId,
}

/// `GET /jobs/{job_id}/status` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: JobId,
    pub state: JobState,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}
