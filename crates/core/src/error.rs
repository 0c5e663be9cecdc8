use crate::job::JobState;
use crate::types::JobId;

/// Errors raised by the evaluation lifecycle operations.
///
/// `Transport` is the only transient variant. Request-shape faults
/// (`Validation`, `Rejected`, `InvalidRequest`) and ordering faults
/// (`NotFound`, `NotReady`, `NoJob`) are never retried automatically.
/// `ProtocolViolation` ends the tracking session that observed it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Request rejected by executor: {0}")]
    Rejected(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Result for job {0} is not ready")]
    NotReady(JobId),

    #[error("No job to track")]
    NoJob,

    #[error("Protocol violation for job {job_id}: {from} -> {to}")]
    ProtocolViolation {
        job_id: JobId,
        from: JobState,
        to: JobState,
    },
}

impl EvalError {
    /// Whether the failure is presumed transient and safe to retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, EvalError::Transport(_))
    }
}
