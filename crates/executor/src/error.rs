use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fedeval_core::error::EvalError;
use fedeval_core::wire::{
    ErrorBody, CODE_BAD_REQUEST, CODE_INTERNAL_ERROR, CODE_NOT_FOUND, CODE_NOT_READY,
    CODE_REJECTED, CODE_VALIDATION_ERROR,
};

/// Application-level error type for HTTP handlers.
///
/// Wraps [`EvalError`] for lifecycle errors and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce `{error, code}` JSON
/// bodies the developer client understands.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// A malformed request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Eval(err) => match err {
                EvalError::Validation(msg) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    CODE_VALIDATION_ERROR,
                    msg.clone(),
                ),
                EvalError::Rejected(msg) => (StatusCode::BAD_REQUEST, CODE_REJECTED, msg.clone()),
                EvalError::InvalidRequest(msg) => {
                    (StatusCode::BAD_REQUEST, CODE_BAD_REQUEST, msg.clone())
                }
                EvalError::NoJob => (
                    StatusCode::BAD_REQUEST,
                    CODE_BAD_REQUEST,
                    err.to_string(),
                ),
                EvalError::NotFound(msg) => (StatusCode::NOT_FOUND, CODE_NOT_FOUND, msg.clone()),
                EvalError::NotReady(_) => (StatusCode::CONFLICT, CODE_NOT_READY, err.to_string()),
                EvalError::Transport(_) | EvalError::ProtocolViolation { .. } => {
                    tracing::error!(error = %err, "Internal lifecycle error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        CODE_INTERNAL_ERROR,
                        "An internal error occurred".to_string(),
                    )
                }
            },

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, CODE_BAD_REQUEST, msg.clone()),
        };

        let body = ErrorBody {
            error: message,
            code: code.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}
