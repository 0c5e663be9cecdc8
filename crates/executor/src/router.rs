//! Shared application router builder.
//!
//! [`build_app_router`] is used by both the binary and the integration
//! tests so they run the same middleware stack.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ExecutorConfig;
use crate::evaluator::{CommandEvaluator, Evaluator, UnconfiguredEvaluator};
use crate::policy::IntakePolicy;
use crate::routes;
use crate::runner::JobRunner;
use crate::state::AppState;
use crate::store::JobStore;

/// Assemble [`AppState`] for `config`, picking the evaluator from
/// `EVALUATOR_COMMAND`.
pub fn build_state(config: ExecutorConfig) -> AppState {
    let evaluator: Arc<dyn Evaluator> = match config.evaluator_command.as_deref().and_then(|cmd| {
        CommandEvaluator::from_command_line(cmd, &config.dataset_path, &config.work_dir)
    }) {
        Some(command) => Arc::new(command),
        None => {
            tracing::warn!("EVALUATOR_COMMAND not set, every job will fail");
            Arc::new(UnconfiguredEvaluator)
        }
    };
    build_state_with(config, evaluator)
}

/// Assemble [`AppState`] around a given evaluator.
pub fn build_state_with(config: ExecutorConfig, evaluator: Arc<dyn Evaluator>) -> AppState {
    let store = Arc::new(JobStore::new());
    let runner = Arc::new(JobRunner::new(
        Arc::clone(&store),
        evaluator,
        config.max_concurrent_jobs,
    ));
    AppState {
        store,
        runner,
        policy: Arc::new(IntakePolicy::from_config(&config)),
        config: Arc::new(config),
    }
}

/// Build the full application [`Router`] with all middleware layers.
///
/// The middleware stack is applied bottom-up:
///
/// 1. Set request ID on incoming requests
/// 2. Structured request/response tracing
/// 3. Propagate request ID to response
/// 4. Request timeout
/// 5. Panic recovery (catch panics, return 500)
pub fn build_app_router(state: AppState) -> Router {
    let request_id_header = HeaderName::from_static("x-request-id");
    let timeout = Duration::from_secs(state.config.request_timeout_secs);
    let max_upload_bytes = state.config.max_upload_bytes();

    Router::new()
        .merge(routes::health::router())
        .merge(routes::api_routes(max_upload_bytes))
        // -- Middleware stack (applied bottom-up) --
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .with_state(state)
}
