use std::sync::Arc;

use crate::config::ExecutorConfig;
use crate::policy::IntakePolicy;
use crate::runner::JobRunner;
use crate::store::JobStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JobStore>,
    pub runner: Arc<JobRunner>,
    pub policy: Arc<IntakePolicy>,
    pub config: Arc<ExecutorConfig>,
}
