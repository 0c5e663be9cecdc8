pub mod bundles;
pub mod health;
pub mod jobs;

use axum::Router;

use crate::state::AppState;

/// All evaluation endpoints, mounted at the root.
///
/// ```text
/// POST   /bundles                 -> upload_bundle
/// POST   /jobs                    -> create_job
/// GET    /jobs/{job_id}/status    -> job_status
/// GET    /jobs/{job_id}/result    -> job_result
/// ```
pub fn api_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .nest("/bundles", bundles::router(max_upload_bytes))
        .nest("/jobs", jobs::router())
}
