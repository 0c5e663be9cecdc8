use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;

use crate::handlers::bundles;
use crate::state::AppState;

/// Routes mounted at `/bundles`.
///
/// Uploads carry model weights, so the default body limit is replaced by
/// one derived from the per-blob limit.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", post(bundles::upload_bundle))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
