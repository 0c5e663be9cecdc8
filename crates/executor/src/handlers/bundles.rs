//! Handler for the `/bundles` resource.

use std::collections::BTreeMap;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use fedeval_core::artifact::{ArtifactBlob, ArtifactBundle};
use fedeval_core::error::EvalError;
use fedeval_core::wire::UploadResponse;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /bundles
///
/// Accept one multipart part per artifact role, named after the role.
/// Parts for unknown or unaccepted roles are dropped and left out of
/// `accepted_roles`. A later part for the same role replaces an earlier
/// one.
pub async fn upload_bundle(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    let mut blobs = BTreeMap::new();
    let mut dropped = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        let Some(role) = state.policy.admit(&name) else {
            dropped.push(name);
            continue;
        };

        let file_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| role.as_str().to_string());
        let data = field.bytes().await.map_err(multipart_error)?;

        blobs.insert(role, ArtifactBlob::new(file_name, data.to_vec()));
    }

    if !dropped.is_empty() {
        tracing::debug!(parts = ?dropped, "Ignored upload parts with unaccepted roles");
    }

    let bundle = ArtifactBundle::new(blobs);
    state.policy.validate(&bundle)?;

    let accepted_roles = bundle.roles();
    let total_bytes = bundle.total_bytes();
    let bundle_id = state.store.insert_bundle(bundle).await;

    tracing::info!(
        bundle_id = %bundle_id,
        roles = ?accepted_roles,
        bytes = total_bytes,
        "Bundle received",
    );

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            bundle_id,
            accepted_roles,
        }),
    ))
}

/// Oversized bodies are a validation failure; anything else is malformed.
fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::Eval(EvalError::Validation(format!(
            "Upload too large: {}",
            e.body_text()
        )))
    } else {
        AppError::BadRequest(e.body_text())
    }
}
