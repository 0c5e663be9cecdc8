//! Developer-side staging and upload of model artifacts.
//!
//! [`SubmissionManager`] collects one blob per [`ArtifactRole`], hands
//! out immutable [`ArtifactBundle`] snapshots, and uploads them. Staged
//! blobs survive a successful upload so the same caller can resubmit;
//! only [`SubmissionManager::clear`] resets them.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use fedeval_core::artifact::{ArtifactBlob, ArtifactBundle, ArtifactRole};
use fedeval_core::error::EvalError;
use fedeval_core::types::BundleId;

use crate::executor::EvaluationExecutor;

/// Outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub bundle_id: BundleId,
    /// Roles the executor kept, in the order it reported them.
    pub accepted_roles: Vec<ArtifactRole>,
}

pub struct SubmissionManager {
    executor: Arc<dyn EvaluationExecutor>,
    staged: BTreeMap<ArtifactRole, ArtifactBlob>,
}

impl SubmissionManager {
    pub fn new(executor: Arc<dyn EvaluationExecutor>) -> Self {
        Self {
            executor,
            staged: BTreeMap::new(),
        }
    }

    /// Record a blob for `role`, replacing any earlier one. Returns the
    /// replaced blob.
    pub fn stage(&mut self, role: ArtifactRole, blob: ArtifactBlob) -> Option<ArtifactBlob> {
        tracing::debug!(role = %role, file_name = %blob.file_name, bytes = blob.len(), "Staged artifact");
        self.staged.insert(role, blob)
    }

    /// Read `path` from disk and stage it for `role`.
    pub async fn stage_file(&mut self, role: ArtifactRole, path: &Path) -> Result<(), EvalError> {
        let data = tokio::fs::read(path).await.map_err(|e| {
            EvalError::InvalidRequest(format!("Cannot read {}: {e}", path.display()))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| role.as_str().to_string());

        self.stage(role, ArtifactBlob::new(file_name, data));
        Ok(())
    }

    /// Stage every role whose conventional file exists in `dir` (see
    /// [`ArtifactRole::conventional_file_names`]). Returns the roles
    /// staged.
    pub async fn stage_directory(&mut self, dir: &Path) -> Result<Vec<ArtifactRole>, EvalError> {
        let mut staged = Vec::new();
        for role in ArtifactRole::ALL {
            for name in role.conventional_file_names() {
                let path = dir.join(name);
                if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    self.stage_file(role, &path).await?;
                    staged.push(role);
                    break;
                }
            }
        }
        Ok(staged)
    }

    /// Snapshot of everything currently staged. No filtering is applied;
    /// deciding whether the bundle is sufficient is left to the caller.
    pub fn validate(&self) -> ArtifactBundle {
        ArtifactBundle::new(self.staged.clone())
    }

    pub fn staged_roles(&self) -> Vec<ArtifactRole> {
        self.staged.keys().copied().collect()
    }

    /// Upload `bundle` to the executor.
    ///
    /// Fails with `Transport` when the upload cannot be delivered or
    /// `Validation` when the executor reports the bundle malformed.
    pub async fn submit(&self, bundle: &ArtifactBundle) -> Result<Submission, EvalError> {
        tracing::info!(
            roles = bundle.len(),
            bytes = bundle.total_bytes(),
            "Uploading artifact bundle",
        );

        let response = self.executor.upload_bundle(bundle).await.map_err(|e| {
            tracing::warn!(error = %e, "Artifact bundle upload failed");
            e
        })?;

        let dropped: Vec<&str> = bundle
            .roles()
            .into_iter()
            .filter(|r| !response.accepted_roles.contains(r))
            .map(ArtifactRole::as_str)
            .collect();
        if !dropped.is_empty() {
            tracing::warn!(
                bundle_id = %response.bundle_id,
                dropped = ?dropped,
                "Executor did not accept every staged role",
            );
        }

        tracing::info!(
            bundle_id = %response.bundle_id,
            accepted = response.accepted_roles.len(),
            "Artifact bundle uploaded",
        );

        Ok(Submission {
            bundle_id: response.bundle_id,
            accepted_roles: response.accepted_roles,
        })
    }

    /// Drop every staged blob.
    pub fn clear(&mut self) {
        self.staged.clear();
    }
}
