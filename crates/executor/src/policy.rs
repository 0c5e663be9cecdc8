//! Which uploaded artifacts are kept and when an upload is refused.

use fedeval_core::artifact::{ArtifactBundle, ArtifactRole};
use fedeval_core::error::EvalError;

use crate::config::ExecutorConfig;

/// Upload intake rules derived from [`ExecutorConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakePolicy {
    pub required: Vec<ArtifactRole>,
    pub accepted: Vec<ArtifactRole>,
    pub max_blob_bytes: usize,
    /// Lowercase extensions without the dot.
    pub allowed_extensions: Vec<String>,
}

impl IntakePolicy {
    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self {
            required: config.required_roles.clone(),
            accepted: config.accepted_roles.clone(),
            max_blob_bytes: config.max_blob_bytes,
            allowed_extensions: config.allowed_extensions.clone(),
        }
    }

    /// Map a multipart part name to a kept role.
    ///
    /// Unknown names and roles outside the accepted set yield `None`; the
    /// caller drops those parts without failing the upload.
    pub fn admit(&self, part_name: &str) -> Option<ArtifactRole> {
        part_name
            .parse::<ArtifactRole>()
            .ok()
            .filter(|role| self.accepted.contains(role))
    }

    /// Check a bundle built from admitted parts.
    ///
    /// Fails with `Validation` when a required role is missing, or when a
    /// blob has a disallowed file type, is empty, or is over the size limit.
    pub fn validate(&self, bundle: &ArtifactBundle) -> Result<(), EvalError> {
        if let Some(missing) = self.required.iter().find(|r| !bundle.contains(**r)) {
            return Err(EvalError::Validation(format!(
                "Missing required role '{missing}'"
            )));
        }

        for (role, blob) in bundle.iter() {
            if !self.allows_file_name(&blob.file_name) {
                return Err(EvalError::Validation(format!(
                    "Invalid file type for role '{role}': '{}'",
                    blob.file_name
                )));
            }
            if blob.is_empty() {
                return Err(EvalError::Validation(format!(
                    "Empty file for role '{role}'"
                )));
            }
            if blob.len() > self.max_blob_bytes {
                return Err(EvalError::Validation(format!(
                    "File for role '{role}' is {} bytes, limit is {}",
                    blob.len(),
                    self.max_blob_bytes
                )));
            }
        }

        Ok(())
    }

    /// Whether the extension of `file_name` is on the allowlist. Names
    /// without an extension are refused.
    pub fn allows_file_name(&self, file_name: &str) -> bool {
        let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
        match base.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => self
                .allowed_extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext)),
            _ => false,
        }
    }
}
