//! Artifact roles, blobs, and the immutable bundle submitted for evaluation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EvalError;

/* --------------------------------------------------------------------------
Roles
-------------------------------------------------------------------------- */

/// A predeclared slot in a model artifact bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactRole {
    Config,
    Weights,
    TokenizerConfig,
    Vocabulary,
    MergeRules,
}

impl ArtifactRole {
    /// Every role, in bundle order.
    pub const ALL: [ArtifactRole; 5] = [
        ArtifactRole::Config,
        ArtifactRole::Weights,
        ArtifactRole::TokenizerConfig,
        ArtifactRole::Vocabulary,
        ArtifactRole::MergeRules,
    ];

    /// Wire name of the role (also the multipart part name).
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactRole::Config => "config",
            ArtifactRole::Weights => "weights",
            ArtifactRole::TokenizerConfig => "tokenizer_config",
            ArtifactRole::Vocabulary => "vocabulary",
            ArtifactRole::MergeRules => "merge_rules",
        }
    }

    /// Conventional file names for the role in a Hugging Face style
    /// model directory, most specific first.
    pub fn conventional_file_names(self) -> &'static [&'static str] {
        match self {
            ArtifactRole::Config => &["config.json"],
            ArtifactRole::Weights => &["pytorch_model.bin", "model.safetensors", "model.bin"],
            ArtifactRole::TokenizerConfig => &["tokenizer_config.json"],
            ArtifactRole::Vocabulary => &["vocab.json", "vocab.txt"],
            ArtifactRole::MergeRules => &["merges.txt"],
        }
    }
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactRole {
    type Err = EvalError;

    /// Accepts the wire names plus the short aliases `model`, `vocab`
    /// and `merges`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "config" => Ok(ArtifactRole::Config),
            "weights" | "model" => Ok(ArtifactRole::Weights),
            "tokenizer_config" => Ok(ArtifactRole::TokenizerConfig),
            "vocabulary" | "vocab" => Ok(ArtifactRole::Vocabulary),
            "merge_rules" | "merges" => Ok(ArtifactRole::MergeRules),
            other => Err(EvalError::InvalidRequest(format!(
                "Unknown artifact role '{other}'"
            ))),
        }
    }
}

/// Parse a comma-separated role list, e.g. `config,weights`.
///
/// Blank entries are skipped and duplicates collapse.
pub fn parse_role_list(raw: &str) -> Result<Vec<ArtifactRole>, EvalError> {
    let mut roles = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let role: ArtifactRole = part.parse()?;
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
    Ok(roles)
}

/* --------------------------------------------------------------------------
Blobs and bundles
-------------------------------------------------------------------------- */

/// Opaque binary content staged for one role.
#[derive(Clone, PartialEq, Eq)]
pub struct ArtifactBlob {
    /// Original file name, forwarded to the executor.
    pub file_name: String,
    pub data: Vec<u8>,
}

impl ArtifactBlob {
    pub fn new(file_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for ArtifactBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactBlob")
            .field("file_name", &self.file_name)
            .field("len", &self.data.len())
            .finish()
    }
}

/// An immutable role -> blob mapping.
///
/// Built once from a staging area and never mutated afterwards; a
/// resubmission builds a new bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactBundle {
    blobs: BTreeMap<ArtifactRole, ArtifactBlob>,
}

impl ArtifactBundle {
    pub fn new(blobs: BTreeMap<ArtifactRole, ArtifactBlob>) -> Self {
        Self { blobs }
    }

    pub fn get(&self, role: ArtifactRole) -> Option<&ArtifactBlob> {
        self.blobs.get(&role)
    }

    pub fn contains(&self, role: ArtifactRole) -> bool {
        self.blobs.contains_key(&role)
    }

    /// Roles present in the bundle, in role order.
    pub fn roles(&self) -> Vec<ArtifactRole> {
        self.blobs.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArtifactRole, &ArtifactBlob)> {
        self.blobs.iter().map(|(role, blob)| (*role, blob))
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Sum of all blob sizes in bytes.
    pub fn total_bytes(&self) -> usize {
        self.blobs.values().map(ArtifactBlob::len).sum()
    }

    /// A new bundle holding only `roles`. Roles absent here are skipped.
    pub fn select(&self, roles: &[ArtifactRole]) -> ArtifactBundle {
        let blobs = self
            .blobs
            .iter()
            .filter(|(role, _)| roles.contains(role))
            .map(|(role, blob)| (*role, blob.clone()))
            .collect();
        ArtifactBundle { blobs }
    }
}
