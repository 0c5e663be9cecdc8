use std::path::PathBuf;
use std::time::Duration;

use fedeval_core::artifact::{parse_role_list, ArtifactRole};

/// Default per-blob upload limit: 512 MiB.
pub const DEFAULT_MAX_BLOB_BYTES: usize = 512 * 1024 * 1024;

/// Upload file extensions accepted when `ALLOWED_EXTENSIONS` is unset.
pub const DEFAULT_ALLOWED_EXTENSIONS: &str = "json,bin,txt,safetensors";

/// Configuration errors detected at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is invalid: {message}")]
    Invalid { var: &'static str, message: String },
}

/// Executor configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5001`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Roles every upload must carry.
    pub required_roles: Vec<ArtifactRole>,
    /// Roles kept on upload. Anything else is dropped silently.
    pub accepted_roles: Vec<ArtifactRole>,
    /// Largest single blob accepted on upload.
    pub max_blob_bytes: usize,
    /// Lowercase file extensions, without the dot, accepted on upload.
    pub allowed_extensions: Vec<String>,
    /// How long finished jobs and their results are kept.
    pub result_retention: Duration,
    /// How often the retention sweeper runs.
    pub retention_sweep: Duration,
    /// Evaluations allowed to run at once. Further jobs wait in `pending`.
    pub max_concurrent_jobs: usize,
    /// Private dataset handed to the evaluator command.
    pub dataset_path: PathBuf,
    /// External evaluator command line. `None` makes every job fail.
    pub evaluator_command: Option<String>,
    /// Root for per-job working directories.
    pub work_dir: PathBuf,
}

impl ExecutorConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `0.0.0.0`                  |
    /// | `PORT`                  | `5001`                     |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                       |
    /// | `REQUIRED_ROLES`        | `config,weights`           |
    /// | `ACCEPTED_ROLES`        | all roles                  |
    /// | `MAX_BLOB_BYTES`        | `536870912`                |
    /// | `ALLOWED_EXTENSIONS`    | `json,bin,txt,safetensors` |
    /// | `RESULT_RETENTION_SECS` | `3600`                     |
    /// | `RETENTION_SWEEP_SECS`  | `60`                       |
    /// | `MAX_CONCURRENT_JOBS`   | `1`                        |
    /// | `DATASET_PATH`          | `datasets/evaluation.json` |
    /// | `EVALUATOR_COMMAND`     | unset                      |
    /// | `WORK_DIR`              | `received_models`          |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_number(&lookup, "PORT", 5001)?;
        let request_timeout_secs: u64 = parse_number(&lookup, "REQUEST_TIMEOUT_SECS", 30)?;

        let accepted_roles = match lookup("ACCEPTED_ROLES") {
            Some(raw) => parse_roles("ACCEPTED_ROLES", &raw)?,
            None => ArtifactRole::ALL.to_vec(),
        };
        let required_roles = match lookup("REQUIRED_ROLES") {
            Some(raw) => parse_roles("REQUIRED_ROLES", &raw)?,
            None => vec![ArtifactRole::Config, ArtifactRole::Weights],
        };
        if let Some(role) = required_roles.iter().find(|r| !accepted_roles.contains(r)) {
            return Err(ConfigError::Invalid {
                var: "REQUIRED_ROLES",
                message: format!("'{role}' is required but not in ACCEPTED_ROLES"),
            });
        }

        let max_blob_bytes: usize = parse_number(&lookup, "MAX_BLOB_BYTES", DEFAULT_MAX_BLOB_BYTES)?;
        let allowed_extensions = parse_extensions(
            &lookup("ALLOWED_EXTENSIONS").unwrap_or_else(|| DEFAULT_ALLOWED_EXTENSIONS.into()),
        )?;
        let retention_secs: u64 = parse_number(&lookup, "RESULT_RETENTION_SECS", 3600)?;
        let sweep_secs: u64 = parse_number(&lookup, "RETENTION_SWEEP_SECS", 60)?;
        if sweep_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "RETENTION_SWEEP_SECS",
                message: "must be greater than zero".into(),
            });
        }
        let max_concurrent_jobs: usize = parse_number(&lookup, "MAX_CONCURRENT_JOBS", 1)?;
        if max_concurrent_jobs == 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_CONCURRENT_JOBS",
                message: "must be greater than zero".into(),
            });
        }

        let dataset_path = PathBuf::from(
            lookup("DATASET_PATH").unwrap_or_else(|| "datasets/evaluation.json".into()),
        );
        let evaluator_command = lookup("EVALUATOR_COMMAND").filter(|c| !c.trim().is_empty());
        let work_dir = PathBuf::from(lookup("WORK_DIR").unwrap_or_else(|| "received_models".into()));

        Ok(Self {
            host,
            port,
            request_timeout_secs,
            required_roles,
            accepted_roles,
            max_blob_bytes,
            allowed_extensions,
            result_retention: Duration::from_secs(retention_secs),
            retention_sweep: Duration::from_secs(sweep_secs),
            max_concurrent_jobs,
            dataset_path,
            evaluator_command,
            work_dir,
        })
    }

    /// Request body ceiling for `POST /bundles`: one maximal blob per
    /// accepted role plus room for multipart framing.
    pub fn max_upload_bytes(&self) -> usize {
        self.max_blob_bytes
            .saturating_mul(self.accepted_roles.len().max(1))
            .saturating_add(1024 * 1024)
    }
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            message: format!("'{raw}': {e}"),
        }),
        None => Ok(default),
    }
}

fn parse_roles(var: &'static str, raw: &str) -> Result<Vec<ArtifactRole>, ConfigError> {
    parse_role_list(raw).map_err(|e| ConfigError::Invalid {
        var,
        message: e.to_string(),
    })
}

/// Comma-separated extensions, normalised to lowercase without a dot.
fn parse_extensions(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut extensions: Vec<String> = Vec::new();
    for ext in raw.split(',') {
        let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        if !ext.is_empty() && !extensions.contains(&ext) {
            extensions.push(ext);
        }
    }
    if extensions.is_empty() {
        return Err(ConfigError::Invalid {
            var: "ALLOWED_EXTENSIONS",
            message: "at least one extension is required".into(),
        });
    }
    Ok(extensions)
}
