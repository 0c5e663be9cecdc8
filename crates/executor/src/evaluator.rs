//! Evaluation backends.
//!
//! The executor never runs models itself. An [`Evaluator`] turns an
//! artifact bundle into labelled predictions over the private dataset;
//! scoring and anonymisation happen afterwards in the runner.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fedeval_core::artifact::ArtifactBundle;

use crate::metrics::LabeledPrediction;

/// Error type for evaluator backends.
#[derive(Debug, thiserror::Error)]
pub enum EvaluatorError {
    #[error("No evaluator command configured")]
    NotConfigured,

    #[error("Dataset not found: {0}")]
    DatasetMissing(String),

    #[error("Evaluator could not be started: {0}")]
    Spawn(std::io::Error),

    #[error("Evaluator failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to parse evaluator output: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Produce predictions for `bundle` against the dataset.
    async fn evaluate(
        &self,
        job_id: &str,
        bundle: &ArtifactBundle,
    ) -> Result<Vec<LabeledPrediction>, EvaluatorError>;
}

/// Stand-in used when no command is configured. Every job fails.
pub struct UnconfiguredEvaluator;

#[async_trait]
impl Evaluator for UnconfiguredEvaluator {
    async fn evaluate(
        &self,
        _job_id: &str,
        _bundle: &ArtifactBundle,
    ) -> Result<Vec<LabeledPrediction>, EvaluatorError> {
        Err(EvaluatorError::NotConfigured)
    }
}

/* --------------------------------------------------------------------------
External command
-------------------------------------------------------------------------- */

/// Runs an external program once per job.
///
/// The bundle is written to `{work_dir}/{job_id}/{role}/{file_name}`, one
/// subdirectory per role so uploads sharing a base name stay apart. A file
/// name with no usable base falls back to the role name. The program is
/// invoked as
/// `<command...> <bundle_dir> <dataset_path>` and must print a JSON array
/// of `{"prediction": .., "label": ..}` objects on stdout. The job
/// directory is removed afterwards.
pub struct CommandEvaluator {
    program: String,
    args: Vec<String>,
    dataset_path: PathBuf,
    work_dir: PathBuf,
}

impl CommandEvaluator {
    /// Build from a whitespace-separated command line. Returns `None` for
    /// a blank command.
    pub fn from_command_line(
        command: &str,
        dataset_path: impl Into<PathBuf>,
        work_dir: impl Into<PathBuf>,
    ) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            dataset_path: dataset_path.into(),
            work_dir: work_dir.into(),
        })
    }

    async fn write_bundle(&self, dir: &Path, bundle: &ArtifactBundle) -> Result<(), EvaluatorError> {
        tokio::fs::create_dir_all(dir).await?;
        for (role, blob) in bundle.iter() {
            let role_dir = dir.join(role.as_str());
            tokio::fs::create_dir_all(&role_dir).await?;
            let name = safe_file_name(&blob.file_name).unwrap_or(role.as_str());
            tokio::fs::write(role_dir.join(name), &blob.data).await?;
        }
        Ok(())
    }

    async fn run(&self, bundle_dir: &Path) -> Result<Vec<LabeledPrediction>, EvaluatorError> {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(bundle_dir)
            .arg(&self.dataset_path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(EvaluatorError::Spawn)?;

        if !output.status.success() {
            return Err(EvaluatorError::ExecutionFailed {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str::<Vec<LabeledPrediction>>(stdout.trim())
            .map_err(|e| EvaluatorError::ParseError(format!("{e}: {stdout}")))
    }
}

#[async_trait]
impl Evaluator for CommandEvaluator {
    async fn evaluate(
        &self,
        job_id: &str,
        bundle: &ArtifactBundle,
    ) -> Result<Vec<LabeledPrediction>, EvaluatorError> {
        if !tokio::fs::try_exists(&self.dataset_path).await.unwrap_or(false) {
            return Err(EvaluatorError::DatasetMissing(
                self.dataset_path.display().to_string(),
            ));
        }

        let bundle_dir = self.work_dir.join(job_id);
        let outcome = match self.write_bundle(&bundle_dir, bundle).await {
            Ok(()) => {
                tracing::debug!(
                    job_id,
                    program = %self.program,
                    bundle_dir = %bundle_dir.display(),
                    "Running evaluator",
                );
                self.run(&bundle_dir).await
            }
            Err(e) => Err(e),
        };

        remove_work_dir(job_id, &bundle_dir).await;
        outcome
    }
}

async fn remove_work_dir(job_id: &str, dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(job_id, error = %e, "Failed to remove job work directory"),
    }
}

/// Last path component of an uploaded file name, if it is a plain name.
fn safe_file_name(name: &str) -> Option<&str> {
    let base = name.rsplit(['/', '\\']).next()?;
    match base {
        "" | "." | ".." => None,
        b => Some(b),
    }
}
