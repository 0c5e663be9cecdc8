//! `fedeval-developer` -- submit a model for federated evaluation.
//!
//! Stages the model artifacts found in a directory, uploads them to the
//! data owner's executor, starts an evaluation job, tracks it to a
//! terminal state and prints the result JSON on stdout.
//!
//! # Environment variables
//!
//! | Variable            | Required | Default                 | Description                     |
//! |---------------------|----------|-------------------------|---------------------------------|
//! | `EXECUTOR_URL`      | no       | `http://localhost:5001` | Data-owner executor base URL    |
//! | `ARTIFACT_DIR`      | no       | `.`                     | Directory holding model files   |
//! | `POLL_INTERVAL_MS`  | no       | `5000`                  | Milliseconds between samples    |
//! | `HTTP_TIMEOUT_SECS` | no       | `30`                    | Per-request timeout             |

use std::sync::Arc;

use fedeval_client::board::StatusBoard;
use fedeval_client::config::ClientConfig;
use fedeval_client::executor::EvaluationExecutor;
use fedeval_client::http::HttpExecutor;
use fedeval_client::initiator::JobInitiator;
use fedeval_client::retriever::ResultRetriever;
use fedeval_client::submission::SubmissionManager;
use fedeval_client::tracker::{JobStatusTracker, TrackingListener, TrackingOutcome};
use fedeval_core::error::EvalError;
use fedeval_core::job::JobState;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Logs every tracker callback.
struct LogListener;

impl TrackingListener for LogListener {
    fn on_update(&self, job_id: &str, state: JobState) {
        tracing::info!(job_id, state = %state, "Evaluation status");
    }

    fn on_terminal(&self, job_id: &str, state: JobState) {
        tracing::info!(job_id, state = %state, "Evaluation finished");
    }

    fn on_transport_error(&self, job_id: &str, error: &EvalError) {
        tracing::warn!(job_id, error = %error, "Error checking status");
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fedeval_client=info,fedeval_developer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ClientConfig::from_env();
    tracing::info!(
        executor_url = %config.executor_url,
        artifact_dir = %config.artifact_dir.display(),
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        "Starting fedeval-developer",
    );

    match run(&config).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            tracing::error!(error = %e, "Evaluation did not complete");
            std::process::exit(1);
        }
    }
}

/// Run the pipeline. `Ok(false)` means the job ended without a result
/// and the outcome has already been logged.
async fn run(config: &ClientConfig) -> Result<bool, EvalError> {
    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .map_err(|e| EvalError::Transport(e.to_string()))?;
    let executor: Arc<dyn EvaluationExecutor> =
        Arc::new(HttpExecutor::with_client(http, config.executor_url.clone()));
    let board = Arc::new(StatusBoard::new());

    // --- Stage + submit ---
    let mut manager = SubmissionManager::new(Arc::clone(&executor));
    let staged = manager.stage_directory(&config.artifact_dir).await?;
    if staged.is_empty() {
        return Err(EvalError::InvalidRequest(format!(
            "No model artifacts found in {}",
            config.artifact_dir.display()
        )));
    }
    tracing::info!(roles = ?staged, "Artifacts staged");

    let bundle = manager.validate();
    let submission = manager.submit(&bundle).await?;

    // --- Initiate ---
    let initiator = JobInitiator::new(Arc::clone(&executor));
    let job_id = initiator.initiate_for(&submission).await?;
    tracing::info!(job_id = %job_id, "Evaluation initiated");

    // --- Track ---
    let tracker = JobStatusTracker::new(Arc::clone(&executor), Arc::clone(&board));
    let handle = tracker.track(&job_id, config.poll_interval, Arc::new(LogListener))?;

    let token = handle.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling tracking");
            token.cancel();
        }
    });

    if !has_result(&job_id, handle.join().await?) {
        return Ok(false);
    }

    // --- Fetch ---
    let retriever = ResultRetriever::new(executor, board);
    let result = retriever.fetch(&job_id).await?;
    let rendered = serde_json::to_string_pretty(&result).unwrap_or_else(|_| result.to_string());
    println!("{rendered}");

    Ok(true)
}

/// Whether tracking ended with a fetchable result. Other outcomes are
/// logged here.
fn has_result(job_id: &str, outcome: TrackingOutcome) -> bool {
    match outcome {
        TrackingOutcome::Finished(JobState::Completed) => true,
        TrackingOutcome::Finished(state) => {
            tracing::error!(job_id, state = %state, "Evaluation ended without a result");
            false
        }
        TrackingOutcome::Cancelled => {
            tracing::warn!(job_id, "Tracking cancelled before the job finished");
            false
        }
    }
}
