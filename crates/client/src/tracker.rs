//! Cooperative, cancellable polling of job state.
//!
//! A [`TrackingSession`] owns the observed state of one job and applies
//! samples to it one at a time, rejecting backward moves. Tests can
//! drive it directly with [`TrackingSession::step`].
//!
//! [`JobStatusTracker::track`] wraps a session in a spawned poll loop:
//! sample, apply, sleep `interval`, repeat. The loop never overlaps
//! samples for a job and stops on the first terminal state, on a
//! protocol violation, or when the [`TrackingHandle`] is cancelled.
//! A sample still in flight when cancellation arrives is dropped
//! without firing any callback.

use std::sync::Arc;
use std::time::Duration;

use fedeval_core::error::EvalError;
use fedeval_core::job::{validate_transition, JobState};
use fedeval_core::types::JobId;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::board::StatusBoard;
use crate::executor::EvaluationExecutor;

/* --------------------------------------------------------------------------
Listener
-------------------------------------------------------------------------- */

/// Callbacks fired by a tracking session.
///
/// Called synchronously from the poll loop, so implementations should
/// not block.
pub trait TrackingListener: Send + Sync {
    /// A sample yielded a state (terminal samples included).
    fn on_update(&self, job_id: &str, state: JobState);

    /// The job reached a terminal state. Fires exactly once per session.
    fn on_terminal(&self, job_id: &str, state: JobState);

    /// A sample failed transiently. Polling continues.
    fn on_transport_error(&self, job_id: &str, error: &EvalError) {
        let _ = (job_id, error);
    }
}

/* --------------------------------------------------------------------------
Session
-------------------------------------------------------------------------- */

/// Result of applying one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Non-terminal state observed; keep polling.
    Observed(JobState),
    /// Terminal state observed; the session is finished.
    Terminal(JobState),
    /// The session stopped on an error without reaching a terminal
    /// state. Carries the last accepted state.
    Halted(JobState),
    /// The sample could not be delivered; keep polling.
    TransportFailed,
}

/// Final result of a spawned tracking loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingOutcome {
    Finished(JobState),
    Cancelled,
}

pub struct TrackingSession {
    job_id: JobId,
    executor: Arc<dyn EvaluationExecutor>,
    board: Arc<StatusBoard>,
    listener: Arc<dyn TrackingListener>,
    state: JobState,
    halted: bool,
    samples: u64,
}

impl std::fmt::Debug for TrackingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingSession")
            .field("job_id", &self.job_id)
            .field("state", &self.state)
            .field("halted", &self.halted)
            .field("samples", &self.samples)
            .finish_non_exhaustive()
    }
}

impl TrackingSession {
    /// Start a session in [`JobState::Unknown`]. An empty `job_id` fails
    /// with `NoJob`.
    pub fn new(
        job_id: impl Into<JobId>,
        executor: Arc<dyn EvaluationExecutor>,
        board: Arc<StatusBoard>,
        listener: Arc<dyn TrackingListener>,
    ) -> Result<Self, EvalError> {
        let job_id = job_id.into();
        if job_id.trim().is_empty() {
            return Err(EvalError::NoJob);
        }
        Ok(Self {
            job_id,
            executor,
            board,
            listener,
            state: JobState::Unknown,
            halted: false,
            samples: 0,
        })
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Last state accepted by the session.
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Whether the session has stopped (terminal state or violation).
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Samples requested so far.
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Take one sample and apply it.
    ///
    /// Once halted, returns `Terminal` or `Halted` with the last accepted
    /// state, without contacting the executor or firing callbacks.
    pub async fn step(&mut self) -> Result<Step, EvalError> {
        if self.halted {
            return Ok(if self.state.is_terminal() {
                Step::Terminal(self.state)
            } else {
                Step::Halted(self.state)
            });
        }
        let sample = self.sample().await;
        self.apply(sample)
    }

    async fn sample(&self) -> Result<JobState, EvalError> {
        self.executor.job_status(&self.job_id).await
    }

    fn apply(&mut self, sample: Result<JobState, EvalError>) -> Result<Step, EvalError> {
        self.samples += 1;

        let observed = match sample {
            Ok(state) => state,
            Err(e) if e.is_transient() => {
                tracing::warn!(job_id = %self.job_id, error = %e, "Status sample failed, will retry");
                self.listener.on_transport_error(&self.job_id, &e);
                return Ok(Step::TransportFailed);
            }
            Err(e) => {
                tracing::error!(job_id = %self.job_id, error = %e, "Status sample failed");
                self.halted = true;
                return Err(e);
            }
        };

        if let Err(e) = validate_transition(&self.job_id, self.state, observed) {
            tracing::error!(
                job_id = %self.job_id,
                from = %self.state,
                to = %observed,
                "Job state moved backward, halting tracker",
            );
            self.halted = true;
            return Err(e);
        }

        if observed != self.state {
            tracing::debug!(job_id = %self.job_id, from = %self.state, to = %observed, "Job state changed");
        }
        self.state = observed;
        self.board.record(&self.job_id, observed);
        self.listener.on_update(&self.job_id, observed);

        if observed.is_terminal() {
            self.halted = true;
            tracing::info!(job_id = %self.job_id, state = %observed, "Job reached terminal state");
            self.listener.on_terminal(&self.job_id, observed);
            return Ok(Step::Terminal(observed));
        }

        Ok(Step::Observed(observed))
    }
}

/* --------------------------------------------------------------------------
Tracker
-------------------------------------------------------------------------- */

/// Spawns independent poll loops, one per job id.
pub struct JobStatusTracker {
    executor: Arc<dyn EvaluationExecutor>,
    board: Arc<StatusBoard>,
}

impl JobStatusTracker {
    pub fn new(executor: Arc<dyn EvaluationExecutor>, board: Arc<StatusBoard>) -> Self {
        Self { executor, board }
    }

    pub fn board(&self) -> Arc<StatusBoard> {
        Arc::clone(&self.board)
    }

    /// Build a session for manual stepping.
    pub fn session(
        &self,
        job_id: &str,
        listener: Arc<dyn TrackingListener>,
    ) -> Result<TrackingSession, EvalError> {
        TrackingSession::new(
            job_id,
            Arc::clone(&self.executor),
            Arc::clone(&self.board),
            listener,
        )
    }

    /// Begin sampling `job_id` every `interval`.
    ///
    /// The first sample is taken immediately. An empty `job_id` fails
    /// with `NoJob` and a zero interval with `InvalidRequest`, both
    /// before any network call.
    pub fn track(
        &self,
        job_id: &str,
        interval: Duration,
        listener: Arc<dyn TrackingListener>,
    ) -> Result<TrackingHandle, EvalError> {
        let session = self.session(job_id, listener)?;
        if interval.is_zero() {
            return Err(EvalError::InvalidRequest(
                "Polling interval must be greater than zero".to_string(),
            ));
        }

        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        let job_id = session.job_id().to_string();

        tracing::info!(job_id = %job_id, interval_ms = interval.as_millis() as u64, "Tracking job");

        let task = tokio::spawn(run_tracking(session, interval, cancel_clone));

        Ok(TrackingHandle {
            job_id,
            cancel,
            task,
        })
    }
}

/// Handle to a spawned poll loop.
///
/// Dropping the handle does not stop the loop; call
/// [`cancel`](Self::cancel).
pub struct TrackingHandle {
    job_id: JobId,
    cancel: CancellationToken,
    task: JoinHandle<Result<TrackingOutcome, EvalError>>,
}

impl std::fmt::Debug for TrackingHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingHandle")
            .field("job_id", &self.job_id)
            .field("cancel", &self.cancel)
            .field("task", &self.task)
            .finish()
    }
}

impl TrackingHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Stop polling. No network call is issued and no callback fires
    /// once the loop observes the cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this loop, for handing to signal handlers.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the loop to end.
    ///
    /// Returns the terminal state, `Cancelled`, or the protocol
    /// violation that halted the loop.
    pub async fn join(self) -> Result<TrackingOutcome, EvalError> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Ok(TrackingOutcome::Cancelled),
        }
    }
}

/// Poll loop: sample -> apply -> sleep, until terminal or cancelled.
async fn run_tracking(
    mut session: TrackingSession,
    interval: Duration,
    cancel: CancellationToken,
) -> Result<TrackingOutcome, EvalError> {
    loop {
        let sample = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(cancelled(&session)),
            sample = session.sample() => sample,
        };

        // The sample may resolve in the same poll as the cancellation.
        if cancel.is_cancelled() {
            return Ok(cancelled(&session));
        }

        if let Step::Terminal(state) = session.apply(sample)? {
            return Ok(TrackingOutcome::Finished(state));
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(cancelled(&session)),
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

fn cancelled(session: &TrackingSession) -> TrackingOutcome {
    tracing::info!(
        job_id = %session.job_id(),
        state = %session.state(),
        samples = session.samples(),
        "Tracking cancelled",
    );
    TrackingOutcome::Cancelled
}
