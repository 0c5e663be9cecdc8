//! Evaluation job state machine.
//!
//! Job state only moves forward:
//!
//! ```text
//! unknown -> pending -> running -> completed
//!    |          |          \-----> failed
//!    |          \-> completed | failed
//!    \-> running | completed | failed | not_found
//! ```
//!
//! `unknown` is the local state before the first successful sample and
//! is never reported by an executor. `completed`, `failed` and
//! `not_found` are terminal.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::types::{BundleId, JobId, Timestamp};

/// Opaque structured payload produced when a job completes.
pub type EvaluationResult = serde_json::Value;

/* --------------------------------------------------------------------------
States
-------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Unknown,
    Pending,
    Running,
    Completed,
    Failed,
    NotFound,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Unknown => "unknown",
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::NotFound => "not_found",
        }
    }

    /// `completed`, `failed` and `not_found` end tracking.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::NotFound
        )
    }

    /// Position in the lifecycle ordering. Terminal states share a rank.
    pub fn rank(self) -> u8 {
        match self {
            JobState::Unknown => 0,
            JobState::Pending => 1,
            JobState::Running => 2,
            JobState::Completed | JobState::Failed | JobState::NotFound => 3,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/* --------------------------------------------------------------------------
Transitions
-------------------------------------------------------------------------- */

/// States reachable in one step from `from`. Terminal states return an
/// empty slice.
pub fn valid_transitions(from: JobState) -> &'static [JobState] {
    match from {
        JobState::Unknown => &[
            JobState::Pending,
            JobState::Running,
            JobState::Completed,
            JobState::Failed,
            JobState::NotFound,
        ],
        JobState::Pending => &[JobState::Running, JobState::Completed, JobState::Failed],
        JobState::Running => &[JobState::Completed, JobState::Failed],
        JobState::Completed | JobState::Failed | JobState::NotFound => &[],
    }
}

/// Check whether moving from `from` to `to` is a forward transition.
pub fn can_transition(from: JobState, to: JobState) -> bool {
    valid_transitions(from).contains(&to)
}

/// Validate an observed state against the previously observed one.
///
/// Observing the same non-`unknown` state again is not a transition and
/// is accepted. An executor never reports `unknown`.
pub fn validate_transition(job_id: &str, from: JobState, to: JobState) -> Result<(), EvalError> {
    if to != JobState::Unknown && (from == to || can_transition(from, to)) {
        Ok(())
    } else {
        Err(EvalError::ProtocolViolation {
            job_id: job_id.to_string(),
            from,
            to,
        })
    }
}

/* --------------------------------------------------------------------------
Job record
-------------------------------------------------------------------------- */

/// An evaluation job as held by the executor.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationJob {
    job_id: JobId,
    pub bundle_id: BundleId,
    state: JobState,
    pub created_at: Timestamp,
    /// Set when the job reaches a terminal state.
    pub finished_at: Option<Timestamp>,
    /// Failure description for `failed` jobs.
    pub error: Option<String>,
    result: Option<EvaluationResult>,
}

impl EvaluationJob {
    /// A freshly accepted job in `pending`.
    pub fn new(job_id: JobId, bundle_id: BundleId) -> Self {
        Self {
            job_id,
            bundle_id,
            state: JobState::Pending,
            created_at: chrono::Utc::now(),
            finished_at: None,
            error: None,
            result: None,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Present only once the job is `completed`.
    pub fn result(&self) -> Option<&EvaluationResult> {
        self.result.as_ref()
    }

    /// Move to `running`.
    pub fn start(&mut self) -> Result<(), EvalError> {
        self.advance(JobState::Running)
    }

    /// Move to `completed`, recording the result exactly once.
    pub fn complete(&mut self, result: EvaluationResult) -> Result<(), EvalError> {
        self.advance(JobState::Completed)?;
        self.result = Some(result);
        Ok(())
    }

    /// Move to `failed` with a description of what went wrong.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), EvalError> {
        self.advance(JobState::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }

    fn advance(&mut self, to: JobState) -> Result<(), EvalError> {
        if !can_transition(self.state, to) {
            return Err(EvalError::ProtocolViolation {
                job_id: self.job_id.clone(),
                from: self.state,
                to,
            });
        }
        self.state = to;
        if to.is_terminal() {
            self.finished_at = Some(chrono::Utc::now());
        }
        Ok(())
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    // -----------------------------------------------------------------------
    // Valid transitions
    // -----------------------------------------------------------------------

    #[test]
    fn unknown_reaches_every_reported_state() {
        for to in [
            JobState::Pending,
            JobState::Running,
            JobState::Completed,
            JobState::Failed,
            JobState::NotFound,
        ] {
            assert!(can_transition(JobState::Unknown, to), "unknown -> {to}");
        }
    }

    #[test]
    fn pending_to_running() {
        assert!(can_transition(JobState::Pending, JobState::Running));
    }

    #[test]
    fn pending_skips_to_terminal() {
        assert!(can_transition(JobState::Pending, JobState::Completed));
        assert!(can_transition(JobState::Pending, JobState::Failed));
    }

    #[test]
    fn running_to_terminal() {
        assert!(can_transition(JobState::Running, JobState::Completed));
        assert!(can_transition(JobState::Running, JobState::Failed));
    }

    // -----------------------------------------------------------------------
    // Invalid transitions
    // -----------------------------------------------------------------------

    #[test]
    fn backward_moves_are_rejected() {
        assert!(!can_transition(JobState::Running, JobState::Pending));
        assert!(!can_transition(JobState::Completed, JobState::Running));
        assert!(!can_transition(JobState::Failed, JobState::Pending));
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        assert!(valid_transitions(JobState::Completed).is_empty());
        assert!(valid_transitions(JobState::Failed).is_empty());
        assert!(valid_transitions(JobState::NotFound).is_empty());
    }

    #[test]
    fn not_found_only_from_unknown() {
        assert!(!can_transition(JobState::Pending, JobState::NotFound));
        assert!(!can_transition(JobState::Running, JobState::NotFound));
    }

    #[test]
    fn validate_accepts_repeated_state() {
        assert!(validate_transition("job-1", JobState::Pending, JobState::Pending).is_ok());
        assert!(validate_transition("job-1", JobState::Running, JobState::Running).is_ok());
    }

    #[test]
    fn validate_rejects_reported_unknown() {
        assert_matches!(
            validate_transition("job-1", JobState::Unknown, JobState::Unknown),
            Err(EvalError::ProtocolViolation { .. })
        );
    }

    #[test]
    fn validate_reports_both_states() {
        let err = validate_transition("job-1", JobState::Completed, JobState::Running).unwrap_err();
        assert_eq!(
            err,
            EvalError::ProtocolViolation {
                job_id: "job-1".into(),
                from: JobState::Completed,
                to: JobState::Running,
            }
        );
    }

    #[test]
    fn rank_orders_lifecycle() {
        assert!(JobState::Unknown.rank() < JobState::Pending.rank());
        assert!(JobState::Pending.rank() < JobState::Running.rank());
        assert_eq!(JobState::Completed.rank(), JobState::NotFound.rank());
    }

    // -----------------------------------------------------------------------
    // Job record
    // -----------------------------------------------------------------------

    #[test]
    fn job_records_result_on_completion() {
        let mut job = EvaluationJob::new("job-1".into(), "bundle-1".into());
        assert_eq!(job.state(), JobState::Pending);
        assert!(job.result().is_none());

        job.start().unwrap();
        job.complete(serde_json::json!({ "accuracy": 0.91 })).unwrap();

        assert_eq!(job.state(), JobState::Completed);
        assert_eq!(job.result().unwrap()["accuracy"], 0.91);
        assert!(job.finished_at.is_some());
    }

    #[test]
    fn completed_job_cannot_complete_again() {
        let mut job = EvaluationJob::new("job-1".into(), "bundle-1".into());
        job.complete(serde_json::json!({ "accuracy": 1.0 })).unwrap();

        let second = job.complete(serde_json::json!({ "accuracy": 0.0 }));
        assert_matches!(second, Err(EvalError::ProtocolViolation { .. }));
        assert_eq!(job.result().unwrap()["accuracy"], 1.0);
    }

    #[test]
    fn failed_job_keeps_error_and_has_no_result() {
        let mut job = EvaluationJob::new("job-2".into(), "bundle-1".into());
        job.start().unwrap();
        job.fail("evaluator exited with status 1").unwrap();

        assert_eq!(job.state(), JobState::Failed);
        assert_eq!(job.error.as_deref(), Some("evaluator exited with status 1"));
        assert!(job.result().is_none());
        assert!(job.start().is_err());
    }
}
