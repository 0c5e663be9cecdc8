//! Last observed state per tracked job.
//!
//! Trackers write only their own job's entry; the
//! [`ResultRetriever`](crate::retriever::ResultRetriever) reads it to
//! refuse fetches for jobs not yet seen `completed`. Lock sections are
//! short and never span an `.await`.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use fedeval_core::job::JobState;
use fedeval_core::types::JobId;

#[derive(Debug, Default)]
pub struct StatusBoard {
    states: RwLock<HashMap<JobId, JobState>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last observed state, or [`JobState::Unknown`] for untracked jobs.
    pub fn get(&self, job_id: &str) -> JobState {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_id)
            .copied()
            .unwrap_or_default()
    }

    pub fn record(&self, job_id: &str, state: JobState) {
        self.states
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job_id.to_string(), state);
    }

    pub fn len(&self) -> usize {
        self.states.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
