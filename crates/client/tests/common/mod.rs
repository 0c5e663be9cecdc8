#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fedeval_client::executor::EvaluationExecutor;
use fedeval_client::tracker::TrackingListener;
use fedeval_core::artifact::{ArtifactBundle, ArtifactRole};
use fedeval_core::error::EvalError;
use fedeval_core::job::{EvaluationResult, JobState};
use fedeval_core::types::BundleId;
use fedeval_core::wire::UploadResponse;
use tokio::sync::Notify;

/// In-memory [`EvaluationExecutor`] that replays scripted answers and
/// counts every call.
pub struct ScriptedExecutor {
    upload: Mutex<Result<UploadResponse, EvalError>>,
    uploaded: Mutex<Vec<ArtifactBundle>>,
    job_ids: Mutex<VecDeque<String>>,
    create_error: Mutex<Option<EvalError>>,
    created: Mutex<Vec<(BundleId, Vec<ArtifactRole>)>>,
    statuses: Mutex<VecDeque<Result<JobState, EvalError>>>,
    last_status: Mutex<JobState>,
    results: Mutex<HashMap<String, Result<EvaluationResult, EvalError>>>,
    /// When set, every status call signals `status_started` and then
    /// waits for `release_status` before answering.
    gated: bool,
    pub status_started: Notify,
    pub release_status: Notify,
    pub upload_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub result_calls: AtomicUsize,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self {
            upload: Mutex::new(Ok(UploadResponse {
                bundle_id: "bundle-1".into(),
                accepted_roles: vec![ArtifactRole::Config, ArtifactRole::Weights],
            })),
            uploaded: Mutex::new(Vec::new()),
            job_ids: Mutex::new(VecDeque::new()),
            create_error: Mutex::new(None),
            created: Mutex::new(Vec::new()),
            statuses: Mutex::new(VecDeque::new()),
            last_status: Mutex::new(JobState::Pending),
            results: Mutex::new(HashMap::new()),
            gated: false,
            status_started: Notify::new(),
            release_status: Notify::new(),
            upload_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            result_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_upload(self, response: Result<UploadResponse, EvalError>) -> Self {
        *self.upload.lock().unwrap() = response;
        self
    }

    pub fn with_job_ids(self, ids: &[&str]) -> Self {
        *self.job_ids.lock().unwrap() = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_create_error(self, error: EvalError) -> Self {
        *self.create_error.lock().unwrap() = Some(error);
        self
    }

    /// Status answers in order. Once exhausted, the last state is
    /// repeated.
    pub fn with_statuses(self, statuses: Vec<Result<JobState, EvalError>>) -> Self {
        *self.statuses.lock().unwrap() = statuses.into();
        self
    }

    pub fn with_result(self, job_id: &str, result: Result<EvaluationResult, EvalError>) -> Self {
        self.results
            .lock()
            .unwrap()
            .insert(job_id.to_string(), result);
        self
    }

    pub fn gated(mut self) -> Self {
        self.gated = true;
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn uploaded(&self) -> Vec<ArtifactBundle> {
        self.uploaded.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<(BundleId, Vec<ArtifactRole>)> {
        self.created.lock().unwrap().clone()
    }

    pub fn status_count(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EvaluationExecutor for ScriptedExecutor {
    async fn upload_bundle(&self, bundle: &ArtifactBundle) -> Result<UploadResponse, EvalError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.uploaded.lock().unwrap().push(bundle.clone());
        self.upload.lock().unwrap().clone()
    }

    async fn create_job(
        &self,
        bundle_id: &BundleId,
        accepted_roles: &[ArtifactRole],
    ) -> Result<String, EvalError> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.create_error.lock().unwrap().clone() {
            return Err(e);
        }
        self.created
            .lock()
            .unwrap()
            .push((bundle_id.clone(), accepted_roles.to_vec()));
        Ok(self
            .job_ids
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| format!("job-{}", n + 1)))
    }

    async fn job_status(&self, _job_id: &str) -> Result<JobState, EvalError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.gated {
            self.status_started.notify_one();
            self.release_status.notified().await;
        }
        let next = self.statuses.lock().unwrap().pop_front();
        match next {
            Some(Ok(state)) => {
                *self.last_status.lock().unwrap() = state;
                Ok(state)
            }
            Some(Err(e)) => Err(e),
            None => Ok(*self.last_status.lock().unwrap()),
        }
    }

    async fn job_result(&self, job_id: &str) -> Result<EvaluationResult, EvalError> {
        self.result_calls.fetch_add(1, Ordering::SeqCst);
        self.results
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .unwrap_or_else(|| Err(EvalError::NotFound(format!("No result for {job_id}"))))
    }
}

/// A listener event, in firing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Update(String, JobState),
    Terminal(String, JobState),
    TransportError(String),
}

/// Records every callback.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<Event>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<JobState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Update(_, s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn terminals(&self) -> Vec<JobState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Terminal(_, s) => Some(s),
                _ => None,
            })
            .collect()
    }
}

impl TrackingListener for RecordingListener {
    fn on_update(&self, job_id: &str, state: JobState) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Update(job_id.to_string(), state));
    }

    fn on_terminal(&self, job_id: &str, state: JobState) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Terminal(job_id.to_string(), state));
    }

    fn on_transport_error(&self, job_id: &str, _error: &EvalError) {
        self.events
            .lock()
            .unwrap()
            .push(Event::TransportError(job_id.to_string()));
    }
}

/// Upcast for constructors taking `Arc<dyn EvaluationExecutor>`.
pub fn as_dyn(executor: &Arc<ScriptedExecutor>) -> Arc<dyn EvaluationExecutor> {
    executor.clone()
}
