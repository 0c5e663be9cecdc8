#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use fedeval_core::artifact::ArtifactBundle;
use fedeval_core::job::JobState;
use fedeval_executor::config::ExecutorConfig;
use fedeval_executor::evaluator::{Evaluator, EvaluatorError};
use fedeval_executor::metrics::LabeledPrediction;
use fedeval_executor::router::{build_app_router, build_state_with};
use fedeval_executor::state::AppState;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::sync::Notify;
use tower::ServiceExt;

const BOUNDARY: &str = "fedeval-test-boundary";

/// Executor configuration with defaults, optionally overridden.
pub fn test_config(overrides: &[(&str, &str)]) -> ExecutorConfig {
    let pairs: Vec<(String, String)> = overrides
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ExecutorConfig::from_lookup(move |key| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    })
    .unwrap()
}

/// Build the router with the production middleware stack around `evaluator`.
pub fn build_test_app(config: ExecutorConfig, evaluator: Arc<dyn Evaluator>) -> (Router, AppState) {
    let state = build_state_with(config, evaluator);
    (build_app_router(state.clone()), state)
}

/* --------------------------------------------------------------------------
Evaluators
-------------------------------------------------------------------------- */

/// Returns fixed `(prediction, label)` pairs. When gated, each evaluation
/// waits for [`release`](Self::release) before answering.
pub struct FixedEvaluator {
    pairs: Vec<(i64, i64)>,
    gate: Option<Notify>,
}

impl FixedEvaluator {
    pub fn new(pairs: &[(i64, i64)]) -> Arc<Self> {
        Arc::new(Self {
            pairs: pairs.to_vec(),
            gate: None,
        })
    }

    pub fn gated(pairs: &[(i64, i64)]) -> Arc<Self> {
        Arc::new(Self {
            pairs: pairs.to_vec(),
            gate: Some(Notify::new()),
        })
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }
}

#[async_trait]
impl Evaluator for FixedEvaluator {
    async fn evaluate(
        &self,
        _job_id: &str,
        _bundle: &ArtifactBundle,
    ) -> Result<Vec<LabeledPrediction>, EvaluatorError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(self
            .pairs
            .iter()
            .map(|(p, l)| LabeledPrediction {
                prediction: json!(p),
                label: json!(l),
            })
            .collect())
    }
}

/* --------------------------------------------------------------------------
Requests
-------------------------------------------------------------------------- */

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    post_raw(app, uri, "application/json", body.to_string().into_bytes()).await
}

pub async fn post_raw(app: Router, uri: &str, content_type: &str, body: Vec<u8>) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", content_type)
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a multipart body with one part per `(name, file_name, data)`.
pub async fn post_multipart(app: Router, uri: &str, parts: &[(&str, &str, &[u8])]) -> Response<Body> {
    let mut body = Vec::new();
    for (name, file_name, data) in parts {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    post_raw(
        app,
        uri,
        &format!("multipart/form-data; boundary={BOUNDARY}"),
        body,
    )
    .await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Upload config + weights and return the new bundle id.
pub async fn upload_default_bundle(app: Router) -> String {
    let response = post_multipart(
        app,
        "/bundles",
        &[
            ("config", "config.json", &b"{\"layers\":2}"[..]),
            ("weights", "model.bin", &[1u8, 2, 3, 4][..]),
        ],
    )
    .await;
    assert_eq!(response.status(), 201);
    body_json(response).await["bundle_id"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Poll the store until `job_id` reaches `target`.
pub async fn wait_for_state(state: &AppState, job_id: &str, target: JobState) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let current = state.store.state(job_id).await;
        if current == target {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {job_id} stuck in {current}, expected {target}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
