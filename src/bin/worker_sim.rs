//! Local stand-in for the external grading worker.
//!
//! Accepts submissions, serves status fetches, and pushes a callback to the
//! lifecycle service after a configurable delay. Useful for exercising the
//! poll and callback paths end to end without the real grading service.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{routing::get, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct SimConfig {
    #[serde(default = "default_bind_addr")]
    bind_addr: String,

    /// Callback endpoint of the lifecycle service; no callback is pushed
    /// when unset (poll-only mode).
    #[serde(default)]
    callback_url: Option<String>,

    /// Simulated grading time in milliseconds.
    #[serde(default = "default_delay_ms")]
    delay_ms: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:4000".to_string()
}

fn default_delay_ms() -> u64 {
    3000
}

#[derive(Clone, Serialize)]
struct SimJobState {
    status: String,
    result: Option<serde_json::Value>,
    error: Option<String>,
}

#[derive(Clone)]
struct SimState {
    jobs: Arc<Mutex<HashMap<String, SimJobState>>>,
    callback_url: Option<String>,
    delay: Duration,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct SubmitBody {
    artifact_ref: String,
    #[serde(default)]
    #[allow(dead_code)]
    metadata: serde_json::Value,
}

#[derive(Serialize)]
struct SubmitReply {
    job_id: String,
    accepted: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    dotenvy::dotenv().ok();
    let config: SimConfig =
        envy::prefixed("SIM_").from_env().expect("Failed to load simulator configuration");

    tracing::info!(
        bind_addr = %config.bind_addr,
        delay_ms = config.delay_ms,
        "Starting grading worker simulator"
    );

    let state = SimState {
        jobs: Arc::new(Mutex::new(HashMap::new())),
        callback_url: config.callback_url.clone(),
        delay: Duration::from_millis(config.delay_ms),
        http: reqwest::Client::new(),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/v1/jobs", post(submit_job))
        .route("/api/v1/jobs/{job_id}", get(job_status))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind simulator address");

    axum::serve(listener, app).await.expect("Simulator error");
}

async fn submit_job(
    State(state): State<SimState>,
    Json(body): Json<SubmitBody>,
) -> (StatusCode, Json<SubmitReply>) {
    let job_id = format!("sim-{}", Uuid::new_v4());

    state.jobs.lock().unwrap().insert(
        job_id.clone(),
        SimJobState {
            status: "processing".to_string(),
            result: None,
            error: None,
        },
    );

    tracing::info!(job_id = %job_id, artifact_ref = %body.artifact_ref, "Accepted simulated job");

    tokio::spawn(finish_job(state.clone(), job_id.clone()));

    (
        StatusCode::ACCEPTED,
        Json(SubmitReply {
            job_id,
            accepted: true,
        }),
    )
}

async fn job_status(
    State(state): State<SimState>,
    Path(job_id): Path<String>,
) -> Result<Json<SimJobState>, StatusCode> {
    state
        .jobs
        .lock()
        .unwrap()
        .get(&job_id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Grade the job after the configured delay, then push the callback.
async fn finish_job(state: SimState, job_id: String) {
    sleep(state.delay).await;

    let result = serde_json::json!({
        "grade": "A",
        "category": "trading_card",
        "confidence": 0.92,
        "sub_scores": { "centering": 9.0, "corners": 8.5, "surface": 9.5 },
        "item_count": 1
    });

    if let Some(job) = state.jobs.lock().unwrap().get_mut(&job_id) {
        job.status = "completed".to_string();
        job.result = Some(result.clone());
    }

    let Some(callback_url) = &state.callback_url else {
        return;
    };

    let payload = serde_json::json!({
        "job_id": job_id,
        "status": "completed",
        "result": result
    });

    match state.http.post(callback_url).json(&payload).send().await {
        Ok(response) => {
            tracing::info!(
                job_id = %job_id,
                status = %response.status(),
                "Pushed grading callback"
            );
        }
        Err(e) => {
            tracing::warn!(job_id = %job_id, error = %e, "Callback delivery failed");
        }
    }
}
