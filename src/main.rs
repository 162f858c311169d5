mod app_state;
mod config;
mod db;
mod models;
mod routes;
mod services;
mod store;

use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use app_state::AppState;
use config::AppConfig;
use services::submitter::JobSubmitter;
use services::worker::HttpGradingWorker;
use store::{JobStore, PgBackend};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing grade-track server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!("grading_jobs_submitted", "Total grading jobs submitted");
    metrics::describe_counter!(
        "grading_submissions_failed",
        "Submissions the worker rejected or that failed in transit"
    );
    metrics::describe_counter!("grading_jobs_completed", "Grading jobs that completed");
    metrics::describe_counter!("grading_jobs_failed", "Grading jobs the worker failed");
    metrics::describe_counter!(
        "grading_updates_discarded",
        "Stale or duplicate updates discarded by the terminal-state guard"
    );

    // Initialize database connection pool
    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run database migrations
    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Initialize grading worker client
    tracing::info!(endpoint = %config.worker_endpoint, "Initializing grading worker client");
    let worker: Arc<dyn services::worker::GradingWorker> = Arc::new(HttpGradingWorker::new(
        config.worker_endpoint.clone(),
        config.worker_api_token.clone(),
        config.submit_timeout(),
        config.status_timeout(),
    ));

    // Job store: in-memory cache in front of Postgres
    let job_store = Arc::new(JobStore::new(PgBackend::new(db_pool.clone())));

    // Submitter with the deferred-cleanup handoff: once the worker has
    // accepted a job, the artifact reference is released to the surrounding
    // system, which owns retention.
    let submitter = JobSubmitter::new(job_store.clone(), worker.clone()).with_accepted_hook(
        Arc::new(|source_ref: &str| {
            tracing::info!(source_ref = %source_ref, "Artifact released for deferred cleanup");
        }),
    );

    // Create shared application state
    let state = AppState::new(db_pool, job_store, worker, submitter);

    // Build API routes
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/v1/grade", post(routes::grade::submit_grading))
        .route("/api/v1/grade/{job_id}", get(routes::grade::get_job_status))
        .route(
            "/api/v1/grade/callback",
            post(routes::grade::grading_callback),
        )
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive());

    tracing::info!("Starting grade-track on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
