//! Postgres-backed integration test for the job store and reconciler.
//!
//! Requires a running PostgreSQL instance configured via environment
//! variables (DATABASE_URL, WORKER_ENDPOINT).
//!
//! Run with: cargo test --test integration_test -- --ignored

use std::sync::Arc;

use grade_track::config::AppConfig;
use grade_track::db;
use grade_track::models::job::{GradeResult, GradingJob, JobStatus, JobUpdate};
use grade_track::services::reconciler;
use grade_track::store::{JobStore, PgBackend};

#[tokio::test]
#[ignore] // Run with: cargo test --test integration_test -- --ignored
async fn test_full_store_round_trip() {
    let config = AppConfig::from_env().expect("Failed to load config");

    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run migrations");

    let store = Arc::new(JobStore::new(PgBackend::new(db_pool)));

    // 1. Persist a freshly accepted job
    let mut job = GradingJob::new("integration/artifact-1");
    job.status = JobStatus::Pending;
    let external_id = format!("it-{}", job.id);
    job.external_job_id = Some(external_id.clone());

    store.insert(&job).await.expect("Failed to insert job");

    // 2. Read it back by local id
    let loaded = store
        .get(job.id)
        .await
        .expect("Failed to get job")
        .expect("Job not found");
    assert_eq!(loaded.status, JobStatus::Pending);
    assert_eq!(loaded.source_ref, "integration/artifact-1");
    assert_eq!(loaded.attempts, 0);

    // 3. Resolve the worker handle through the secondary index
    let resolved = store
        .resolve_external_id(&external_id)
        .await
        .expect("Failed to resolve external id");
    assert_eq!(resolved, Some(job.id));

    // 4. A non-terminal update moves only the side channel
    let observed = reconciler::apply_update(&store, job.id, JobUpdate::StillProcessing)
        .await
        .expect("Failed to apply update");
    assert_eq!(observed.status, JobStatus::Pending);
    assert!(observed.last_observed_at.is_some());
    assert_eq!(observed.attempts, 1);

    // 5. A terminal verdict finalizes the row
    let result = GradeResult {
        grade: "9.5".to_string(),
        category: Some("coin".to_string()),
        confidence: 0.88,
        sub_scores: Default::default(),
        item_count: 1,
    };
    let completed = reconciler::apply_update(
        &store,
        job.id,
        JobUpdate::Completed(result.clone()),
    )
    .await
    .expect("Failed to finalize job");
    assert_eq!(completed.status, JobStatus::Completed);
    assert_eq!(completed.result, Some(result.clone()));
    assert!(completed.completed_at.is_some());

    // 6. A late contradictory update is discarded, row unchanged
    let discarded = reconciler::apply_update(
        &store,
        job.id,
        JobUpdate::Failed {
            error: "late report".to_string(),
        },
    )
    .await
    .expect("Failed to apply late update");
    assert_eq!(discarded.status, JobStatus::Completed);
    assert_eq!(discarded.result, Some(result));
    assert!(discarded.last_error.is_none());
    assert_eq!(discarded.completed_at, completed.completed_at);
    assert_eq!(discarded.attempts, 3);

    // 7. The durable row survives a cold cache
    let cold = JobStore::new(PgBackend::new(
        db::init_pool(&config.database_url)
            .await
            .expect("Failed to reconnect"),
    ));
    let reread = cold
        .get(job.id)
        .await
        .expect("Failed to reread job")
        .expect("Job missing after reconnect");
    assert_eq!(reread.status, JobStatus::Completed);
    assert_eq!(reread.attempts, 3);
}
