//! The single choke point for status-changing writes.
//!
//! Every update, whether it arrived via a client poll or a worker callback,
//! passes through [`apply_update`]. The terminal-state guard makes the
//! reconciler idempotent under replay and race-free under concurrent
//! delivery: the first terminal write wins, later ones are discarded.

use chrono::Utc;
use uuid::Uuid;

use crate::models::job::{GradingJob, JobStatus, JobUpdate};
use crate::store::{JobStore, StoreError};

/// Apply a validated update to a job under its per-job critical section.
///
/// The lock covers only the load-reconcile-persist step; network calls that
/// produced the update happen outside it.
pub async fn apply_update(
    store: &JobStore,
    local_id: Uuid,
    update: JobUpdate,
) -> Result<GradingJob, StoreError> {
    let _guard = store.lock(local_id).await;

    let mut job = store
        .get(local_id)
        .await?
        .ok_or(StoreError::NotFound(local_id))?;

    job.attempts += 1;

    if job.status.is_terminal() {
        // Stale or duplicate delivery. Count it, change nothing else.
        metrics::counter!("grading_updates_discarded").increment(1);
        tracing::debug!(
            job_id = %job.id,
            status = %job.status,
            attempts = job.attempts,
            "Discarding update for terminal job"
        );
        store.update(&job).await?;
        return Ok(job);
    }

    match update {
        JobUpdate::StillProcessing => {
            job.last_observed_at = Some(Utc::now());
            tracing::debug!(job_id = %job.id, "Worker still processing");
        }
        JobUpdate::Completed(result) => {
            job.status = JobStatus::Completed;
            job.result = Some(result);
            job.completed_at = Some(Utc::now());
            metrics::counter!("grading_jobs_completed").increment(1);
            tracing::info!(job_id = %job.id, "Job completed");
        }
        JobUpdate::Failed { error } => {
            job.status = JobStatus::Failed;
            job.last_error = Some(error);
            job.completed_at = Some(Utc::now());
            metrics::counter!("grading_jobs_failed").increment(1);
            tracing::info!(
                job_id = %job.id,
                error = job.last_error.as_deref().unwrap_or(""),
                "Job failed"
            );
        }
    }

    store.update(&job).await?;
    Ok(job)
}
