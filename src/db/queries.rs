use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::job::{GradingJob, JobStatus};

/// Map a row from `grading_jobs` into a `GradingJob`.
fn row_to_job(row: &PgRow) -> Result<GradingJob, sqlx::Error> {
    let status_str: String = row.try_get("status")?;
    let status = JobStatus::from_str(&status_str)
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    let result = match row.try_get::<Option<serde_json::Value>, _>("result")? {
        Some(value) => Some(
            serde_json::from_value(value).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        ),
        None => None,
    };

    Ok(GradingJob {
        id: row.try_get("id")?,
        external_job_id: row.try_get("external_job_id")?,
        status,
        source_ref: row.try_get("source_ref")?,
        submitted_at: row.try_get("submitted_at")?,
        completed_at: row.try_get("completed_at")?,
        last_observed_at: row.try_get("last_observed_at")?,
        result,
        last_error: row.try_get("last_error")?,
        attempts: row.try_get("attempts")?,
    })
}

fn result_to_json(job: &GradingJob) -> Result<Option<serde_json::Value>, sqlx::Error> {
    job.result
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

/// Insert a newly submitted job
pub async fn insert_job(pool: &PgPool, job: &GradingJob) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO grading_jobs
            (id, external_job_id, status, source_ref, submitted_at, completed_at,
             last_observed_at, result, last_error, attempts)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(job.id)
    .bind(&job.external_job_id)
    .bind(job.status.to_string())
    .bind(&job.source_ref)
    .bind(job.submitted_at)
    .bind(job.completed_at)
    .bind(job.last_observed_at)
    .bind(result_to_json(job)?)
    .bind(&job.last_error)
    .bind(job.attempts)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a job by local ID
pub async fn fetch_job(pool: &PgPool, job_id: Uuid) -> Result<Option<GradingJob>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, external_job_id, status, source_ref, submitted_at, completed_at,
               last_observed_at, result, last_error, attempts
        FROM grading_jobs
        WHERE id = $1
        "#,
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_job).transpose()
}

/// Resolve a worker-assigned handle to the full job row (secondary index)
pub async fn fetch_job_by_external_id(
    pool: &PgPool,
    external_job_id: &str,
) -> Result<Option<GradingJob>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, external_job_id, status, source_ref, submitted_at, completed_at,
               last_observed_at, result, last_error, attempts
        FROM grading_jobs
        WHERE external_job_id = $1
        "#,
    )
    .bind(external_job_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_job).transpose()
}

/// Write back a reconciled job row
pub async fn update_job(pool: &PgPool, job: &GradingJob) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE grading_jobs
        SET status = $1,
            completed_at = $2,
            last_observed_at = $3,
            result = $4,
            last_error = $5,
            attempts = $6
        WHERE id = $7
        "#,
    )
    .bind(job.status.to_string())
    .bind(job.completed_at)
    .bind(job.last_observed_at)
    .bind(result_to_json(job)?)
    .bind(&job.last_error)
    .bind(job.attempts)
    .bind(job.id)
    .execute(pool)
    .await?;

    Ok(())
}
