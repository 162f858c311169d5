use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::{GradeResult, GradingJob, JobStatus};

/// Correlation metadata attached to a submission and forwarded to the worker.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SubmitMetadata {
    /// Caller-side correlation reference (order id, listing id, ...).
    #[garde(length(min = 1, max = 200))]
    pub client_ref: Option<String>,

    /// Hint about what kind of item the artifact shows.
    #[garde(length(min = 1, max = 100))]
    pub category_hint: Option<String>,

    /// Declared value of the item, if the caller tracks one.
    #[garde(range(min = 0.0))]
    pub declared_value: Option<f64>,
}

/// Request to submit an already-stored artifact for grading.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitRequest {
    /// Opaque reference to the artifact (storage key, URL, ...).
    #[garde(length(min = 1, max = 1024))]
    pub artifact_ref: String,

    #[garde(dive)]
    #[serde(default)]
    pub metadata: SubmitMetadata,
}

/// Response after submitting an artifact for grading.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub external_job_id: Option<String>,
}

/// Full job projection returned by the poll endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<GradeResult>,
    pub error: Option<String>,
    pub attempts: i32,
}

impl From<GradingJob> for JobStatusResponse {
    fn from(job: GradingJob) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            submitted_at: job.submitted_at,
            completed_at: job.completed_at,
            result: job.result,
            error: job.last_error,
            attempts: job.attempts,
        }
    }
}

/// Worker-pushed callback payload.
#[derive(Debug, Deserialize, Validate)]
pub struct CallbackRequest {
    /// The worker-side job handle the callback refers to.
    #[garde(length(min = 1, max = 200))]
    pub job_id: String,

    /// Worker-reported status string, validated at the boundary.
    #[garde(length(min = 1, max = 50))]
    pub status: String,

    #[garde(skip)]
    pub result: Option<GradeResult>,

    #[garde(skip)]
    pub error: Option<String>,
}

/// Acknowledgement returned to the worker for a callback delivery.
#[derive(Debug, Serialize, Deserialize)]
pub struct CallbackAck {
    pub acknowledged: bool,
}
