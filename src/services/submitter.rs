//! Submission orchestration: hand the artifact to the worker, persist the
//! outcome, and notify the surrounding system once the worker has accepted.

use std::sync::Arc;

use crate::models::api::SubmitMetadata;
use crate::models::job::{GradingJob, JobStatus};
use crate::services::worker::GradingWorker;
use crate::store::{JobStore, StoreError};

/// Hook invoked with the artifact reference once a submission reaches
/// `Pending`. The surrounding system uses it to schedule deferred artifact
/// cleanup; it must never fire before the worker has accepted the job.
pub type AcceptedHook = Arc<dyn Fn(&str) + Send + Sync>;

pub struct JobSubmitter {
    store: Arc<JobStore>,
    worker: Arc<dyn GradingWorker>,
    on_accepted: Option<AcceptedHook>,
}

impl JobSubmitter {
    pub fn new(store: Arc<JobStore>, worker: Arc<dyn GradingWorker>) -> Self {
        Self {
            store,
            worker,
            on_accepted: None,
        }
    }

    pub fn with_accepted_hook(mut self, hook: AcceptedHook) -> Self {
        self.on_accepted = Some(hook);
        self
    }

    /// Submit an artifact for grading.
    ///
    /// Exactly one fully consistent record is persisted: `Pending` with the
    /// worker handle set, or `SubmissionFailed` with the error captured and
    /// no handle. Submission is never auto-retried here; the caller decides
    /// what to do with a `SubmissionFailed` record.
    pub async fn submit(
        &self,
        artifact_ref: &str,
        metadata: &SubmitMetadata,
    ) -> Result<GradingJob, StoreError> {
        let mut job = GradingJob::new(artifact_ref);
        metrics::counter!("grading_jobs_submitted").increment(1);

        match self.worker.submit(artifact_ref, metadata).await {
            Ok(external_job_id) => {
                tracing::info!(
                    job_id = %job.id,
                    external_job_id = %external_job_id,
                    "Worker accepted grading job"
                );
                job.external_job_id = Some(external_job_id);
                job.status = JobStatus::Pending;
            }
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "Grading submission failed");
                metrics::counter!("grading_submissions_failed").increment(1);
                job.status = JobStatus::SubmissionFailed;
                job.last_error = Some(e.to_string());
            }
        }

        self.store.insert(&job).await?;

        // Artifact cleanup must wait until the worker has the job; never
        // signal before `Pending` is durable.
        if job.status == JobStatus::Pending {
            if let Some(hook) = &self.on_accepted {
                hook(&job.source_ref);
            }
        }

        Ok(job)
    }
}
