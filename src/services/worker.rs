use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::api::SubmitMetadata;
use crate::models::job::{GradeResult, JobUpdate};

/// Errors from talking to the grading worker.
///
/// `Transport` means the worker could not be reached (connect failure,
/// timeout); `Rejected` means the worker answered and declined; `Protocol`
/// means it answered with something we could not interpret. Callers classify
/// on the variant: a poll degrades on `Transport`/`Protocol`, a submission
/// records any of them as `SubmissionFailed`.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("worker unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("worker rejected request: {0}")]
    Rejected(String),

    #[error("unexpected worker payload: {0}")]
    Protocol(String),
}

/// Raw job state as the worker reports it, either from a status fetch or a
/// pushed callback. Validated into a [`JobUpdate`] before it reaches any
/// internal logic.
#[derive(Debug, Deserialize)]
pub struct WorkerJobState {
    pub status: String,
    pub result: Option<GradeResult>,
    pub error: Option<String>,
}

impl WorkerJobState {
    /// Boundary validation: map the loosely-typed worker payload onto the
    /// tagged update the reconciler consumes.
    pub fn into_update(self) -> Result<JobUpdate, WorkerError> {
        match self.status.as_str() {
            "queued" | "pending" | "processing" => Ok(JobUpdate::StillProcessing),
            "completed" => match self.result {
                Some(result) => Ok(JobUpdate::Completed(result)),
                None => Err(WorkerError::Protocol(
                    "completed status without a result payload".to_string(),
                )),
            },
            "failed" => Ok(JobUpdate::Failed {
                error: self
                    .error
                    .unwrap_or_else(|| "worker reported failure without detail".to_string()),
            }),
            other => Err(WorkerError::Protocol(format!(
                "unrecognized worker status {other:?}"
            ))),
        }
    }
}

/// Outbound interface to the external grading worker.
#[async_trait]
pub trait GradingWorker: Send + Sync {
    /// Submit an artifact for grading. Returns the worker-assigned job
    /// handle on acceptance.
    async fn submit(
        &self,
        artifact_ref: &str,
        metadata: &SubmitMetadata,
    ) -> Result<String, WorkerError>;

    /// Fetch the worker's current view of a job.
    async fn fetch_status(&self, external_job_id: &str) -> Result<JobUpdate, WorkerError>;

    /// Reachability probe for health checks.
    async fn healthy(&self) -> bool {
        true
    }
}

#[derive(Serialize)]
struct SubmitBody<'a> {
    artifact_ref: &'a str,
    metadata: &'a SubmitMetadata,
}

#[derive(Deserialize)]
struct SubmitReply {
    job_id: String,
    accepted: bool,
}

/// HTTP client for the grading worker's JSON API.
pub struct HttpGradingWorker {
    http: Client,
    base_url: String,
    api_token: Option<String>,
    submit_timeout: Duration,
    status_timeout: Duration,
}

impl HttpGradingWorker {
    pub fn new(
        base_url: impl Into<String>,
        api_token: Option<String>,
        submit_timeout: Duration,
        status_timeout: Duration,
    ) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token,
            submit_timeout,
            status_timeout,
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl GradingWorker for HttpGradingWorker {
    async fn submit(
        &self,
        artifact_ref: &str,
        metadata: &SubmitMetadata,
    ) -> Result<String, WorkerError> {
        let url = format!("{}/api/v1/jobs", self.base_url);
        let body = SubmitBody {
            artifact_ref,
            metadata,
        };

        let response = self
            .request(self.http.post(&url))
            .timeout(self.submit_timeout)
            .json(&body)
            .send()
            .await
            .map_err(WorkerError::Transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(WorkerError::Rejected(format!(
                "submission rejected with {status}: {detail}"
            )));
        }

        let reply: SubmitReply = response
            .json()
            .await
            .map_err(|e| WorkerError::Protocol(format!("malformed submission reply: {e}")))?;

        if !reply.accepted {
            return Err(WorkerError::Rejected(format!(
                "worker declined job {}",
                reply.job_id
            )));
        }

        Ok(reply.job_id)
    }

    async fn fetch_status(&self, external_job_id: &str) -> Result<JobUpdate, WorkerError> {
        let url = format!("{}/api/v1/jobs/{}", self.base_url, external_job_id);

        let response = self
            .request(self.http.get(&url))
            .timeout(self.status_timeout)
            .send()
            .await
            .map_err(WorkerError::Transport)?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(WorkerError::Protocol(format!(
                "status fetch for {external_job_id} returned {status}"
            )));
        }

        let state: WorkerJobState = response
            .json()
            .await
            .map_err(|e| WorkerError::Protocol(format!("malformed status payload: {e}")))?;

        state.into_update()
    }

    async fn healthy(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self
            .request(self.http.get(&url))
            .timeout(self.status_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
