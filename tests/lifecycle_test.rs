//! End-to-end lifecycle scenarios against the in-memory backend and a
//! scripted worker: submit, poll while in flight, callback delivery,
//! duplicate callback, and the poll short-circuit once a verdict lands.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use grade_track::models::api::SubmitMetadata;
use grade_track::models::job::{GradeResult, JobStatus, JobUpdate};
use grade_track::services::submitter::JobSubmitter;
use grade_track::services::worker::{GradingWorker, WorkerError};
use grade_track::services::{callback, poll};
use grade_track::store::{JobStore, MemoryBackend};

/// Worker double: accepts every submission with a fixed handle and serves
/// fetch_status outcomes from a script, counting contacts.
struct FakeWorker {
    handle: String,
    fetch_script: Mutex<VecDeque<Result<JobUpdate, WorkerError>>>,
    fetches: AtomicUsize,
}

impl FakeWorker {
    fn new(handle: &str) -> Self {
        Self {
            handle: handle.to_string(),
            fetch_script: Mutex::new(VecDeque::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    fn script_fetch(&self, outcome: Result<JobUpdate, WorkerError>) {
        self.fetch_script.lock().unwrap().push_back(outcome);
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GradingWorker for FakeWorker {
    async fn submit(
        &self,
        _artifact_ref: &str,
        _metadata: &SubmitMetadata,
    ) -> Result<String, WorkerError> {
        Ok(self.handle.clone())
    }

    async fn fetch_status(&self, external_job_id: &str) -> Result<JobUpdate, WorkerError> {
        assert_eq!(external_job_id, self.handle);
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.fetch_script
            .lock()
            .unwrap()
            .pop_front()
            .expect("fetch_status called more often than scripted")
    }
}

fn grade_a() -> GradeResult {
    GradeResult {
        grade: "A".to_string(),
        category: Some("trading_card".to_string()),
        confidence: 0.92,
        sub_scores: [("centering".to_string(), 9.0), ("surface".to_string(), 9.5)]
            .into_iter()
            .collect(),
        item_count: 1,
    }
}

#[tokio::test]
async fn full_lifecycle_with_racing_channels() {
    let store = Arc::new(JobStore::new(MemoryBackend::new()));
    let worker = Arc::new(FakeWorker::new("W1"));
    let submitter = JobSubmitter::new(store.clone(), worker.clone());

    // Submit artifact A; worker accepts with handle W1.
    let job = submitter
        .submit("artifacts/A", &SubmitMetadata::default())
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.external_job_id.as_deref(), Some("W1"));

    // Poll before the worker finishes: record stays Pending.
    worker.script_fetch(Ok(JobUpdate::StillProcessing));
    let polled = poll::get_status(&store, worker.as_ref(), job.id)
        .await
        .unwrap();
    assert_eq!(polled.status, JobStatus::Pending);
    assert_eq!(worker.fetch_count(), 1);

    // Callback arrives with the verdict.
    let outcome = callback::handle_callback(&store, "W1", JobUpdate::Completed(grade_a()))
        .await
        .unwrap();
    let callback::CallbackOutcome::Acknowledged(after_callback) = outcome else {
        panic!("callback for a known handle must be acknowledged");
    };
    assert_eq!(after_callback.status, JobStatus::Completed);
    assert_eq!(after_callback.result, Some(grade_a()));

    // Duplicate callback with the same payload: acknowledged, record
    // outcome fields unchanged.
    let outcome = callback::handle_callback(&store, "W1", JobUpdate::Completed(grade_a()))
        .await
        .unwrap();
    let callback::CallbackOutcome::Acknowledged(after_duplicate) = outcome else {
        panic!("duplicate callback must still be acknowledged");
    };
    assert_eq!(after_duplicate.status, after_callback.status);
    assert_eq!(after_duplicate.result, after_callback.result);
    assert_eq!(after_duplicate.completed_at, after_callback.completed_at);
    assert_eq!(after_duplicate.last_error, after_callback.last_error);

    // A later poll short-circuits on the terminal record without
    // contacting the worker again.
    let final_read = poll::get_status(&store, worker.as_ref(), job.id)
        .await
        .unwrap();
    assert_eq!(final_read.status, JobStatus::Completed);
    assert_eq!(worker.fetch_count(), 1);
}

#[tokio::test]
async fn poll_and_callback_race_converges() {
    let store = Arc::new(JobStore::new(MemoryBackend::new()));
    let worker = Arc::new(FakeWorker::new("W2"));
    let submitter = JobSubmitter::new(store.clone(), worker.clone());

    let job = submitter
        .submit("artifacts/B", &SubmitMetadata::default())
        .await
        .unwrap();

    // The poll's direct fetch reports Completed while the callback claims
    // Failed. Whichever lands first wins; the record must stay coherent.
    worker.script_fetch(Ok(JobUpdate::Completed(grade_a())));

    let poll_task = {
        let store = store.clone();
        let worker = worker.clone();
        let id = job.id;
        tokio::spawn(async move { poll::get_status(&store, worker.as_ref(), id).await })
    };
    let callback_task = {
        let store = store.clone();
        tokio::spawn(async move {
            callback::handle_callback(
                &store,
                "W2",
                JobUpdate::Failed {
                    error: "grader disagreed".to_string(),
                },
            )
            .await
        })
    };

    let (poll_result, callback_result) = futures::future::join(poll_task, callback_task).await;
    poll_result.unwrap().unwrap();
    callback_result.unwrap().unwrap();

    let settled = store.get(job.id).await.unwrap().unwrap();
    match settled.status {
        JobStatus::Completed => {
            assert_eq!(settled.result, Some(grade_a()));
            assert!(settled.last_error.is_none());
        }
        JobStatus::Failed => {
            assert!(settled.result.is_none());
            assert_eq!(settled.last_error.as_deref(), Some("grader disagreed"));
        }
        other => panic!("expected a terminal status, got {other}"),
    }
    assert!(settled.completed_at.is_some());
}

#[tokio::test]
async fn submission_failure_is_terminal_and_poll_safe() {
    struct DownWorker;

    #[async_trait]
    impl GradingWorker for DownWorker {
        async fn submit(
            &self,
            _artifact_ref: &str,
            _metadata: &SubmitMetadata,
        ) -> Result<String, WorkerError> {
            Err(WorkerError::Rejected("maintenance window".to_string()))
        }

        async fn fetch_status(&self, _external_job_id: &str) -> Result<JobUpdate, WorkerError> {
            panic!("a submission-failed job must never be fetched");
        }
    }

    let store = Arc::new(JobStore::new(MemoryBackend::new()));
    let worker = Arc::new(DownWorker);
    let submitter = JobSubmitter::new(store.clone(), worker.clone());

    let job = submitter
        .submit("artifacts/C", &SubmitMetadata::default())
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::SubmissionFailed);
    assert!(job.external_job_id.is_none());
    assert!(job.last_error.is_some());

    // Polling a terminally failed submission never reaches the worker.
    let read = poll::get_status(&store, worker.as_ref(), job.id)
        .await
        .unwrap();
    assert_eq!(read.status, JobStatus::SubmissionFailed);
}
