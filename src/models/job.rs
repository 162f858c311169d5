use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumString};
use uuid::Uuid;

/// Status of a grading job.
///
/// `Submitted` is transient: it exists only between record creation and the
/// first persist inside the submitter. Every persisted record carries one of
/// the other four values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Submitted,
    Pending,
    Completed,
    Failed,
    SubmissionFailed,
}

impl JobStatus {
    /// Terminal statuses admit no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::SubmissionFailed
        )
    }
}

/// Structured grading verdict returned by the worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradeResult {
    /// Overall grade assigned by the worker (e.g. "A", "9.5", "Gem Mint").
    pub grade: String,
    /// Category the worker classified the artifact into, if any.
    pub category: Option<String>,
    /// Worker confidence in the verdict, 0.0–1.0.
    pub confidence: f64,
    /// Per-aspect sub-scores (e.g. centering, corners, surface).
    #[serde(default)]
    pub sub_scores: BTreeMap<String, f64>,
    /// Number of items the worker identified in the artifact.
    #[serde(default)]
    pub item_count: u32,
}

/// A status update destined for the reconciler, already validated at the
/// boundary. Internal logic only ever branches on this tagged form, never on
/// raw worker JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum JobUpdate {
    /// Worker still has the job in flight; no status change, only the
    /// last-observed side channel moves.
    StillProcessing,
    Completed(GradeResult),
    Failed { error: String },
}

/// A grading job tracked through its full lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradingJob {
    pub id: Uuid,
    /// Handle assigned by the worker. Set iff submission was accepted,
    /// i.e. iff status is not `SubmissionFailed`.
    pub external_job_id: Option<String>,
    pub status: JobStatus,
    /// Opaque reference to the submitted artifact; never interpreted here.
    pub source_ref: String,
    pub submitted_at: DateTime<Utc>,
    /// Set exactly once, at the first terminal transition.
    pub completed_at: Option<DateTime<Utc>>,
    /// Bumped when a non-terminal update is observed via poll or callback.
    pub last_observed_at: Option<DateTime<Utc>>,
    pub result: Option<GradeResult>,
    pub last_error: Option<String>,
    /// Number of update applications received, including discarded ones.
    pub attempts: i32,
}

impl GradingJob {
    /// Create a fresh, not-yet-persisted job for an artifact.
    pub fn new(source_ref: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            external_job_id: None,
            status: JobStatus::Submitted,
            source_ref: source_ref.into(),
            submitted_at: Utc::now(),
            completed_at: None,
            last_observed_at: None,
            result: None,
            last_error: None,
            attempts: 0,
        }
    }
}
