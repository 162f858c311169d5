//! Worker-pushed status deliveries.
//!
//! The handler only resolves the worker handle and delegates to the
//! reconciler, so poll-path and callback-path updates are governed by
//! exactly one rule.

use crate::models::job::{GradingJob, JobUpdate};
use crate::services::reconciler;
use crate::store::{JobStore, StoreError};

/// Outcome of a callback delivery.
#[derive(Debug)]
pub enum CallbackOutcome {
    /// Update accepted (possibly discarded by the terminal guard; the worker
    /// still sees success so its retry loop stops).
    Acknowledged(GradingJob),
    /// No job matches the worker handle; nothing was mutated.
    UnknownJob,
}

pub async fn handle_callback(
    store: &JobStore,
    external_job_id: &str,
    update: JobUpdate,
) -> Result<CallbackOutcome, StoreError> {
    let Some(local_id) = store.resolve_external_id(external_job_id).await? else {
        // Never create a phantom record off an unsolicited delivery.
        tracing::warn!(
            external_job_id = %external_job_id,
            "Callback for unknown grading job, dropping"
        );
        return Ok(CallbackOutcome::UnknownJob);
    };

    let job = reconciler::apply_update(store, local_id, update).await?;
    Ok(CallbackOutcome::Acknowledged(job))
}
