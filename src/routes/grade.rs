use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::api::{
    CallbackAck, CallbackRequest, JobStatusResponse, SubmitRequest, SubmitResponse,
};
use crate::services::worker::WorkerJobState;
use crate::services::{callback, poll};
use crate::store::StoreError;

fn store_error_status(e: &StoreError) -> StatusCode {
    match e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// POST /api/v1/grade — Submit a stored artifact for grading.
pub async fn submit_grading(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), StatusCode> {
    request.validate().map_err(|_| StatusCode::BAD_REQUEST)?;

    let job = state
        .submitter
        .submit(&request.artifact_ref, &request.metadata)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to persist grading submission");
            store_error_status(&e)
        })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            job_id: job.id,
            status: job.status,
            external_job_id: job.external_job_id,
        }),
    ))
}

/// GET /api/v1/grade/{job_id} — Poll a grading job's current status.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>, StatusCode> {
    let job = poll::get_status(&state.store, state.worker.as_ref(), job_id)
        .await
        .map_err(|e| store_error_status(&e))?;

    Ok(Json(job.into()))
}

/// POST /api/v1/grade/callback — Worker-pushed final status delivery.
///
/// Idempotent under worker retry: replays are acknowledged even when the
/// terminal guard discards them.
// TODO: verify the worker's signature header once the grading service
// publishes its signing key.
pub async fn grading_callback(
    State(state): State<AppState>,
    Json(request): Json<CallbackRequest>,
) -> Result<(StatusCode, Json<CallbackAck>), StatusCode> {
    request.validate().map_err(|_| StatusCode::BAD_REQUEST)?;

    let update = WorkerJobState {
        status: request.status,
        result: request.result,
        error: request.error,
    }
    .into_update()
    .map_err(|e| {
        tracing::warn!(
            external_job_id = %request.job_id,
            error = %e,
            "Rejecting malformed callback payload"
        );
        StatusCode::BAD_REQUEST
    })?;

    match callback::handle_callback(&state.store, &request.job_id, update)
        .await
        .map_err(|e| store_error_status(&e))?
    {
        callback::CallbackOutcome::Acknowledged(_) => {
            Ok((StatusCode::OK, Json(CallbackAck { acknowledged: true })))
        }
        callback::CallbackOutcome::UnknownJob => Ok((
            StatusCode::NOT_FOUND,
            Json(CallbackAck {
                acknowledged: false,
            }),
        )),
    }
}
