//! Job submission and polling.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use sclip_models::{Job, JobId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::validation::{validate_owner_id, validate_source_url};

#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    pub owner_id: String,
    pub source_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub job_id: JobId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelJobResponse {
    pub job_id: JobId,
    pub cancel_requested: bool,
}

/// Create a job and start it in the background.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<SubmitJobRequest>,
) -> ApiResult<(StatusCode, Json<SubmitJobResponse>)> {
    let owner_id = validate_owner_id(&request.owner_id)?;
    let source_url = validate_source_url(&request.source_url)?;

    let job_id = JobId::new();
    let notifier = state.notifier_for(&job_id, &owner_id);
    let job_id = state
        .executor
        .submit_with_id(job_id, &owner_id, &source_url, notifier)
        .await?;

    info!(job_id = %job_id, owner_id = %owner_id, "Accepted job");

    Ok((StatusCode::ACCEPTED, Json(SubmitJobResponse { job_id })))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Job>> {
    let job = state.executor.get_status(&JobId::from_string(job_id)).await?;
    Ok(Json(job))
}

/// Request cancellation. The job stops at its next stage boundary.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<(StatusCode, Json<CancelJobResponse>)> {
    let job_id = JobId::from_string(job_id);
    let job = state.executor.get_status(&job_id).await?;

    if job.is_terminal() {
        return Err(ApiError::conflict(format!(
            "job {} already finished with status {}",
            job_id, job.status
        )));
    }
    if !state.executor.cancel(&job_id).await {
        return Err(ApiError::conflict(format!(
            "job {} is not running on this server",
            job_id
        )));
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(CancelJobResponse {
            job_id,
            cancel_requested: true,
        }),
    ))
}
