//! Handlers for the `/jobs` resource.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use lpa_core::error::CoreError;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/jobs
pub async fn list_jobs(State(state): State<AppState>) -> impl IntoResponse {
    Json(DataResponse {
        data: state.jobs.list(),
    })
}

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job_id = Uuid::parse_str(&id)
        .map_err(|_| AppError::BadRequest(format!("'{id}' is not a valid job id")))?;
    let job = state.jobs.get(job_id).ok_or(CoreError::NotFound {
        entity: "Job",
        id,
    })?;
    Ok(Json(DataResponse { data: job }))
}
