//! Handlers connecting a project to Label Studio.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use lpa_core::project;
use lpa_labelstudio::setup;

use crate::error::AppResult;
use crate::handlers::run_blocking;
use crate::handlers::project::LabelStudioStatus;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/projects/{name}/label-studio
///
/// Creates the Label Studio project from the project's labeling config and
/// registers the project directory as its data source.
pub async fn create_label_studio_project(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let api = state.label_studio()?;
    let data_dir = state.config.data_dir.clone();
    let project_name = name.clone();
    let (paths, _) = run_blocking(move || project::load_project(&data_dir, &project_name)).await?;
    let metadata = setup::create_labeling_project(api, &paths, &name).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: LabelStudioStatus::from(metadata),
        }),
    ))
}

/// POST /api/v1/projects/{name}/label-studio/sync
///
/// Pulls the labeled/total task counters from Label Studio.
pub async fn sync_label_studio(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let api = state.label_studio()?;
    let data_dir = state.config.data_dir.clone();
    let (paths, _) = run_blocking(move || project::load_project(&data_dir, &name)).await?;
    let metadata = setup::refresh_task_counts(api, &paths).await?;
    Ok(Json(DataResponse {
        data: LabelStudioStatus::from(metadata),
    }))
}
