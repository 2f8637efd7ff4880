//! Handlers for the `/projects` resource.
//!
//! Projects live on disk under the configured data directory; see
//! [`lpa_core::project`] for the layout.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use lpa_core::error::CoreError;
use lpa_core::project::{self, LabelStudioMetadata, ProjectConfig};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::handlers::run_blocking;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub keypoints: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateKeypointsRequest {
    pub keypoints: Vec<String>,
}

/// Label Studio state of a project, without the stored API key.
#[derive(Debug, Serialize)]
pub struct LabelStudioStatus {
    pub project_id: i64,
    pub created_at: String,
    pub n_labeled_tasks: i64,
    pub n_total_tasks: i64,
}

impl From<LabelStudioMetadata> for LabelStudioStatus {
    fn from(meta: LabelStudioMetadata) -> Self {
        Self {
            project_id: meta.id,
            created_at: meta.created_at,
            n_labeled_tasks: meta.n_labeled_tasks,
            n_total_tasks: meta.n_total_tasks,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    pub name: String,
    pub keypoints: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub videos: Vec<String>,
    pub label_studio: Option<LabelStudioStatus>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/projects
pub async fn list_projects(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let data_dir = state.config.data_dir.clone();
    let projects = run_blocking(move || project::list_projects(&data_dir)).await?;
    Ok(Json(DataResponse { data: projects }))
}

/// POST /api/v1/projects
pub async fn create_project(
    State(state): State<AppState>,
    Json(input): Json<CreateProjectRequest>,
) -> AppResult<impl IntoResponse> {
    let data_dir = state.config.data_dir.clone();
    let config =
        run_blocking(move || project::create_project(&data_dir, &input.name, input.keypoints))
            .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: config })))
}

/// GET /api/v1/projects/{name}
pub async fn get_project(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let data_dir = state.config.data_dir.clone();
    let (config, videos, label_studio) = run_blocking(move || {
        let (paths, config) = project::load_project(&data_dir, &name)?;
        let videos = project::list_videos(&paths)?;
        let label_studio = match LabelStudioMetadata::load(&paths.labelstudio_metadata_file()) {
            Ok(meta) => Some(LabelStudioStatus::from(meta)),
            Err(CoreError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };
        Ok((config, videos, label_studio))
    })
    .await?;

    let ProjectConfig {
        name,
        keypoints,
        created_at,
    } = config;
    Ok(Json(DataResponse {
        data: ProjectDetail {
            name,
            keypoints,
            created_at,
            videos,
            label_studio,
        },
    }))
}

/// PUT /api/v1/projects/{name}/keypoints
pub async fn update_keypoints(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(input): Json<UpdateKeypointsRequest>,
) -> AppResult<impl IntoResponse> {
    let data_dir = state.config.data_dir.clone();
    let config =
        run_blocking(move || project::update_keypoints(&data_dir, &name, input.keypoints)).await?;
    Ok(Json(DataResponse { data: config }))
}

/// GET /api/v1/projects/{name}/labeling-config
///
/// Returns the raw XML, not a JSON envelope.
pub async fn get_labeling_config(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let data_dir = state.config.data_dir.clone();
    let project_name = name.clone();
    let (paths, _) = run_blocking(move || project::load_project(&data_dir, &project_name)).await?;
    let file = paths.labeling_config_file();
    let xml = tokio::fs::read_to_string(&file).await.map_err(|_| CoreError::NotFound {
        entity: "Labeling config",
        id: name.clone(),
    })?;
    Ok(([(header::CONTENT_TYPE, "application/xml")], xml))
}
