//! Handlers for project videos.
//!
//! Import and snippet extraction run ffmpeg and can take minutes, so both
//! are submitted as background jobs and answered with `202 Accepted` and
//! the job record.

use std::path::{Path as FsPath, PathBuf};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use lpa_core::error::CoreError;
use lpa_core::project;
use lpa_core::video::{self, SnippetOptions, DEFAULT_CLIP_LENGTH_SECS, DEFAULT_LIKELIHOOD_THRESH};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::handlers::run_blocking;
use crate::response::DataResponse;
use crate::state::AppState;

pub const JOB_KIND_IMPORT: &str = "video_import";
pub const JOB_KIND_SNIPPET: &str = "video_snippet";

/// Longest snippet that can be requested, in seconds.
const MAX_CLIP_LENGTH_SECS: u32 = 600;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ImportVideosRequest {
    /// A video file or a directory of videos on the server's filesystem.
    pub source: PathBuf,
    /// Move single files instead of copying them.
    #[serde(default)]
    pub remove_old: bool,
}

#[derive(Debug, Deserialize)]
pub struct SnippetRequest {
    /// File name of an imported video in the project's videos directory.
    pub video: String,
    /// Pose predictions CSV; motion is measured on pixels when absent.
    pub preds_file: Option<PathBuf>,
    pub clip_length_secs: Option<u32>,
    pub likelihood_thresh: Option<f64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/projects/{name}/videos
pub async fn list_videos(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let data_dir = state.config.data_dir.clone();
    let videos = run_blocking(move || {
        let (paths, _) = project::load_project(&data_dir, &name)?;
        project::list_videos(&paths)
    })
    .await?;
    Ok(Json(DataResponse { data: videos }))
}

/// POST /api/v1/projects/{name}/videos/import
pub async fn import_videos(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(input): Json<ImportVideosRequest>,
) -> AppResult<impl IntoResponse> {
    let paths = load_project_paths(&state, &name).await?;
    if !tokio::fs::try_exists(&input.source).await.unwrap_or(false) {
        return Err(CoreError::NotFound {
            entity: "Import source",
            id: input.source.display().to_string(),
        }
        .into());
    }

    let dst_dir = paths.videos_dir();
    let source = input.source;
    let remove_old = input.remove_old;
    let job = state.jobs.spawn(JOB_KIND_IMPORT, &name, move |_progress| async move {
        if source.is_dir() {
            let report = video::copy_and_reformat_video_directory(&source, &dst_dir)
                .await
                .map_err(|e| e.to_string())?;
            serde_json::to_value(report).map_err(|e| e.to_string())
        } else {
            let dst = video::copy_and_reformat_video(&source, &dst_dir, remove_old)
                .await
                .map_err(|e| e.to_string())?;
            Ok(serde_json::json!({ "path": dst }))
        }
    });

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: job })))
}

/// POST /api/v1/projects/{name}/videos/snippet
pub async fn make_snippet(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(input): Json<SnippetRequest>,
) -> AppResult<impl IntoResponse> {
    let paths = load_project_paths(&state, &name).await?;
    validate_video_file_name(&input.video)?;

    let clip_length_secs = input.clip_length_secs.unwrap_or(DEFAULT_CLIP_LENGTH_SECS);
    if clip_length_secs == 0 || clip_length_secs > MAX_CLIP_LENGTH_SECS {
        return Err(AppError::BadRequest(format!(
            "clip_length_secs must be between 1 and {MAX_CLIP_LENGTH_SECS}"
        )));
    }
    let likelihood_thresh = input.likelihood_thresh.unwrap_or(DEFAULT_LIKELIHOOD_THRESH);
    if !(0.0..=1.0).contains(&likelihood_thresh) {
        return Err(AppError::BadRequest(
            "likelihood_thresh must be between 0 and 1".into(),
        ));
    }

    let video_file = paths.videos_dir().join(&input.video);
    if !is_file(&video_file).await {
        return Err(CoreError::NotFound {
            entity: "Video",
            id: input.video,
        }
        .into());
    }
    if let Some(preds) = &input.preds_file {
        if !is_file(preds).await {
            return Err(CoreError::NotFound {
                entity: "Predictions file",
                id: preds.display().to_string(),
            }
            .into());
        }
    }

    let options = SnippetOptions {
        preds_file: input.preds_file,
        clip_length_secs,
        likelihood_thresh,
        save_dir: Some(paths.snippets_dir()),
    };
    let job = state.jobs.spawn(JOB_KIND_SNIPPET, &name, move |progress| async move {
        let snippet = video::make_video_snippet(&video_file, &options, &progress)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_value(snippet).map_err(|e| e.to_string())
    });

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: job })))
}

async fn load_project_paths(state: &AppState, name: &str) -> AppResult<project::ProjectPaths> {
    let data_dir = state.config.data_dir.clone();
    let name = name.to_string();
    let (paths, _) = run_blocking(move || project::load_project(&data_dir, &name)).await?;
    Ok(paths)
}

async fn is_file(path: &FsPath) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file())
}

/// Reject anything that is not a bare file name inside the videos directory.
fn validate_video_file_name(video: &str) -> Result<(), CoreError> {
    let path = FsPath::new(video);
    let is_bare_name = path.file_name().is_some_and(|f| f == path.as_os_str());
    if video.is_empty() || !is_bare_name {
        return Err(CoreError::Validation(format!(
            "'{video}' is not a video file name"
        )));
    }
    Ok(())
}
