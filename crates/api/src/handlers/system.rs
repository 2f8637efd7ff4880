//! Handlers for `/system`: version info and the power button.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct VersionInfo {
    pub name: &'static str,
    pub version: &'static str,
}

/// GET /api/v1/system/version
///
/// Lets the operator confirm which release is running after an upgrade.
pub async fn get_version() -> impl IntoResponse {
    Json(DataResponse {
        data: VersionInfo {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        },
    })
}

#[derive(Debug, Serialize)]
pub struct ShutdownAccepted {
    pub active_jobs: usize,
}

/// POST /api/v1/system/shutdown
///
/// Starts a graceful shutdown, the same as pressing Ctrl-C in the terminal.
pub async fn shutdown(State(state): State<AppState>) -> impl IntoResponse {
    let active_jobs = state.jobs.active_count();
    tracing::info!(active_jobs, "Shutdown requested through the API");
    state.shutdown.cancel();
    (
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: ShutdownAccepted { active_jobs },
        }),
    )
}
