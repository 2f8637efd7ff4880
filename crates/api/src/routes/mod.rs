pub mod health;
pub mod jobs;
pub mod projects;
pub mod system;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /system/version                                  app version (GET)
/// /system/shutdown                                 power off the server (POST)
///
/// /projects                                        list, create
/// /projects/{name}                                 get
/// /projects/{name}/keypoints                       replace keypoints (PUT)
/// /projects/{name}/labeling-config                 labeling interface XML (GET)
/// /projects/{name}/videos                          list imported videos
/// /projects/{name}/videos/import                   import a file or directory (POST, job)
/// /projects/{name}/videos/snippet                  cut a high-motion snippet (POST, job)
/// /projects/{name}/label-studio                    create Label Studio project (POST)
/// /projects/{name}/label-studio/sync               refresh task counts (POST)
///
/// /jobs                                            list background jobs
/// /jobs/{id}                                       job status and progress
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/system", system::router())
        .nest("/projects", projects::router())
        .nest("/jobs", jobs::router())
}
