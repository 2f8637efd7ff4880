//! Route definitions for the `/projects` resource.
//!
//! ```text
//! GET  /                                  list_projects
//! POST /                                  create_project
//! GET  /{name}                            get_project
//! PUT  /{name}/keypoints                  update_keypoints
//! GET  /{name}/labeling-config            get_labeling_config
//! GET  /{name}/videos                     list_videos
//! POST /{name}/videos/import              import_videos
//! POST /{name}/videos/snippet             make_snippet
//! POST /{name}/label-studio               create_label_studio_project
//! POST /{name}/label-studio/sync          sync_label_studio
//! ```

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{label_studio, project, video};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(project::list_projects).post(project::create_project))
        .route("/{name}", get(project::get_project))
        .route("/{name}/keypoints", put(project::update_keypoints))
        .route("/{name}/labeling-config", get(project::get_labeling_config))
        .route("/{name}/videos", get(video::list_videos))
        .route("/{name}/videos/import", post(video::import_videos))
        .route("/{name}/videos/snippet", post(video::make_snippet))
        .route(
            "/{name}/label-studio",
            post(label_studio::create_label_studio_project),
        )
        .route("/{name}/label-studio/sync", post(label_studio::sync_label_studio))
}
