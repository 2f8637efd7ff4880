//! Route definitions for `/system`.
//!
//! ```text
//! GET  /version    get_version
//! POST /shutdown   shutdown
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::system;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/version", get(system::get_version))
        .route("/shutdown", post(system::shutdown))
}
