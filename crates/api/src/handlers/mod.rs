pub mod jobs;
pub mod label_studio;
pub mod project;
pub mod system;
pub mod video;

use lpa_core::error::CoreError;

use crate::error::{AppError, AppResult};

/// Run synchronous project-file work on the blocking thread pool.
pub(crate) async fn run_blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> Result<T, CoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::InternalError(format!("Blocking task failed: {e}")))?
        .map_err(AppError::from)
}
