use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lpa_core::error::CoreError;
use lpa_core::ffmpeg::FfmpegError;
use lpa_core::video::VideoError;
use lpa_labelstudio::{LabelStudioError, SetupError};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps domain errors from `lpa_core` and `lpa_labelstudio` and adds
/// HTTP-specific variants. Implements [`IntoResponse`] to produce consistent
/// JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `lpa_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An ffmpeg/ffprobe failure.
    #[error(transparent)]
    Ffmpeg(#[from] FfmpegError),

    /// The Label Studio server rejected a request or was unreachable.
    #[error(transparent)]
    LabelStudio(#[from] LabelStudioError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A feature that needs configuration the server was started without.
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<VideoError> for AppError {
    fn from(err: VideoError) -> Self {
        match err {
            VideoError::Core(e) => AppError::Core(e),
            VideoError::Ffmpeg(e) => AppError::Ffmpeg(e),
            VideoError::Io(e) => AppError::InternalError(e.to_string()),
        }
    }
}

impl From<SetupError> for AppError {
    fn from(err: SetupError) -> Self {
        match err {
            SetupError::Core(e) => AppError::Core(e),
            SetupError::LabelStudio(e) => AppError::LabelStudio(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} '{id}' not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- ffmpeg ---
            AppError::Ffmpeg(FfmpegError::VideoNotFound(path)) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Video '{path}' not found"),
            ),
            AppError::Ffmpeg(err) => {
                tracing::error!(error = %err, "ffmpeg error");
                internal()
            }

            // --- Label Studio ---
            AppError::LabelStudio(err) => {
                tracing::warn!(error = %err, "Label Studio request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "LABEL_STUDIO_ERROR",
                    "Label Studio request failed".to_string(),
                )
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::NotConfigured(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "NOT_CONFIGURED",
                msg.clone(),
            ),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
