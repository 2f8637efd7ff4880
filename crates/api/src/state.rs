use std::sync::Arc;

use lpa_labelstudio::LabelStudioApi;
use tokio_util::sync::CancellationToken;

use crate::background::JobRegistry;
use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Background job registry (video import, snippets).
    pub jobs: Arc<JobRegistry>,
    /// Label Studio client, present when an API key is configured.
    pub label_studio: Option<LabelStudioApi>,
    /// Cancelled to stop the server (power button or termination signal).
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let label_studio = config
            .label_studio_api_key
            .as_ref()
            .map(|key| LabelStudioApi::new(config.label_studio_url.clone(), key.clone()));

        Self {
            config: Arc::new(config),
            jobs: Arc::new(JobRegistry::new()),
            label_studio,
            shutdown: CancellationToken::new(),
        }
    }

    /// The Label Studio client, or a 503 if none is configured.
    pub fn label_studio(&self) -> AppResult<&LabelStudioApi> {
        self.label_studio.as_ref().ok_or_else(|| {
            AppError::NotConfigured("Set LABEL_STUDIO_API_KEY to enable Label Studio".into())
        })
    }
}
