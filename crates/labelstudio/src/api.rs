//! REST API client for a Label Studio server.
//!
//! Wraps the handful of endpoints the app needs (health, project creation
//! and lookup, local-files storage) using [`reqwest`]. Every request carries
//! the `Authorization: Token <key>` header Label Studio expects.

use serde::{Deserialize, Serialize};

/// HTTP client for a single Label Studio instance.
#[derive(Clone)]
pub struct LabelStudioApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Errors from the Label Studio REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum LabelStudioError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Label Studio returned a non-2xx status code.
    #[error("Label Studio API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// A Label Studio project as returned by `/api/projects`.
#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    /// Total number of tasks (images) in the project.
    #[serde(default)]
    pub task_number: Option<i64>,
    /// Number of tasks with at least one annotation.
    #[serde(default)]
    pub num_tasks_with_annotations: Option<i64>,
}

/// A local-files storage connection.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalStorage {
    pub id: i64,
    pub project: i64,
    pub path: String,
}

#[derive(Serialize)]
struct CreateProject<'a> {
    title: &'a str,
    label_config: &'a str,
}

#[derive(Serialize)]
struct CreateLocalStorage<'a> {
    path: &'a str,
    project: i64,
}

impl LabelStudioApi {
    /// Create a new API client.
    ///
    /// * `base_url` - e.g. `http://localhost:8080`; a trailing slash is ignored.
    /// * `api_key` - the user's access token.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            api_key: api_key.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Verify the server is reachable (`GET /health`).
    pub async fn check_connection(&self) -> Result<(), LabelStudioError> {
        let response = self.get("/health").send().await?;
        Self::check_status(response).await
    }

    /// Create a project with the given labeling interface (`POST /api/projects`).
    pub async fn create_project(
        &self,
        title: &str,
        label_config: &str,
    ) -> Result<Project, LabelStudioError> {
        let response = self
            .post("/api/projects")
            .json(&CreateProject {
                title,
                label_config,
            })
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch a project, including its task counters (`GET /api/projects/{id}`).
    pub async fn get_project(&self, project_id: i64) -> Result<Project, LabelStudioError> {
        let response = self
            .get(&format!("/api/projects/{project_id}"))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Connect a server-local directory as a project's data source
    /// (`POST /api/storages/localfiles`).
    pub async fn create_local_storage(
        &self,
        project_id: i64,
        path: &str,
    ) -> Result<LocalStorage, LabelStudioError> {
        let response = self
            .post("/api/storages/localfiles")
            .json(&CreateLocalStorage {
                path,
                project: project_id,
            })
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Import new files from a local-files storage
    /// (`POST /api/storages/localfiles/{id}/sync`).
    pub async fn sync_local_storage(&self, storage_id: i64) -> Result<(), LabelStudioError> {
        let response = self
            .post(&format!("/api/storages/localfiles/{storage_id}/sync"))
            .send()
            .await?;

        Self::check_status(response).await
    }

    // ---- private helpers ----

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{path}", self.base_url))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{path}", self.base_url))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.api_key)
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`LabelStudioError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, LabelStudioError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(LabelStudioError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, LabelStudioError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), LabelStudioError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

impl std::fmt::Debug for LabelStudioApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelStudioApi")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
