//! Bootstrapping and syncing the Label Studio side of an app project.

use chrono::Local;
use lpa_core::error::CoreError;
use lpa_core::project::{LabelStudioMetadata, ProjectPaths};

use crate::api::{LabelStudioApi, LabelStudioError};

/// Local-time format of `created_at` in the metadata file.
pub const METADATA_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    LabelStudio(#[from] LabelStudioError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Create the Label Studio project backing `paths` and connect its data.
///
/// Reads the labeling config from the project directory, creates the
/// Label Studio project, registers the project directory as a local-files
/// storage and imports what is already there. Only then is
/// `label_studio_metadata.yaml` persisted with zeroed task counters; a
/// failed attempt leaves no metadata behind.
pub async fn create_labeling_project(
    api: &LabelStudioApi,
    paths: &ProjectPaths,
    project_name: &str,
) -> Result<LabelStudioMetadata, SetupError> {
    let metadata_file = paths.labelstudio_metadata_file();
    if metadata_file.exists() {
        return Err(CoreError::Conflict(format!(
            "Label Studio project for '{project_name}' already exists"
        ))
        .into());
    }

    let config_file = paths.labeling_config_file();
    let label_config = tokio::fs::read_to_string(&config_file)
        .await
        .map_err(|_| {
            tracing::warn!(path = %config_file.display(), "Cannot find labeling config");
            CoreError::NotFound {
                entity: "Labeling config",
                id: config_file.display().to_string(),
            }
        })?;

    tracing::debug!(url = api.base_url(), "Connecting to Label Studio");
    api.check_connection().await?;

    tracing::info!(project = project_name, "Creating Label Studio project");
    let project = api.create_project(project_name, &label_config).await?;

    tracing::info!(project_id = project.id, "Creating Label Studio data source");
    let storage = api
        .create_local_storage(project.id, &paths.root.to_string_lossy())
        .await?;
    api.sync_local_storage(storage.id).await?;

    // Written last: its presence marks the project as fully connected.
    let metadata = LabelStudioMetadata {
        project_name: project_name.to_string(),
        id: project.id,
        created_at: Local::now().format(METADATA_TIMESTAMP_FORMAT).to_string(),
        api_key: api.api_key().to_string(),
        n_labeled_tasks: 0,
        n_total_tasks: 0,
    };
    metadata.save(&metadata_file)?;
    tracing::info!(project_id = project.id, storage_id = storage.id, "Label Studio project ready");

    Ok(metadata)
}

/// Refresh the labeled/total task counters stored in the project metadata.
pub async fn refresh_task_counts(
    api: &LabelStudioApi,
    paths: &ProjectPaths,
) -> Result<LabelStudioMetadata, SetupError> {
    let metadata_file = paths.labelstudio_metadata_file();
    let mut metadata = LabelStudioMetadata::load(&metadata_file)?;

    let project = api.get_project(metadata.id).await?;
    metadata.n_total_tasks = project.task_number.unwrap_or(0);
    metadata.n_labeled_tasks = project.num_tasks_with_annotations.unwrap_or(0);
    metadata.save(&metadata_file)?;

    tracing::debug!(
        project_id = metadata.id,
        labeled = metadata.n_labeled_tasks,
        total = metadata.n_total_tasks,
        "Label Studio task counts refreshed"
    );
    Ok(metadata)
}
