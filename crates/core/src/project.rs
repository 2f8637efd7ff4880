//! On-disk project layout and metadata files.
//!
//! A project is a directory under the data root:
//!
//! ```text
//! <data_dir>/<name>/
//!     project.yaml                 ProjectConfig
//!     label_config.xml             Label Studio labeling interface
//!     label_studio_metadata.yaml   LabelStudioMetadata
//!     videos/                      reformatted videos
//!     videos_snippets/             high-motion clips for labeling
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::labeling::{self, LABELING_CONFIG_FILENAME};

pub const PROJECT_CONFIG_FILENAME: &str = "project.yaml";
pub const LABELSTUDIO_METADATA_FILENAME: &str = "label_studio_metadata.yaml";
pub const VIDEOS_DIR: &str = "videos";
pub const SNIPPETS_DIR: &str = "videos_snippets";

/// Maximum project name length.
pub const MAX_PROJECT_NAME_LEN: usize = 64;

/// Validate a project name: 1-64 characters of `[A-Za-z0-9_-]`.
///
/// Names become directory names, so separators and dots are rejected.
pub fn validate_project_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::Validation(
            "Project name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_PROJECT_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Project name must be at most {MAX_PROJECT_NAME_LEN} characters"
        )));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(CoreError::Validation(format!(
            "Project name contains invalid character '{bad}'"
        )));
    }
    Ok(())
}

/// Paths of every file and directory belonging to one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root: PathBuf,
}

impl ProjectPaths {
    pub fn new(data_dir: &Path, name: &str) -> Result<Self, CoreError> {
        validate_project_name(name)?;
        Ok(Self {
            root: data_dir.join(name),
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(PROJECT_CONFIG_FILENAME)
    }

    pub fn labeling_config_file(&self) -> PathBuf {
        self.root.join(LABELING_CONFIG_FILENAME)
    }

    pub fn labelstudio_metadata_file(&self) -> PathBuf {
        self.root.join(LABELSTUDIO_METADATA_FILENAME)
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.root.join(VIDEOS_DIR)
    }

    pub fn snippets_dir(&self) -> PathBuf {
        self.root.join(SNIPPETS_DIR)
    }

    pub fn exists(&self) -> bool {
        self.config_file().is_file()
    }
}

/// Contents of `project.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub keypoints: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ProjectConfig {
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        load_yaml(path, "Project config")
    }

    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        save_yaml(path, self)
    }
}

/// Contents of `label_studio_metadata.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelStudioMetadata {
    pub project_name: String,
    pub id: i64,
    pub created_at: String,
    pub api_key: String,
    pub n_labeled_tasks: i64,
    pub n_total_tasks: i64,
}

impl LabelStudioMetadata {
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        load_yaml(path, "Label Studio metadata")
    }

    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        save_yaml(path, self)
    }
}

/// Create a new project directory with its config and labeling interface.
///
/// Fails with [`CoreError::Conflict`] if the project already exists.
pub fn create_project(
    data_dir: &Path,
    name: &str,
    keypoints: Vec<String>,
) -> Result<ProjectConfig, CoreError> {
    let paths = ProjectPaths::new(data_dir, name)?;
    labeling::validate_keypoints(&keypoints)?;
    if paths.exists() {
        return Err(CoreError::Conflict(format!(
            "Project '{name}' already exists"
        )));
    }

    std::fs::create_dir_all(paths.videos_dir())?;
    let config = ProjectConfig {
        name: name.to_string(),
        keypoints,
        created_at: Utc::now(),
    };
    labeling::write_labeling_config(&paths.root, LABELING_CONFIG_FILENAME, &config.keypoints)?;
    config.save(&paths.config_file())?;

    tracing::info!(project = name, root = %paths.root.display(), "Project created");
    Ok(config)
}

/// Load a project by name.
pub fn load_project(data_dir: &Path, name: &str) -> Result<(ProjectPaths, ProjectConfig), CoreError> {
    let paths = ProjectPaths::new(data_dir, name)?;
    if !paths.exists() {
        return Err(CoreError::NotFound {
            entity: "Project",
            id: name.to_string(),
        });
    }
    let config = ProjectConfig::load(&paths.config_file())?;
    Ok((paths, config))
}

/// Replace a project's keypoints and regenerate its labeling config.
pub fn update_keypoints(
    data_dir: &Path,
    name: &str,
    keypoints: Vec<String>,
) -> Result<ProjectConfig, CoreError> {
    let (paths, mut config) = load_project(data_dir, name)?;
    labeling::validate_keypoints(&keypoints)?;
    config.keypoints = keypoints;
    labeling::write_labeling_config(&paths.root, LABELING_CONFIG_FILENAME, &config.keypoints)?;
    config.save(&paths.config_file())?;
    Ok(config)
}

/// All projects under `data_dir`, sorted by name.
///
/// Directories without a readable `project.yaml` are skipped.
pub fn list_projects(data_dir: &Path) -> Result<Vec<ProjectConfig>, CoreError> {
    if !data_dir.exists() {
        return Ok(Vec::new());
    }
    let mut projects = Vec::new();
    for entry in std::fs::read_dir(data_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let config_file = entry.path().join(PROJECT_CONFIG_FILENAME);
        if !config_file.is_file() {
            continue;
        }
        match ProjectConfig::load(&config_file) {
            Ok(config) => projects.push(config),
            Err(e) => {
                tracing::warn!(path = %config_file.display(), error = %e, "Skipping unreadable project");
            }
        }
    }
    projects.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(projects)
}

/// Video files (`.mp4`) in the project's videos directory, sorted.
pub fn list_videos(paths: &ProjectPaths) -> Result<Vec<String>, CoreError> {
    let dir = paths.videos_dir();
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut videos = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "mp4") {
            if let Some(name) = path.file_name() {
                videos.push(name.to_string_lossy().to_string());
            }
        }
    }
    videos.sort();
    Ok(videos)
}

fn load_yaml<T: serde::de::DeserializeOwned>(
    path: &Path,
    entity: &'static str,
) -> Result<T, CoreError> {
    let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CoreError::NotFound {
            entity,
            id: path.display().to_string(),
        },
        _ => CoreError::from(e),
    })?;
    Ok(serde_yaml::from_str(&contents)?)
}

fn save_yaml<T: Serialize>(path: &Path, value: &T) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_yaml::to_string(value)?)?;
    Ok(())
}
