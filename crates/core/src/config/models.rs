//! Configuration models that aggregate all settings.
//!
//! `AppConfig` combines the global settings from `.mloop/config.toml` with
//! the project description from `mloop.yaml`.

use crate::hitl::HitlCheckpointManager;
use crate::session::OrchestrationSessionStore;
use mloop_protocol::config_models::GlobalConfig;
use mloop_protocol::pipeline_models::{OrchestrationOptions, TaskType};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Project description from `mloop.yaml`.
///
/// ```yaml
/// project: churn-prediction
/// task:
///   type: binary-classification
///   label: churned
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub project: Option<String>,

    #[serde(default)]
    pub task: TaskSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSettings {
    #[serde(rename = "type", default)]
    pub task_type: Option<TaskType>,

    /// Target column.
    #[serde(default)]
    pub label: Option<String>,
}

/// Unified application configuration for one project directory.
///
/// # Example
///
/// ```rust,no_run
/// use mloop_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// let options = config.orchestration_options();
/// println!("Target column: {:?}", options.target_column);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Project directory the configuration was loaded from.
    pub root: PathBuf,

    /// Global settings from `.mloop/config.toml`.
    pub global: GlobalConfig,

    /// Project settings from `mloop.yaml`.
    pub project: ProjectConfig,
}

impl AppConfig {
    /// Run options from the project file and configured defaults.
    ///
    /// Command-line flags are applied on top of these by the caller.
    pub fn orchestration_options(&self) -> OrchestrationOptions {
        let defaults = &self.global.orchestration;
        let mut options = OrchestrationOptions {
            target_column: self.project.task.label.clone(),
            task_type: self.project.task.task_type,
            optimization_metric: defaults.optimization_metric.clone(),
            ..OrchestrationOptions::default()
        };

        if let Some(seconds) = defaults.max_training_time_seconds {
            options.max_training_time_seconds = seconds;
        }
        if let Some(auto) = defaults.auto_approve_high_confidence {
            options.auto_approve_high_confidence = auto;
        }
        if let Some(threshold) = defaults.auto_approval_threshold {
            options.auto_approval_threshold = threshold;
        }
        options
    }

    /// Session storage directory, relative paths resolved against the project root.
    pub fn storage_dir(&self) -> PathBuf {
        match &self.global.storage_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.root.join(dir),
            None => self.root.join(".mloop").join("sessions"),
        }
    }

    pub fn session_store(&self) -> OrchestrationSessionStore {
        OrchestrationSessionStore::new(self.storage_dir())
    }

    pub fn checkpoint_manager(&self) -> HitlCheckpointManager {
        HitlCheckpointManager::new(self.global.agentic.clone())
    }
}
