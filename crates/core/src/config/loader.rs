//! Configuration file loader for a project directory.
//!
//! This module loads:
//! - `.mloop/config.toml`: Global settings
//! - `mloop.yaml`: Project task description

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::models::{AppConfig, ProjectConfig};
use mloop_protocol::config_models::GlobalConfig;
use std::path::Path;
use tracing::debug;

/// Loads all configuration for the project at `root`.
///
/// Missing files yield defaults rather than errors.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - Files exist but cannot be read
/// - Files have invalid TOML or YAML syntax
/// - Thresholds lie outside [0, 1]
///
/// # Example
///
/// ```rust,no_run
/// use mloop_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Sessions live in {}", config.storage_dir().display());
/// # Ok(())
/// # }
/// ```
pub async fn load_config(root: &Path) -> ConfigResult<AppConfig> {
    let global = load_global_config(root)?;
    let project = load_project_config(root)?;

    Ok(AppConfig {
        root: root.to_path_buf(),
        global,
        project,
    })
}

/// Loads global configuration from `.mloop/config.toml`.
fn load_global_config(root: &Path) -> ConfigResult<GlobalConfig> {
    let config_path = root.join(".mloop").join("config.toml");

    if !config_path.exists() {
        return Ok(GlobalConfig::default());
    }

    let content =
        std::fs::read_to_string(&config_path).map_err(|source| ConfigError::FileRead {
            path: config_path.clone(),
            source,
        })?;

    let config: GlobalConfig =
        toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
            path: config_path.clone(),
            source,
        })?;

    validate_global(&config_path, &config)?;
    debug!(path = %config_path.display(), "Loaded global config");
    Ok(config)
}

fn validate_global(path: &Path, config: &GlobalConfig) -> ConfigResult<()> {
    let invalid = |reason: String| ConfigError::InvalidConfig {
        path: path.to_path_buf(),
        reason,
    };

    if let Some(threshold) = config.orchestration.auto_approval_threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(invalid(format!(
                "orchestration.auto_approval_threshold must be between 0 and 1, got {threshold}"
            )));
        }
    }

    if let Some(hitl) = config.agentic.as_ref().and_then(|a| a.hitl.as_ref()) {
        if !(0.0..=1.0).contains(&hitl.uncertainty_threshold) {
            return Err(invalid(format!(
                "agentic.hitl.uncertainty_threshold must be between 0 and 1, got {}",
                hitl.uncertainty_threshold
            )));
        }
    }

    Ok(())
}

/// Loads the project description from `mloop.yaml`.
fn load_project_config(root: &Path) -> ConfigResult<ProjectConfig> {
    let project_path = root.join("mloop.yaml");

    if !project_path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content =
        std::fs::read_to_string(&project_path).map_err(|source| ConfigError::FileRead {
            path: project_path.clone(),
            source,
        })?;

    // An empty file is a valid, empty project.
    if content.trim().is_empty() {
        return Ok(ProjectConfig::default());
    }

    let project: ProjectConfig =
        serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlParse {
            path: project_path.clone(),
            source,
        })?;

    debug!(path = %project_path.display(), "Loaded project config");
    Ok(project)
}
