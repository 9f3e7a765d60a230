//! Configuration loading and management.
//!
//! This module loads `.mloop/config.toml` and the project file `mloop.yaml`
//! and turns them into run options and a session store location.

pub mod error;
pub mod loader;
pub mod models;

pub use error::{ConfigError, ConfigResult};
pub use loader::load_config;
pub use models::{AppConfig, ProjectConfig, TaskSettings};
