//! Configuration errors. Every variant names the file it came from.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// `.mloop/config.toml` is not valid TOML or does not match `GlobalConfig`.
    #[error("Malformed settings in {path}: {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// `mloop.yaml` is not valid YAML or names an unknown task type.
    #[error("Malformed project file {path}: {source}")]
    YamlParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// Parsed, but a value is out of range.
    #[error("Invalid value in {path}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
