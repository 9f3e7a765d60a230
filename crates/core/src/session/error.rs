//! Error types for the session store.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing persisted sessions.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A file or directory operation failed.
    #[error("Session store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A value could not be encoded as JSON.
    #[error("Failed to serialize session data: {0}")]
    Serialize(#[source] serde_json::Error),

    /// A stored file is not valid JSON for the expected type.
    #[error("Failed to parse {path}: {source}")]
    Deserialize {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The session id would escape the store root or is empty.
    #[error("Invalid session id '{0}'")]
    InvalidSessionId(String),

    /// An artifact name would escape the artifacts directory or is empty.
    #[error("Invalid artifact name '{0}'")]
    InvalidName(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Type alias for Result with StoreError.
pub type StoreResult<T> = Result<T, StoreError>;
