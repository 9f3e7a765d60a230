//! Error types for checkpoint handling.

use mloop_protocol::process_models::OrchestrationState;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HitlError {
    /// The state is not a review state. Callers should never ask for one.
    #[error("No checkpoint is defined for state {0:?}")]
    NoCheckpoint(OrchestrationState),

    /// The option is not part of the checkpoint's vocabulary.
    #[error("Unknown option '{option_id}' for checkpoint '{checkpoint_id}' (expected one of: {expected})")]
    UnknownOption {
        checkpoint_id: String,
        option_id: String,
        expected: String,
    },
}

/// Type alias for Result with HitlError.
pub type HitlResult<T> = Result<T, HitlError>;
