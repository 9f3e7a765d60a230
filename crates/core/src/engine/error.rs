//! Error types for the orchestrator.
//!
//! These are returned before an event stream starts. Once a run is under
//! way, failures are reported on the stream instead.

use crate::hitl::HitlError;
use crate::session::StoreError;
use mloop_protocol::process_models::{OrchestrationState, SessionStatus};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// No session is stored under the id.
    #[error("Session '{0}' not found")]
    SessionNotFound(String),

    /// The session has reached a terminal status.
    #[error("Session '{session_id}' is {status} and cannot be resumed")]
    NotResumable {
        session_id: String,
        status: SessionStatus,
    },

    /// A response was submitted for a session that is not paused at a checkpoint.
    #[error("Session '{session_id}' is not awaiting review (status: {status}, state: {state})")]
    NotAwaitingReview {
        session_id: String,
        status: SessionStatus,
        state: OrchestrationState,
    },

    /// Option overrides were sent with an answer that does not modify the phase.
    #[error("Option '{option_id}' at '{checkpoint_id}' does not accept option overrides")]
    OverridesRequireModify {
        checkpoint_id: String,
        option_id: String,
    },

    #[error(transparent)]
    Hitl(#[from] HitlError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Type alias for Result with OrchestratorError.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
