//! Orchestration event protocol.
//!
//! The orchestrator reports progress exclusively through a stream of
//! [`OrchestrationEvent`]s. Consumers (the CLI, or any front-end built on the
//! generated TypeScript bindings) match on the closed set of variants.
//!
//! Uses tagged enum serialization for TypeScript compatibility:
//! ```json
//! {
//!   "type": "phaseCompleted",
//!   "payload": {
//!     "phase_number": 1,
//!     "phase_name": "Data Analysis",
//!     "duration_ms": 5210,
//!     "confidence": 0.91
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use ts_rs::TS;

use crate::agent_models::AgentType;
use crate::hitl_models::{HitlRequest, HitlResponseAction};
use crate::process_models::OrchestrationState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum OrchestrationEvent {
    /// A new session was created and persisted.
    OrchestrationStarted {
        session_id: String,
        data_file_path: PathBuf,
    },

    /// A persisted session is continuing from `state`.
    OrchestrationResumed {
        session_id: String,
        state: OrchestrationState,
    },

    /// A work phase began.
    PhaseStarted { phase_number: u8, phase_name: String },

    /// A work phase finished and its result was stored.
    PhaseCompleted {
        phase_number: u8,
        phase_name: String,
        duration_ms: u64,
        confidence: f64,
    },

    /// A collaborator was invoked.
    AgentStarted { agent_type: AgentType },

    /// A collaborator returned.
    AgentCompleted { agent_type: AgentType, duration_ms: u64 },

    /// Overall pipeline progress.
    ProgressUpdate {
        current_operation: String,
        percentage: f64,
    },

    /// The run paused at a checkpoint. The stream ends after this event.
    HitlRequested(HitlRequest),

    /// The checkpoint policy let the run continue without asking.
    CheckpointAutoApproved {
        checkpoint_id: String,
        confidence: f64,
    },

    /// A human decision recorded while paused was applied.
    HitlResponseReceived {
        session_id: String,
        checkpoint_id: String,
        selected_option_id: String,
        action: HitlResponseAction,
    },

    /// Every phase finished.
    OrchestrationCompleted {
        session_id: String,
        total_duration_ms: u64,
    },

    /// A phase failed. The session is persisted as failed.
    OrchestrationFailed { session_id: String, error: String },

    /// The run was cancelled. The session is persisted as cancelled.
    OrchestrationCancelled { session_id: String },
}

impl OrchestrationEvent {
    /// Whether this event ends the session for good.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::OrchestrationCompleted { .. }
                | Self::OrchestrationFailed { .. }
                | Self::OrchestrationCancelled { .. }
        )
    }
}
