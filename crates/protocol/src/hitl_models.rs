//! Human-in-the-loop request, decision and snapshot models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use ts_rs::TS;

use crate::context_models::OrchestrationContext;
use crate::pipeline_models::OptionOverrides;
use crate::process_models::{OrchestrationState, SessionStatus};

/// The closed set of actions a checkpoint response can map to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "lowercase")]
pub enum HitlResponseAction {
    /// Accept the phase result and continue.
    Proceed,
    /// Re-run the reviewed phase after the reviewer adjusted its inputs.
    Modify,
    /// Re-run the reviewed phase as is.
    Retry,
    /// Continue without the reviewed phase's output.
    Skip,
    /// Stop the orchestration.
    Cancel,
    /// Promote the model to serving.
    Deploy,
    /// Export the model artifact.
    Export,
    /// Keep the model in the registry only.
    Save,
}

impl fmt::Display for HitlResponseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Proceed => "proceed",
            Self::Modify => "modify",
            Self::Retry => "retry",
            Self::Skip => "skip",
            Self::Cancel => "cancel",
            Self::Deploy => "deploy",
            Self::Export => "export",
            Self::Save => "save",
        };
        f.write_str(label)
    }
}

/// A selectable option presented at a checkpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct HitlOption {
    pub id: String,
    pub label: String,
    pub description: String,
    pub is_default: bool,
}

/// A checkpoint pause, asking a human to choose how to continue.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct HitlRequest {
    pub session_id: String,
    pub checkpoint_id: String,
    pub checkpoint_name: String,
    pub question: String,
    /// Phase facts the reviewer needs, keyed by a short name.
    pub context: BTreeMap<String, String>,
    pub options: Vec<HitlOption>,
}

impl HitlRequest {
    pub fn default_option(&self) -> Option<&HitlOption> {
        self.options.iter().find(|o| o.is_default)
    }
}

/// A recorded answer to a checkpoint. Decisions are append-only.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct HitlDecision {
    pub checkpoint_id: String,
    pub state: OrchestrationState,
    pub option_id: String,
    pub action: HitlResponseAction,
    #[serde(default)]
    pub comment: Option<String>,
    /// Option changes carried by a `modify` answer.
    #[serde(default)]
    pub overrides: Option<OptionOverrides>,
    /// Set when the checkpoint policy approved without asking anyone.
    #[serde(default)]
    pub auto_approved: bool,
    pub decided_at: DateTime<Utc>,
}

/// A named snapshot of a session taken during a run.
#[derive(Serialize, Deserialize, Debug, Clone, TS)]
pub struct SessionCheckpoint {
    pub name: String,
    pub state: OrchestrationState,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub context: OrchestrationContext,
}
