//! Orchestration state machine and session lifecycle models.
//!
//! This module defines the pipeline phases an orchestration moves through,
//! the lifecycle status of a persisted session, and the session record
//! itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use ts_rs::TS;

use crate::context_models::OrchestrationContext;

/// The phase an orchestration is currently in.
///
/// Every work state is immediately followed by its review state:
///
/// ```text
/// NotStarted -> DataAnalysis -> DataAnalysisReview -> ModelRecommendation
///   -> ModelSelectionReview -> Preprocessing -> PreprocessingReview
///   -> Training -> TrainingReview -> Deployment -> DeploymentReview -> Completed
/// ```
///
/// `Completed`, `Failed` and `Cancelled` are terminal.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrchestrationState {
    NotStarted,
    DataAnalysis,
    DataAnalysisReview,
    ModelRecommendation,
    ModelSelectionReview,
    Preprocessing,
    PreprocessingReview,
    Training,
    TrainingReview,
    Deployment,
    DeploymentReview,
    Completed,
    Failed,
    Cancelled,
}

impl OrchestrationState {
    /// All work states in execution order.
    pub const WORK_STATES: [OrchestrationState; 5] = [
        Self::DataAnalysis,
        Self::ModelRecommendation,
        Self::Preprocessing,
        Self::Training,
        Self::Deployment,
    ];

    /// The first work state of every orchestration.
    pub fn first_phase() -> Self {
        Self::DataAnalysis
    }

    /// Whether no further transitions may leave this state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether this state is a human-in-the-loop review point.
    pub fn is_review(self) -> bool {
        matches!(
            self,
            Self::DataAnalysisReview
                | Self::ModelSelectionReview
                | Self::PreprocessingReview
                | Self::TrainingReview
                | Self::DeploymentReview
        )
    }

    /// Whether this state performs phase work.
    pub fn is_work(self) -> bool {
        Self::WORK_STATES.contains(&self)
    }

    /// The review state that follows a work state.
    pub fn review_state(self) -> Option<Self> {
        match self {
            Self::DataAnalysis => Some(Self::DataAnalysisReview),
            Self::ModelRecommendation => Some(Self::ModelSelectionReview),
            Self::Preprocessing => Some(Self::PreprocessingReview),
            Self::Training => Some(Self::TrainingReview),
            Self::Deployment => Some(Self::DeploymentReview),
            _ => None,
        }
    }

    /// The work state a review state reviews.
    pub fn work_state(self) -> Option<Self> {
        match self {
            Self::DataAnalysisReview => Some(Self::DataAnalysis),
            Self::ModelSelectionReview => Some(Self::ModelRecommendation),
            Self::PreprocessingReview => Some(Self::Preprocessing),
            Self::TrainingReview => Some(Self::Training),
            Self::DeploymentReview => Some(Self::Deployment),
            _ => None,
        }
    }

    /// The state entered once a review state is approved.
    ///
    /// Returns `None` for states that are not review states.
    pub fn next_after_review(self) -> Option<Self> {
        match self {
            Self::DataAnalysisReview => Some(Self::ModelRecommendation),
            Self::ModelSelectionReview => Some(Self::Preprocessing),
            Self::PreprocessingReview => Some(Self::Training),
            Self::TrainingReview => Some(Self::Deployment),
            Self::DeploymentReview => Some(Self::Completed),
            _ => None,
        }
    }

    /// Phase number (1-5) shared by a work state and its review state.
    pub fn phase_number(self) -> Option<u8> {
        match self {
            Self::DataAnalysis | Self::DataAnalysisReview => Some(1),
            Self::ModelRecommendation | Self::ModelSelectionReview => Some(2),
            Self::Preprocessing | Self::PreprocessingReview => Some(3),
            Self::Training | Self::TrainingReview => Some(4),
            Self::Deployment | Self::DeploymentReview => Some(5),
            _ => None,
        }
    }

    /// Human-readable phase name.
    pub fn phase_name(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::DataAnalysis => "Data Analysis",
            Self::DataAnalysisReview => "Data Analysis Review",
            Self::ModelRecommendation => "Model Recommendation",
            Self::ModelSelectionReview => "Model Selection Review",
            Self::Preprocessing => "Preprocessing",
            Self::PreprocessingReview => "Preprocessing Review",
            Self::Training => "Training",
            Self::TrainingReview => "Training Review",
            Self::Deployment => "Deployment",
            Self::DeploymentReview => "Deployment Review",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrchestrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phase_name())
    }
}

/// Lifecycle status of a persisted orchestration session.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// The session is running or ready to continue.
    Active,

    /// The session is waiting for a human decision at a checkpoint.
    Paused,

    /// All phases finished.
    Completed,

    /// A phase failed; the session cannot be resumed.
    Failed,

    /// The session was cancelled by a decision or a cancellation request.
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Only active and paused sessions may be resumed.
    pub fn is_resumable(self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// One durable, resumable run of the orchestration state machine.
#[derive(Serialize, Deserialize, Debug, Clone, TS)]
pub struct OrchestrationSession {
    /// The state carried through the phases.
    pub context: OrchestrationContext,

    /// Current lifecycle status.
    pub status: SessionStatus,

    /// When the session was first created. Never changes.
    pub created_at: DateTime<Utc>,

    /// When the session was last saved.
    ///
    /// The session store refreshes this on every save, so it reflects the
    /// last save time rather than the last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl OrchestrationSession {
    pub fn new(context: OrchestrationContext, now: DateTime<Utc>) -> Self {
        Self {
            context,
            status: SessionStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.context.session_id
    }

    pub fn current_state(&self) -> OrchestrationState {
        self.context.current_state
    }
}

/// Lightweight listing entry for a session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct SessionSummary {
    pub session_id: String,
    pub data_file_path: PathBuf,
    pub current_state: OrchestrationState,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub error: Option<String>,
}

impl From<&OrchestrationSession> for SessionSummary {
    fn from(session: &OrchestrationSession) -> Self {
        Self {
            session_id: session.context.session_id.clone(),
            data_file_path: session.context.data_file_path.clone(),
            current_state: session.context.current_state,
            status: session.status,
            created_at: session.created_at,
            updated_at: session.updated_at,
            error: session.context.error.clone(),
        }
    }
}
