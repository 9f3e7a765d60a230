//! Agent roles that perform pipeline phase work.
//!
//! Each work phase is delegated to a collaborator acting in one of these
//! roles. The role is reported in `AgentStarted`/`AgentCompleted` events so
//! the CLI can show who is working.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::process_models::OrchestrationState;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "kebab-case")]
pub enum AgentType {
    /// Profiles the dataset and detects the target column.
    DataAnalyst,

    /// Recommends a task type, trainers and an optimization metric.
    ModelArchitect,

    /// Plans and runs data preprocessing.
    PreprocessingExpert,

    /// Drives training and deployment.
    MlopsManager,
}

impl AgentType {
    /// The agent responsible for a work state.
    ///
    /// Review states resolve to the agent of the phase they review.
    pub fn for_state(state: OrchestrationState) -> Option<Self> {
        let work = if state.is_review() {
            state.work_state()?
        } else {
            state
        };
        match work {
            OrchestrationState::DataAnalysis => Some(Self::DataAnalyst),
            OrchestrationState::ModelRecommendation => Some(Self::ModelArchitect),
            OrchestrationState::Preprocessing => Some(Self::PreprocessingExpert),
            OrchestrationState::Training | OrchestrationState::Deployment => {
                Some(Self::MlopsManager)
            }
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::DataAnalyst => "Data Analyst",
            Self::ModelArchitect => "Model Architect",
            Self::PreprocessingExpert => "Preprocessing Expert",
            Self::MlopsManager => "MLOps Manager",
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
