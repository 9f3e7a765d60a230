//! The static checkpoint table.
//!
//! One definition per review state. The table is a process-wide constant,
//! built at compile time and safe to read from any number of concurrent runs.

use mloop_protocol::hitl_models::{HitlOption, HitlResponseAction};
use mloop_protocol::process_models::OrchestrationState;

/// Sentinel threshold for checkpoints that never auto-approve.
pub const NEVER_AUTO_APPROVE: f64 = f64::MAX;

/// A selectable option at a checkpoint and the action it maps to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckpointOption {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub action: HitlResponseAction,
    pub is_default: bool,
}

impl CheckpointOption {
    const fn new(
        id: &'static str,
        label: &'static str,
        description: &'static str,
        action: HitlResponseAction,
        is_default: bool,
    ) -> Self {
        Self {
            id,
            label,
            description,
            action,
            is_default,
        }
    }

    pub fn to_hitl_option(&self) -> HitlOption {
        HitlOption {
            id: self.id.to_string(),
            label: self.label.to_string(),
            description: self.description.to_string(),
            is_default: self.is_default,
        }
    }
}

const CANCEL: CheckpointOption = CheckpointOption::new(
    "cancel",
    "Cancel",
    "Stop the orchestration and mark the session cancelled",
    HitlResponseAction::Cancel,
    false,
);

/// A human-in-the-loop decision point attached to a review state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckpointDefinition {
    pub id: &'static str,
    pub state: OrchestrationState,
    /// Phase number, 1-5.
    pub phase: u8,
    pub name: &'static str,
    pub question: &'static str,
    /// Never auto-approve, whatever the confidence.
    pub requires_explicit_approval: bool,
    /// Confidence in [0, 1] at or above which the checkpoint may auto-approve.
    pub auto_approval_threshold: f64,
    /// Non-empty, exactly one entry is the default.
    pub options: &'static [CheckpointOption],
}

impl CheckpointDefinition {
    pub fn default_option(&self) -> Option<&'static CheckpointOption> {
        self.options.iter().find(|o| o.is_default)
    }

    /// Find an option by id, or by the name of the action it maps to.
    ///
    /// Matching ignores case and surrounding whitespace.
    pub fn find_option(&self, option_id: &str) -> Option<&'static CheckpointOption> {
        let wanted = option_id.trim().to_lowercase();
        self.options
            .iter()
            .find(|o| o.id == wanted)
            .or_else(|| self.options.iter().find(|o| o.action.to_string() == wanted))
    }
}

pub static CHECKPOINTS: [CheckpointDefinition; 5] = [
    CheckpointDefinition {
        id: "data-analysis-review",
        state: OrchestrationState::DataAnalysisReview,
        phase: 1,
        name: "Data Analysis Review",
        question: "Review the dataset profile. Is the detected target and data quality acceptable?",
        requires_explicit_approval: false,
        auto_approval_threshold: 0.85,
        options: &[
            CheckpointOption::new(
                "approve",
                "Approve",
                "Accept the analysis and continue to model recommendation",
                HitlResponseAction::Proceed,
                true,
            ),
            CheckpointOption::new(
                "modify",
                "Modify",
                "Adjust the target column or task type and re-run the analysis",
                HitlResponseAction::Modify,
                false,
            ),
            CANCEL,
        ],
    },
    CheckpointDefinition {
        id: "model-selection-review",
        state: OrchestrationState::ModelSelectionReview,
        phase: 2,
        name: "Model Selection Review",
        question: "Review the recommended trainers and metric. Proceed with this model selection?",
        requires_explicit_approval: false,
        auto_approval_threshold: 0.80,
        options: &[
            CheckpointOption::new(
                "approve",
                "Approve",
                "Accept the recommendation and continue to preprocessing",
                HitlResponseAction::Proceed,
                true,
            ),
            CheckpointOption::new(
                "modify",
                "Modify",
                "Change the task type or metric and re-run the recommendation",
                HitlResponseAction::Modify,
                false,
            ),
            CANCEL,
        ],
    },
    CheckpointDefinition {
        id: "preprocessing-review",
        state: OrchestrationState::PreprocessingReview,
        phase: 3,
        name: "Preprocessing Review",
        question: "Review the preprocessing steps. Apply them before training?",
        requires_explicit_approval: false,
        auto_approval_threshold: 0.90,
        options: &[
            CheckpointOption::new(
                "approve",
                "Approve",
                "Apply the preprocessing plan and continue to training",
                HitlResponseAction::Proceed,
                true,
            ),
            CheckpointOption::new(
                "skip",
                "Skip",
                "Train on the raw data without preprocessing",
                HitlResponseAction::Skip,
                false,
            ),
            CheckpointOption::new(
                "retry",
                "Retry",
                "Generate the preprocessing plan again",
                HitlResponseAction::Retry,
                false,
            ),
            CANCEL,
        ],
    },
    CheckpointDefinition {
        id: "training-review",
        state: OrchestrationState::TrainingReview,
        phase: 4,
        name: "Training Review",
        question: "Review the trained model and its metric. Accept this model?",
        requires_explicit_approval: true,
        auto_approval_threshold: NEVER_AUTO_APPROVE,
        options: &[
            CheckpointOption::new(
                "approve",
                "Accept",
                "Accept the model and continue to deployment",
                HitlResponseAction::Proceed,
                true,
            ),
            CheckpointOption::new(
                "retry",
                "Retrain",
                "Run training again",
                HitlResponseAction::Retry,
                false,
            ),
            CANCEL,
        ],
    },
    CheckpointDefinition {
        id: "deployment-review",
        state: OrchestrationState::DeploymentReview,
        phase: 5,
        name: "Deployment Review",
        question: "How should the trained model be released?",
        requires_explicit_approval: true,
        auto_approval_threshold: NEVER_AUTO_APPROVE,
        options: &[
            CheckpointOption::new(
                "deploy",
                "Deploy",
                "Promote the model to the serving target",
                HitlResponseAction::Deploy,
                true,
            ),
            CheckpointOption::new(
                "export",
                "Export",
                "Export the model artifact without serving it",
                HitlResponseAction::Export,
                false,
            ),
            CheckpointOption::new(
                "save",
                "Save",
                "Keep the model in the registry only",
                HitlResponseAction::Save,
                false,
            ),
            CANCEL,
        ],
    },
];

/// The checkpoint attached to a review state.
pub fn checkpoint_for(state: OrchestrationState) -> Option<&'static CheckpointDefinition> {
    CHECKPOINTS.iter().find(|c| c.state == state)
}

pub fn checkpoint_by_id(id: &str) -> Option<&'static CheckpointDefinition> {
    CHECKPOINTS.iter().find(|c| c.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_review_state_has_a_checkpoint() {
        for work in OrchestrationState::WORK_STATES {
            let review = work.review_state().unwrap();
            let checkpoint = checkpoint_for(review).unwrap();
            assert_eq!(Some(checkpoint.phase), review.phase_number());
        }
        assert!(checkpoint_for(OrchestrationState::Training).is_none());
        assert!(checkpoint_for(OrchestrationState::Completed).is_none());
    }

    #[test]
    fn test_each_checkpoint_has_exactly_one_default_and_cancel() {
        for checkpoint in &CHECKPOINTS {
            assert!(!checkpoint.options.is_empty());
            let defaults = checkpoint.options.iter().filter(|o| o.is_default).count();
            assert_eq!(defaults, 1, "{}", checkpoint.id);
            assert_eq!(
                checkpoint.find_option("cancel").map(|o| o.action),
                Some(HitlResponseAction::Cancel)
            );
        }
    }

    #[test]
    fn test_thresholds_are_probabilities_or_sentinel() {
        for checkpoint in &CHECKPOINTS {
            if checkpoint.requires_explicit_approval {
                assert_eq!(checkpoint.auto_approval_threshold, NEVER_AUTO_APPROVE);
            } else {
                assert!((0.0..=1.0).contains(&checkpoint.auto_approval_threshold));
            }
        }
    }

    #[test]
    fn test_find_option_by_id_or_action() {
        let checkpoint = checkpoint_by_id("data-analysis-review").unwrap();
        assert_eq!(
            checkpoint.find_option(" Approve ").map(|o| o.action),
            Some(HitlResponseAction::Proceed)
        );
        assert_eq!(
            checkpoint.find_option("proceed").map(|o| o.id),
            Some("approve")
        );
        assert!(checkpoint.find_option("deploy").is_none());
    }
}
