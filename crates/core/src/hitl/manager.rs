//! Checkpoint policy: when to pause, what to ask, and how to read the answer.
//!
//! The `HitlCheckpointManager` holds no run state. It reads the static
//! checkpoint table, the run options and, when configured, an agentic
//! override policy.

use crate::hitl::checkpoints::{checkpoint_for, CheckpointDefinition, CheckpointOption};
use crate::hitl::error::{HitlError, HitlResult};
use mloop_protocol::config_models::{AgenticSettings, HitlPolicy, HitlSettings};
use mloop_protocol::context_models::OrchestrationContext;
use mloop_protocol::hitl_models::{HitlRequest, HitlResponseAction};
use mloop_protocol::pipeline_models::OrchestrationOptions;
use mloop_protocol::process_models::OrchestrationState;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct HitlCheckpointManager {
    settings: Option<AgenticSettings>,
}

impl HitlCheckpointManager {
    /// Create a manager. `settings` optionally overrides the table policy.
    pub fn new(settings: Option<AgenticSettings>) -> Self {
        Self { settings }
    }

    fn uncertainty_policy(&self) -> Option<&HitlSettings> {
        self.settings
            .as_ref()
            .and_then(|s| s.hitl.as_ref())
            .filter(|h| h.policy == HitlPolicy::OnUncertainty)
    }

    /// Decide whether a review state must pause for a human.
    ///
    /// Evaluation order:
    /// 1. `skip_hitl`, or a state without a checkpoint: never pause.
    /// 2. An `on-uncertainty` agentic policy: pause when confidence is below
    ///    its threshold, at allow-listed checkpoints only.
    /// 3. Checkpoints requiring explicit approval always pause.
    /// 4. Without `auto_approve_high_confidence`, always pause.
    /// 5. Otherwise pause when confidence is below
    ///    `min(checkpoint threshold, options threshold)`. Equal confidence proceeds.
    ///
    /// Non-finite confidence is treated as zero.
    pub fn should_trigger_hitl(
        &self,
        state: OrchestrationState,
        confidence: f64,
        options: &OrchestrationOptions,
    ) -> bool {
        if options.skip_hitl {
            return false;
        }
        let Some(checkpoint) = checkpoint_for(state) else {
            return false;
        };
        let confidence = if confidence.is_finite() { confidence } else { 0.0 };

        if let Some(policy) = self.uncertainty_policy() {
            let listed = policy.checkpoints.is_empty()
                || policy.checkpoints.iter().any(|id| id == checkpoint.id);
            return listed && confidence < policy.uncertainty_threshold;
        }

        if checkpoint.requires_explicit_approval {
            return true;
        }

        if !options.auto_approve_high_confidence {
            return true;
        }

        let threshold = checkpoint
            .auto_approval_threshold
            .min(options.auto_approval_threshold);
        confidence < threshold
    }

    /// Build the pause request for a review state.
    pub fn create_hitl_request(
        &self,
        state: OrchestrationState,
        context: &OrchestrationContext,
    ) -> HitlResult<HitlRequest> {
        let checkpoint = checkpoint_for(state).ok_or(HitlError::NoCheckpoint(state))?;

        let mut details = checkpoint_context(state, context);
        if let Some(confidence) = context.phase_confidence(state) {
            details.insert("confidence".to_string(), format!("{confidence:.2}"));
        }

        Ok(HitlRequest {
            session_id: context.session_id.clone(),
            checkpoint_id: checkpoint.id.to_string(),
            checkpoint_name: checkpoint.name.to_string(),
            question: checkpoint.question.to_string(),
            context: details,
            options: checkpoint
                .options
                .iter()
                .map(CheckpointOption::to_hitl_option)
                .collect(),
        })
    }

    /// Map a reviewer's option id to an action.
    ///
    /// `cancel` is accepted at every checkpoint. Anything outside the
    /// checkpoint's vocabulary is an `UnknownOption` error.
    pub fn process_response(
        &self,
        state: OrchestrationState,
        option_id: &str,
        _context: &OrchestrationContext,
    ) -> HitlResult<HitlResponseAction> {
        let checkpoint = checkpoint_for(state).ok_or(HitlError::NoCheckpoint(state))?;

        if option_id.trim().eq_ignore_ascii_case("cancel") {
            return Ok(HitlResponseAction::Cancel);
        }

        checkpoint
            .find_option(option_id)
            .map(|o| o.action)
            .ok_or_else(|| unknown_option(checkpoint, option_id))
    }

    /// The option applied when a checkpoint proceeds without a human.
    pub fn default_option(&self, state: OrchestrationState) -> HitlResult<&'static CheckpointOption> {
        checkpoint_for(state)
            .and_then(CheckpointDefinition::default_option)
            .ok_or(HitlError::NoCheckpoint(state))
    }
}

fn unknown_option(checkpoint: &CheckpointDefinition, option_id: &str) -> HitlError {
    HitlError::UnknownOption {
        checkpoint_id: checkpoint.id.to_string(),
        option_id: option_id.to_string(),
        expected: checkpoint
            .options
            .iter()
            .map(|o| o.id)
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// Facts from the phase result a review state is about.
fn checkpoint_context(
    state: OrchestrationState,
    context: &OrchestrationContext,
) -> BTreeMap<String, String> {
    let mut details = BTreeMap::new();
    let mut put = |key: &str, value: String| {
        details.insert(key.to_string(), value);
    };

    match state {
        OrchestrationState::DataAnalysisReview => {
            if let Some(record) = &context.data_analysis {
                let report = &record.result;
                put("rows", report.row_count.to_string());
                put("columns", report.column_count.to_string());
                put(
                    "detected_target",
                    report
                        .detected_target
                        .clone()
                        .unwrap_or_else(|| "(none)".to_string()),
                );
                put("quality_score", format!("{:.2}", report.quality_score));
                if !report.warnings.is_empty() {
                    put("warnings", report.warnings.join("; "));
                }
            }
        }
        OrchestrationState::ModelSelectionReview => {
            if let Some(record) = &context.model_recommendation {
                let recommendation = &record.result;
                put("task_type", recommendation.task_type.to_string());
                put("trainers", recommendation.recommended_trainers.join(", "));
                put("metric", recommendation.optimization_metric.clone());
                if !recommendation.rationale.is_empty() {
                    put("rationale", recommendation.rationale.clone());
                }
            }
        }
        OrchestrationState::PreprocessingReview => {
            if let Some(record) = &context.preprocessing {
                let plan = &record.result;
                put("steps", plan.steps.join(", "));
                if let Some(script) = &plan.script_path {
                    put("script", script.display().to_string());
                }
            }
        }
        OrchestrationState::TrainingReview => {
            if let Some(record) = &context.training {
                let outcome = &record.result;
                put("best_trainer", outcome.best_trainer.clone());
                put("metric", outcome.metric_name.clone());
                put("metric_value", format!("{:.4}", outcome.metric_value));
                put("training_seconds", format!("{:.1}", outcome.training_seconds));
            }
        }
        OrchestrationState::DeploymentReview => {
            if let Some(record) = &context.deployment {
                let plan = &record.result;
                put("model_id", plan.model_id.clone());
                put("target", plan.target.clone());
                if let Some(endpoint) = &plan.endpoint {
                    put("endpoint", endpoint.clone());
                }
            }
        }
        _ => {}
    }

    details
}
