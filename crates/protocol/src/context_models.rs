//! The mutable state container threaded through an orchestration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use ts_rs::TS;

use crate::hitl_models::HitlDecision;
use crate::pipeline_models::{
    DataAnalysisReport, DeploymentPlan, ModelRecommendation, OrchestrationOptions, PhaseRecord,
    PreprocessingPlan, TaskType, TrainingOutcome,
};
use crate::process_models::OrchestrationState;

/// Everything an orchestration knows about itself.
///
/// Phase result slots are filled progressively as phases complete. Only the
/// orchestrator mutates a context; the checkpoint manager reads it.
#[derive(Serialize, Deserialize, Debug, Clone, TS)]
pub struct OrchestrationContext {
    /// Unique, immutable session identifier.
    pub session_id: String,

    /// Dataset the orchestration was started with.
    pub data_file_path: PathBuf,

    pub current_state: OrchestrationState,

    pub options: OrchestrationOptions,

    pub started_at: DateTime<Utc>,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub data_analysis: Option<PhaseRecord<DataAnalysisReport>>,

    #[serde(default)]
    pub model_recommendation: Option<PhaseRecord<ModelRecommendation>>,

    #[serde(default)]
    pub preprocessing: Option<PhaseRecord<PreprocessingPlan>>,

    #[serde(default)]
    pub training: Option<PhaseRecord<TrainingOutcome>>,

    #[serde(default)]
    pub deployment: Option<PhaseRecord<DeploymentPlan>>,

    /// Decision recorded since the last pause, not yet announced on a resumed stream.
    #[serde(default)]
    pub last_decision: Option<HitlDecision>,

    /// Error message of a failed run.
    #[serde(default)]
    pub error: Option<String>,
}

impl OrchestrationContext {
    pub fn new(
        session_id: impl Into<String>,
        data_file_path: impl Into<PathBuf>,
        options: OrchestrationOptions,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            data_file_path: data_file_path.into(),
            current_state: OrchestrationState::NotStarted,
            options,
            started_at,
            completed_at: None,
            data_analysis: None,
            model_recommendation: None,
            preprocessing: None,
            training: None,
            deployment: None,
            last_decision: None,
            error: None,
        }
    }

    /// Confidence recorded by the phase that `state` reviews.
    ///
    /// Accepts either a work state or its review state.
    pub fn phase_confidence(&self, state: OrchestrationState) -> Option<f64> {
        let work = if state.is_review() {
            state.work_state()?
        } else {
            state
        };
        match work {
            OrchestrationState::DataAnalysis => self.data_analysis.as_ref().map(|r| r.confidence),
            OrchestrationState::ModelRecommendation => {
                self.model_recommendation.as_ref().map(|r| r.confidence)
            }
            OrchestrationState::Preprocessing => self.preprocessing.as_ref().map(|r| r.confidence),
            OrchestrationState::Training => self.training.as_ref().map(|r| r.confidence),
            OrchestrationState::Deployment => self.deployment.as_ref().map(|r| r.confidence),
            _ => None,
        }
    }

    /// The explicit target column, else the one detected during analysis.
    pub fn effective_target_column(&self) -> Option<&str> {
        self.options.target_column.as_deref().or_else(|| {
            self.data_analysis
                .as_ref()
                .and_then(|r| r.result.detected_target.as_deref())
        })
    }

    /// The explicit task type, else the recommended one, else the inferred one.
    pub fn effective_task_type(&self) -> Option<TaskType> {
        self.options
            .task_type
            .or_else(|| self.model_recommendation.as_ref().map(|r| r.result.task_type))
            .or_else(|| {
                self.data_analysis
                    .as_ref()
                    .and_then(|r| r.result.inferred_task_type)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline_models::PhaseOutcome;

    fn analysis(target: Option<&str>, confidence: f64) -> PhaseRecord<DataAnalysisReport> {
        PhaseRecord::from_outcome(
            PhaseOutcome::new(
                DataAnalysisReport {
                    row_count: 100,
                    column_count: 5,
                    detected_target: target.map(str::to_string),
                    inferred_task_type: Some(TaskType::Regression),
                    quality_score: 0.9,
                    warnings: vec![],
                },
                confidence,
            ),
            Utc::now(),
            12,
        )
    }

    #[test]
    fn test_new_context_starts_empty() {
        let ctx = OrchestrationContext::new(
            "s-1",
            "data/train.csv",
            OrchestrationOptions::default(),
            Utc::now(),
        );
        assert_eq!(ctx.current_state, OrchestrationState::NotStarted);
        assert!(ctx.data_analysis.is_none());
        assert_eq!(ctx.phase_confidence(OrchestrationState::DataAnalysisReview), None);
    }

    #[test]
    fn test_phase_confidence_reads_reviewed_phase() {
        let mut ctx =
            OrchestrationContext::new("s-1", "d.csv", OrchestrationOptions::default(), Utc::now());
        ctx.data_analysis = Some(analysis(Some("price"), 0.72));
        assert_eq!(ctx.phase_confidence(OrchestrationState::DataAnalysisReview), Some(0.72));
        assert_eq!(ctx.phase_confidence(OrchestrationState::DataAnalysis), Some(0.72));
        assert_eq!(ctx.phase_confidence(OrchestrationState::TrainingReview), None);
    }

    #[test]
    fn test_effective_target_prefers_option() {
        let mut ctx =
            OrchestrationContext::new("s-1", "d.csv", OrchestrationOptions::default(), Utc::now());
        ctx.data_analysis = Some(analysis(Some("price"), 0.9));
        assert_eq!(ctx.effective_target_column(), Some("price"));
        assert_eq!(ctx.effective_task_type(), Some(TaskType::Regression));

        ctx.options.target_column = Some("label".to_string());
        ctx.options.task_type = Some(TaskType::BinaryClassification);
        assert_eq!(ctx.effective_target_column(), Some("label"));
        assert_eq!(ctx.effective_task_type(), Some(TaskType::BinaryClassification));
    }
}
