//! Deterministic offline agents.
//!
//! These stand in for real collaborators when `--simulate` is passed. Results
//! are derived from the run options and earlier phase results only; the data
//! file itself is never read.

use crate::agents::base::{AgentError, PhaseAgent};
use async_trait::async_trait;
use mloop_protocol::context_models::OrchestrationContext;
use mloop_protocol::pipeline_models::{
    DataAnalysisReport, DeploymentPlan, ModelRecommendation, PhaseOutcome, PreprocessingPlan,
    TaskType, TrainingOutcome,
};

const DEFAULT_TARGET: &str = "label";

#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedAnalyst;

#[async_trait]
impl PhaseAgent<DataAnalysisReport> for SimulatedAnalyst {
    async fn check_availability(&self) -> bool {
        true
    }

    async fn run(
        &self,
        context: &OrchestrationContext,
    ) -> Result<PhaseOutcome<DataAnalysisReport>, AgentError> {
        let target = context
            .options
            .target_column
            .clone()
            .unwrap_or_else(|| DEFAULT_TARGET.to_string());
        let report = DataAnalysisReport {
            row_count: 1000,
            column_count: 12,
            detected_target: Some(target),
            inferred_task_type: Some(
                context
                    .options
                    .task_type
                    .unwrap_or(TaskType::BinaryClassification),
            ),
            quality_score: 0.94,
            warnings: vec!["3 columns contain missing values".to_string()],
        };
        Ok(PhaseOutcome::new(report, 0.92))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedArchitect;

#[async_trait]
impl PhaseAgent<ModelRecommendation> for SimulatedArchitect {
    async fn check_availability(&self) -> bool {
        true
    }

    async fn run(
        &self,
        context: &OrchestrationContext,
    ) -> Result<PhaseOutcome<ModelRecommendation>, AgentError> {
        let task_type = context
            .effective_task_type()
            .unwrap_or(TaskType::BinaryClassification);
        let trainers = match task_type {
            TaskType::Regression => ["FastTree", "LightGbm", "Sdca"],
            TaskType::BinaryClassification | TaskType::MulticlassClassification => {
                ["LightGbm", "FastForest", "LbfgsLogisticRegression"]
            }
        };
        let metric = context
            .options
            .optimization_metric
            .clone()
            .unwrap_or_else(|| task_type.default_metric().to_string());

        let recommendation = ModelRecommendation {
            task_type,
            recommended_trainers: trainers.iter().map(|t| t.to_string()).collect(),
            optimization_metric: metric,
            rationale: format!("Tree ensembles are strong baselines for {task_type} on tabular data"),
        };
        Ok(PhaseOutcome::new(recommendation, 0.88))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedPreprocessor;

#[async_trait]
impl PhaseAgent<PreprocessingPlan> for SimulatedPreprocessor {
    async fn check_availability(&self) -> bool {
        true
    }

    async fn run(
        &self,
        context: &OrchestrationContext,
    ) -> Result<PhaseOutcome<PreprocessingPlan>, AgentError> {
        let has_warnings = context
            .data_analysis
            .as_ref()
            .is_some_and(|r| !r.result.warnings.is_empty());

        let mut steps = vec!["normalize-column-names".to_string()];
        if has_warnings {
            steps.push("impute-missing-values".to_string());
        }
        steps.push("encode-categoricals".to_string());

        let plan = PreprocessingPlan {
            steps,
            ..PreprocessingPlan::default()
        };
        Ok(PhaseOutcome::new(plan, 0.93))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedTrainer;

#[async_trait]
impl PhaseAgent<TrainingOutcome> for SimulatedTrainer {
    async fn check_availability(&self) -> bool {
        true
    }

    async fn run(
        &self,
        context: &OrchestrationContext,
    ) -> Result<PhaseOutcome<TrainingOutcome>, AgentError> {
        let recommendation = context.model_recommendation.as_ref().map(|r| &r.result);
        let best_trainer = recommendation
            .and_then(|r| r.recommended_trainers.first().cloned())
            .unwrap_or_else(|| "LightGbm".to_string());
        let metric_name = recommendation
            .map(|r| r.optimization_metric.clone())
            .unwrap_or_else(|| "AUC".to_string());

        let outcome = TrainingOutcome {
            model_id: format!("{}-model", context.session_id),
            best_trainer,
            metric_name,
            metric_value: 0.87,
            training_seconds: (context.options.max_training_time_seconds as f64).min(42.0),
            model_path: None,
        };
        Ok(PhaseOutcome::new(outcome, 0.95))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedDeployer;

#[async_trait]
impl PhaseAgent<DeploymentPlan> for SimulatedDeployer {
    async fn check_availability(&self) -> bool {
        true
    }

    async fn run(
        &self,
        context: &OrchestrationContext,
    ) -> Result<PhaseOutcome<DeploymentPlan>, AgentError> {
        let model_id = context
            .training
            .as_ref()
            .map(|r| r.result.model_id.clone())
            .ok_or_else(|| AgentError::ExecutionError("no trained model to deploy".to_string()))?;

        let plan = DeploymentPlan {
            endpoint: Some(format!("http://localhost:5000/predict/{model_id}")),
            model_id,
            target: "local".to_string(),
            disposition: None,
        };
        Ok(PhaseOutcome::new(plan, 0.97))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mloop_protocol::pipeline_models::{OrchestrationOptions, PhaseRecord};

    fn context(options: OrchestrationOptions) -> OrchestrationContext {
        OrchestrationContext::new("orch-1", "d.csv", options, Utc::now())
    }

    #[tokio::test]
    async fn test_analyst_uses_explicit_target() {
        let ctx = context(OrchestrationOptions {
            target_column: Some("price".to_string()),
            task_type: Some(TaskType::Regression),
            ..OrchestrationOptions::default()
        });
        let outcome = SimulatedAnalyst.run(&ctx).await.unwrap();
        assert_eq!(outcome.result.detected_target.as_deref(), Some("price"));
        assert_eq!(outcome.result.inferred_task_type, Some(TaskType::Regression));
    }

    #[tokio::test]
    async fn test_architect_picks_metric_for_task() {
        let ctx = context(OrchestrationOptions {
            task_type: Some(TaskType::Regression),
            ..OrchestrationOptions::default()
        });
        let outcome = SimulatedArchitect.run(&ctx).await.unwrap();
        assert_eq!(outcome.result.optimization_metric, "RSquared");
        assert_eq!(outcome.result.recommended_trainers[0], "FastTree");
    }

    #[tokio::test]
    async fn test_deployer_requires_trained_model() {
        let mut ctx = context(OrchestrationOptions::default());
        assert!(SimulatedDeployer.run(&ctx).await.is_err());

        let training = SimulatedTrainer.run(&ctx).await.unwrap();
        ctx.training = Some(PhaseRecord::from_outcome(training, Utc::now(), 1));
        let plan = SimulatedDeployer.run(&ctx).await.unwrap().result;
        assert_eq!(plan.model_id, "orch-1-model");
    }
}
