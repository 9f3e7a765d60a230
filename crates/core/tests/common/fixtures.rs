//! Test fixtures for phase results, agent sets and orchestrators.
#![allow(dead_code)]

use mloop_core::agents::{AgentSet, MockAgent};
use mloop_core::engine::{EventStream, MlopsOrchestrator};
use mloop_core::hitl::HitlCheckpointManager;
use mloop_core::session::OrchestrationSessionStore;
use mloop_core::state::SequentialSessionIds;
use mloop_protocol::events::OrchestrationEvent;
use mloop_protocol::pipeline_models::{
    DataAnalysisReport, DeploymentPlan, ModelRecommendation, OrchestrationOptions,
    PreprocessingPlan, TaskType, TrainingOutcome,
};
use tempfile::TempDir;
use tokio_stream::StreamExt;

pub fn analysis_report() -> DataAnalysisReport {
    DataAnalysisReport {
        row_count: 5000,
        column_count: 14,
        detected_target: Some("churned".to_string()),
        inferred_task_type: Some(TaskType::BinaryClassification),
        quality_score: 0.91,
        warnings: vec![],
    }
}

pub fn recommendation() -> ModelRecommendation {
    ModelRecommendation {
        task_type: TaskType::BinaryClassification,
        recommended_trainers: vec!["LightGbm".to_string(), "FastForest".to_string()],
        optimization_metric: "AUC".to_string(),
        rationale: "Tabular binary target".to_string(),
    }
}

pub fn preprocessing_plan() -> PreprocessingPlan {
    PreprocessingPlan {
        steps: vec!["impute-missing-values".to_string()],
        ..PreprocessingPlan::default()
    }
}

pub fn training_outcome() -> TrainingOutcome {
    TrainingOutcome {
        model_id: "model-001".to_string(),
        best_trainer: "LightGbm".to_string(),
        metric_name: "AUC".to_string(),
        metric_value: 0.89,
        training_seconds: 12.5,
        model_path: None,
    }
}

pub fn deployment_plan() -> DeploymentPlan {
    DeploymentPlan {
        model_id: "model-001".to_string(),
        target: "local".to_string(),
        endpoint: Some("http://localhost:5000/predict".to_string()),
        disposition: None,
    }
}

/// Confidence reported by each of the five phases.
#[derive(Debug, Clone, Copy)]
pub struct Confidences {
    pub analysis: f64,
    pub recommendation: f64,
    pub preprocessing: f64,
    pub training: f64,
    pub deployment: f64,
}

impl Confidences {
    pub fn all(confidence: f64) -> Self {
        Self {
            analysis: confidence,
            recommendation: confidence,
            preprocessing: confidence,
            training: confidence,
            deployment: confidence,
        }
    }
}

/// Mock agents answering with the fixture results.
pub fn mock_agents(confidences: Confidences) -> AgentSet {
    AgentSet::simulated()
        .with_data_analysis(MockAgent::success(analysis_report(), confidences.analysis))
        .with_model_recommendation(MockAgent::success(
            recommendation(),
            confidences.recommendation,
        ))
        .with_preprocessing(MockAgent::success(
            preprocessing_plan(),
            confidences.preprocessing,
        ))
        .with_training(MockAgent::success(training_outcome(), confidences.training))
        .with_deployment(MockAgent::success(deployment_plan(), confidences.deployment))
}

/// An orchestrator on a temporary store with ids `test-1`, `test-2`, ...
///
/// The returned TempDir must be kept alive for the test duration.
pub fn orchestrator(agents: AgentSet) -> (TempDir, MlopsOrchestrator) {
    let temp = tempfile::tempdir().expect("Failed to create temp dir");
    let store = OrchestrationSessionStore::new(temp.path().join("sessions"));
    let orchestrator = MlopsOrchestrator::new(agents, store, HitlCheckpointManager::new(None))
        .with_id_generator(SequentialSessionIds::new("test"));
    (temp, orchestrator)
}

pub fn manual_options() -> OrchestrationOptions {
    OrchestrationOptions::default()
}

pub fn auto_options() -> OrchestrationOptions {
    OrchestrationOptions {
        auto_approve_high_confidence: true,
        ..OrchestrationOptions::default()
    }
}

pub fn skip_hitl_options() -> OrchestrationOptions {
    OrchestrationOptions {
        skip_hitl: true,
        ..OrchestrationOptions::default()
    }
}

/// Drain a stream into a vector.
pub async fn collect(stream: EventStream) -> Vec<OrchestrationEvent> {
    stream.collect().await
}
