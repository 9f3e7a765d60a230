//! Pipeline run options and phase result models.
//!
//! Each work phase produces a typed result. Collaborators hand results back
//! as a [`PhaseOutcome`] and the orchestrator stores them in the context as a
//! [`PhaseRecord`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use ts_rs::TS;

/// The machine-learning task an orchestration trains for.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    BinaryClassification,
    MulticlassClassification,
    Regression,
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BinaryClassification => "binary-classification",
            Self::MulticlassClassification => "multiclass-classification",
            Self::Regression => "regression",
        }
    }

    /// Metric optimized when the run does not name one.
    pub fn default_metric(self) -> &'static str {
        match self {
            Self::BinaryClassification => "AUC",
            Self::MulticlassClassification => "MacroAccuracy",
            Self::Regression => "RSquared",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "binary" | "binary-classification" | "binaryclassification" => {
                Ok(Self::BinaryClassification)
            }
            "multiclass" | "multiclass-classification" | "multiclassclassification" => {
                Ok(Self::MulticlassClassification)
            }
            "regression" => Ok(Self::Regression),
            other => Err(format!(
                "unknown task type '{other}' (expected binary, multiclass or regression)"
            )),
        }
    }
}

/// Per-run configuration of an orchestration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct OrchestrationOptions {
    /// Column to predict. Falls back to the column detected during data analysis.
    #[serde(default)]
    pub target_column: Option<String>,

    /// Task type override. Falls back to the recommended or inferred type.
    #[serde(default)]
    pub task_type: Option<TaskType>,

    /// Training budget handed to the training collaborator. Advisory only.
    #[serde(default = "default_max_training_time")]
    pub max_training_time_seconds: u64,

    /// Metric to optimize during training.
    #[serde(default)]
    pub optimization_metric: Option<String>,

    /// Bypass every checkpoint.
    #[serde(default)]
    pub skip_hitl: bool,

    /// Allow checkpoints without explicit approval to proceed on high confidence.
    #[serde(default)]
    pub auto_approve_high_confidence: bool,

    /// Upper bound on the auto-approval threshold. The effective threshold at a
    /// checkpoint is the minimum of this value and the checkpoint's own.
    #[serde(default = "default_auto_approval_threshold")]
    pub auto_approval_threshold: f64,
}

fn default_max_training_time() -> u64 {
    300
}

fn default_auto_approval_threshold() -> f64 {
    1.0
}

impl Default for OrchestrationOptions {
    fn default() -> Self {
        Self {
            target_column: None,
            task_type: None,
            max_training_time_seconds: default_max_training_time(),
            optimization_metric: None,
            skip_hitl: false,
            auto_approve_high_confidence: false,
            auto_approval_threshold: default_auto_approval_threshold(),
        }
    }
}

/// Option changes a reviewer attaches to a `modify` answer.
///
/// Unset fields leave the session's options untouched.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
pub struct OptionOverrides {
    #[serde(default)]
    pub target_column: Option<String>,
    #[serde(default)]
    pub task_type: Option<TaskType>,
    #[serde(default)]
    pub optimization_metric: Option<String>,
}

impl OptionOverrides {
    pub fn is_empty(&self) -> bool {
        self.target_column.is_none()
            && self.task_type.is_none()
            && self.optimization_metric.is_none()
    }

    pub fn apply_to(&self, options: &mut OrchestrationOptions) {
        if let Some(target) = &self.target_column {
            options.target_column = Some(target.clone());
        }
        if let Some(task_type) = self.task_type {
            options.task_type = Some(task_type);
        }
        if let Some(metric) = &self.optimization_metric {
            options.optimization_metric = Some(metric.clone());
        }
    }
}

/// Output of the data analysis phase.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct DataAnalysisReport {
    pub row_count: u64,
    pub column_count: u64,
    #[serde(default)]
    pub detected_target: Option<String>,
    #[serde(default)]
    pub inferred_task_type: Option<TaskType>,
    /// Data quality in [0, 1].
    pub quality_score: f64,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Output of the model recommendation phase.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct ModelRecommendation {
    pub task_type: TaskType,
    pub recommended_trainers: Vec<String>,
    pub optimization_metric: String,
    #[serde(default)]
    pub rationale: String,
}

/// Output of the preprocessing phase.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, TS)]
pub struct PreprocessingPlan {
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub script_path: Option<PathBuf>,
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    /// Set when a reviewer chose to skip preprocessing.
    #[serde(default)]
    pub skipped: bool,
}

/// Output of the training phase.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct TrainingOutcome {
    pub model_id: String,
    pub best_trainer: String,
    pub metric_name: String,
    pub metric_value: f64,
    pub training_seconds: f64,
    #[serde(default)]
    pub model_path: Option<PathBuf>,
}

/// What happens to the trained model once deployment is reviewed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentDisposition {
    /// Promote the model to the serving target.
    Deploy,
    /// Export the model artifact without serving it.
    Export,
    /// Keep the model in the registry only.
    Save,
}

/// Output of the deployment phase.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct DeploymentPlan {
    pub model_id: String,
    pub target: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Filled in once the deployment checkpoint is decided.
    #[serde(default)]
    pub disposition: Option<DeploymentDisposition>,
}

/// What a phase collaborator returns: a result plus its confidence in it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct PhaseOutcome<T> {
    pub result: T,
    /// Certainty in [0, 1], consumed by the checkpoint policy.
    pub confidence: f64,
}

impl<T> PhaseOutcome<T> {
    pub fn new(result: T, confidence: f64) -> Self {
        Self {
            result,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// A completed phase as stored in the orchestration context.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct PhaseRecord<T> {
    pub result: T,
    pub confidence: f64,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl<T> PhaseRecord<T> {
    pub fn from_outcome(
        outcome: PhaseOutcome<T>,
        completed_at: DateTime<Utc>,
        duration_ms: u64,
    ) -> Self {
        Self {
            result: outcome.result,
            confidence: outcome.confidence,
            completed_at,
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_type_from_str_aliases() {
        assert_eq!(
            "binary".parse::<TaskType>(),
            Ok(TaskType::BinaryClassification)
        );
        assert_eq!(
            "Multiclass-Classification".parse::<TaskType>(),
            Ok(TaskType::MulticlassClassification)
        );
        assert_eq!(" regression ".parse::<TaskType>(), Ok(TaskType::Regression));
        assert!("clustering".parse::<TaskType>().is_err());
    }

    #[test]
    fn test_options_defaults_fill_missing_fields() {
        let options: OrchestrationOptions =
            serde_json::from_str(r#"{"skip_hitl": true}"#).expect("valid options");
        assert!(options.skip_hitl);
        assert!(!options.auto_approve_high_confidence);
        assert_eq!(options.max_training_time_seconds, 300);
        assert_eq!(options.auto_approval_threshold, 1.0);
    }

    #[test]
    fn test_overrides_only_replace_set_fields() {
        let mut options = OrchestrationOptions {
            target_column: Some("label".to_string()),
            optimization_metric: Some("f1".to_string()),
            ..Default::default()
        };
        let overrides = OptionOverrides {
            task_type: Some(TaskType::Regression),
            ..Default::default()
        };
        assert!(!overrides.is_empty());
        overrides.apply_to(&mut options);
        assert_eq!(options.target_column.as_deref(), Some("label"));
        assert_eq!(options.task_type, Some(TaskType::Regression));
        assert_eq!(options.optimization_metric.as_deref(), Some("f1"));
        assert!(OptionOverrides::default().is_empty());
    }

    #[test]
    fn test_phase_outcome_clamps_confidence() {
        assert_eq!(PhaseOutcome::new((), 1.7).confidence, 1.0);
        assert_eq!(PhaseOutcome::new((), -0.2).confidence, 0.0);
    }
}
