//! Global configuration models for `.mloop/config.toml`.
//!
//! This module defines the project-wide settings that shape orchestration:
//! where sessions are stored, default run options, the optional agentic
//! HITL override policy, and the external commands that perform phase work.

use serde::Deserialize;
use serde::Serialize;
use std::path::PathBuf;
use ts_rs::TS;

/// Represents global settings from `.mloop/config.toml`.
///
/// # Example
///
/// ```toml
/// # .mloop/config.toml
/// storage_dir = ".mloop/sessions"
///
/// [orchestration]
/// auto_approve_high_confidence = true
/// auto_approval_threshold = 0.9
///
/// [agentic.hitl]
/// policy = "on-uncertainty"
/// uncertainty_threshold = 0.7
/// checkpoints = ["data-analysis-review", "training-review"]
///
/// [phases.training]
/// command = "python3"
/// args = ["scripts/train.py", "{data_file}", "--time", "{max_training_time}"]
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, TS)]
pub struct GlobalConfig {
    /// Session storage directory, relative to the project root.
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,

    #[serde(default)]
    pub orchestration: OrchestrationDefaults,

    #[serde(default)]
    pub agentic: Option<AgenticSettings>,

    #[serde(default)]
    pub phases: PhaseCommands,
}

/// Defaults applied to every run unless overridden on the command line.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
pub struct OrchestrationDefaults {
    #[serde(default)]
    pub max_training_time_seconds: Option<u64>,
    #[serde(default)]
    pub optimization_metric: Option<String>,
    #[serde(default)]
    pub auto_approve_high_confidence: Option<bool>,
    #[serde(default)]
    pub auto_approval_threshold: Option<f64>,
}

/// External policy settings that can override the checkpoint table.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
pub struct AgenticSettings {
    #[serde(default)]
    pub hitl: Option<HitlSettings>,
}

/// How checkpoints decide whether to pause.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "kebab-case")]
pub enum HitlPolicy {
    /// Follow each checkpoint's own approval rules.
    #[default]
    Always,

    /// Pause only when phase confidence falls below `uncertainty_threshold`,
    /// and only at the listed checkpoints.
    OnUncertainty,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct HitlSettings {
    #[serde(default)]
    pub policy: HitlPolicy,

    #[serde(default = "default_uncertainty_threshold")]
    pub uncertainty_threshold: f64,

    /// Checkpoint ids the policy applies to. Empty means every checkpoint.
    #[serde(default)]
    pub checkpoints: Vec<String>,
}

fn default_uncertainty_threshold() -> f64 {
    0.7
}

impl Default for HitlSettings {
    fn default() -> Self {
        Self {
            policy: HitlPolicy::default(),
            uncertainty_threshold: default_uncertainty_threshold(),
            checkpoints: Vec::new(),
        }
    }
}

/// External commands that perform each work phase.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
pub struct PhaseCommands {
    #[serde(default)]
    pub data_analysis: Option<PhaseCommand>,
    #[serde(default)]
    pub model_recommendation: Option<PhaseCommand>,
    #[serde(default)]
    pub preprocessing: Option<PhaseCommand>,
    #[serde(default)]
    pub training: Option<PhaseCommand>,
    #[serde(default)]
    pub deployment: Option<PhaseCommand>,
}

/// A command line whose JSON Lines output carries a phase result.
///
/// Arguments may contain `{data_file}`, `{session_id}`, `{target}`,
/// `{task_type}` and `{max_training_time}` placeholders.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct PhaseCommand {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}
