//! The set of agents driving one orchestration.
//!
//! `AgentSet` assigns exactly one agent to each work phase. It can be built
//! from the phase commands in `.mloop/config.toml`, or from the simulated
//! agents, and any phase can be replaced afterwards.

use crate::agents::adapters::{
    CommandAgent, SimulatedAnalyst, SimulatedArchitect, SimulatedDeployer, SimulatedPreprocessor,
    SimulatedTrainer,
};
use crate::agents::base::{AgentError, PhaseAgent, SharedAgent};
use mloop_protocol::config_models::{PhaseCommand, PhaseCommands};
use mloop_protocol::pipeline_models::{
    DataAnalysisReport, DeploymentPlan, ModelRecommendation, PreprocessingPlan, TrainingOutcome,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;

#[derive(Clone)]
pub struct AgentSet {
    pub data_analysis: SharedAgent<DataAnalysisReport>,
    pub model_recommendation: SharedAgent<ModelRecommendation>,
    pub preprocessing: SharedAgent<PreprocessingPlan>,
    pub training: SharedAgent<TrainingOutcome>,
    pub deployment: SharedAgent<DeploymentPlan>,
}

impl AgentSet {
    /// Deterministic offline agents for every phase.
    pub fn simulated() -> Self {
        Self {
            data_analysis: Arc::new(SimulatedAnalyst),
            model_recommendation: Arc::new(SimulatedArchitect),
            preprocessing: Arc::new(SimulatedPreprocessor),
            training: Arc::new(SimulatedTrainer),
            deployment: Arc::new(SimulatedDeployer),
        }
    }

    /// Command-backed agents for every phase.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::NotConfigured` naming every phase without a command.
    pub fn from_commands(commands: &PhaseCommands) -> Result<Self, AgentError> {
        let missing: Vec<&str> = [
            ("data_analysis", commands.data_analysis.is_none()),
            ("model_recommendation", commands.model_recommendation.is_none()),
            ("preprocessing", commands.preprocessing.is_none()),
            ("training", commands.training.is_none()),
            ("deployment", commands.deployment.is_none()),
        ]
        .into_iter()
        .filter_map(|(phase, absent)| absent.then_some(phase))
        .collect();

        let (
            Some(data_analysis),
            Some(model_recommendation),
            Some(preprocessing),
            Some(training),
            Some(deployment),
        ) = (
            &commands.data_analysis,
            &commands.model_recommendation,
            &commands.preprocessing,
            &commands.training,
            &commands.deployment,
        )
        else {
            return Err(AgentError::NotConfigured(format!(
                "no command configured for phase(s): {} (set [phases.<name>] in .mloop/config.toml)",
                missing.join(", ")
            )));
        };

        Ok(Self {
            data_analysis: command_agent("data_analysis", data_analysis),
            model_recommendation: command_agent("model_recommendation", model_recommendation),
            preprocessing: command_agent("preprocessing", preprocessing),
            training: command_agent("training", training),
            deployment: command_agent("deployment", deployment),
        })
    }

    pub fn with_data_analysis(mut self, agent: impl PhaseAgent<DataAnalysisReport> + 'static) -> Self {
        self.data_analysis = Arc::new(agent);
        self
    }

    pub fn with_model_recommendation(
        mut self,
        agent: impl PhaseAgent<ModelRecommendation> + 'static,
    ) -> Self {
        self.model_recommendation = Arc::new(agent);
        self
    }

    pub fn with_preprocessing(mut self, agent: impl PhaseAgent<PreprocessingPlan> + 'static) -> Self {
        self.preprocessing = Arc::new(agent);
        self
    }

    pub fn with_training(mut self, agent: impl PhaseAgent<TrainingOutcome> + 'static) -> Self {
        self.training = Arc::new(agent);
        self
    }

    pub fn with_deployment(mut self, agent: impl PhaseAgent<DeploymentPlan> + 'static) -> Self {
        self.deployment = Arc::new(agent);
        self
    }

    /// Names of the phases whose agent reports itself unavailable.
    pub async fn unavailable_phases(&self) -> Vec<&'static str> {
        let mut unavailable = Vec::new();
        if !self.data_analysis.check_availability().await {
            unavailable.push("data_analysis");
        }
        if !self.model_recommendation.check_availability().await {
            unavailable.push("model_recommendation");
        }
        if !self.preprocessing.check_availability().await {
            unavailable.push("preprocessing");
        }
        if !self.training.check_availability().await {
            unavailable.push("training");
        }
        if !self.deployment.check_availability().await {
            unavailable.push("deployment");
        }
        unavailable
    }
}

fn command_agent<T>(phase: &'static str, command: &PhaseCommand) -> SharedAgent<T>
where
    T: DeserializeOwned + Send + 'static,
{
    Arc::new(CommandAgent::<T>::new(phase, command.clone()))
}
