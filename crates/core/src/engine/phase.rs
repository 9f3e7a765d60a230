//! Phase dispatch and decision application.

use crate::agents::{AgentError, AgentSet};
use crate::session::{OrchestrationSessionStore, StoreResult};
use crate::state::transitions::{advance_to, cancel_session};
use chrono::{DateTime, Utc};
use mloop_protocol::context_models::OrchestrationContext;
use mloop_protocol::hitl_models::HitlResponseAction;
use mloop_protocol::pipeline_models::{
    DataAnalysisReport, DeploymentDisposition, DeploymentPlan, ModelRecommendation,
    OptionOverrides, PhaseOutcome, PhaseRecord, PreprocessingPlan, TrainingOutcome,
};
use mloop_protocol::process_models::{OrchestrationSession, OrchestrationState};

/// The typed result of one work phase.
pub(crate) enum PhaseResult {
    DataAnalysis(PhaseOutcome<DataAnalysisReport>),
    ModelRecommendation(PhaseOutcome<ModelRecommendation>),
    Preprocessing(PhaseOutcome<PreprocessingPlan>),
    Training(PhaseOutcome<TrainingOutcome>),
    Deployment(PhaseOutcome<DeploymentPlan>),
}

impl PhaseResult {
    /// Run the agent assigned to a work state.
    pub(crate) async fn run(
        agents: &AgentSet,
        state: OrchestrationState,
        context: &OrchestrationContext,
    ) -> Result<Self, AgentError> {
        match state {
            OrchestrationState::DataAnalysis => {
                agents.data_analysis.run(context).await.map(Self::DataAnalysis)
            }
            OrchestrationState::ModelRecommendation => agents
                .model_recommendation
                .run(context)
                .await
                .map(Self::ModelRecommendation),
            OrchestrationState::Preprocessing => {
                agents.preprocessing.run(context).await.map(Self::Preprocessing)
            }
            OrchestrationState::Training => agents.training.run(context).await.map(Self::Training),
            OrchestrationState::Deployment => {
                agents.deployment.run(context).await.map(Self::Deployment)
            }
            other => Err(AgentError::NotConfigured(format!("{other} is not a work phase"))),
        }
    }

    /// Confidence with non-finite values read as zero.
    pub(crate) fn confidence(&self) -> f64 {
        let raw = match self {
            Self::DataAnalysis(o) => o.confidence,
            Self::ModelRecommendation(o) => o.confidence,
            Self::Preprocessing(o) => o.confidence,
            Self::Training(o) => o.confidence,
            Self::Deployment(o) => o.confidence,
        };
        if raw.is_finite() {
            raw.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Artifact name for the phase output.
    pub(crate) fn artifact_name(&self) -> &'static str {
        match self {
            Self::DataAnalysis(_) => "data-analysis",
            Self::ModelRecommendation(_) => "model-recommendation",
            Self::Preprocessing(_) => "preprocessing",
            Self::Training(_) => "training",
            Self::Deployment(_) => "deployment",
        }
    }

    /// Persist the phase output as a session artifact.
    pub(crate) async fn save_artifact(
        &self,
        store: &OrchestrationSessionStore,
        session_id: &str,
    ) -> StoreResult<()> {
        let name = self.artifact_name();
        match self {
            Self::DataAnalysis(o) => store.save_artifact(session_id, name, &o.result).await,
            Self::ModelRecommendation(o) => store.save_artifact(session_id, name, &o.result).await,
            Self::Preprocessing(o) => store.save_artifact(session_id, name, &o.result).await,
            Self::Training(o) => store.save_artifact(session_id, name, &o.result).await,
            Self::Deployment(o) => store.save_artifact(session_id, name, &o.result).await,
        }
        .map(|_| ())
    }

    /// Move the result into its context slot.
    pub(crate) fn record(
        self,
        context: &mut OrchestrationContext,
        completed_at: DateTime<Utc>,
        duration_ms: u64,
    ) {
        let confidence = self.confidence();
        match self {
            Self::DataAnalysis(o) => {
                context.data_analysis = Some(record(o, confidence, completed_at, duration_ms));
            }
            Self::ModelRecommendation(o) => {
                context.model_recommendation = Some(record(o, confidence, completed_at, duration_ms));
            }
            Self::Preprocessing(o) => {
                context.preprocessing = Some(record(o, confidence, completed_at, duration_ms));
            }
            Self::Training(o) => {
                context.training = Some(record(o, confidence, completed_at, duration_ms));
            }
            Self::Deployment(o) => {
                context.deployment = Some(record(o, confidence, completed_at, duration_ms));
            }
        }
    }
}

fn record<T>(
    outcome: PhaseOutcome<T>,
    confidence: f64,
    completed_at: DateTime<Utc>,
    duration_ms: u64,
) -> PhaseRecord<T> {
    PhaseRecord::from_outcome(
        PhaseOutcome {
            result: outcome.result,
            confidence,
        },
        completed_at,
        duration_ms,
    )
}

/// Apply a checkpoint decision to a session paused at `review`.
///
/// - Proceed, Deploy, Export, Save: move to the next work state, or to
///   `Completed` after the deployment review, recording the disposition.
/// - Modify: apply `overrides` to the session options, drop the reviewed
///   phase's result and return to its work state.
/// - Retry: return to the reviewed work state.
/// - Skip: move on, marking the reviewed phase as skipped.
/// - Cancel: cancel the session.
pub(crate) fn apply_action(
    session: &mut OrchestrationSession,
    review: OrchestrationState,
    action: HitlResponseAction,
    overrides: Option<&OptionOverrides>,
) {
    match action {
        HitlResponseAction::Proceed
        | HitlResponseAction::Deploy
        | HitlResponseAction::Export
        | HitlResponseAction::Save => {
            if review == OrchestrationState::DeploymentReview {
                if let Some(record) = session.context.deployment.as_mut() {
                    record.result.disposition = Some(disposition(action));
                }
            }
            if let Some(next) = review.next_after_review() {
                advance_to(session, next);
            }
        }
        HitlResponseAction::Modify => {
            if let Some(overrides) = overrides {
                overrides.apply_to(&mut session.context.options);
            }
            if let Some(work) = review.work_state() {
                clear_phase(&mut session.context, work);
                advance_to(session, work);
            }
        }
        HitlResponseAction::Retry => {
            if let Some(work) = review.work_state() {
                advance_to(session, work);
            }
        }
        HitlResponseAction::Skip => {
            if review == OrchestrationState::PreprocessingReview {
                if let Some(record) = session.context.preprocessing.as_mut() {
                    record.result.skipped = true;
                }
            }
            if let Some(next) = review.next_after_review() {
                advance_to(session, next);
            }
        }
        HitlResponseAction::Cancel => {
            cancel_session(session);
        }
    }
}

fn clear_phase(context: &mut OrchestrationContext, work: OrchestrationState) {
    match work {
        OrchestrationState::DataAnalysis => context.data_analysis = None,
        OrchestrationState::ModelRecommendation => context.model_recommendation = None,
        OrchestrationState::Preprocessing => context.preprocessing = None,
        OrchestrationState::Training => context.training = None,
        OrchestrationState::Deployment => context.deployment = None,
        _ => {}
    }
}

fn disposition(action: HitlResponseAction) -> DeploymentDisposition {
    match action {
        HitlResponseAction::Export => DeploymentDisposition::Export,
        HitlResponseAction::Save => DeploymentDisposition::Save,
        _ => DeploymentDisposition::Deploy,
    }
}
