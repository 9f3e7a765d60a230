//! The orchestration state machine driver.

use crate::agents::AgentSet;
use crate::engine::error::{OrchestratorError, OrchestratorResult};
use crate::engine::phase::{apply_action, PhaseResult};
use crate::hitl::{checkpoint_for, HitlCheckpointManager, HitlError};
use crate::session::{OrchestrationSessionStore, StoreResult};
use crate::state::ids::{SessionIdGenerator, UuidSessionIds};
use crate::state::transitions::{
    advance_to, cancel_session, complete_session, create_session, fail_session, pause_for_review,
    resume_session, started_event,
};
use mloop_protocol::agent_models::AgentType;
use mloop_protocol::events::OrchestrationEvent;
use mloop_protocol::hitl_models::{HitlDecision, HitlResponseAction, SessionCheckpoint};
use mloop_protocol::pipeline_models::{OptionOverrides, OrchestrationOptions};
use mloop_protocol::process_models::{OrchestrationSession, OrchestrationState, SessionStatus};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// The ordered events of one run. The stream ends after a `HitlRequested`
/// event or a terminal event.
pub type EventStream = Pin<Box<dyn Stream<Item = OrchestrationEvent> + Send>>;

const PHASE_COUNT: f64 = 5.0;

/// Drives sessions through the pipeline phases.
///
/// One orchestrator can serve many sessions concurrently. A single session
/// must only be driven by one caller at a time: concurrent `resume` or
/// `respond` calls on the same id race, and the last save wins.
#[derive(Clone)]
pub struct MlopsOrchestrator {
    agents: AgentSet,
    store: OrchestrationSessionStore,
    checkpoints: HitlCheckpointManager,
    ids: Arc<dyn SessionIdGenerator>,
}

impl MlopsOrchestrator {
    pub fn new(
        agents: AgentSet,
        store: OrchestrationSessionStore,
        checkpoints: HitlCheckpointManager,
    ) -> Self {
        Self {
            agents,
            store,
            checkpoints,
            ids: Arc::new(UuidSessionIds),
        }
    }

    /// Replace the session id source.
    pub fn with_id_generator(mut self, ids: impl SessionIdGenerator + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    pub fn store(&self) -> &OrchestrationSessionStore {
        &self.store
    }

    /// Start a new orchestration of `data_file`.
    ///
    /// The session is created and persisted before this returns, so a
    /// storage failure is reported here rather than on the stream.
    pub async fn execute(
        &self,
        data_file: impl Into<PathBuf>,
        options: OrchestrationOptions,
        cancel: CancellationToken,
    ) -> OrchestratorResult<EventStream> {
        let session_id = self.ids.next_id();
        let mut session = create_session(session_id, data_file.into(), options, self.store.now());
        self.store.save_session(&mut session).await?;

        info!(session_id = %session.session_id(), "Started orchestration");
        let started = started_event(&session);
        Ok(self.clone().drive(session, cancel, vec![started]))
    }

    /// Continue a stored session from its current state.
    ///
    /// Yields `OrchestrationResumed` first, then `HitlResponseReceived` when a
    /// decision was recorded since the session paused.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if nothing is stored under `session_id`
    /// - `NotResumable` if the session is completed, failed or cancelled
    pub async fn resume(
        &self,
        session_id: &str,
        cancel: CancellationToken,
    ) -> OrchestratorResult<EventStream> {
        let mut session = self.load(session_id).await?;
        if !session.status.is_resumable() {
            return Err(OrchestratorError::NotResumable {
                session_id: session_id.to_string(),
                status: session.status,
            });
        }

        let mut prelude = vec![resume_session(&mut session)];
        if let Some(decision) = session.context.last_decision.take() {
            prelude.push(OrchestrationEvent::HitlResponseReceived {
                session_id: session_id.to_string(),
                checkpoint_id: decision.checkpoint_id,
                selected_option_id: decision.option_id,
                action: decision.action,
            });
        }
        self.store.save_session(&mut session).await?;

        Ok(self.clone().drive(session, cancel, prelude))
    }

    /// Record a reviewer's answer for a session paused at a checkpoint.
    ///
    /// The decision is appended to the session's decision log and applied
    /// immediately. The session stays stopped; call [`resume`](Self::resume)
    /// to continue. After an approved deployment review the session sits at
    /// `Completed` with status `Active` until it is resumed and finalized.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if nothing is stored under `session_id`
    /// - `NotAwaitingReview` unless the session is paused at a review state
    /// - `Hitl(UnknownOption)` if `option_id` is not offered at the checkpoint
    pub async fn respond(
        &self,
        session_id: &str,
        option_id: &str,
        comment: Option<String>,
    ) -> OrchestratorResult<HitlDecision> {
        self.respond_with_overrides(session_id, option_id, comment, OptionOverrides::default())
            .await
    }

    /// Like [`respond`](Self::respond), carrying option changes for a
    /// `modify` answer.
    ///
    /// The overrides are merged into the session options and the reviewed
    /// phase's result is dropped, so the phase re-runs against the new
    /// options on resume.
    ///
    /// # Errors
    ///
    /// As [`respond`](Self::respond), plus `OverridesRequireModify` if
    /// `overrides` is non-empty and the option's action is not `modify`.
    pub async fn respond_with_overrides(
        &self,
        session_id: &str,
        option_id: &str,
        comment: Option<String>,
        overrides: OptionOverrides,
    ) -> OrchestratorResult<HitlDecision> {
        let mut session = self.load(session_id).await?;
        let state = session.current_state();
        if session.status != SessionStatus::Paused || !state.is_review() {
            return Err(OrchestratorError::NotAwaitingReview {
                session_id: session_id.to_string(),
                status: session.status,
                state,
            });
        }

        let action = self
            .checkpoints
            .process_response(state, option_id, &session.context)?;
        let checkpoint = checkpoint_for(state).ok_or(HitlError::NoCheckpoint(state))?;
        let option_id = checkpoint
            .find_option(option_id)
            .map_or_else(|| option_id.trim().to_lowercase(), |o| o.id.to_string());
        if !overrides.is_empty() && action != HitlResponseAction::Modify {
            return Err(OrchestratorError::OverridesRequireModify {
                checkpoint_id: checkpoint.id.to_string(),
                option_id,
            });
        }

        let decision = HitlDecision {
            checkpoint_id: checkpoint.id.to_string(),
            state,
            option_id,
            action,
            comment,
            overrides: (!overrides.is_empty()).then_some(overrides),
            auto_approved: false,
            decided_at: self.store.now(),
        };
        self.store.save_decision(session_id, &decision).await?;

        apply_action(&mut session, state, action, decision.overrides.as_ref());
        if session.status != SessionStatus::Cancelled {
            session.status = SessionStatus::Active;
            session.context.last_decision = Some(decision.clone());
        }
        self.store.save_session(&mut session).await?;

        info!(
            session_id,
            checkpoint_id = %decision.checkpoint_id,
            %action,
            next = %session.current_state(),
            "Applied review decision"
        );
        Ok(decision)
    }

    async fn load(&self, session_id: &str) -> OrchestratorResult<OrchestrationSession> {
        self.store
            .load_session(session_id)
            .await?
            .ok_or_else(|| OrchestratorError::SessionNotFound(session_id.to_string()))
    }

    /// Run the state machine from the session's current state.
    fn drive(
        self,
        mut session: OrchestrationSession,
        cancel: CancellationToken,
        prelude: Vec<OrchestrationEvent>,
    ) -> EventStream {
        let stream = async_stream::stream! {
            for event in prelude {
                yield event;
            }

            loop {
                if cancel.is_cancelled() {
                    yield self.cancel(&mut session).await;
                    return;
                }

                let state = session.current_state();
                match state {
                    OrchestrationState::NotStarted => {
                        advance_to(&mut session, OrchestrationState::first_phase());
                    }

                    OrchestrationState::Completed => {
                        let event = complete_session(&mut session, self.store.now());
                        if let Err(e) = self.store.save_session(&mut session).await {
                            yield self.fail(&mut session, format!("Failed to persist session: {e}")).await;
                            return;
                        }
                        yield event;
                        return;
                    }

                    OrchestrationState::Failed | OrchestrationState::Cancelled => {
                        warn!(session_id = %session.session_id(), %state, "Session is already finished");
                        return;
                    }

                    work if work.is_work() => {
                        let phase_number = work.phase_number().unwrap_or_default();
                        let phase_name = work.phase_name().to_string();
                        let agent_type = AgentType::for_state(work).unwrap_or(AgentType::MlopsManager);

                        yield OrchestrationEvent::PhaseStarted {
                            phase_number,
                            phase_name: phase_name.clone(),
                        };
                        yield OrchestrationEvent::ProgressUpdate {
                            current_operation: format!("Running {phase_name}"),
                            percentage: f64::from(phase_number.saturating_sub(1)) / PHASE_COUNT * 100.0,
                        };
                        yield OrchestrationEvent::AgentStarted { agent_type };

                        let started = Instant::now();
                        let result = tokio::select! {
                            biased;
                            _ = cancel.cancelled() => None,
                            result = PhaseResult::run(&self.agents, work, &session.context) => Some(result),
                        };
                        let Some(result) = result else {
                            yield self.cancel(&mut session).await;
                            return;
                        };
                        let duration_ms = elapsed_ms(started);

                        let outcome = match result {
                            Ok(outcome) => outcome,
                            Err(e) => {
                                yield self.fail(&mut session, format!("{phase_name} failed: {e}")).await;
                                return;
                            }
                        };
                        yield OrchestrationEvent::AgentCompleted { agent_type, duration_ms };

                        let confidence = outcome.confidence();
                        if let Err(e) = self.record_phase(&mut session, work, outcome, duration_ms).await {
                            yield self.fail(&mut session, format!("Failed to persist {phase_name} result: {e}")).await;
                            return;
                        }

                        yield OrchestrationEvent::PhaseCompleted {
                            phase_number,
                            phase_name,
                            duration_ms,
                            confidence,
                        };

                        if let Err(e) = self.store.save_session(&mut session).await {
                            yield self.fail(&mut session, format!("Failed to persist session: {e}")).await;
                            return;
                        }
                    }

                    review => {
                        let confidence = session.context.phase_confidence(review).unwrap_or(0.0);
                        let options = &session.context.options;

                        if self.checkpoints.should_trigger_hitl(review, confidence, options) {
                            let request = match self.checkpoints.create_hitl_request(review, &session.context) {
                                Ok(request) => request,
                                Err(e) => {
                                    yield self.fail(&mut session, e.to_string()).await;
                                    return;
                                }
                            };
                            let event = pause_for_review(&mut session, request);
                            if let Err(e) = self.store.save_session(&mut session).await {
                                yield self.fail(&mut session, format!("Failed to persist session: {e}")).await;
                                return;
                            }
                            yield event;
                            return;
                        }

                        match self.auto_approve(&mut session, review, confidence).await {
                            Ok(event) => yield event,
                            Err(e) => {
                                yield self.fail(&mut session, e.to_string()).await;
                                return;
                            }
                        }
                    }
                }
            }
        };

        Box::pin(stream)
    }

    /// Store a phase result, its artifact and a snapshot, then move to the review state.
    async fn record_phase(
        &self,
        session: &mut OrchestrationSession,
        work: OrchestrationState,
        outcome: PhaseResult,
        duration_ms: u64,
    ) -> StoreResult<()> {
        let session_id = session.session_id().to_string();
        outcome.save_artifact(&self.store, &session_id).await?;

        let name = format!("{}-completed", outcome.artifact_name());
        outcome.record(&mut session.context, self.store.now(), duration_ms);
        if let Some(review) = work.review_state() {
            advance_to(session, review);
        }

        let snapshot = SessionCheckpoint {
            name,
            state: session.current_state(),
            status: session.status,
            created_at: self.store.now(),
            context: session.context.clone(),
        };
        self.store.save_checkpoint(&session_id, &snapshot).await
    }

    /// Apply the checkpoint's default option without asking anyone.
    async fn auto_approve(
        &self,
        session: &mut OrchestrationSession,
        review: OrchestrationState,
        confidence: f64,
    ) -> OrchestratorResult<OrchestrationEvent> {
        let checkpoint = checkpoint_for(review).ok_or(HitlError::NoCheckpoint(review))?;
        let option = self.checkpoints.default_option(review)?;

        let decision = HitlDecision {
            checkpoint_id: checkpoint.id.to_string(),
            state: review,
            option_id: option.id.to_string(),
            action: option.action,
            comment: None,
            overrides: None,
            auto_approved: true,
            decided_at: self.store.now(),
        };
        self.store
            .save_decision(session.session_id(), &decision)
            .await?;

        info!(
            session_id = %session.session_id(),
            checkpoint_id = checkpoint.id,
            confidence,
            "Checkpoint auto-approved"
        );
        apply_action(session, review, option.action, None);
        self.store.save_session(session).await?;

        Ok(OrchestrationEvent::CheckpointAutoApproved {
            checkpoint_id: checkpoint.id.to_string(),
            confidence,
        })
    }

    /// Persist a failure. Returns the terminal event even if saving fails.
    async fn fail(&self, session: &mut OrchestrationSession, error: String) -> OrchestrationEvent {
        let event = fail_session(session, error);
        if let Err(e) = self.store.save_session(session).await {
            warn!(session_id = %session.session_id(), error = %e, "Failed to persist failed session");
        }
        event
    }

    /// Persist a cancellation. Returns the terminal event even if saving fails.
    async fn cancel(&self, session: &mut OrchestrationSession) -> OrchestrationEvent {
        let event = cancel_session(session);
        if let Err(e) = self.store.save_session(session).await {
            warn!(session_id = %session.session_id(), error = %e, "Failed to persist cancelled session");
        }
        event
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
