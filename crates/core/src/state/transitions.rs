//! Session state machine transitions.
//!
//! These functions mutate a session in memory and return the event that
//! announces the change. Persisting the session is left to the caller.

use chrono::{DateTime, Utc};
use mloop_protocol::context_models::OrchestrationContext;
use mloop_protocol::events::OrchestrationEvent;
use mloop_protocol::hitl_models::HitlRequest;
use mloop_protocol::pipeline_models::OrchestrationOptions;
use mloop_protocol::process_models::{OrchestrationSession, OrchestrationState, SessionStatus};
use std::path::PathBuf;
use tracing::{info, warn};

/// Create a new `Active` session at `NotStarted`.
pub fn create_session(
    session_id: String,
    data_file_path: PathBuf,
    options: OrchestrationOptions,
    now: DateTime<Utc>,
) -> OrchestrationSession {
    let context = OrchestrationContext::new(session_id, data_file_path, options, now);
    OrchestrationSession::new(context, now)
}

/// The event announcing a freshly created session.
pub fn started_event(session: &OrchestrationSession) -> OrchestrationEvent {
    OrchestrationEvent::OrchestrationStarted {
        session_id: session.session_id().to_string(),
        data_file_path: session.context.data_file_path.clone(),
    }
}

/// Move the session to `state`.
pub fn advance_to(session: &mut OrchestrationSession, state: OrchestrationState) {
    let from = session.context.current_state;
    session.context.current_state = state;
    info!(session_id = %session.session_id(), %from, to = %state, "State transition");
}

/// Pause at a review state and hand the checkpoint request to the caller.
pub fn pause_for_review(session: &mut OrchestrationSession, request: HitlRequest) -> OrchestrationEvent {
    session.status = SessionStatus::Paused;
    info!(
        session_id = %session.session_id(),
        checkpoint_id = %request.checkpoint_id,
        "Paused for review"
    );
    OrchestrationEvent::HitlRequested(request)
}

/// Reactivate a paused or interrupted session.
pub fn resume_session(session: &mut OrchestrationSession) -> OrchestrationEvent {
    session.status = SessionStatus::Active;
    info!(
        session_id = %session.session_id(),
        state = %session.current_state(),
        "Resumed session"
    );
    OrchestrationEvent::OrchestrationResumed {
        session_id: session.session_id().to_string(),
        state: session.current_state(),
    }
}

/// Finish the session. Total duration is measured from `started_at`.
pub fn complete_session(session: &mut OrchestrationSession, now: DateTime<Utc>) -> OrchestrationEvent {
    session.status = SessionStatus::Completed;
    session.context.current_state = OrchestrationState::Completed;
    session.context.completed_at = Some(now);

    let total_duration_ms = (now - session.context.started_at)
        .num_milliseconds()
        .max(0) as u64;
    info!(session_id = %session.session_id(), total_duration_ms, "Orchestration completed");

    OrchestrationEvent::OrchestrationCompleted {
        session_id: session.session_id().to_string(),
        total_duration_ms,
    }
}

/// Mark the session failed, keeping the error message on the context.
pub fn fail_session(session: &mut OrchestrationSession, error: String) -> OrchestrationEvent {
    session.status = SessionStatus::Failed;
    session.context.current_state = OrchestrationState::Failed;
    session.context.error = Some(error.clone());
    warn!(session_id = %session.session_id(), %error, "Orchestration failed");

    OrchestrationEvent::OrchestrationFailed {
        session_id: session.session_id().to_string(),
        error,
    }
}

/// Mark the session cancelled.
pub fn cancel_session(session: &mut OrchestrationSession) -> OrchestrationEvent {
    session.status = SessionStatus::Cancelled;
    session.context.current_state = OrchestrationState::Cancelled;
    info!(session_id = %session.session_id(), "Orchestration cancelled");

    OrchestrationEvent::OrchestrationCancelled {
        session_id: session.session_id().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::BTreeMap;

    fn new_session() -> OrchestrationSession {
        create_session(
            "orch-1".to_string(),
            PathBuf::from("train.csv"),
            OrchestrationOptions::default(),
            Utc::now(),
        )
    }

    #[test]
    fn test_create_session() {
        let session = new_session();
        assert_eq!(session.session_id(), "orch-1");
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.current_state(), OrchestrationState::NotStarted);
        assert!(matches!(
            started_event(&session),
            OrchestrationEvent::OrchestrationStarted { ref session_id, .. } if session_id == "orch-1"
        ));
    }

    #[test]
    fn test_pause_and_resume() {
        let mut session = new_session();
        advance_to(&mut session, OrchestrationState::DataAnalysisReview);

        let request = HitlRequest {
            session_id: "orch-1".to_string(),
            checkpoint_id: "data-analysis-review".to_string(),
            checkpoint_name: "Data Analysis Review".to_string(),
            question: "Proceed?".to_string(),
            context: BTreeMap::new(),
            options: vec![],
        };
        let event = pause_for_review(&mut session, request.clone());
        assert_eq!(session.status, SessionStatus::Paused);
        assert_eq!(event, OrchestrationEvent::HitlRequested(request));

        let event = resume_session(&mut session);
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(
            event,
            OrchestrationEvent::OrchestrationResumed {
                session_id: "orch-1".to_string(),
                state: OrchestrationState::DataAnalysisReview,
            }
        );
    }

    #[test]
    fn test_complete_session_reports_total_duration() {
        let mut session = new_session();
        let now = session.context.started_at + Duration::milliseconds(2500);

        let event = complete_session(&mut session, now);
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.current_state(), OrchestrationState::Completed);
        assert_eq!(session.context.completed_at, Some(now));
        assert_eq!(
            event,
            OrchestrationEvent::OrchestrationCompleted {
                session_id: "orch-1".to_string(),
                total_duration_ms: 2500,
            }
        );
    }

    #[test]
    fn test_fail_session_keeps_error() {
        let mut session = new_session();
        let event = fail_session(&mut session, "training crashed".to_string());
        assert_eq!(session.status, SessionStatus::Failed);
        assert_eq!(session.context.error.as_deref(), Some("training crashed"));
        assert!(event.is_terminal());
    }

    #[test]
    fn test_cancel_session() {
        let mut session = new_session();
        let event = cancel_session(&mut session);
        assert_eq!(session.status, SessionStatus::Cancelled);
        assert_eq!(session.current_state(), OrchestrationState::Cancelled);
        assert!(event.is_terminal());
    }
}
