//! End-to-end orchestration tests against mock agents and a temporary store.

mod common;

use common::*;
use mloop_core::agents::{AgentSet, MockAgent};
use mloop_core::engine::{MlopsOrchestrator, OrchestratorError};
use mloop_core::hitl::HitlError;
use mloop_protocol::agent_models::AgentType;
use mloop_protocol::events::OrchestrationEvent;
use mloop_protocol::hitl_models::HitlResponseAction;
use mloop_protocol::pipeline_models::{
    DataAnalysisReport, DeploymentDisposition, OptionOverrides, TaskType, TrainingOutcome,
};
use mloop_protocol::process_models::{OrchestrationState, SessionStatus};
use std::time::Duration;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

async fn respond_and_resume(
    orchestrator: &MlopsOrchestrator,
    session_id: &str,
    option_id: &str,
) -> Vec<OrchestrationEvent> {
    orchestrator
        .respond(session_id, option_id, None)
        .await
        .expect("Failed to respond");
    let stream = orchestrator
        .resume(session_id, CancellationToken::new())
        .await
        .expect("Failed to resume");
    collect(stream).await
}

#[tokio::test]
async fn test_first_phase_event_order() {
    let (_temp, orchestrator) = orchestrator(mock_agents(Confidences::all(0.99)));

    let stream = orchestrator
        .execute("data.csv", manual_options(), CancellationToken::new())
        .await
        .expect("Failed to execute");
    let events = collect(stream).await;

    assert_eq!(events.len(), 7, "Unexpected events: {events:?}");
    assert!(matches!(
        &events[0],
        OrchestrationEvent::OrchestrationStarted { session_id, .. } if session_id == "test-1"
    ));
    assert!(matches!(events[1], OrchestrationEvent::PhaseStarted { phase_number: 1, .. }));
    assert!(matches!(
        events[2],
        OrchestrationEvent::ProgressUpdate { percentage, .. } if percentage == 0.0
    ));
    assert_eq!(
        events[3],
        OrchestrationEvent::AgentStarted { agent_type: AgentType::DataAnalyst }
    );
    assert!(matches!(
        events[4],
        OrchestrationEvent::AgentCompleted { agent_type: AgentType::DataAnalyst, .. }
    ));
    assert!(matches!(
        events[5],
        OrchestrationEvent::PhaseCompleted { phase_number: 1, confidence, .. } if confidence == 0.99
    ));
    assert_eq!(requested_checkpoints(&events), vec!["data-analysis-review"]);
    assert_stream_shape(&events);

    let session = orchestrator
        .store()
        .load_session("test-1")
        .await
        .unwrap()
        .expect("Session should be persisted");
    assert_eq!(session.status, SessionStatus::Paused);
    assert_eq!(session.current_state(), OrchestrationState::DataAnalysisReview);
    assert!(session.context.data_analysis.is_some());
}

#[tokio::test]
async fn test_manual_review_requests_each_checkpoint_once() {
    let (_temp, orchestrator) = orchestrator(mock_agents(Confidences::all(0.99)));

    let stream = orchestrator
        .execute("data.csv", manual_options(), CancellationToken::new())
        .await
        .unwrap();
    let mut all_events = collect(stream).await;
    let session_id = extract_session_id(&all_events).expect("No session id");

    for option in ["approve", "approve", "approve", "approve", "deploy"] {
        let events = respond_and_resume(&orchestrator, &session_id, option).await;
        assert_stream_shape(&events);
        assert!(matches!(
            events[1],
            OrchestrationEvent::HitlResponseReceived { ref selected_option_id, .. }
                if selected_option_id == option
        ));
        all_events.extend(events);
    }

    assert_eq!(
        requested_checkpoints(&all_events),
        vec![
            "data-analysis-review",
            "model-selection-review",
            "preprocessing-review",
            "training-review",
            "deployment-review",
        ]
    );
    assert_eq!(started_phases(&all_events), vec![1, 2, 3, 4, 5]);
    assert!(matches!(
        all_events.last(),
        Some(OrchestrationEvent::OrchestrationCompleted { .. })
    ));

    let session = orchestrator
        .store()
        .load_session(&session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert!(session.context.completed_at.is_some());
    assert!(session.context.last_decision.is_none());
    assert_eq!(
        session.context.deployment.unwrap().result.disposition,
        Some(DeploymentDisposition::Deploy)
    );

    let decisions = orchestrator.store().list_decisions(&session_id).await.unwrap();
    assert_eq!(decisions.len(), 5);
    assert!(decisions.iter().all(|d| !d.auto_approved));
}

#[tokio::test]
async fn test_auto_approve_pauses_only_where_required() {
    let (_temp, orchestrator) = orchestrator(mock_agents(Confidences::all(0.95)));

    let stream = orchestrator
        .execute("data.csv", auto_options(), CancellationToken::new())
        .await
        .unwrap();
    let events = collect(stream).await;

    assert_eq!(
        auto_approved_checkpoints(&events),
        vec!["data-analysis-review", "model-selection-review", "preprocessing-review"]
    );
    assert_eq!(requested_checkpoints(&events), vec!["training-review"]);

    let decisions = orchestrator.store().list_decisions("test-1").await.unwrap();
    assert_eq!(decisions.len(), 3);
    assert!(decisions.iter().all(|d| d.auto_approved));
    assert_eq!(decisions[0].action, HitlResponseAction::Proceed);
}

#[tokio::test]
async fn test_resume_after_model_selection_approval_does_not_ask_again() {
    let confidences = Confidences {
        recommendation: 0.5,
        ..Confidences::all(0.95)
    };
    let (_temp, orchestrator) = orchestrator(mock_agents(confidences));

    let stream = orchestrator
        .execute("data.csv", auto_options(), CancellationToken::new())
        .await
        .unwrap();
    let events = collect(stream).await;
    assert_eq!(requested_checkpoints(&events), vec!["model-selection-review"]);

    let session = orchestrator.store().load_session("test-1").await.unwrap().unwrap();
    assert_eq!(session.current_state(), OrchestrationState::ModelSelectionReview);

    let events = respond_and_resume(&orchestrator, "test-1", "approve").await;

    assert!(matches!(
        events[0],
        OrchestrationEvent::OrchestrationResumed { state: OrchestrationState::Preprocessing, .. }
    ));
    assert!(!requested_checkpoints(&events).contains(&"model-selection-review".to_string()));
    assert_eq!(started_phases(&events), vec![3, 4]);
    assert_eq!(requested_checkpoints(&events), vec!["training-review"]);
}

#[tokio::test]
async fn test_skip_hitl_runs_to_completion() {
    let (_temp, orchestrator) = orchestrator(mock_agents(Confidences::all(0.1)));

    let stream = orchestrator
        .execute("data.csv", skip_hitl_options(), CancellationToken::new())
        .await
        .unwrap();
    let events = collect(stream).await;

    assert_stream_shape(&events);
    assert!(requested_checkpoints(&events).is_empty());
    assert_eq!(auto_approved_checkpoints(&events).len(), 5);
    assert!(matches!(
        events.last(),
        Some(OrchestrationEvent::OrchestrationCompleted { session_id, .. }) if session_id == "test-1"
    ));

    let store = orchestrator.store();
    let checkpoints = store.list_checkpoints("test-1").await.unwrap();
    let names: Vec<_> = checkpoints.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "data-analysis-completed",
            "model-recommendation-completed",
            "preprocessing-completed",
            "training-completed",
            "deployment-completed",
        ]
    );

    let training: Option<TrainingOutcome> = store.load_artifact("test-1", "training").await.unwrap();
    assert_eq!(training, Some(training_outcome()));
    assert!(store.get_resumable_sessions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_phase_failure_persists_failed_session() {
    let agents = mock_agents(Confidences::all(0.95))
        .with_training(MockAgent::<TrainingOutcome>::failing("out of memory"));
    let (_temp, orchestrator) = orchestrator(agents);

    let stream = orchestrator
        .execute("data.csv", skip_hitl_options(), CancellationToken::new())
        .await
        .unwrap();
    let events = collect(stream).await;

    assert_stream_shape(&events);
    match events.last() {
        Some(OrchestrationEvent::OrchestrationFailed { error, .. }) => {
            assert!(error.contains("out of memory"), "error: {error}");
        }
        other => panic!("Expected OrchestrationFailed, got {other:?}"),
    }

    let session = orchestrator.store().load_session("test-1").await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Failed);
    assert_eq!(session.current_state(), OrchestrationState::Failed);
    assert!(session.context.error.as_deref().unwrap_or_default().contains("out of memory"));
    assert!(session.context.preprocessing.is_some());
    assert!(session.context.training.is_none());

    assert!(matches!(
        orchestrator.resume("test-1", CancellationToken::new()).await,
        Err(OrchestratorError::NotResumable { status: SessionStatus::Failed, .. })
    ));
}

#[tokio::test]
async fn test_store_failure_mid_run_fails_session() {
    let (temp, orchestrator) = orchestrator(mock_agents(Confidences::all(0.95)));

    let stream = orchestrator
        .execute("data.csv", skip_hitl_options(), CancellationToken::new())
        .await
        .unwrap();
    // A plain file where the artifacts directory belongs makes the first
    // artifact write fail.
    std::fs::write(temp.path().join("sessions/test-1/artifacts"), b"blocked").unwrap();
    let events = collect(stream).await;

    assert_stream_shape(&events);
    match events.last() {
        Some(OrchestrationEvent::OrchestrationFailed { session_id, error, .. }) => {
            assert_eq!(session_id, "test-1");
            assert!(error.contains("Failed to persist"), "error: {error}");
        }
        other => panic!("Expected OrchestrationFailed, got {other:?}"),
    }
    assert_eq!(started_phases(&events), vec![1]);

    let session = orchestrator.store().load_session("test-1").await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Failed);
    assert!(session.context.error.is_some());
}

#[tokio::test]
async fn test_resume_without_decision_repeats_request() {
    let (_temp, orchestrator) = orchestrator(mock_agents(Confidences::all(0.95)));

    let stream = orchestrator
        .execute("data.csv", manual_options(), CancellationToken::new())
        .await
        .unwrap();
    let first = collect(stream).await;
    assert_eq!(requested_checkpoints(&first), vec!["data-analysis-review"]);

    let stream = orchestrator
        .resume("test-1", CancellationToken::new())
        .await
        .unwrap();
    let events = collect(stream).await;

    assert!(matches!(
        events[0],
        OrchestrationEvent::OrchestrationResumed {
            state: OrchestrationState::DataAnalysisReview,
            ..
        }
    ));
    assert!(!events
        .iter()
        .any(|e| matches!(e, OrchestrationEvent::HitlResponseReceived { .. })));
    assert!(started_phases(&events).is_empty());
    assert_eq!(requested_checkpoints(&events), vec!["data-analysis-review"]);
    assert_eq!(first.last(), events.last());

    let session = orchestrator.store().load_session("test-1").await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Paused);
    assert!(orchestrator.store().list_decisions("test-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_modify_reruns_phase_with_overrides() {
    let (_temp, orchestrator) = orchestrator(AgentSet::simulated());

    let stream = orchestrator
        .execute("data.csv", manual_options(), CancellationToken::new())
        .await
        .unwrap();
    collect(stream).await;
    let analysis: Option<DataAnalysisReport> =
        orchestrator.store().load_artifact("test-1", "data-analysis").await.unwrap();
    assert_eq!(analysis.unwrap().detected_target.as_deref(), Some("label"));

    let overrides = OptionOverrides {
        target_column: Some("price".to_string()),
        task_type: Some(TaskType::Regression),
        optimization_metric: None,
    };
    let decision = orchestrator
        .respond_with_overrides("test-1", "modify", None, overrides.clone())
        .await
        .unwrap();
    assert_eq!(decision.action, HitlResponseAction::Modify);
    assert_eq!(decision.overrides.as_ref(), Some(&overrides));

    let session = orchestrator.store().load_session("test-1").await.unwrap().unwrap();
    assert_eq!(session.current_state(), OrchestrationState::DataAnalysis);
    assert!(session.context.data_analysis.is_none());

    let stream = orchestrator
        .resume("test-1", CancellationToken::new())
        .await
        .unwrap();
    let events = collect(stream).await;
    assert_eq!(started_phases(&events), vec![1]);
    assert_eq!(requested_checkpoints(&events), vec!["data-analysis-review"]);

    let session = orchestrator.store().load_session("test-1").await.unwrap().unwrap();
    assert_eq!(session.context.options.target_column.as_deref(), Some("price"));
    let analysis = session.context.data_analysis.unwrap().result;
    assert_eq!(analysis.detected_target.as_deref(), Some("price"));
    assert_eq!(analysis.inferred_task_type, Some(TaskType::Regression));

    let decisions = orchestrator.store().list_decisions("test-1").await.unwrap();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].overrides, Some(overrides));
}

#[tokio::test]
async fn test_overrides_rejected_for_non_modify_option() {
    let (_temp, orchestrator) = orchestrator(mock_agents(Confidences::all(0.95)));
    let stream = orchestrator
        .execute("data.csv", manual_options(), CancellationToken::new())
        .await
        .unwrap();
    collect(stream).await;

    let overrides = OptionOverrides {
        target_column: Some("price".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        orchestrator
            .respond_with_overrides("test-1", "approve", None, overrides)
            .await,
        Err(OrchestratorError::OverridesRequireModify { option_id, .. }) if option_id == "approve"
    ));
    let session = orchestrator.store().load_session("test-1").await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Paused);
    assert!(orchestrator.store().list_decisions("test-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancelled_token_before_start() {
    let (_temp, orchestrator) = orchestrator(mock_agents(Confidences::all(0.95)));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let stream = orchestrator
        .execute("data.csv", manual_options(), cancel)
        .await
        .unwrap();
    let events = collect(stream).await;

    assert_eq!(events.len(), 2);
    assert!(matches!(events[1], OrchestrationEvent::OrchestrationCancelled { .. }));

    let session = orchestrator.store().load_session("test-1").await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Cancelled);
}

#[tokio::test]
async fn test_cancel_during_running_phase() {
    let agents = mock_agents(Confidences::all(0.95)).with_training(
        MockAgent::success(training_outcome(), 0.95).with_delay(Duration::from_secs(60)),
    );
    let (_temp, orchestrator) = orchestrator(agents);
    let cancel = CancellationToken::new();

    let mut stream = orchestrator
        .execute("data.csv", skip_hitl_options(), cancel.clone())
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        if event == (OrchestrationEvent::AgentStarted { agent_type: AgentType::MlopsManager }) {
            cancel.cancel();
        }
        events.push(event);
    }

    assert!(matches!(
        events.last(),
        Some(OrchestrationEvent::OrchestrationCancelled { .. })
    ));
    let session = orchestrator.store().load_session("test-1").await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Cancelled);
    assert!(session.context.training.is_none());
}

#[tokio::test]
async fn test_cancel_option_ends_session() {
    let (_temp, orchestrator) = orchestrator(mock_agents(Confidences::all(0.95)));
    let stream = orchestrator
        .execute("data.csv", manual_options(), CancellationToken::new())
        .await
        .unwrap();
    collect(stream).await;

    let decision = orchestrator
        .respond("test-1", "Cancel", Some("wrong dataset".to_string()))
        .await
        .unwrap();
    assert_eq!(decision.action, HitlResponseAction::Cancel);
    assert_eq!(decision.comment.as_deref(), Some("wrong dataset"));

    let session = orchestrator.store().load_session("test-1").await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Cancelled);
    assert!(matches!(
        orchestrator.resume("test-1", CancellationToken::new()).await,
        Err(OrchestratorError::NotResumable { .. })
    ));
}

#[tokio::test]
async fn test_retry_reruns_training() {
    let training = MockAgent::success(training_outcome(), 0.95);
    let calls = training.call_counter();
    let agents = mock_agents(Confidences::all(0.95)).with_training(training);
    let (_temp, orchestrator) = orchestrator(agents);

    let stream = orchestrator
        .execute("data.csv", auto_options(), CancellationToken::new())
        .await
        .unwrap();
    collect(stream).await;
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);

    let events = respond_and_resume(&orchestrator, "test-1", "retry").await;

    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    assert_eq!(started_phases(&events), vec![4]);
    assert_eq!(requested_checkpoints(&events), vec!["training-review"]);
}

#[tokio::test]
async fn test_export_disposition_is_recorded() {
    let (_temp, orchestrator) = orchestrator(mock_agents(Confidences::all(0.95)));
    let stream = orchestrator
        .execute("data.csv", auto_options(), CancellationToken::new())
        .await
        .unwrap();
    collect(stream).await;

    respond_and_resume(&orchestrator, "test-1", "approve").await;
    let events = respond_and_resume(&orchestrator, "test-1", "export").await;

    assert!(matches!(
        events.last(),
        Some(OrchestrationEvent::OrchestrationCompleted { .. })
    ));
    let session = orchestrator.store().load_session("test-1").await.unwrap().unwrap();
    assert_eq!(
        session.context.deployment.unwrap().result.disposition,
        Some(DeploymentDisposition::Export)
    );
}

#[tokio::test]
async fn test_respond_errors() {
    let (_temp, orchestrator) = orchestrator(mock_agents(Confidences::all(0.95)));

    assert!(matches!(
        orchestrator.respond("missing", "approve", None).await,
        Err(OrchestratorError::SessionNotFound(id)) if id == "missing"
    ));
    assert!(matches!(
        orchestrator.resume("missing", CancellationToken::new()).await,
        Err(OrchestratorError::SessionNotFound(_))
    ));

    let stream = orchestrator
        .execute("data.csv", manual_options(), CancellationToken::new())
        .await
        .unwrap();
    collect(stream).await;

    assert!(matches!(
        orchestrator.respond("test-1", "deploy", None).await,
        Err(OrchestratorError::Hitl(HitlError::UnknownOption { .. }))
    ));
    let session = orchestrator.store().load_session("test-1").await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Paused);
    assert!(orchestrator.store().list_decisions("test-1").await.unwrap().is_empty());

    orchestrator.respond("test-1", "approve", None).await.unwrap();
    assert!(matches!(
        orchestrator.respond("test-1", "approve", None).await,
        Err(OrchestratorError::NotAwaitingReview { status: SessionStatus::Active, .. })
    ));
}

#[tokio::test]
async fn test_sessions_run_concurrently() {
    let (_temp, orchestrator) = orchestrator(AgentSet::simulated());

    let (first, second) = tokio::join!(
        orchestrator.execute("a.csv", skip_hitl_options(), CancellationToken::new()),
        orchestrator.execute("b.csv", skip_hitl_options(), CancellationToken::new()),
    );
    let (first, second) = tokio::join!(collect(first.unwrap()), collect(second.unwrap()));

    let first_id = extract_session_id(&first).unwrap();
    let second_id = extract_session_id(&second).unwrap();
    assert_ne!(first_id, second_id);
    assert!(first.last().is_some_and(OrchestrationEvent::is_terminal));
    assert!(matches!(
        second.last(),
        Some(OrchestrationEvent::OrchestrationCompleted { .. })
    ));

    let sessions = orchestrator.store().list_sessions().await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert!(sessions.iter().all(|s| s.status == SessionStatus::Completed));
}
