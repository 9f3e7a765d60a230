//! Custom assertion helpers for event streams.
#![allow(dead_code)]

use mloop_protocol::events::OrchestrationEvent;

/// Checkpoint ids of every `HitlRequested` event, in order.
pub fn requested_checkpoints(events: &[OrchestrationEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            OrchestrationEvent::HitlRequested(request) => Some(request.checkpoint_id.clone()),
            _ => None,
        })
        .collect()
}

/// Checkpoint ids of every `CheckpointAutoApproved` event, in order.
pub fn auto_approved_checkpoints(events: &[OrchestrationEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            OrchestrationEvent::CheckpointAutoApproved { checkpoint_id, .. } => {
                Some(checkpoint_id.clone())
            }
            _ => None,
        })
        .collect()
}

/// Phase numbers of every `PhaseStarted` event, in order.
pub fn started_phases(events: &[OrchestrationEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            OrchestrationEvent::PhaseStarted { phase_number, .. } => Some(*phase_number),
            _ => None,
        })
        .collect()
}

/// Session id from the `OrchestrationStarted` event.
pub fn extract_session_id(events: &[OrchestrationEvent]) -> Option<String> {
    events.iter().find_map(|e| match e {
        OrchestrationEvent::OrchestrationStarted { session_id, .. } => Some(session_id.clone()),
        _ => None,
    })
}

/// Assert that only the last event ends the stream, and that it is terminal or a pause.
pub fn assert_stream_shape(events: &[OrchestrationEvent]) {
    let Some(last) = events.last() else {
        panic!("Event sequence is empty");
    };
    assert!(
        last.is_terminal() || matches!(last, OrchestrationEvent::HitlRequested(_)),
        "Last event should be terminal or a review request, got: {last:?}"
    );
    for event in &events[..events.len() - 1] {
        assert!(
            !event.is_terminal() && !matches!(event, OrchestrationEvent::HitlRequested(_)),
            "Stream continued after {event:?}"
        );
    }
}
