//! Mock phase agent for testing.

use crate::agents::base::{AgentError, PhaseAgent};
use async_trait::async_trait;
use mloop_protocol::context_models::OrchestrationContext;
use mloop_protocol::pipeline_models::PhaseOutcome;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
enum Behavior<T> {
    Succeed { result: T, confidence: f64 },
    Fail(String),
}

#[derive(Clone)]
pub struct MockAgent<T> {
    available: bool,
    behavior: Behavior<T>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl<T> MockAgent<T> {
    pub fn success(result: T, confidence: f64) -> Self {
        Self {
            available: true,
            behavior: Behavior::Succeed { result, confidence },
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            available: true,
            behavior: Behavior::Fail(message.into()),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::failing("Mock agent not available")
        }
    }

    /// Sleep for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared counter of `run` calls, still readable after the agent is moved.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T> PhaseAgent<T> for MockAgent<T>
where
    T: Clone + Send + Sync,
{
    async fn check_availability(&self) -> bool {
        self.available
    }

    async fn run(&self, _context: &OrchestrationContext) -> Result<PhaseOutcome<T>, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.available {
            return Err(AgentError::NotAvailable("Mock agent not available".to_string()));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behavior {
            Behavior::Succeed { result, confidence } => {
                Ok(PhaseOutcome::new(result.clone(), *confidence))
            }
            Behavior::Fail(message) => Err(AgentError::ExecutionError(message.clone())),
        }
    }
}
