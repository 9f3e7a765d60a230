//! Base phase collaborator trait and supporting types.

use async_trait::async_trait;
use mloop_protocol::context_models::OrchestrationContext;
use mloop_protocol::pipeline_models::PhaseOutcome;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("Agent not available: {0}")]
    NotAvailable(String),
    #[error("Execution failed: {0}")]
    ExecutionError(String),
    #[error("Invalid output: {0}")]
    InvalidOutput(String),
    #[error("Not configured: {0}")]
    NotConfigured(String),
}

/// Performs the work of one pipeline phase.
///
/// An agent is handed the context accumulated so far and returns its result
/// with a confidence score in [0, 1], or an error.
#[async_trait]
pub trait PhaseAgent<T: Send>: Send + Sync {
    async fn check_availability(&self) -> bool;
    async fn run(&self, context: &OrchestrationContext) -> Result<PhaseOutcome<T>, AgentError>;
}

/// A shareable handle to a phase agent.
pub type SharedAgent<T> = Arc<dyn PhaseAgent<T>>;
