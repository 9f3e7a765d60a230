//! Orchestration engine.
//!
//! The `MlopsOrchestrator` drives a session through the five pipeline phases,
//! reporting progress as a stream of `OrchestrationEvent`s. At each review
//! state the checkpoint manager decides whether the run pauses for a human or
//! continues with the checkpoint's default option. A pause ends the stream;
//! `respond` records the decision and `resume` continues from the saved state.

pub mod error;
mod orchestrator;
mod phase;

pub use error::{OrchestratorError, OrchestratorResult};
pub use orchestrator::{EventStream, MlopsOrchestrator};
