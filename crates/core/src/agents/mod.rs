//! Phase agent abstraction and wiring.
//!
//! This module provides the `PhaseAgent` trait (Adapter Pattern), the
//! command-backed, simulated and mock implementations, and `AgentSet`,
//! which assigns one agent to each work phase.

pub mod adapters;
pub mod base;
pub mod cli_executor;
pub mod manager;

pub use adapters::{CommandAgent, MockAgent};
pub use base::{AgentError, PhaseAgent, SharedAgent};
pub use manager::AgentSet;
