//! # mloop-protocol
//!
//! Core data models and the event protocol for mloop orchestration.
//!
//! This crate defines all shared data structures used for:
//! - The orchestration state machine and session lifecycle
//! - Run options and per-phase results
//! - Human-in-the-loop requests, decisions and snapshots
//! - The event stream consumed by the CLI
//! - Configuration file parsing (`.mloop/config.toml`)
//!
//! ## Modules
//!
//! - [`agent_models`]: Agent roles performing phase work
//! - [`config_models`]: Global configuration from config.toml
//! - [`context_models`]: The orchestration context
//! - [`events`]: Orchestration events
//! - [`hitl_models`]: Checkpoint requests, options, actions and decisions
//! - [`pipeline_models`]: Run options and phase results
//! - [`process_models`]: States, statuses and sessions
//!
//! ## Design Principles
//!
//! - Minimal dependencies: Only serde, chrono and ts-rs
//! - TypeScript generation: All types derive `TS` for client compatibility
//! - Independent compilation: No dependencies on other mloop crates

pub mod agent_models;
pub mod config_models;
pub mod context_models;
pub mod events;
pub mod hitl_models;
pub mod pipeline_models;
pub mod process_models;

// Re-export all public types for convenience
pub use agent_models::*;
pub use config_models::*;
pub use context_models::*;
pub use events::*;
pub use hitl_models::*;
pub use pipeline_models::*;
pub use process_models::*;
