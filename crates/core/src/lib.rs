//! # mloop-core
//!
//! Human-in-the-loop orchestration engine for mloop.
//!
//! This crate provides:
//! - Configuration loading from `.mloop/config.toml` and `mloop.yaml`
//! - The checkpoint policy deciding when a run pauses for review
//! - File-backed persistence of sessions, decisions and artifacts
//! - Phase agents (external commands, simulated, mock)
//! - The orchestrator driving sessions through the pipeline
//!
//! ## Modules
//!
//! - [`agents`]: Phase agent trait and implementations
//! - [`config`]: Configuration loading and management
//! - [`engine`]: Orchestration state machine driver
//! - [`hitl`]: Checkpoint table and policy
//! - [`session`]: Session store
//! - [`state`]: Session transitions and id generation

pub mod agents;
pub mod config;
pub mod engine;
pub mod hitl;
pub mod session;
pub mod state;
