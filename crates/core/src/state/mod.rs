//! Session lifecycle management.
//!
//! This module provides:
//! - Transition helpers that move a session between statuses and announce it
//! - Session id generation

pub mod ids;
pub mod transitions;

pub use ids::{SequentialSessionIds, SessionIdGenerator, UuidSessionIds};
