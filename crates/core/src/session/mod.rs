//! Durable, file-backed persistence of orchestration sessions.
//!
//! Each session owns a directory under the store root holding the session
//! record, append-only checkpoint and decision logs, and named artifacts.

pub mod error;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::OrchestrationSessionStore;
