//! Common test utilities and helpers for orchestration tests.
//!
//! This module provides shared functionality across the integration tests:
//! - Fixtures (phase results, agent sets, orchestrators on temp stores)
//! - Event assertions

pub mod assertions;
pub mod fixtures;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;
