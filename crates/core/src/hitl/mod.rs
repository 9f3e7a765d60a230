//! Human-in-the-loop checkpoints.
//!
//! This module provides:
//! - The static checkpoint table, one definition per review state
//! - `HitlCheckpointManager`, the policy deciding when to pause and how to
//!   interpret a reviewer's answer

pub mod checkpoints;
pub mod error;
pub mod manager;

pub use checkpoints::{checkpoint_by_id, checkpoint_for, CheckpointDefinition, CheckpointOption};
pub use error::{HitlError, HitlResult};
pub use manager::HitlCheckpointManager;
