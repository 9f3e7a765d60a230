//! Session id generation.
//!
//! The orchestrator never creates ids on its own. It asks an injected
//! generator, so tests can run with predictable ids.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Produces unique session ids.
pub trait SessionIdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Ids of the form `orch-<yyyymmdd-hhmmss>-<8 hex>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidSessionIds;

impl SessionIdGenerator for UuidSessionIds {
    fn next_id(&self) -> String {
        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        let suffix = Uuid::new_v4().simple().to_string();
        format!("orch-{stamp}-{}", &suffix[..8])
    }
}

/// Deterministic ids: `<prefix>-1`, `<prefix>-2`, ...
#[derive(Debug)]
pub struct SequentialSessionIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialSessionIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl SessionIdGenerator for SequentialSessionIds {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{n}", self.prefix)
    }
}
