//! The orchestration session store.
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/<session-id>/session.json
//! <root>/<session-id>/checkpoints.jsonl
//! <root>/<session-id>/decisions.jsonl
//! <root>/<session-id>/artifacts/<name>.json
//! ```
//!
//! Session files are replaced atomically. Concurrent writers to the same
//! session are not coordinated: the last save wins. Callers must keep a
//! single writer per session.

use crate::session::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use mloop_protocol::hitl_models::{HitlDecision, SessionCheckpoint};
use mloop_protocol::process_models::{OrchestrationSession, SessionSummary};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const SESSION_FILE: &str = "session.json";
const CHECKPOINT_LOG: &str = "checkpoints.jsonl";
const DECISION_LOG: &str = "decisions.jsonl";
const ARTIFACTS_DIR: &str = "artifacts";

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct OrchestrationSessionStore {
    root: PathBuf,
    clock: Clock,
}

impl fmt::Debug for OrchestrationSessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrchestrationSessionStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl OrchestrationSessionStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            clock: Arc::new(Utc::now),
        }
    }

    /// Create a store under the project convention `<project>/.mloop/sessions`.
    pub fn for_project(project: impl AsRef<Path>) -> Self {
        Self::new(project.as_ref().join(".mloop").join("sessions"))
    }

    /// Replace the clock used to stamp `updated_at` and to age sessions.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Current time as seen by this store.
    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn session_dir(&self, session_id: &str) -> StoreResult<PathBuf> {
        if !is_safe_name(session_id) {
            return Err(StoreError::InvalidSessionId(session_id.to_string()));
        }
        Ok(self.root.join(session_id))
    }

    /// Persist a session, refreshing its `updated_at` to the current time.
    pub async fn save_session(&self, session: &mut OrchestrationSession) -> StoreResult<()> {
        let dir = self.session_dir(session.session_id())?;
        session.updated_at = self.now();

        let bytes = serde_json::to_vec_pretty(session).map_err(StoreError::Serialize)?;
        ensure_dir(&dir).await?;
        write_atomic(dir.join(SESSION_FILE), bytes).await?;

        debug!(
            session_id = %session.session_id(),
            state = %session.current_state(),
            status = %session.status,
            "Saved session"
        );
        Ok(())
    }

    /// Load a session. Returns `None` when nothing is stored under `session_id`.
    pub async fn load_session(&self, session_id: &str) -> StoreResult<Option<OrchestrationSession>> {
        let path = self.session_dir(session_id)?.join(SESSION_FILE);
        read_json(&path).await
    }

    /// Remove a session and everything stored with it. Missing sessions are ignored.
    pub async fn delete_session(&self, session_id: &str) -> StoreResult<()> {
        let dir = self.session_dir(session_id)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!(session_id, "Deleted session");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(dir, e)),
        }
    }

    pub fn session_exists(&self, session_id: &str) -> bool {
        self.session_dir(session_id)
            .map(|dir| dir.join(SESSION_FILE).is_file())
            .unwrap_or(false)
    }

    async fn load_all(&self) -> StoreResult<Vec<OrchestrationSession>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.root).to_path_buf();
                StoreError::io(path, e.into())
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path().join(SESSION_FILE);
            match read_json::<OrchestrationSession>(&path).await {
                Ok(Some(session)) => sessions.push(session),
                Ok(None) => warn!(dir = %entry.path().display(), "Skipping directory without session file"),
                Err(e) => warn!(dir = %entry.path().display(), error = %e, "Skipping unreadable session"),
            }
        }
        Ok(sessions)
    }

    /// Summaries of every stored session, most recently updated first.
    pub async fn list_sessions(&self) -> StoreResult<Vec<SessionSummary>> {
        let mut sessions = self.load_all().await?;
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions.iter().map(SessionSummary::from).collect())
    }

    /// Sessions whose status is `Active` or `Paused`.
    ///
    /// Only the status is consulted, never the current state.
    pub async fn get_resumable_sessions(&self) -> StoreResult<Vec<SessionSummary>> {
        Ok(self
            .list_sessions()
            .await?
            .into_iter()
            .filter(|s| s.status.is_resumable())
            .collect())
    }

    /// Delete terminal sessions last updated at least `max_age` ago.
    ///
    /// Active and paused sessions are never removed. Returns the number deleted.
    pub async fn cleanup_old_sessions(&self, max_age: Duration) -> StoreResult<usize> {
        // Ages beyond chrono's range can never be reached.
        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            return Ok(0);
        };
        let now = self.now();

        let mut removed = 0;
        for session in self.load_all().await? {
            if session.status.is_terminal() && now - session.updated_at >= max_age {
                self.delete_session(session.session_id()).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, "Cleaned up old sessions");
        }
        Ok(removed)
    }

    /// Append a named snapshot to the session's checkpoint log.
    pub async fn save_checkpoint(
        &self,
        session_id: &str,
        checkpoint: &SessionCheckpoint,
    ) -> StoreResult<()> {
        let path = self.session_dir(session_id)?.join(CHECKPOINT_LOG);
        append_json_line(&path, checkpoint).await?;
        debug!(session_id, name = %checkpoint.name, "Saved checkpoint");
        Ok(())
    }

    /// Snapshots in the order they were saved.
    pub async fn list_checkpoints(&self, session_id: &str) -> StoreResult<Vec<SessionCheckpoint>> {
        let path = self.session_dir(session_id)?.join(CHECKPOINT_LOG);
        read_json_lines(&path).await
    }

    /// Append a decision to the session's decision log. Prior entries are never rewritten.
    pub async fn save_decision(&self, session_id: &str, decision: &HitlDecision) -> StoreResult<()> {
        let path = self.session_dir(session_id)?.join(DECISION_LOG);
        append_json_line(&path, decision).await?;
        debug!(
            session_id,
            checkpoint_id = %decision.checkpoint_id,
            option_id = %decision.option_id,
            "Recorded decision"
        );
        Ok(())
    }

    /// Decisions in the order they were recorded.
    pub async fn list_decisions(&self, session_id: &str) -> StoreResult<Vec<HitlDecision>> {
        let path = self.session_dir(session_id)?.join(DECISION_LOG);
        read_json_lines(&path).await
    }

    /// Ensure the session's artifact directory exists and return it.
    pub async fn get_artifacts_directory(&self, session_id: &str) -> StoreResult<PathBuf> {
        let dir = self.session_dir(session_id)?.join(ARTIFACTS_DIR);
        ensure_dir(&dir).await?;
        Ok(dir)
    }

    /// Store `artifact` as `<name>.json`, replacing any previous artifact of that name.
    pub async fn save_artifact<T: Serialize + ?Sized>(
        &self,
        session_id: &str,
        name: &str,
        artifact: &T,
    ) -> StoreResult<PathBuf> {
        if !is_safe_name(name) {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        let dir = self.get_artifacts_directory(session_id).await?;
        let path = dir.join(format!("{name}.json"));

        let bytes = serde_json::to_vec_pretty(artifact).map_err(StoreError::Serialize)?;
        write_atomic(path.clone(), bytes).await?;
        debug!(session_id, name, "Saved artifact");
        Ok(path)
    }

    /// Load an artifact. Returns `None` when no artifact has that name.
    pub async fn load_artifact<T: DeserializeOwned>(
        &self,
        session_id: &str,
        name: &str,
    ) -> StoreResult<Option<T>> {
        if !is_safe_name(name) {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        let path = self
            .session_dir(session_id)?
            .join(ARTIFACTS_DIR)
            .join(format!("{name}.json"));
        read_json(&path).await
    }
}

/// Names must be non-empty and stay inside their parent directory.
fn is_safe_name(name: &str) -> bool {
    !(name.trim().is_empty()
        || name.contains(['/', '\\'])
        || name.contains("..")
        || Path::new(name).is_absolute())
}

async fn ensure_dir(dir: &Path) -> StoreResult<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| StoreError::io(dir, e))
}

/// Write `bytes` to a temp file beside `path`, then rename it into place.
async fn write_atomic(path: PathBuf, bytes: Vec<u8>) -> StoreResult<()> {
    let target = path.clone();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let dir = target.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| StoreError::io(&path, std::io::Error::other(e)))?
    .map_err(|e| StoreError::io(&path, e))
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| StoreError::Deserialize {
            path: path.to_path_buf(),
            source,
        })
}

async fn append_json_line<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    if let Some(dir) = path.parent() {
        ensure_dir(dir).await?;
    }

    let mut line = serde_json::to_vec(value).map_err(StoreError::Serialize)?;
    line.push(b'\n');

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    file.write_all(&line)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    file.flush().await.map_err(|e| StoreError::io(path, e))
}

async fn read_json_lines<T: DeserializeOwned>(path: &Path) -> StoreResult<Vec<T>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|source| StoreError::Deserialize {
                path: path.to_path_buf(),
                source,
            })
        })
        .collect()
}
