//! Subprocess executor for command-backed phase agents.
//!
//! Spawns an external command and parses its stdout as JSON Lines.

use crate::agents::base::AgentError;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio_stream::Stream;

/// Number of trailing stderr bytes quoted in a failure message.
const STDERR_TAIL: usize = 2000;

pub type JsonLineStream = Pin<Box<dyn Stream<Item = Result<serde_json::Value, AgentError>> + Send>>;

pub struct CliExecutor;

impl CliExecutor {
    /// Execute a command and parse its stdout as JSON Lines.
    ///
    /// Empty lines are skipped. A line that is not JSON yields
    /// `AgentError::InvalidOutput` and reading continues. A non-zero exit
    /// yields a final `AgentError::ExecutionError` quoting the end of stderr.
    ///
    /// The child is killed if the stream is dropped before it finishes.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mloop_core::agents::cli_executor::CliExecutor;
    /// use tokio_stream::StreamExt;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let stream = CliExecutor::execute(
    ///         "echo".to_string(),
    ///         vec![r#"{"progress":"profiling"}"#.to_string()],
    ///         ".".into(),
    ///     );
    ///
    ///     let values: Vec<_> = stream.collect().await;
    ///     println!("Got {} values", values.len());
    /// }
    /// ```
    pub fn execute(command: String, args: Vec<String>, working_dir: PathBuf) -> JsonLineStream {
        let stream = async_stream::stream! {
            let mut cmd = Command::new(&command);
            cmd.args(&args);
            cmd.current_dir(&working_dir);
            cmd.stdin(Stdio::null());
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
            cmd.kill_on_drop(true);

            let mut child = match cmd.spawn() {
                Ok(child) => child,
                Err(e) => {
                    yield Err(AgentError::ExecutionError(format!(
                        "Failed to spawn command '{command}': {e}"
                    )));
                    return;
                }
            };

            let Some(stdout) = child.stdout.take() else {
                yield Err(AgentError::ExecutionError("Failed to capture stdout".to_string()));
                return;
            };

            // Drain stderr concurrently so a chatty child cannot block on a full pipe.
            let stderr_task = child.stderr.take().map(|mut stderr| {
                tokio::spawn(async move {
                    let mut buf = String::new();
                    let _ = stderr.read_to_string(&mut buf).await;
                    buf
                })
            });

            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }

                match serde_json::from_str::<serde_json::Value>(&line) {
                    Ok(value) => yield Ok(value),
                    Err(e) => {
                        yield Err(AgentError::InvalidOutput(format!(
                            "Failed to parse JSON: {e} (line: {line})"
                        )));
                    }
                }
            }

            let status = child.wait().await;
            let stderr = match stderr_task {
                Some(task) => task.await.unwrap_or_default(),
                None => String::new(),
            };

            match status {
                Ok(status) if status.success() => {}
                Ok(status) => {
                    yield Err(AgentError::ExecutionError(format!(
                        "Command '{command}' exited with {status}{}",
                        stderr_suffix(&stderr)
                    )));
                }
                Err(e) => {
                    yield Err(AgentError::ExecutionError(format!(
                        "Failed to wait for command '{command}': {e}"
                    )));
                }
            }
        };

        Box::pin(stream)
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let mut start = trimmed.len().saturating_sub(STDERR_TAIL);
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    format!(": {}", &trimmed[start..])
}
