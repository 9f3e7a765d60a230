//! Phase agent backed by an external command.
//!
//! The command is configured per phase in `.mloop/config.toml`:
//!
//! ```toml
//! [phases.training]
//! command = "python3"
//! args = ["scripts/train.py", "{data_file}", "--label", "{target}"]
//! ```
//!
//! It must print JSON Lines on stdout. `{"progress": "..."}` lines are logged.
//! The last line carrying `result` and `confidence` is the phase outcome.

use crate::agents::base::{AgentError, PhaseAgent};
use crate::agents::cli_executor::CliExecutor;
use async_trait::async_trait;
use mloop_protocol::config_models::PhaseCommand;
use mloop_protocol::context_models::OrchestrationContext;
use mloop_protocol::pipeline_models::PhaseOutcome;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio_stream::StreamExt;
use tracing::{debug, info};

#[derive(Deserialize)]
struct ResultLine<T> {
    result: T,
    confidence: f64,
}

pub struct CommandAgent<T> {
    phase: &'static str,
    command: PhaseCommand,
    _result: PhantomData<fn() -> T>,
}

impl<T> CommandAgent<T> {
    pub fn new(phase: &'static str, command: PhaseCommand) -> Self {
        Self {
            phase,
            command,
            _result: PhantomData,
        }
    }

    /// Substitute context placeholders in the configured arguments.
    fn expand_args(&self, context: &OrchestrationContext) -> Vec<String> {
        let data_file = context.data_file_path.display().to_string();
        let target = context.effective_target_column().unwrap_or_default();
        let task_type = context
            .effective_task_type()
            .map(|t| t.as_str())
            .unwrap_or_default();
        let max_training_time = context.options.max_training_time_seconds.to_string();

        self.command
            .args
            .iter()
            .map(|arg| {
                arg.replace("{data_file}", &data_file)
                    .replace("{session_id}", &context.session_id)
                    .replace("{target}", target)
                    .replace("{task_type}", task_type)
                    .replace("{max_training_time}", &max_training_time)
            })
            .collect()
    }

    fn working_dir(&self) -> PathBuf {
        self.command
            .working_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[async_trait]
impl<T> PhaseAgent<T> for CommandAgent<T>
where
    T: DeserializeOwned + Send,
{
    async fn check_availability(&self) -> bool {
        let program = Path::new(&self.command.command);
        if program.components().count() > 1 {
            return self.working_dir().join(program).is_file() || program.is_file();
        }
        which::which(&self.command.command).is_ok()
    }

    async fn run(&self, context: &OrchestrationContext) -> Result<PhaseOutcome<T>, AgentError> {
        if !self.check_availability().await {
            return Err(AgentError::NotAvailable(format!(
                "command '{}' for {} was not found",
                self.command.command, self.phase
            )));
        }

        let args = self.expand_args(context);
        debug!(phase = self.phase, command = %self.command.command, ?args, "Running phase command");

        let mut stream = CliExecutor::execute(self.command.command.clone(), args, self.working_dir());
        let mut outcome = None;

        while let Some(item) = stream.next().await {
            let value = item?;
            if let Some(progress) = value.get("progress") {
                let message = progress.as_str().map_or_else(|| progress.to_string(), str::to_string);
                info!(phase = self.phase, "{message}");
                continue;
            }
            if value.get("result").is_some() {
                let line: ResultLine<T> = serde_json::from_value(value).map_err(|e| {
                    AgentError::InvalidOutput(format!("{} result line: {e}", self.phase))
                })?;
                let confidence = if line.confidence.is_finite() {
                    line.confidence
                } else {
                    0.0
                };
                outcome = Some(PhaseOutcome::new(line.result, confidence));
            }
        }

        outcome.ok_or_else(|| {
            AgentError::ExecutionError(format!(
                "command '{}' for {} produced no result line",
                self.command.command, self.phase
            ))
        })
    }
}
