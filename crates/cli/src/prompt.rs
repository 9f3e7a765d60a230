//! Interactive checkpoint prompt.

use anyhow::{Context, Result};
use colored::Colorize;
use mloop_core::hitl::checkpoint_by_id;
use mloop_protocol::hitl_models::{HitlRequest, HitlResponseAction};
use mloop_protocol::pipeline_models::{OptionOverrides, TaskType};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// A reviewer's answer to one checkpoint.
#[derive(Debug)]
pub struct Answer {
    pub option_id: String,
    pub overrides: OptionOverrides,
}

/// Reads checkpoint answers from stdin.
///
/// Reads are async so a pending prompt can be dropped when the run is
/// interrupted.
pub struct Prompter {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompter {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Ask for an option, then for option overrides if it modifies the phase.
    ///
    /// Returns `None` when stdin is closed.
    pub async fn answer(&mut self, request: &HitlRequest) -> Result<Option<Answer>> {
        let Some(option_id) = self.choose_option(request).await? else {
            return Ok(None);
        };
        let overrides = if is_modify(request, &option_id) {
            match self.ask_overrides().await? {
                Some(overrides) => overrides,
                None => return Ok(None),
            }
        } else {
            OptionOverrides::default()
        };
        Ok(Some(Answer {
            option_id,
            overrides,
        }))
    }

    /// Ask for one of the request's options until a valid answer arrives.
    ///
    /// Returns `None` when stdin is closed.
    pub async fn choose_option(&mut self, request: &HitlRequest) -> Result<Option<String>> {
        loop {
            print!("{} ", "Select an option (number or id, Enter for default):".bold());
            std::io::stdout().flush().context("Failed to flush stdout")?;

            let Some(line) = self.lines.next_line().await.context("Failed to read stdin")? else {
                return Ok(None);
            };

            match resolve_choice(request, &line) {
                Some(option_id) => return Ok(Some(option_id)),
                None => println!("{} '{}'", "Unknown choice".red(), line.trim()),
            }
        }
    }

    async fn ask_overrides(&mut self) -> Result<Option<OptionOverrides>> {
        println!("{}", "Press Enter to keep the current value.".dimmed());
        let Some(target) = self.ask("Target column:").await? else {
            return Ok(None);
        };
        let task_type = loop {
            let Some(input) = self.ask("Task type (binary, multiclass, regression):").await? else {
                return Ok(None);
            };
            if input.is_empty() {
                break None;
            }
            match input.parse::<TaskType>() {
                Ok(task_type) => break Some(task_type),
                Err(e) => println!("{}", e.as_str().red()),
            }
        };
        let Some(metric) = self.ask("Optimization metric:").await? else {
            return Ok(None);
        };
        Ok(Some(OptionOverrides {
            target_column: non_empty(target),
            task_type,
            optimization_metric: non_empty(metric),
        }))
    }

    /// One trimmed line, or `None` when stdin is closed.
    async fn ask(&mut self, label: &str) -> Result<Option<String>> {
        print!("{} ", label.bold());
        std::io::stdout().flush().context("Failed to flush stdout")?;
        let line = self.lines.next_line().await.context("Failed to read stdin")?;
        Ok(line.map(|l| l.trim().to_string()))
    }
}

impl Default for Prompter {
    fn default() -> Self {
        Self::new()
    }
}

/// Map typed input to an option id.
///
/// Accepts an empty line (the default option), a 1-based index, an option id
/// in any case, or `cancel`.
fn resolve_choice(request: &HitlRequest, input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return request.default_option().map(|o| o.id.clone());
    }
    if input.eq_ignore_ascii_case("cancel") {
        return Some("cancel".to_string());
    }
    if let Ok(index) = input.parse::<usize>() {
        return index
            .checked_sub(1)
            .and_then(|i| request.options.get(i))
            .map(|o| o.id.clone());
    }
    request
        .options
        .iter()
        .find(|o| o.id.eq_ignore_ascii_case(input))
        .map(|o| o.id.clone())
}

fn is_modify(request: &HitlRequest, option_id: &str) -> bool {
    checkpoint_by_id(&request.checkpoint_id)
        .and_then(|c| c.find_option(option_id))
        .is_some_and(|o| o.action == HitlResponseAction::Modify)
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}
