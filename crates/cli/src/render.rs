//! Terminal rendering of orchestration events and stored sessions.

use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use mloop_protocol::events::OrchestrationEvent;
use mloop_protocol::hitl_models::{HitlDecision, HitlRequest};
use mloop_protocol::process_models::{OrchestrationSession, SessionStatus, SessionSummary};

const PHASE_COUNT: u8 = 5;

pub fn print_event(event: &OrchestrationEvent) {
    match event {
        OrchestrationEvent::OrchestrationStarted {
            session_id,
            data_file_path,
        } => {
            println!(
                "{} session {} for {}",
                "Started".bold().cyan(),
                session_id.bold(),
                data_file_path.display()
            );
        }
        OrchestrationEvent::OrchestrationResumed { session_id, state } => {
            println!(
                "{} session {} at {}",
                "Resumed".bold().cyan(),
                session_id.bold(),
                state
            );
        }
        OrchestrationEvent::PhaseStarted {
            phase_number,
            phase_name,
        } => {
            println!();
            println!(
                "{}",
                format!("[{phase_number}/{PHASE_COUNT}] {phase_name}").bold()
            );
        }
        OrchestrationEvent::ProgressUpdate {
            current_operation,
            percentage,
        } => {
            println!("  {}", format!("{current_operation} ({percentage:.0}%)").dimmed());
        }
        OrchestrationEvent::AgentStarted { agent_type } => {
            println!("  {} {agent_type} working", "→".cyan());
        }
        OrchestrationEvent::AgentCompleted {
            agent_type,
            duration_ms,
        } => {
            println!(
                "  {} {agent_type} finished in {}",
                "✓".green(),
                format_duration(*duration_ms)
            );
        }
        OrchestrationEvent::PhaseCompleted {
            phase_name,
            duration_ms,
            confidence,
            ..
        } => {
            println!(
                "{} {phase_name} completed in {} (confidence {confidence:.2})",
                "✓".green().bold(),
                format_duration(*duration_ms)
            );
        }
        OrchestrationEvent::HitlRequested(request) => print_request(request),
        OrchestrationEvent::CheckpointAutoApproved {
            checkpoint_id,
            confidence,
        } => {
            println!(
                "  {} {checkpoint_id} auto-approved (confidence {confidence:.2})",
                "↷".green()
            );
        }
        OrchestrationEvent::HitlResponseReceived {
            checkpoint_id,
            selected_option_id,
            action,
            ..
        } => {
            println!(
                "  {} {checkpoint_id}: selected '{selected_option_id}' ({action})",
                "↳".cyan()
            );
        }
        OrchestrationEvent::OrchestrationCompleted {
            session_id,
            total_duration_ms,
        } => {
            println!();
            println!(
                "{} session {session_id} in {}",
                "Orchestration completed".green().bold(),
                format_duration(*total_duration_ms)
            );
        }
        OrchestrationEvent::OrchestrationFailed { session_id, error } => {
            println!();
            println!("{} session {session_id}", "Orchestration failed".red().bold());
            println!("  {}", error.red());
        }
        OrchestrationEvent::OrchestrationCancelled { session_id } => {
            println!();
            println!(
                "{} session {session_id}",
                "Orchestration cancelled".yellow().bold()
            );
        }
    }
}

pub fn print_request(request: &HitlRequest) {
    println!();
    println!("{}", "═".repeat(60).yellow());
    println!(
        "{} {}",
        "Review required:".yellow().bold(),
        request.checkpoint_name.bold()
    );
    println!("{}", "═".repeat(60).yellow());
    println!("{}", request.question);

    if !request.context.is_empty() {
        println!();
        for (key, value) in &request.context {
            println!("  {:<22} {value}", format!("{key}:").dimmed());
        }
    }

    println!();
    for (i, option) in request.options.iter().enumerate() {
        let marker = if option.is_default { " (default)" } else { "" };
        println!(
            "  {}. {} [{}]{}",
            i + 1,
            option.label.bold(),
            option.id,
            marker.dimmed()
        );
        if !option.description.is_empty() {
            println!("     {}", option.description.dimmed());
        }
    }
}

pub fn print_resume_hint(session_id: &str) {
    println!();
    println!("Session {} is waiting for review. Continue with:", session_id.bold());
    println!("  mloop sessions approve {session_id} [--option <id>]");
    println!("  mloop orchestrate --resume {session_id}");
}

pub fn print_session_table(sessions: &[SessionSummary]) {
    if sessions.is_empty() {
        println!("No sessions found");
        return;
    }

    println!(
        "{}",
        format!(
            "{:<34} {:<24} {:<10} {:<17} DATA FILE",
            "SESSION", "STATE", "STATUS", "UPDATED"
        )
        .bold()
    );
    for session in sessions {
        let status = format!("{:<10}", session.status.to_string());
        println!(
            "{:<34} {:<24} {} {:<17} {}",
            session.session_id,
            session.current_state.to_string(),
            colorize_status(session.status, &status),
            local_time(session.updated_at),
            session.data_file_path.display()
        );
        if let Some(error) = &session.error {
            println!("  {}", error.red());
        }
    }
}

pub fn print_session_detail(session: &OrchestrationSession, decisions: &[HitlDecision]) {
    let context = &session.context;
    println!("{}", format!("Session {}", context.session_id).bold().cyan());
    println!("  Data file:  {}", context.data_file_path.display());
    println!("  State:      {}", context.current_state);
    println!(
        "  Status:     {}",
        colorize_status(session.status, &session.status.to_string())
    );
    println!("  Created:    {}", local_time(session.created_at));
    println!("  Updated:    {}", local_time(session.updated_at));
    if let Some(target) = context.effective_target_column() {
        println!("  Target:     {target}");
    }
    if let Some(task_type) = context.effective_task_type() {
        println!("  Task type:  {task_type}");
    }
    if let Some(error) = &context.error {
        println!("  Error:      {}", error.red());
    }

    println!();
    println!("{}", "Phases".bold());
    let phases = [
        ("Data Analysis", context.data_analysis.as_ref().map(|r| r.confidence)),
        (
            "Model Recommendation",
            context.model_recommendation.as_ref().map(|r| r.confidence),
        ),
        ("Preprocessing", context.preprocessing.as_ref().map(|r| r.confidence)),
        ("Training", context.training.as_ref().map(|r| r.confidence)),
        ("Deployment", context.deployment.as_ref().map(|r| r.confidence)),
    ];
    for (name, confidence) in phases {
        match confidence {
            Some(c) => println!("  {} {name:<22} confidence {c:.2}", "✓".green()),
            None => println!("  {} {}", "·".dimmed(), name.dimmed()),
        }
    }

    if !decisions.is_empty() {
        println!();
        println!("{}", "Decisions".bold());
        for decision in decisions {
            let how = if decision.auto_approved { "auto" } else { "human" };
            println!(
                "  {} {:<24} {:<8} {how}",
                local_time(decision.decided_at),
                decision.checkpoint_id,
                decision.option_id
            );
            if let Some(comment) = &decision.comment {
                println!("      {}", comment.dimmed());
            }
        }
    }
}

fn colorize_status(status: SessionStatus, text: &str) -> String {
    match status {
        SessionStatus::Active => text.cyan().to_string(),
        SessionStatus::Paused => text.yellow().to_string(),
        SessionStatus::Completed => text.green().to_string(),
        SessionStatus::Failed => text.red().to_string(),
        SessionStatus::Cancelled => text.dimmed().to_string(),
    }
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Human-readable duration: `850ms`, `4.2s`, `3m 07s`.
pub fn format_duration(ms: u64) -> String {
    match ms {
        0..=999 => format!("{ms}ms"),
        1_000..=59_999 => format!("{:.1}s", ms as f64 / 1000.0),
        _ => {
            let seconds = ms / 1000;
            format!("{}m {:02}s", seconds / 60, seconds % 60)
        }
    }
}
