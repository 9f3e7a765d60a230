//! `mloop sessions`: inspect and manage stored sessions.

use crate::args::SessionsAction;
use crate::render;
use anyhow::{bail, Context, Result};
use colored::Colorize;
use mloop_core::agents::AgentSet;
use mloop_core::config::load_config;
use mloop_core::engine::MlopsOrchestrator;
use mloop_protocol::pipeline_models::OptionOverrides;
use mloop_protocol::process_models::SessionStatus;
use std::path::Path;
use std::time::Duration;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

pub async fn run(project_dir: &Path, action: SessionsAction) -> Result<()> {
    let config = load_config(project_dir)
        .await
        .context("Failed to load configuration")?;
    let store = config.session_store();

    match action {
        SessionsAction::List { resumable } => {
            let sessions = if resumable {
                store.get_resumable_sessions().await?
            } else {
                store.list_sessions().await?
            };
            render::print_session_table(&sessions);
        }

        SessionsAction::Show { session_id, json } => {
            let Some(session) = store.load_session(&session_id).await? else {
                bail!("Session not found: {session_id}");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&session)?);
                return Ok(());
            }

            let decisions = store.list_decisions(&session_id).await?;
            render::print_session_detail(&session, &decisions);

            let state = session.current_state();
            if session.status == SessionStatus::Paused && state.is_review() {
                let request = config
                    .checkpoint_manager()
                    .create_hitl_request(state, &session.context)?;
                render::print_request(&request);
                render::print_resume_hint(&session_id);
            }
        }

        SessionsAction::Approve {
            session_id,
            option,
            comment,
            target,
            task_type,
            metric,
        } => {
            let Some(session) = store.load_session(&session_id).await? else {
                bail!("Session not found: {session_id}");
            };
            let state = session.current_state();
            if session.status != SessionStatus::Paused || !state.is_review() {
                bail!(
                    "Session '{session_id}' is not awaiting review (status: {}, state: {state})",
                    session.status
                );
            }
            let option_id = match option {
                Some(option) => option,
                None => config
                    .checkpoint_manager()
                    .default_option(state)?
                    .id
                    .to_string(),
            };
            let overrides = OptionOverrides {
                target_column: target,
                task_type,
                optimization_metric: metric,
            };

            // Recording a decision never invokes an agent.
            let orchestrator =
                MlopsOrchestrator::new(AgentSet::simulated(), store, config.checkpoint_manager());
            let decision = orchestrator
                .respond_with_overrides(&session_id, &option_id, comment, overrides)
                .await?;

            println!(
                "{} {} at {} ({})",
                "Recorded".green().bold(),
                decision.option_id,
                decision.checkpoint_id,
                decision.action
            );
            if let Some(updated) = orchestrator.store().load_session(&session_id).await? {
                if updated.status.is_resumable() {
                    println!("Continue with: mloop orchestrate --resume {session_id}");
                }
            }
        }

        SessionsAction::Cleanup { days } => {
            let max_age = Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY));
            let removed = store.cleanup_old_sessions(max_age).await?;
            println!("Removed {removed} session(s) older than {days} day(s)");
        }
    }

    Ok(())
}
