//! `mloop orchestrate`: run or resume a session in the foreground.

use crate::args::OrchestrateArgs;
use crate::prompt::Prompter;
use crate::render;
use anyhow::{ensure, Context, Result};
use mloop_core::config::{load_config, AppConfig};
use mloop_core::engine::{EventStream, MlopsOrchestrator};
use mloop_protocol::events::OrchestrationEvent;
use mloop_protocol::hitl_models::HitlResponseAction;
use mloop_protocol::pipeline_models::OrchestrationOptions;
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Exit code after Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

pub async fn run(project_dir: &Path, args: OrchestrateArgs) -> Result<ExitCode> {
    let config = load_config(project_dir)
        .await
        .context("Failed to load configuration")?;
    debug!(storage_dir = %config.storage_dir().display(), "Loaded configuration");

    if args.list_sessions {
        let sessions = config.session_store().list_sessions().await?;
        render::print_session_table(&sessions);
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(threshold) = args.threshold {
        ensure!(
            (0.0..=1.0).contains(&threshold),
            "--threshold must be between 0 and 1, got {threshold}"
        );
    }

    let orchestrator = MlopsOrchestrator::new(
        super::build_agents(&config, args.simulate).await?,
        config.session_store(),
        config.checkpoint_manager(),
    );

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let stream = match &args.resume {
        Some(session_id) => orchestrator.resume(session_id, cancel.clone()).await?,
        None => {
            let data_file = args
                .data_file
                .clone()
                .context("A data file is required to start an orchestration")?;
            ensure!(
                data_file.is_file(),
                "Data file not found: {}",
                data_file.display()
            );
            let options = build_options(&config, &args);
            orchestrator
                .execute(data_file, options, cancel.clone())
                .await?
        }
    };

    let interactive = !args.non_interactive && std::io::stdin().is_terminal();
    follow(&orchestrator, stream, interactive, cancel).await
}

/// Command-line flags layered over the configured defaults.
fn build_options(config: &AppConfig, args: &OrchestrateArgs) -> OrchestrationOptions {
    let mut options = config.orchestration_options();
    if let Some(target) = &args.target {
        options.target_column = Some(target.clone());
    }
    if let Some(task_type) = args.task_type {
        options.task_type = Some(task_type);
    }
    if let Some(seconds) = args.max_training_time {
        options.max_training_time_seconds = seconds;
    }
    if let Some(threshold) = args.threshold {
        options.auto_approval_threshold = threshold;
    }
    options.skip_hitl |= args.skip_hitl;
    options.auto_approve_high_confidence |= args.auto_approve;
    options
}

/// Render events, answering checkpoints until the session finishes or pauses for good.
async fn follow(
    orchestrator: &MlopsOrchestrator,
    mut stream: EventStream,
    interactive: bool,
    cancel: CancellationToken,
) -> Result<ExitCode> {
    let mut prompter = Prompter::new();

    loop {
        let mut pending = None;
        while let Some(event) = stream.next().await {
            render::print_event(&event);
            match event {
                OrchestrationEvent::HitlRequested(request) => pending = Some(request),
                OrchestrationEvent::OrchestrationCompleted { .. } => return Ok(ExitCode::SUCCESS),
                OrchestrationEvent::OrchestrationFailed { .. } => return Ok(ExitCode::FAILURE),
                OrchestrationEvent::OrchestrationCancelled { .. } => {
                    return Ok(ExitCode::from(EXIT_INTERRUPTED))
                }
                _ => {}
            }
        }

        let Some(request) = pending else {
            return Ok(ExitCode::SUCCESS);
        };
        if !interactive {
            render::print_resume_hint(&request.session_id);
            return Ok(ExitCode::SUCCESS);
        }

        let answer = tokio::select! {
            _ = cancel.cancelled() => {
                render::print_resume_hint(&request.session_id);
                return Ok(ExitCode::from(EXIT_INTERRUPTED));
            }
            answer = prompter.answer(&request) => answer?,
        };
        let Some(answer) = answer else {
            render::print_resume_hint(&request.session_id);
            return Ok(ExitCode::SUCCESS);
        };

        let decision = orchestrator
            .respond_with_overrides(
                &request.session_id,
                &answer.option_id,
                None,
                answer.overrides,
            )
            .await?;
        if decision.action == HitlResponseAction::Cancel {
            println!("Session {} cancelled", request.session_id);
            return Ok(ExitCode::SUCCESS);
        }
        stream = orchestrator.resume(&request.session_id, cancel.clone()).await?;
    }
}
