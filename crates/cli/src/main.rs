//! `mloop`: guided, resumable MLOps orchestration with human review checkpoints.

mod args;
mod commands;
mod logging;
mod prompt;
mod render;

use args::{Cli, Commands};
use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let failed = e.use_stderr();
            e.print()?;
            return Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS });
        }
    };

    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Orchestrate(args) => commands::orchestrate::run(&cli.project_dir, args).await,
        Commands::Sessions { action } => commands::sessions::run(&cli.project_dir, action)
            .await
            .map(|()| ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => Ok(code),
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            Ok(ExitCode::FAILURE)
        }
    }
}
