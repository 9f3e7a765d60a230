//! Command-line argument definitions.

use clap::{Args, Parser, Subcommand};
use mloop_protocol::pipeline_models::TaskType;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mloop")]
#[command(author, version, about = "Human-in-the-loop MLOps orchestration", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project directory holding `.mloop/config.toml` and `mloop.yaml`
    #[arg(long, global = true, default_value = ".")]
    pub project_dir: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the guided pipeline on a dataset, or resume a paused session
    Orchestrate(OrchestrateArgs),

    /// Inspect and manage stored sessions
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },
}

#[derive(Args, Debug)]
pub struct OrchestrateArgs {
    /// Dataset to orchestrate
    #[arg(required_unless_present_any = ["resume", "list_sessions"])]
    pub data_file: Option<PathBuf>,

    /// Target column
    #[arg(long)]
    pub target: Option<String>,

    /// Task type: binary, multiclass or regression
    #[arg(long)]
    pub task_type: Option<TaskType>,

    /// Training time budget in seconds
    #[arg(long, value_name = "SECONDS")]
    pub max_training_time: Option<u64>,

    /// Never pause at checkpoints
    #[arg(long)]
    pub skip_hitl: bool,

    /// Auto-approve checkpoints whose phase confidence is high enough
    #[arg(long)]
    pub auto_approve: bool,

    /// Confidence threshold for auto-approval, between 0 and 1
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Resume a stored session instead of starting a new one
    #[arg(long, value_name = "SESSION_ID", conflicts_with = "data_file")]
    pub resume: Option<String>,

    /// List stored sessions and exit
    #[arg(long)]
    pub list_sessions: bool,

    /// Use built-in simulated agents instead of configured phase commands
    #[arg(long)]
    pub simulate: bool,

    /// Stop at the first checkpoint instead of prompting
    #[arg(long)]
    pub non_interactive: bool,
}

#[derive(Subcommand, Debug)]
pub enum SessionsAction {
    /// List sessions, most recently updated first
    List {
        /// Only show sessions that can be resumed
        #[arg(long)]
        resumable: bool,
    },

    /// Show one session in detail
    Show {
        session_id: String,

        /// Print the stored session as JSON
        #[arg(long)]
        json: bool,
    },

    /// Answer the checkpoint a paused session is waiting on
    Approve {
        session_id: String,

        /// Option to select (defaults to the checkpoint's default option)
        #[arg(long)]
        option: Option<String>,

        /// Comment stored with the decision
        #[arg(long)]
        comment: Option<String>,

        /// New target column for a modify answer
        #[arg(long)]
        target: Option<String>,

        /// New task type for a modify answer: binary, multiclass or regression
        #[arg(long)]
        task_type: Option<TaskType>,

        /// New optimization metric for a modify answer
        #[arg(long)]
        metric: Option<String>,
    },

    /// Delete sessions not updated for the given number of days
    Cleanup {
        #[arg(long, default_value_t = 30)]
        days: u64,
    },
}
