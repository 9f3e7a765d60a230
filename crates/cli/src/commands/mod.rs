//! Subcommand handlers.

pub mod orchestrate;
pub mod sessions;

use anyhow::{bail, Context, Result};
use mloop_core::agents::AgentSet;
use mloop_core::config::AppConfig;
use tracing::debug;

/// Agents for a run: the simulated set, or the configured phase commands.
async fn build_agents(config: &AppConfig, simulate: bool) -> Result<AgentSet> {
    if simulate {
        debug!("Using simulated agents");
        return Ok(AgentSet::simulated());
    }

    let agents = AgentSet::from_commands(&config.global.phases)
        .context("Phase commands are not configured (or pass --simulate)")?;
    let unavailable = agents.unavailable_phases().await;
    if !unavailable.is_empty() {
        bail!(
            "Phase command not found for: {} (check [phases.<name>] in .mloop/config.toml)",
            unavailable.join(", ")
        );
    }
    Ok(agents)
}
