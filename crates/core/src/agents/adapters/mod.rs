//! Phase agent implementations.

pub mod command_agent;
pub mod mock_agent;
pub mod simulated;

pub use command_agent::CommandAgent;
pub use mock_agent::MockAgent;
pub use simulated::{
    SimulatedAnalyst, SimulatedArchitect, SimulatedDeployer, SimulatedPreprocessor,
    SimulatedTrainer,
};
