pub mod config;
pub mod engine;
pub mod logging;
pub mod simulate;

pub use config::NodeConfig;
pub use engine::WorkTogetherEngine;
pub use simulate::{run_simulation, SimulationReport};
