//! Orchestrator: declarative cell deployment, dependency ordering, and host
//! embedding over Support and the Broker (spec §4.5).

pub mod bridge;
pub mod config;
pub mod deploy;
pub mod orchestrator;
pub mod running_cell;
pub mod topo;

pub use bridge::{Event, EventBridge, EventSubscription, PublishAndWaitError};
pub use config::OrchestratorConfig;
pub use deploy::{DeployedAgent, Deployer, DEFAULT_MILESTONE_TIMEOUT};
pub use orchestrator::Orchestrator;
pub use running_cell::{RunningCell, RunningCellRegistry};
pub use topo::deployment_order;
