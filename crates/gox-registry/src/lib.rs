//! Support registry: service discovery, per-agent cell config distribution,
//! and lifecycle tracking (spec §4.3).

pub mod config;
pub mod retry;
pub mod service;
pub mod types;

pub use retry::RetrySchedule;
pub use service::{RegistryHandle, RegistryService};
pub use types::{
	AgentCellConfig, AgentDescriptor, CellAgentEntry, CellEntry, CellsFile, Operator, PoolEntry, PoolFile,
};
