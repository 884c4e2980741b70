//! Declarative cell/pool schema and registry entities (spec §3, §6).

use std::collections::HashMap;

use gox_types::ids::{AgentId, AgentType, CellId};
use gox_types::lifecycle::LifecycleState;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a pool entry's binary is brought up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
	/// The deployer spawns the binary as a child process.
	Spawn,
	/// The deployer does not spawn anything; it only waits for the named
	/// agent id to reach `Registered` (spec §9 Open Question iii).
	Await,
}

/// One agent-type entry in the pool catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolEntry {
	pub agent_type: AgentType,
	pub binary: String,
	pub operator: Operator,
	#[serde(default)]
	pub capabilities: Vec<String>,
	#[serde(default)]
	pub description: String,
}

/// Top-level shape of a pool YAML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolFile {
	#[serde(default)]
	pub pool: Vec<PoolEntry>,
}

/// One agent entry within a cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellAgentEntry {
	pub id: AgentId,
	pub agent_type: AgentType,
	#[serde(default)]
	pub dependencies: Vec<AgentId>,
	pub ingress: String,
	pub egress: String,
	#[serde(default)]
	pub config: HashMap<String, Value>,
}

/// A declarative cell: an ordered (by dependency) composition of agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellEntry {
	pub id: CellId,
	#[serde(default)]
	pub description: String,
	pub agents: Vec<CellAgentEntry>,
}

/// Top-level shape of a cells YAML file. Multiple cells files are
/// concatenated before dependency resolution (spec §9 Open Question i).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CellsFile {
	#[serde(default)]
	pub cell: Vec<CellEntry>,
}

/// Per-agent descriptor tracked by Support once the agent registers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDescriptor {
	pub id: AgentId,
	pub agent_type: AgentType,
	pub capabilities: Vec<String>,
	pub ingress: String,
	pub egress: String,
	pub state: LifecycleState,
	pub config: Option<HashMap<String, Value>>,
}

/// What `GetAgentCellConfig` returns: ingress, egress, and the agent's
/// config map drawn purely from the loaded cell file. Merging this with a
/// local file config (file provides defaults, this overrides) is the
/// caller's job — typically the agent framework, which is the side with
/// filesystem access to the local file (spec §4.3's "Pool & cell loading").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCellConfig {
	pub ingress: String,
	pub egress: String,
	pub config: HashMap<String, Value>,
}
