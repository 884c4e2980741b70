//! Support registry actor: agent registration, broker address distribution,
//! per-agent cell config, and lifecycle tracking (spec §4.3).

use std::collections::HashMap;

use gox_broker::BrokerAddress;
use gox_types::error::RegistryError;
use gox_types::ids::{AgentId, AgentType};
use gox_types::lifecycle::{LifecycleGraph, LifecycleState};
use tokio::sync::{mpsc, oneshot};

use crate::types::{AgentCellConfig, AgentDescriptor, CellsFile, PoolEntry, PoolFile};

enum RegistryCmd {
	RegisterAgent {
		id: AgentId,
		agent_type: AgentType,
		capabilities: Vec<String>,
		ingress: String,
		egress: String,
		reply: oneshot::Sender<Result<(), RegistryError>>,
	},
	SetBrokerAddress {
		address: BrokerAddress,
	},
	GetBroker {
		reply: oneshot::Sender<Option<BrokerAddress>>,
	},
	GetAgentCellConfig {
		agent: AgentId,
		reply: oneshot::Sender<Result<AgentCellConfig, RegistryError>>,
	},
	ReportStateChange {
		agent: AgentId,
		to: LifecycleState,
		reply: oneshot::Sender<Result<(), RegistryError>>,
	},
	GetState {
		agent: AgentId,
		reply: oneshot::Sender<Option<LifecycleState>>,
	},
	LoadCells {
		cells: CellsFile,
	},
	LoadPool {
		pool: PoolFile,
	},
	GetPoolEntry {
		agent_type: AgentType,
		reply: oneshot::Sender<Option<PoolEntry>>,
	},
}

/// Handle for communicating with the `RegistryService` actor. Cheaply
/// cloneable; shared by the orchestrator and every agent process.
#[derive(Clone)]
pub struct RegistryHandle {
	tx: mpsc::Sender<RegistryCmd>,
}

impl RegistryHandle {
	/// Registers a fresh agent instance. Rejects an id already registered
	/// (spec §8: "registering the same agent id twice is rejected, not
	/// silently overwritten").
	pub async fn register_agent(
		&self,
		id: AgentId,
		agent_type: AgentType,
		capabilities: Vec<String>,
		ingress: String,
		egress: String,
	) -> Result<(), RegistryError> {
		let (reply, rx) = oneshot::channel();
		self.tx
			.send(RegistryCmd::RegisterAgent {
				id,
				agent_type,
				capabilities,
				ingress,
				egress,
				reply,
			})
			.await
			.map_err(|_| RegistryError::Unreachable)?;
		rx.await.map_err(|_| RegistryError::Unreachable)?
	}

	/// Publishes the broker's network address for agents to discover.
	pub async fn set_broker_address(&self, address: BrokerAddress) {
		let _ = self.tx.send(RegistryCmd::SetBrokerAddress { address }).await;
	}

	/// Reads back the broker's address, if one has been set yet.
	pub async fn get_broker(&self) -> Option<BrokerAddress> {
		let (reply, rx) = oneshot::channel();
		self.tx.send(RegistryCmd::GetBroker { reply }).await.ok()?;
		rx.await.ok().flatten()
	}

	/// Returns the cell-file-sourced ingress/egress/config for `agent`.
	pub async fn get_agent_cell_config(&self, agent: AgentId) -> Result<AgentCellConfig, RegistryError> {
		let (reply, rx) = oneshot::channel();
		self.tx
			.send(RegistryCmd::GetAgentCellConfig { agent, reply })
			.await
			.map_err(|_| RegistryError::Unreachable)?;
		rx.await.map_err(|_| RegistryError::Unreachable)?
	}

	/// Reports a lifecycle transition for `agent`. Rejects any transition
	/// outside the linear `Registered -> Configured -> Running -> Stopping
	/// -> Stopped` graph.
	pub async fn report_state_change(&self, agent: AgentId, to: LifecycleState) -> Result<(), RegistryError> {
		let (reply, rx) = oneshot::channel();
		self.tx
			.send(RegistryCmd::ReportStateChange { agent, to, reply })
			.await
			.map_err(|_| RegistryError::Unreachable)?;
		rx.await.map_err(|_| RegistryError::Unreachable)?
	}

	/// Current lifecycle state of `agent`, if it has registered.
	pub async fn get_state(&self, agent: AgentId) -> Option<LifecycleState> {
		let (reply, rx) = oneshot::channel();
		self.tx.send(RegistryCmd::GetState { agent, reply }).await.ok()?;
		rx.await.ok().flatten()
	}

	/// Loads cell declarations into the registry's catalog.
	pub async fn load_cells(&self, cells: CellsFile) {
		let _ = self.tx.send(RegistryCmd::LoadCells { cells }).await;
	}

	/// Loads the pool catalog (agent type -> binary/operator) into the registry.
	pub async fn load_pool(&self, pool: PoolFile) {
		let _ = self.tx.send(RegistryCmd::LoadPool { pool }).await;
	}

	/// Looks up a pool entry by agent type, used by the orchestrator to
	/// decide how to bring an agent up.
	pub async fn get_pool_entry(&self, agent_type: AgentType) -> Option<PoolEntry> {
		let (reply, rx) = oneshot::channel();
		self.tx
			.send(RegistryCmd::GetPoolEntry { agent_type, reply })
			.await
			.ok()?;
		rx.await.ok().flatten()
	}
}

struct CellConfigEntry {
	ingress: String,
	egress: String,
	config: HashMap<String, serde_json::Value>,
}

/// Actor owning the registered-agent table, loaded cell/pool catalogs, and
/// the broker address. Single source of truth, reached only through its
/// channel (same pattern as `gox_broker::topic::TopicService`).
pub struct RegistryService {
	rx: mpsc::Receiver<RegistryCmd>,
	agents: HashMap<AgentId, AgentDescriptor>,
	lifecycles: HashMap<AgentId, LifecycleGraph>,
	cell_configs: HashMap<AgentId, CellConfigEntry>,
	pool: HashMap<AgentType, PoolEntry>,
	broker_address: Option<BrokerAddress>,
}

impl RegistryService {
	/// Spawns the registry actor task and returns its handle.
	#[must_use]
	pub fn start() -> RegistryHandle {
		let (tx, rx) = mpsc::channel(256);
		let service = Self {
			rx,
			agents: HashMap::new(),
			lifecycles: HashMap::new(),
			cell_configs: HashMap::new(),
			pool: HashMap::new(),
			broker_address: None,
		};
		tokio::spawn(service.run());
		RegistryHandle { tx }
	}

	async fn run(mut self) {
		while let Some(cmd) = self.rx.recv().await {
			match cmd {
				RegistryCmd::RegisterAgent {
					id,
					agent_type,
					capabilities,
					ingress,
					egress,
					reply,
				} => {
					let result = if self.agents.contains_key(&id) {
						Err(RegistryError::AlreadyRegistered { agent: id.clone() })
					} else {
						self.agents.insert(
							id.clone(),
							AgentDescriptor {
								id: id.clone(),
								agent_type,
								capabilities,
								ingress,
								egress,
								state: LifecycleState::Registered,
								config: None,
							},
						);
						self.lifecycles.insert(id, LifecycleGraph::new());
						Ok(())
					};
					let _ = reply.send(result);
				}
				RegistryCmd::SetBrokerAddress { address } => {
					self.broker_address = Some(address);
				}
				RegistryCmd::GetBroker { reply } => {
					let _ = reply.send(self.broker_address.clone());
				}
				RegistryCmd::GetAgentCellConfig { agent, reply } => {
					let result = self
						.cell_configs
						.get(&agent)
						.map(|entry| AgentCellConfig {
							ingress: entry.ingress.clone(),
							egress: entry.egress.clone(),
							config: entry.config.clone(),
						})
						.ok_or(RegistryError::NotFound { agent: agent.clone() });
					let _ = reply.send(result);
				}
				RegistryCmd::ReportStateChange { agent, to, reply } => {
					let result = match self.lifecycles.get_mut(&agent) {
						Some(graph) => graph.transition(to).map_err(RegistryError::from),
						None => Err(RegistryError::NotFound { agent: agent.clone() }),
					};
					if result.is_ok()
						&& let Some(descriptor) = self.agents.get_mut(&agent)
					{
						descriptor.state = to;
					}
					let _ = reply.send(result);
				}
				RegistryCmd::GetState { agent, reply } => {
					let _ = reply.send(self.lifecycles.get(&agent).map(LifecycleGraph::state));
				}
				RegistryCmd::LoadCells { cells } => {
					for cell in cells.cell {
						for agent in cell.agents {
							self.cell_configs.insert(
								agent.id,
								CellConfigEntry {
									ingress: agent.ingress,
									egress: agent.egress,
									config: agent.config,
								},
							);
						}
					}
				}
				RegistryCmd::LoadPool { pool } => {
					for entry in pool.pool {
						self.pool.insert(entry.agent_type.clone(), entry);
					}
				}
				RegistryCmd::GetPoolEntry { agent_type, reply } => {
					let _ = reply.send(self.pool.get(&agent_type).cloned());
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use gox_types::lifecycle::LifecycleState::{Configured, Registered, Running, Stopped, Stopping};

	use super::*;
	use crate::config::{parse_cells, parse_pool};

	fn agent(id: &str) -> AgentId {
		AgentId::new(id)
	}

	#[tokio::test]
	async fn registering_same_agent_twice_is_rejected() {
		let registry = RegistryService::start();
		registry
			.register_agent(agent("a1"), AgentType::new("echo"), vec![], "sub:in".into(), "pub:out".into())
			.await
			.unwrap();
		let second = registry
			.register_agent(agent("a1"), AgentType::new("echo"), vec![], "sub:in".into(), "pub:out".into())
			.await;
		assert_eq!(second, Err(RegistryError::AlreadyRegistered { agent: agent("a1") }));
	}

	#[tokio::test]
	async fn lifecycle_transitions_follow_the_linear_graph() {
		let registry = RegistryService::start();
		registry
			.register_agent(agent("a1"), AgentType::new("echo"), vec![], "sub:in".into(), "pub:out".into())
			.await
			.unwrap();
		assert_eq!(registry.get_state(agent("a1")).await, Some(Registered));

		registry.report_state_change(agent("a1"), Configured).await.unwrap();
		registry.report_state_change(agent("a1"), Running).await.unwrap();
		registry.report_state_change(agent("a1"), Stopping).await.unwrap();
		registry.report_state_change(agent("a1"), Stopped).await.unwrap();
		assert_eq!(registry.get_state(agent("a1")).await, Some(Stopped));
	}

	#[tokio::test]
	async fn skipping_a_lifecycle_state_is_rejected() {
		let registry = RegistryService::start();
		registry
			.register_agent(agent("a1"), AgentType::new("echo"), vec![], "sub:in".into(), "pub:out".into())
			.await
			.unwrap();
		let result = registry.report_state_change(agent("a1"), Running).await;
		assert!(matches!(result, Err(RegistryError::InvalidTransition(_))));
	}

	#[tokio::test]
	async fn get_agent_cell_config_is_sourced_purely_from_loaded_cells() {
		let registry = RegistryService::start();
		let cells = parse_cells(
			r#"
cell:
  - id: demo
    agents:
      - id: a1
        agent_type: echo
        ingress: "sub:in"
        egress: "pub:out"
        config:
          greeting: hello
"#,
		)
		.unwrap();
		registry.load_cells(cells).await;

		let config = registry.get_agent_cell_config(agent("a1")).await.unwrap();
		assert_eq!(config.ingress, "sub:in");
		assert_eq!(config.egress, "pub:out");
		assert_eq!(config.config["greeting"], serde_json::json!("hello"));
	}

	#[tokio::test]
	async fn unknown_agent_cell_config_is_not_found() {
		let registry = RegistryService::start();
		let result = registry.get_agent_cell_config(agent("ghost")).await;
		assert_eq!(result, Err(RegistryError::NotFound { agent: agent("ghost") }));
	}

	#[tokio::test]
	async fn pool_entries_are_looked_up_by_agent_type() {
		let registry = RegistryService::start();
		let pool = parse_pool(
			r#"
pool:
  - agent_type: echo
    binary: /usr/local/bin/gox-echo
    operator: spawn
"#,
		)
		.unwrap();
		registry.load_pool(pool).await;

		let entry = registry.get_pool_entry(AgentType::new("echo")).await.unwrap();
		assert_eq!(entry.binary, "/usr/local/bin/gox-echo");
		assert!(registry.get_pool_entry(AgentType::new("missing")).await.is_none());
	}

	#[tokio::test]
	async fn broker_address_round_trips() {
		let registry = RegistryService::start();
		assert!(registry.get_broker().await.is_none());
		let address = BrokerAddress {
			protocol: "tcp".into(),
			host: "localhost".into(),
			port: 9000,
			codec: gox_broker::Codec::Json,
		};
		registry.set_broker_address(address.clone()).await;
		assert_eq!(registry.get_broker().await, Some(address));
	}
}
