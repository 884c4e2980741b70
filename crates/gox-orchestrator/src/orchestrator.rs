//! Top-level orchestrator: config loading, Support/Broker startup, cell
//! deployment, and shutdown (spec §4.5).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use gox_broker::{Broker, BrokerAddress, BrokerConfig};
use gox_registry::{CellEntry, RegistryHandle, RegistryService};
use gox_types::error::OrchestratorError;
use gox_types::ids::{CellId, ProjectId};
use tokio_util::sync::CancellationToken;

use crate::bridge::EventBridge;
use crate::config::OrchestratorConfig;
use crate::deploy::{DeployedAgent, Deployer};
use crate::running_cell::{RunningCell, RunningCellRegistry};

/// Owns the embedded Support registry and Broker, deployed cells, and the
/// cancellation token that tears everything down on `close`.
pub struct Orchestrator {
	registry: RegistryHandle,
	broker: Broker,
	deployer: Deployer,
	running_cells: RunningCellRegistry,
	deployed_agents: tokio::sync::Mutex<HashMap<(CellId, ProjectId), Vec<DeployedAgent>>>,
	cells: Vec<CellEntry>,
	cancel: CancellationToken,
}

impl Orchestrator {
	/// Loads `config` (and the pool/cells files it names), starts Support and
	/// the broker, and publishes the broker address.
	pub async fn start(config: &OrchestratorConfig) -> Result<Self, OrchestratorError> {
		let registry = RegistryService::start();

		for path in &config.pool {
			let pool = gox_registry::config::load_pool_file(path)?;
			registry.load_pool(pool).await;
		}
		let cells_file = gox_registry::config::load_and_concat_cells(&config.cells)?;
		registry.load_cells(cells_file.clone()).await;
		let cells = cells_file.cell;

		let broker = Broker::start(BrokerConfig::default());
		let host = format!("localhost:{}", config.broker.port);
		registry
			.set_broker_address(BrokerAddress {
				protocol: config.broker.protocol.clone(),
				host: "localhost".to_string(),
				port: config.broker.port,
				codec: config.broker.codec,
			})
			.await;

		let deployer = Deployer::new(registry.clone(), host, config.debug);

		Ok(Self {
			registry,
			broker,
			deployer,
			running_cells: RunningCellRegistry::new(),
			deployed_agents: tokio::sync::Mutex::new(HashMap::new()),
			cells,
			cancel: CancellationToken::new(),
		})
	}

	/// A handle to the embedded broker, for host code that wants direct
	/// access rather than going through `event_bridge`.
	#[must_use]
	pub fn broker(&self) -> Broker {
		self.broker.clone()
	}

	/// A handle to the embedded Support registry.
	#[must_use]
	pub fn registry(&self) -> RegistryHandle {
		self.registry.clone()
	}

	/// Builds a host-facing `EventBridge` scoped to `project_id`.
	#[must_use]
	pub fn event_bridge(&self, project_id: ProjectId) -> EventBridge {
		EventBridge::new(self.broker.clone(), project_id)
	}

	/// Looks up a loaded cell declaration by id.
	#[must_use]
	pub fn find_cell(&self, cell_id: &CellId) -> Option<&CellEntry> {
		self.cells.iter().find(|c| &c.id == cell_id)
	}

	/// Every cell declaration loaded from the configured cells files.
	#[must_use]
	pub fn cells(&self) -> &[CellEntry] {
		&self.cells
	}

	/// Deploys `cell_id` for `project_id`, rooting its VFS at
	/// `data_root/projects/project_id` and per-agent file configs at
	/// `workbench_dir`.
	pub async fn deploy(
		&self,
		cell_id: &CellId,
		project_id: ProjectId,
		data_root: &Path,
		workbench_dir: &Path,
		extra_env: &HashMap<String, String>,
	) -> Result<(), OrchestratorError> {
		let cell = self.find_cell(cell_id).ok_or_else(|| OrchestratorError::Configuration {
			reason: format!("no loaded cell named {cell_id}"),
		})?;

		let agents = self
			.deployer
			.deploy_cell(cell, &project_id, data_root, workbench_dir, extra_env, &self.running_cells)
			.await?;
		let agent_ids = agents.iter().map(|a| a.id.clone()).collect();

		self.running_cells
			.insert(RunningCell {
				cell_id: cell_id.clone(),
				project_id: project_id.clone(),
				agent_ids,
				vfs_root: data_root.join("projects").join(project_id.as_str()),
			})
			.await?;
		self.deployed_agents.lock().await.insert((cell_id.clone(), project_id), agents);
		Ok(())
	}

	/// Stops every agent of `(cell_id, project_id)`, ignoring agents that are
	/// not running (spec §4.5 "StopCell").
	pub async fn stop_cell(&self, cell_id: &CellId, project_id: &ProjectId) {
		self.running_cells.remove(cell_id, project_id).await;
		if let Some(mut agents) = self.deployed_agents.lock().await.remove(&(cell_id.clone(), project_id.clone())) {
			for agent in agents.iter_mut().rev() {
				agent.stop().await;
			}
		}
	}

	/// Stops every currently running cell (spec §4.5 "StopAll").
	pub async fn stop_all(&self) {
		let keys: Vec<(CellId, ProjectId)> = self.deployed_agents.lock().await.keys().cloned().collect();
		for (cell_id, project_id) in keys {
			self.stop_cell(&cell_id, &project_id).await;
		}
	}

	/// Stops all cells, then cancels the orchestrator's context, which tears
	/// down the embedded Support and Broker actors (spec §4.5 "Close").
	pub async fn close(&self) {
		self.stop_all().await;
		self.cancel.cancel();
		tokio::time::sleep(std::time::Duration::from_millis(50)).await;
	}

	/// The orchestrator's root cancellation token. Agents embedded in-process
	/// are typically handed a child of this token.
	#[must_use]
	pub fn cancellation_token(&self) -> CancellationToken {
		self.cancel.clone()
	}
}

/// Resolves a config-relative path (the `base_dir` entries are search roots
/// for pool/cells files given as bare filenames).
#[must_use]
pub fn resolve_relative(base_dirs: &[PathBuf], candidate: &Path) -> PathBuf {
	if candidate.is_absolute() {
		return candidate.to_path_buf();
	}
	for base in base_dirs {
		let joined = base.join(candidate);
		if joined.exists() {
			return joined;
		}
	}
	candidate.to_path_buf()
}
