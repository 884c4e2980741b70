//! Per-agent deployment: spawn/await dispatch, environment injection, and
//! waiting for lifecycle milestones (spec §4.5 "Deployment algorithm").

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use gox_registry::{CellAgentEntry, CellEntry, Operator, RegistryHandle};
use gox_types::error::OrchestratorError;
use gox_types::ids::{AgentId, AgentType, ProjectId};
use gox_types::lifecycle::LifecycleState;
use tokio::process::{Child, Command};

use crate::running_cell::RunningCellRegistry;

/// How long to wait for a spawned/awaited agent to reach a required
/// lifecycle milestone before giving up.
pub const DEFAULT_MILESTONE_TIMEOUT: Duration = Duration::from_secs(30);

/// One deployed agent: its id, and the child process if the pool entry used
/// `Operator::Spawn` (`None` for `Operator::Await`).
pub struct DeployedAgent {
	pub id: AgentId,
	child: Option<Child>,
}

impl DeployedAgent {
	/// Terminates the child process, if any. A no-op for `Operator::Await`
	/// agents, which the deployer never owned a process for.
	pub async fn stop(&mut self) {
		if let Some(child) = self.child.as_mut() {
			let _ = child.start_kill();
			let _ = child.wait().await;
		}
	}
}

/// Brings up agents by spawning or awaiting their pool binary and injecting
/// the environment variables spec §4.5 lists.
pub struct Deployer {
	registry: RegistryHandle,
	host: String,
	debug: bool,
	milestone_timeout: Duration,
}

impl Deployer {
	#[must_use]
	pub fn new(registry: RegistryHandle, host: String, debug: bool) -> Self {
		Self {
			registry,
			host,
			debug,
			milestone_timeout: DEFAULT_MILESTONE_TIMEOUT,
		}
	}

	#[must_use]
	pub fn with_milestone_timeout(mut self, timeout: Duration) -> Self {
		self.milestone_timeout = timeout;
		self
	}

	/// Deploys every agent of `cell` in dependency order, rejecting a
	/// duplicate `(cell, project)` key before spawning anything.
	pub async fn deploy_cell(
		&self,
		cell: &CellEntry,
		project_id: &ProjectId,
		data_root: &Path,
		workbench_dir: &Path,
		extra_env: &HashMap<String, String>,
		running_cells: &RunningCellRegistry,
	) -> Result<Vec<DeployedAgent>, OrchestratorError> {
		if running_cells.contains(&cell.id, project_id).await {
			return Err(OrchestratorError::CellAlreadyRunning {
				cell: cell.id.clone(),
				project: project_id.to_string(),
			});
		}

		let order = crate::topo::deployment_order(cell)?;
		let by_id: HashMap<&AgentId, &CellAgentEntry> = cell.agents.iter().map(|a| (&a.id, a)).collect();
		let mut deployed = Vec::with_capacity(order.len());

		for agent_id in &order {
			let entry = by_id.get(agent_id).expect("topo order only contains declared agents");

			for dep in &entry.dependencies {
				self.wait_for_state(dep, LifecycleState::Running).await?;
			}

			let pool_entry = self
				.registry
				.get_pool_entry(entry.agent_type.clone())
				.await
				.ok_or_else(|| OrchestratorError::Configuration {
					reason: format!("no pool entry for agent type {}", entry.agent_type),
				})?;

			let child = match pool_entry.operator {
				Operator::Spawn => Some(self.spawn(&pool_entry.binary, agent_id, &entry.agent_type, data_root, project_id, workbench_dir, extra_env)?),
				Operator::Await => None,
			};

			self.wait_for_state(agent_id, LifecycleState::Registered).await?;
			deployed.push(DeployedAgent { id: agent_id.clone(), child });
		}

		Ok(deployed)
	}

	#[allow(clippy::too_many_arguments)]
	fn spawn(
		&self,
		binary: &str,
		agent_id: &AgentId,
		agent_type: &AgentType,
		data_root: &Path,
		project_id: &ProjectId,
		workbench_dir: &Path,
		extra_env: &HashMap<String, String>,
	) -> Result<Child, OrchestratorError> {
		let config_path = workbench_dir.join(format!("{}.yaml", agent_id.as_str()));
		let mut command = Command::new(binary);
		command
			.env("HOST", &self.host)
			.env("AGENT_ID", agent_id.as_str())
			.env("AGENT_TYPE", agent_type.as_str())
			.env("DEBUG", if self.debug { "1" } else { "0" })
			.env("DATA_ROOT", data_root)
			.env("PROJECT_ID", project_id.as_str())
			.env("WORKBENCH_DIR", workbench_dir)
			.env("CONFIG_PATH", config_path)
			.envs(extra_env.iter());
		command.spawn().map_err(|e| OrchestratorError::Configuration {
			reason: format!("spawning {binary} for agent {agent_id}: {e}"),
		})
	}

	async fn wait_for_state(&self, agent: &AgentId, target: LifecycleState) -> Result<(), OrchestratorError> {
		let deadline = tokio::time::Instant::now() + self.milestone_timeout;
		loop {
			if let Some(state) = self.registry.get_state(agent.clone()).await
				&& state_rank(state) >= state_rank(target)
			{
				return Ok(());
			}
			if tokio::time::Instant::now() >= deadline {
				return Err(OrchestratorError::DeploymentTimeout { agent: agent.clone() });
			}
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
	}
}

fn state_rank(state: LifecycleState) -> u8 {
	match state {
		LifecycleState::Registered => 0,
		LifecycleState::Configured => 1,
		LifecycleState::Running => 2,
		LifecycleState::Stopping => 3,
		LifecycleState::Stopped => 4,
	}
}

#[cfg(test)]
mod tests {
	use gox_registry::config::{parse_cells, parse_pool};
	use gox_registry::RegistryService;

	use super::*;

	fn await_pool() -> gox_registry::PoolFile {
		parse_pool(
			r#"
pool:
  - agent_type: t
    binary: /bin/true
    operator: await
"#,
		)
		.unwrap()
	}

	#[tokio::test]
	async fn waits_for_dependency_to_reach_running_before_deploying_dependent() {
		let registry = RegistryService::start();
		registry.load_pool(await_pool()).await;
		let cells = parse_cells(
			r#"
cell:
  - id: demo
    agents:
      - id: a
        agent_type: t
        ingress: "sub:a-in"
        egress: "pub:a-out"
      - id: b
        agent_type: t
        dependencies: ["a"]
        ingress: "sub:b-in"
        egress: "pub:b-out"
"#,
		)
		.unwrap();

		let deployer = Deployer::new(registry.clone(), "localhost:7000".into(), false).with_milestone_timeout(Duration::from_millis(300));
		let running_cells = RunningCellRegistry::new();
		let dir = tempfile::tempdir().unwrap();

		// Drive "a" through Registered -> Configured -> Running once deployment starts.
		let advance_registry = registry.clone();
		tokio::spawn(async move {
			loop {
				if advance_registry.get_state(AgentId::new("a")).await == Some(LifecycleState::Registered) {
					advance_registry.report_state_change(AgentId::new("a"), LifecycleState::Configured).await.unwrap();
					advance_registry.report_state_change(AgentId::new("a"), LifecycleState::Running).await.unwrap();
					break;
				}
				tokio::time::sleep(Duration::from_millis(5)).await;
			}
		});

		let deployed = deployer
			.deploy_cell(&cells.cell[0], &ProjectId::new("proj-1"), dir.path(), dir.path(), &HashMap::new(), &running_cells)
			.await
			.unwrap();

		assert_eq!(deployed.len(), 2);
		assert_eq!(registry.get_state(AgentId::new("b")).await, Some(LifecycleState::Registered));
	}

	#[tokio::test]
	async fn unregistered_dependency_times_out() {
		let registry = RegistryService::start();
		registry.load_pool(await_pool()).await;
		let cells = parse_cells(
			r#"
cell:
  - id: demo
    agents:
      - id: a
        agent_type: t
        ingress: "sub:a-in"
        egress: "pub:a-out"
"#,
		)
		.unwrap();

		let deployer = Deployer::new(registry.clone(), "localhost:7000".into(), false).with_milestone_timeout(Duration::from_millis(50));
		let running_cells = RunningCellRegistry::new();
		let dir = tempfile::tempdir().unwrap();

		let result = deployer
			.deploy_cell(&cells.cell[0], &ProjectId::new("proj-1"), dir.path(), dir.path(), &HashMap::new(), &running_cells)
			.await;
		assert!(matches!(result, Err(OrchestratorError::DeploymentTimeout { .. })));
	}

	#[tokio::test]
	async fn duplicate_cell_project_is_rejected_before_deploying() {
		let registry = RegistryService::start();
		registry.load_pool(await_pool()).await;
		let cells = parse_cells("cell:\n  - id: demo\n    agents: []\n").unwrap();

		let deployer = Deployer::new(registry, "localhost:7000".into(), false);
		let running_cells = RunningCellRegistry::new();
		running_cells
			.insert(crate::running_cell::RunningCell {
				cell_id: gox_types::ids::CellId::new("demo"),
				project_id: ProjectId::new("proj-1"),
				agent_ids: vec![],
				vfs_root: dirs_tempdir(),
			})
			.await
			.unwrap();
		let dir = tempfile::tempdir().unwrap();

		let result = deployer
			.deploy_cell(&cells.cell[0], &ProjectId::new("proj-1"), dir.path(), dir.path(), &HashMap::new(), &running_cells)
			.await;
		assert!(matches!(result, Err(OrchestratorError::CellAlreadyRunning { .. })));
	}

	fn dirs_tempdir() -> std::path::PathBuf {
		std::env::temp_dir()
	}
}
