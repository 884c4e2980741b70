//! Keyed registry of deployed cell instances (spec §4.5 "Cell isolation").

use std::collections::HashMap;
use std::path::PathBuf;

use gox_types::error::OrchestratorError;
use gox_types::ids::{AgentId, CellId, ProjectId};
use tokio::sync::Mutex;

/// One deployed instance of a cell: the agents it brought up and the VFS
/// root they share.
#[derive(Debug, Clone)]
pub struct RunningCell {
	pub cell_id: CellId,
	pub project_id: ProjectId,
	pub agent_ids: Vec<AgentId>,
	pub vfs_root: PathBuf,
}

/// `(cellId, projectId) -> RunningCell`, refusing duplicate keys (spec §4.5:
/// "the same cell definition can be deployed multiple times with distinct
/// project ids ... refuses duplicates for the same key").
#[derive(Default)]
pub struct RunningCellRegistry {
	inner: Mutex<HashMap<(CellId, ProjectId), RunningCell>>,
}

impl RunningCellRegistry {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn insert(&self, cell: RunningCell) -> Result<(), OrchestratorError> {
		let key = (cell.cell_id.clone(), cell.project_id.clone());
		let mut guard = self.inner.lock().await;
		if guard.contains_key(&key) {
			return Err(OrchestratorError::CellAlreadyRunning {
				cell: key.0,
				project: key.1.to_string(),
			});
		}
		guard.insert(key, cell);
		Ok(())
	}

	pub async fn remove(&self, cell_id: &CellId, project_id: &ProjectId) -> Option<RunningCell> {
		self.inner.lock().await.remove(&(cell_id.clone(), project_id.clone()))
	}

	pub async fn all(&self) -> Vec<RunningCell> {
		self.inner.lock().await.values().cloned().collect()
	}

	pub async fn contains(&self, cell_id: &CellId, project_id: &ProjectId) -> bool {
		self.inner.lock().await.contains_key(&(cell_id.clone(), project_id.clone()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn cell(cell_id: &str, project_id: &str) -> RunningCell {
		RunningCell {
			cell_id: CellId::new(cell_id),
			project_id: ProjectId::new(project_id),
			agent_ids: vec![],
			vfs_root: PathBuf::from("/tmp"),
		}
	}

	#[tokio::test]
	async fn duplicate_cell_project_key_is_rejected() {
		let registry = RunningCellRegistry::new();
		registry.insert(cell("demo", "proj-1")).await.unwrap();
		let result = registry.insert(cell("demo", "proj-1")).await;
		assert!(matches!(result, Err(OrchestratorError::CellAlreadyRunning { .. })));
	}

	#[tokio::test]
	async fn same_cell_different_project_is_allowed() {
		let registry = RunningCellRegistry::new();
		registry.insert(cell("demo", "proj-1")).await.unwrap();
		registry.insert(cell("demo", "proj-2")).await.unwrap();
		assert_eq!(registry.all().await.len(), 2);
	}

	#[tokio::test]
	async fn remove_frees_the_key_for_reuse() {
		let registry = RunningCellRegistry::new();
		registry.insert(cell("demo", "proj-1")).await.unwrap();
		registry.remove(&CellId::new("demo"), &ProjectId::new("proj-1")).await;
		registry.insert(cell("demo", "proj-1")).await.unwrap();
	}
}
