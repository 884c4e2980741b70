//! Dependency-ordered deployment via Kahn's algorithm (spec §4.5
//! "Deployment algorithm").

use std::collections::{HashMap, HashSet, VecDeque};

use gox_registry::CellEntry;
use gox_types::error::OrchestratorError;
use gox_types::ids::AgentId;

/// Returns the cell's agent ids in an order where every agent follows all of
/// its `dependencies`. Errors with `DependencyCycle` if the dependency graph
/// is not a DAG.
pub fn deployment_order(cell: &CellEntry) -> Result<Vec<AgentId>, OrchestratorError> {
	let mut in_degree: HashMap<&AgentId, usize> = HashMap::new();
	let mut dependents: HashMap<&AgentId, Vec<&AgentId>> = HashMap::new();
	let known: HashSet<&AgentId> = cell.agents.iter().map(|a| &a.id).collect();

	for agent in &cell.agents {
		in_degree.entry(&agent.id).or_insert(0);
		for dep in &agent.dependencies {
			if known.contains(dep) {
				*in_degree.entry(&agent.id).or_insert(0) += 1;
				dependents.entry(dep).or_default().push(&agent.id);
			}
		}
	}

	// Deterministic order among agents with no dependencies: original declaration order.
	let declared_order: HashMap<&AgentId, usize> = cell.agents.iter().enumerate().map(|(i, a)| (&a.id, i)).collect();
	let mut initial: Vec<&AgentId> = in_degree.iter().filter(|(_, &deg)| deg == 0).map(|(&id, _)| id).collect();
	initial.sort_by_key(|id| declared_order[id]);
	let mut ready: VecDeque<&AgentId> = initial.into();

	let mut order = Vec::with_capacity(cell.agents.len());
	while let Some(id) = ready.pop_front() {
		order.push(id.clone());
		if let Some(next) = dependents.get(id) {
			let mut newly_ready = Vec::new();
			for &dependent in next {
				let degree = in_degree.get_mut(dependent).expect("dependent tracked in in_degree");
				*degree -= 1;
				if *degree == 0 {
					newly_ready.push(dependent);
				}
			}
			newly_ready.sort_by_key(|id| declared_order[id]);
			for id in newly_ready {
				ready.push_back(id);
			}
		}
	}

	if order.len() != cell.agents.len() {
		return Err(OrchestratorError::DependencyCycle { cell: cell.id.clone() });
	}
	Ok(order)
}
