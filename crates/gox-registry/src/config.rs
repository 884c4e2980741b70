//! Loading of pool and cells YAML files (spec §4.3, §6).

use std::path::Path;

use gox_types::error::OrchestratorError;

use crate::types::{CellsFile, PoolFile};

/// Reads and parses a pool YAML file from disk.
pub fn load_pool_file(path: &Path) -> Result<PoolFile, OrchestratorError> {
	let text = std::fs::read_to_string(path).map_err(|e| OrchestratorError::Configuration {
		reason: format!("reading pool file {}: {e}", path.display()),
	})?;
	parse_pool(&text)
}

/// Parses pool YAML text directly (used by tests and embedded configs).
pub fn parse_pool(text: &str) -> Result<PoolFile, OrchestratorError> {
	serde_yaml::from_str(text).map_err(|e| OrchestratorError::Configuration {
		reason: format!("parsing pool file: {e}"),
	})
}

/// Reads and parses one cells YAML file from disk.
pub fn load_cells_file(path: &Path) -> Result<CellsFile, OrchestratorError> {
	let text = std::fs::read_to_string(path).map_err(|e| OrchestratorError::Configuration {
		reason: format!("reading cells file {}: {e}", path.display()),
	})?;
	parse_cells(&text)
}

/// Parses cells YAML text directly.
pub fn parse_cells(text: &str) -> Result<CellsFile, OrchestratorError> {
	serde_yaml::from_str(text).map_err(|e| OrchestratorError::Configuration {
		reason: format!("parsing cells file: {e}"),
	})
}

/// Loads every cells file in `paths` and concatenates their cell lists.
/// Multiple cells files are a flat union, never merged by cell id (spec §9
/// Open Question i): a duplicate cell id across files is kept as two
/// separate entries and left to the orchestrator to reject at deploy time.
pub fn load_and_concat_cells(paths: &[impl AsRef<Path>]) -> Result<CellsFile, OrchestratorError> {
	let mut merged = CellsFile::default();
	for path in paths {
		let mut file = load_cells_file(path.as_ref())?;
		merged.cell.append(&mut file.cell);
	}
	Ok(merged)
}
