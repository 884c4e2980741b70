//! Orchestrator configuration: bind ports, debug flag, and which pool/cells
//! files to load (spec §4.5 "Configuration resolution").

use std::path::PathBuf;

use gox_broker::Codec;
use gox_types::error::OrchestratorError;
use serde::{Deserialize, Serialize};

fn default_protocol() -> String {
	"tcp".to_string()
}

/// `support:` section of the orchestrator config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportSection {
	pub port: u16,
}

/// `broker:` section of the orchestrator config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerSection {
	pub port: u16,
	#[serde(default = "default_protocol")]
	pub protocol: String,
	#[serde(default)]
	pub codec: Codec,
}

/// Top-level orchestrator configuration (spec §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
	pub support: SupportSection,
	pub broker: BrokerSection,
	#[serde(default)]
	pub base_dir: Vec<PathBuf>,
	#[serde(default)]
	pub pool: Vec<PathBuf>,
	#[serde(default)]
	pub cells: Vec<PathBuf>,
	#[serde(default)]
	pub debug: bool,
}

impl OrchestratorConfig {
	/// Reads and parses an orchestrator config YAML file.
	pub fn load(path: &std::path::Path) -> Result<Self, OrchestratorError> {
		let text = std::fs::read_to_string(path).map_err(|e| OrchestratorError::Configuration {
			reason: format!("reading orchestrator config {}: {e}", path.display()),
		})?;
		Self::parse(&text)
	}

	/// Parses orchestrator config YAML text directly (used by tests).
	pub fn parse(text: &str) -> Result<Self, OrchestratorError> {
		serde_yaml::from_str(text).map_err(|e| OrchestratorError::Configuration {
			reason: format!("parsing orchestrator config: {e}"),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_minimal_config() {
		let yaml = r#"
support:
  port: 7000
broker:
  port: 7001
pool: ["pool.yaml"]
cells: ["cells.yaml"]
"#;
		let config = OrchestratorConfig::parse(yaml).unwrap();
		assert_eq!(config.support.port, 7000);
		assert_eq!(config.broker.port, 7001);
		assert_eq!(config.broker.protocol, "tcp");
		assert_eq!(config.broker.codec, Codec::Json);
		assert_eq!(config.pool.len(), 1);
		assert!(!config.debug);
	}
}
