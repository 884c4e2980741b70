//! Broker network address, as registered with Support (spec §4.3, §6).

pub use gox_types::Codec;
use serde::{Deserialize, Serialize};

/// Protocol, host, port, and codec describing how to reach the broker.
/// Registered by the orchestrator via `SetBrokerAddress`, read back by
/// agents through `Support::GetBroker`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerAddress {
	#[serde(default = "default_protocol")]
	pub protocol: String,
	pub host: String,
	pub port: u16,
	#[serde(default)]
	pub codec: Codec,
}

fn default_protocol() -> String {
	"tcp".to_string()
}
