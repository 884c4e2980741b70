//! Wire codec shared between the envelope wire format and the broker
//! address agents discover through Support (spec §4.3, §6).

use serde::{Deserialize, Serialize};

/// Encoding used for an envelope on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
	Json,
	Msgpack,
}

impl Default for Codec {
	fn default() -> Self {
		Self::Json
	}
}
