//! The universal message unit exchanged across the broker (spec §3, §6).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use gox_types::ids::{AgentId, EnvelopeId, Topic};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Chunk-group header: stable identifier shared by every chunk of one group.
pub const X_CHUNK_ID: &str = "X-Chunk-ID";
/// Chunk-group header: this chunk's zero-based index within its group.
pub const X_CHUNK_INDEX: &str = "X-Chunk-Index";
/// Chunk-group header: total number of chunks in the group.
pub const X_CHUNK_TOTAL: &str = "X-Chunk-Total";
/// Chunk-group header: id of the pre-split envelope this chunk belongs to.
pub const X_ORIGINAL_ID: &str = "X-Original-ID";

/// An envelope's intended destination: a single agent or a pub/sub topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Destination {
	Agent(AgentId),
	Topic(Topic),
}

/// The universal message unit. Immutable once published — a transforming
/// agent emits a new envelope rather than mutating one in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
	pub id: EnvelopeId,
	pub source: AgentId,
	pub destination: Destination,
	pub message_type: String,
	pub timestamp: DateTime<Utc>,
	/// Base64-encoded on the JSON wire (see `gox-envelope::wire`); held as raw
	/// bytes in memory.
	#[serde(with = "payload_b64")]
	pub payload: Vec<u8>,
	pub headers: HashMap<String, String>,
	pub properties: HashMap<String, Value>,
	pub route: Vec<AgentId>,
}

impl Envelope {
	/// Builds a fresh envelope with a generated id, current timestamp, and no
	/// headers/properties/route — the common case for a producing agent.
	#[must_use]
	pub fn new(source: AgentId, destination: Destination, message_type: impl Into<String>, payload: Vec<u8>) -> Self {
		Self {
			id: EnvelopeId::generate(),
			source,
			destination,
			message_type: message_type.into(),
			timestamp: Utc::now(),
			payload,
			headers: HashMap::new(),
			properties: HashMap::new(),
			route: Vec::new(),
		}
	}

	/// Appends an agent id to the route trace, recording that this envelope
	/// has passed through it.
	pub fn record_hop(&mut self, agent: AgentId) {
		self.route.push(agent);
	}

	/// The chunk-group id of this envelope, if it is part of a chunk group.
	#[must_use]
	pub fn chunk_group(&self) -> Option<&str> {
		self.headers.get(X_CHUNK_ID).map(String::as_str)
	}

	/// `true` if this envelope carries chunk headers at all.
	#[must_use]
	pub fn is_chunk(&self) -> bool {
		self.headers.contains_key(X_CHUNK_ID)
	}
}

mod payload_b64 {
	use base64::Engine;
	use base64::engine::general_purpose::STANDARD;
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&STANDARD.encode(bytes))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
		let s = String::deserialize(deserializer)?;
		STANDARD.decode(&s).map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn json_round_trip_preserves_payload() {
		let env = Envelope::new(
			AgentId::new("src"),
			Destination::Topic(Topic::new("raw")),
			"text",
			b"hello world".to_vec(),
		);
		let json = serde_json::to_string(&env).unwrap();
		let back: Envelope = serde_json::from_str(&json).unwrap();
		assert_eq!(back.payload, env.payload);
		assert_eq!(back.destination, env.destination);
	}
}
