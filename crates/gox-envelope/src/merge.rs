//! Reassembling a chunk group into its original envelope (spec §4.1).

use std::collections::HashMap;

use gox_types::error::EnvelopeError;
use gox_types::ids::{ChunkGroupId, EnvelopeId};
use uuid::Uuid;

use crate::envelope::{Envelope, X_CHUNK_ID, X_CHUNK_INDEX, X_CHUNK_TOTAL, X_ORIGINAL_ID};

struct ChunkMeta {
	group: String,
	index: u32,
	total: u32,
	original_id: String,
}

fn chunk_meta(e: &Envelope) -> Result<ChunkMeta, EnvelopeError> {
	let bad_group = || EnvelopeError::InconsistentGroup {
		group: ChunkGroupId::new(String::new()),
	};
	let group = e.headers.get(X_CHUNK_ID).ok_or_else(bad_group)?.clone();
	let index: u32 = e
		.headers
		.get(X_CHUNK_INDEX)
		.and_then(|s| s.parse().ok())
		.ok_or_else(bad_group)?;
	let total: u32 = e
		.headers
		.get(X_CHUNK_TOTAL)
		.and_then(|s| s.parse().ok())
		.ok_or_else(bad_group)?;
	let original_id = e.headers.get(X_ORIGINAL_ID).ok_or_else(bad_group)?.clone();
	Ok(ChunkMeta {
		group,
		index,
		total,
		original_id,
	})
}

/// Reassembles a complete set of chunk envelopes (any arrival order) into
/// the original envelope. See spec §4.1 for the error conditions.
pub fn merge(chunks: &[Envelope]) -> Result<Envelope, EnvelopeError> {
	if chunks.is_empty() {
		return Err(EnvelopeError::MissingChunk {
			group: ChunkGroupId::new(String::new()),
			index: 0,
			total: 0,
		});
	}

	let mut group_id: Option<String> = None;
	let mut total: Option<u32> = None;
	let mut original_id: Option<String> = None;
	let mut by_index: HashMap<u32, &Envelope> = HashMap::new();

	for chunk in chunks {
		let meta = chunk_meta(chunk)?;

		if let Some(g) = &group_id {
			if *g != meta.group {
				return Err(EnvelopeError::InconsistentGroup {
					group: ChunkGroupId::new(meta.group),
				});
			}
		} else {
			group_id = Some(meta.group.clone());
		}

		if let Some(t) = total {
			if t != meta.total {
				return Err(EnvelopeError::InconsistentGroup {
					group: ChunkGroupId::new(meta.group),
				});
			}
		} else {
			total = Some(meta.total);
		}

		if let Some(o) = &original_id {
			if *o != meta.original_id {
				return Err(EnvelopeError::InconsistentGroup {
					group: ChunkGroupId::new(meta.group),
				});
			}
		} else {
			original_id = Some(meta.original_id.clone());
		}

		if let Some(existing) = by_index.get(&meta.index) {
			if existing.payload != chunk.payload {
				return Err(EnvelopeError::DuplicateChunk {
					group: ChunkGroupId::new(meta.group),
					index: meta.index,
				});
			}
		} else {
			by_index.insert(meta.index, chunk);
		}
	}

	let group = ChunkGroupId::new(group_id.expect("at least one chunk"));
	let total = total.expect("at least one chunk");

	for i in 0..total {
		if !by_index.contains_key(&i) {
			return Err(EnvelopeError::MissingChunk {
				group,
				index: i,
				total,
			});
		}
	}

	let mut payload = Vec::new();
	for i in 0..total {
		payload.extend_from_slice(&by_index[&i].payload);
	}

	let first = by_index[&0];
	let mut headers = first.headers.clone();
	for h in [X_CHUNK_ID, X_CHUNK_INDEX, X_CHUNK_TOTAL, X_ORIGINAL_ID] {
		headers.remove(h);
	}

	let id = Uuid::parse_str(&original_id.expect("at least one chunk"))
		.map(EnvelopeId)
		.unwrap_or_else(|_| EnvelopeId::generate());

	Ok(Envelope {
		id,
		source: first.source.clone(),
		destination: first.destination.clone(),
		message_type: first.message_type.clone(),
		timestamp: first.timestamp,
		payload,
		headers,
		properties: first.properties.clone(),
		route: first.route.clone(),
	})
}

#[cfg(test)]
mod tests {
	use gox_types::ids::{AgentId, Topic};

	use super::*;
	use crate::envelope::Destination;
	use crate::split::split;

	fn env(payload: &[u8]) -> Envelope {
		Envelope::new(
			AgentId::new("src"),
			Destination::Topic(Topic::new("t")),
			"text",
			payload.to_vec(),
		)
	}

	#[test]
	fn round_trip_byte_split() {
		let e = env(&vec![b'x'; 500]);
		let chunks = split(&e, 37).unwrap();
		let merged = merge(&chunks).unwrap();
		assert_eq!(merged.payload, e.payload);
		assert_eq!(merged.id, e.id);
		assert_eq!(merged.message_type, e.message_type);
		assert_eq!(merged.destination, e.destination);
	}

	#[test]
	fn out_of_order_merge_matches_in_order() {
		let e = env(b"abcdefghijklmnopqrstuvwxyz");
		let chunks = split(&e, 5).unwrap();
		let mut shuffled = chunks.clone();
		shuffled.reverse();
		let a = merge(&chunks).unwrap();
		let b = merge(&shuffled).unwrap();
		assert_eq!(a.payload, b.payload);
		assert_eq!(a.payload, e.payload);
	}

	#[test]
	fn missing_chunk_detected() {
		let e = env(&vec![b'x'; 100]);
		let mut chunks = split(&e, 20).unwrap();
		chunks.remove(1);
		assert!(matches!(merge(&chunks), Err(EnvelopeError::MissingChunk { .. })));
	}

	#[test]
	fn inconsistent_total_detected() {
		let e1 = env(&vec![b'a'; 100]);
		let e2 = env(&vec![b'b'; 100]);
		let mut chunks1 = split(&e1, 20).unwrap();
		let chunks2 = split(&e2, 50).unwrap();
		chunks1.push(chunks2.into_iter().next().unwrap());
		assert!(matches!(merge(&chunks1), Err(EnvelopeError::InconsistentGroup { .. })));
	}

	#[test]
	fn duplicate_index_with_different_payload_detected() {
		let e = env(&vec![b'x'; 100]);
		let mut chunks = split(&e, 20).unwrap();
		let mut dup = chunks[0].clone();
		dup.payload = b"different".to_vec();
		chunks.push(dup);
		assert!(matches!(merge(&chunks), Err(EnvelopeError::DuplicateChunk { .. })));
	}

	#[test]
	fn duplicate_index_with_identical_payload_is_idempotent() {
		let e = env(&vec![b'x'; 100]);
		let mut chunks = split(&e, 20).unwrap();
		let dup = chunks[0].clone();
		chunks.push(dup);
		assert!(merge(&chunks).is_ok());
	}

	#[test]
	fn single_chunk_round_trips() {
		let e = env(b"small");
		let chunks = split(&e, 1024).unwrap();
		assert_eq!(chunks.len(), 1);
		let merged = merge(&chunks).unwrap();
		assert_eq!(merged.payload, e.payload);
	}
}
