//! Splitting an oversized envelope into a chunk group (spec §4.1).

use std::collections::HashMap;

use gox_types::error::EnvelopeError;
use uuid::Uuid;

use crate::envelope::{Envelope, X_CHUNK_ID, X_CHUNK_INDEX, X_CHUNK_TOTAL, X_ORIGINAL_ID};

/// How a payload is sliced into chunks; chosen automatically from the
/// payload's shape so element/line boundaries are respected where possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMethod {
	/// Payload is a JSON array; split along element boundaries.
	JsonArray,
	/// Payload is newline-oriented text; split along line boundaries.
	LineOriented,
	/// No semantic boundary detected; split at raw byte offsets.
	Byte,
}

/// Detects the most specific splitting method that applies to `payload`.
#[must_use]
pub fn detect_split_method(payload: &[u8]) -> SplitMethod {
	let Ok(text) = std::str::from_utf8(payload) else {
		return SplitMethod::Byte;
	};
	let trimmed = text.trim_start();
	if trimmed.starts_with('[') && serde_json::from_str::<Vec<serde_json::Value>>(trimmed).is_ok() {
		return SplitMethod::JsonArray;
	}
	if text.contains('\n') {
		return SplitMethod::LineOriented;
	}
	SplitMethod::Byte
}

/// Splits `envelope`'s payload into a sequence of chunk envelopes, each no
/// larger than `chunk_budget` bytes (best-effort for semantic methods: a
/// single array element or line may exceed the budget only if it cannot be
/// split further without breaking the boundary it owns).
pub fn split(envelope: &Envelope, chunk_budget: usize) -> Result<Vec<Envelope>, EnvelopeError> {
	if chunk_budget == 0 {
		return Err(EnvelopeError::InvalidPayload { budget: chunk_budget });
	}

	let parts = match detect_split_method(&envelope.payload) {
		SplitMethod::JsonArray => split_json_array(&envelope.payload, chunk_budget)?,
		SplitMethod::LineOriented => split_lines(&envelope.payload, chunk_budget),
		SplitMethod::Byte => split_bytes(&envelope.payload, chunk_budget),
	};

	let total = u32::try_from(parts.len()).expect("chunk count fits u32");
	let group = Uuid::new_v4().to_string();
	let original_id = envelope.id.to_string();

	Ok(parts
		.into_iter()
		.enumerate()
		.map(|(index, payload)| {
			let mut chunk = Envelope {
				id: gox_types::ids::EnvelopeId::generate(),
				source: envelope.source.clone(),
				destination: envelope.destination.clone(),
				message_type: envelope.message_type.clone(),
				timestamp: envelope.timestamp,
				payload,
				headers: envelope.headers.clone(),
				properties: HashMap::new(),
				route: envelope.route.clone(),
			};
			chunk.headers.insert(X_CHUNK_ID.to_string(), group.clone());
			chunk.headers.insert(X_CHUNK_INDEX.to_string(), index.to_string());
			chunk.headers.insert(X_CHUNK_TOTAL.to_string(), total.to_string());
			chunk.headers.insert(X_ORIGINAL_ID.to_string(), original_id.clone());
			chunk
		})
		.collect())
}

fn split_json_array(payload: &[u8], chunk_budget: usize) -> Result<Vec<Vec<u8>>, EnvelopeError> {
	let text = std::str::from_utf8(payload).expect("validated utf8 by detect_split_method");
	let items: Vec<serde_json::Value> =
		serde_json::from_str(text).expect("validated JSON array by detect_split_method");

	if items.is_empty() {
		return Ok(vec![b"[]".to_vec()]);
	}

	let mut chunks = Vec::new();
	let mut current: Vec<serde_json::Value> = Vec::new();
	let mut current_len = 2; // "[" + "]"

	for item in items {
		let item_text = serde_json::to_string(&item).expect("Value serializes");
		let item_len = item_text.len() + 1; // + comma/bracket slack
		if item_len > chunk_budget && current.is_empty() {
			return Err(EnvelopeError::InvalidPayload { budget: chunk_budget });
		}
		if current_len + item_len > chunk_budget && !current.is_empty() {
			chunks.push(serde_json::to_vec(&current).expect("Vec<Value> serializes"));
			current = Vec::new();
			current_len = 2;
		}
		current_len += item_len;
		current.push(item);
	}
	if !current.is_empty() {
		chunks.push(serde_json::to_vec(&current).expect("Vec<Value> serializes"));
	}
	Ok(chunks)
}

fn split_lines(payload: &[u8], chunk_budget: usize) -> Vec<Vec<u8>> {
	let text = std::str::from_utf8(payload).expect("validated utf8 by detect_split_method");
	let mut chunks = Vec::new();
	let mut current = String::new();

	for line in text.split_inclusive('\n') {
		if !current.is_empty() && current.len() + line.len() > chunk_budget {
			chunks.push(std::mem::take(&mut current).into_bytes());
		}
		current.push_str(line);
	}
	if !current.is_empty() {
		chunks.push(current.into_bytes());
	}
	if chunks.is_empty() {
		chunks.push(Vec::new());
	}
	chunks
}

fn split_bytes(payload: &[u8], chunk_budget: usize) -> Vec<Vec<u8>> {
	if payload.is_empty() {
		return vec![Vec::new()];
	}
	payload.chunks(chunk_budget).map(<[u8]>::to_vec).collect()
}

#[cfg(test)]
mod tests {
	use gox_types::ids::{AgentId, Topic};

	use super::*;
	use crate::envelope::Destination;

	fn env(payload: &[u8]) -> Envelope {
		Envelope::new(
			AgentId::new("src"),
			Destination::Topic(Topic::new("t")),
			"text",
			payload.to_vec(),
		)
	}

	#[test]
	fn byte_split_produces_expected_chunk_count() {
		let e = env(&vec![b'a'; 100]);
		let chunks = split(&e, 30).unwrap();
		assert_eq!(chunks.len(), 4);
		for (i, c) in chunks.iter().enumerate() {
			assert_eq!(c.headers[X_CHUNK_INDEX], i.to_string());
			assert_eq!(c.headers[X_CHUNK_TOTAL], "4");
		}
	}

	#[test]
	fn zero_budget_is_invalid_payload() {
		let e = env(b"hi");
		assert!(matches!(split(&e, 0), Err(EnvelopeError::InvalidPayload { .. })));
	}

	#[test]
	fn json_array_respects_element_boundaries() {
		let e = env(br#"[1,2,3,4,5,6,7,8,9,10]"#);
		let chunks = split(&e, 8).unwrap();
		assert!(chunks.len() > 1);
		for c in &chunks {
			let parsed: Vec<i64> = serde_json::from_slice(&c.payload).unwrap();
			assert!(!parsed.is_empty());
		}
	}

	#[test]
	fn json_element_larger_than_budget_is_invalid_payload() {
		let e = env(br#"[123456789012345]"#);
		assert!(matches!(split(&e, 4), Err(EnvelopeError::InvalidPayload { .. })));
	}

	#[test]
	fn detects_line_oriented_text() {
		assert_eq!(detect_split_method(b"a\nb\nc\n"), SplitMethod::LineOriented);
		assert_eq!(detect_split_method(b"[1,2,3]"), SplitMethod::JsonArray);
		assert_eq!(detect_split_method(&[0xff, 0xfe, 0x00]), SplitMethod::Byte);
	}
}
