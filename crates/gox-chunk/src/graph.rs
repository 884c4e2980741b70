//! Materialising a split's file/chunk graph into the unified store
//! (spec §4.6 "Store").

use gox_types::error::ChunkError;

use crate::chunk::{Chunk, DependencyEdge, FileRecord};
use crate::split::{ChunkSlice, hex_sha256};
use crate::store::{BatchOp, UnifiedStore};

/// Registers a file and its chunks as graph vertices, with `HAS_CHUNK`,
/// `NEXT_CHUNK`/`PREV_CHUNK`, and `DEPENDS_ON` edges.
pub async fn register_split(
	store: &dyn UnifiedStore,
	file: &FileRecord,
	chunks: &[Chunk],
	dependencies: &[DependencyEdge],
) -> Result<(), ChunkError> {
	let mut ops = vec![BatchOp::CreateVertex {
		label: "File".to_string(),
		id: file.content_hash.clone(),
		properties: serde_json::json!({
			"size": file.size,
			"mime": file.mime,
			"chunk_count": file.chunk_count,
		}),
	}];

	for chunk in chunks {
		ops.push(BatchOp::CreateVertex {
			label: "Chunk".to_string(),
			id: chunk_vertex_id(&file.content_hash, chunk.index),
			properties: serde_json::json!({
				"index": chunk.index,
				"content_hash": chunk.content_hash,
				"size": chunk.size,
				"start": chunk.start,
				"end": chunk.end,
				"status": "created",
			}),
		});
		ops.push(BatchOp::CreateEdge {
			label: "HAS_CHUNK".to_string(),
			from: file.content_hash.clone(),
			to: chunk_vertex_id(&file.content_hash, chunk.index),
		});
		if chunk.index > 0 {
			ops.push(BatchOp::CreateEdge {
				label: "PREV_CHUNK".to_string(),
				from: chunk_vertex_id(&file.content_hash, chunk.index),
				to: chunk_vertex_id(&file.content_hash, chunk.index - 1),
			});
			ops.push(BatchOp::CreateEdge {
				label: "NEXT_CHUNK".to_string(),
				from: chunk_vertex_id(&file.content_hash, chunk.index - 1),
				to: chunk_vertex_id(&file.content_hash, chunk.index),
			});
		}
	}

	for dep in dependencies {
		ops.push(BatchOp::CreateEdge {
			label: "DEPENDS_ON".to_string(),
			from: chunk_vertex_id(&file.content_hash, dep.to),
			to: chunk_vertex_id(&file.content_hash, dep.from),
		});
	}

	store.batch(ops).await
}

/// Stable vertex id for chunk `index` of a file identified by `file_hash`.
#[must_use]
pub fn chunk_vertex_id(file_hash: &str, index: u32) -> String {
	format!("{file_hash}:{index}")
}

/// Stores a chunk's bytes, rejecting a mismatch between `bytes`'s actual
/// hash and the chunk's registered `content_hash` (spec §4.6 "Integrity").
pub async fn store_chunk_bytes(store: &dyn UnifiedStore, chunk: &ChunkSlice) -> Result<(), ChunkError> {
	let actual = hex_sha256(&chunk.bytes);
	if actual != chunk.chunk.content_hash {
		return Err(ChunkError::HashMismatch {
			expected: chunk.chunk.content_hash.clone(),
			actual,
		});
	}
	store.store_blob(&chunk.chunk.content_hash, chunk.bytes.clone()).await
}
