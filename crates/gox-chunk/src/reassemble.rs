//! Chunk reassembly with integrity verification (spec §4.6 "Reassemble").

use std::path::Path;

use gox_types::error::ChunkError;

use crate::chunk::{Chunk, ChunkStatus};
use crate::split::hex_sha256;
use crate::store::UnifiedStore;

/// Retrieves every chunk in index order, verifies completion/hash/size, and
/// concatenates into `output_path`.
pub async fn reassemble(store: &dyn UnifiedStore, chunks: &[Chunk], output_path: &Path) -> Result<(), ChunkError> {
	let mut ordered = chunks.to_vec();
	ordered.sort_by_key(|c| c.index);

	let mut out = Vec::new();
	for chunk in &ordered {
		if !matches!(chunk.status, ChunkStatus::Completed) {
			return Err(ChunkError::NotCompleted {
				file: output_path.display().to_string(),
				index: chunk.index,
				status: format!("{:?}", chunk.status),
			});
		}
		let bytes = store.retrieve_blob(&chunk.content_hash).await?;
		if bytes.len() as u64 != chunk.size {
			return Err(ChunkError::SizeMismatch {
				file: output_path.display().to_string(),
				index: chunk.index,
				expected: chunk.size,
				actual: bytes.len() as u64,
			});
		}
		let actual_hash = hex_sha256(&bytes);
		if actual_hash != chunk.content_hash {
			return Err(ChunkError::HashMismatch {
				expected: chunk.content_hash.clone(),
				actual: actual_hash,
			});
		}
		out.extend_from_slice(&bytes);
	}

	std::fs::write(output_path, out).map_err(|e| ChunkError::IoError { reason: e.to_string() })
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::InMemoryStore;

	fn completed_chunk(index: u32, hash: &str, size: u64) -> Chunk {
		Chunk {
			index,
			content_hash: hash.to_string(),
			size,
			start: 0,
			end: size,
			status: ChunkStatus::Completed,
		}
	}

	#[tokio::test]
	async fn reassembles_chunks_in_order_regardless_of_input_order() {
		let store = InMemoryStore::new();
		let h0 = hex_sha256(b"aaaa");
		let h1 = hex_sha256(b"bbbb");
		store.store_blob(&h0, b"aaaa".to_vec()).await.unwrap();
		store.store_blob(&h1, b"bbbb".to_vec()).await.unwrap();

		let chunks = vec![completed_chunk(1, &h1, 4), completed_chunk(0, &h0, 4)];
		let dir = tempfile::tempdir().unwrap();
		let out = dir.path().join("reassembled.bin");
		reassemble(&store, &chunks, &out).await.unwrap();

		assert_eq!(std::fs::read(&out).unwrap(), b"aaaabbbb");
	}

	#[tokio::test]
	async fn incomplete_chunk_aborts_reassembly() {
		let store = InMemoryStore::new();
		let h0 = hex_sha256(b"aaaa");
		store.store_blob(&h0, b"aaaa".to_vec()).await.unwrap();
		let mut chunks = vec![completed_chunk(0, &h0, 4)];
		chunks.push(Chunk {
			index: 1,
			content_hash: "h1".into(),
			size: 4,
			start: 4,
			end: 8,
			status: ChunkStatus::Processing,
		});
		let dir = tempfile::tempdir().unwrap();
		let out = dir.path().join("reassembled.bin");
		let result = reassemble(&store, &chunks, &out).await;
		assert!(matches!(result, Err(ChunkError::NotCompleted { .. })));
	}

	#[tokio::test]
	async fn size_mismatch_between_blob_and_chunk_record_aborts() {
		let store = InMemoryStore::new();
		store.store_blob("h0", b"aa".to_vec()).await.unwrap();
		let chunks = vec![completed_chunk(0, "h0", 4)];
		let dir = tempfile::tempdir().unwrap();
		let out = dir.path().join("reassembled.bin");
		let result = reassemble(&store, &chunks, &out).await;
		assert!(matches!(result, Err(ChunkError::SizeMismatch { .. })));
	}

	#[tokio::test]
	async fn one_byte_change_to_a_stored_chunk_is_a_hash_mismatch() {
		let store = InMemoryStore::new();
		let h0 = hex_sha256(b"aaaa");
		// Corrupt one byte of the stored blob but keep it registered under
		// the original hash and the original size, so this exercises the
		// hash check rather than the size check above it.
		store.store_blob(&h0, b"aaab".to_vec()).await.unwrap();
		let chunks = vec![completed_chunk(0, &h0, 4)];
		let dir = tempfile::tempdir().unwrap();
		let out = dir.path().join("reassembled.bin");
		let result = reassemble(&store, &chunks, &out).await;
		assert!(matches!(result, Err(ChunkError::HashMismatch { .. })));
	}
}
