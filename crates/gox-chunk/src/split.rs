//! File split into content-addressed chunk slices (spec §4.6 "Split").

use std::path::Path;

use gox_types::error::ChunkError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::chunk::{Chunk, ChunkStatus, FileRecord};

const COMPRESSION_BLOCK: usize = 32 * 1024;
const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// How a file is divided into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitMethod {
	FixedByte,
	/// Text: chunk boundaries fall on line breaks.
	LineAligned,
	/// Binary: chunk size rounded to the nearest power of two.
	PowerOfTwoAligned,
	/// Rounded to the compression block size (32 KiB).
	CompressionBlockAligned,
	/// 64 KiB fixed, used when no more specific method applies.
	Default,
}

/// A chunk slice produced by `split_file`, carrying its bytes for storing.
#[derive(Debug, Clone)]
pub struct ChunkSlice {
	pub chunk: Chunk,
	pub bytes: Vec<u8>,
}

/// Chooses a split method and target chunk size from the file's total size,
/// a desired chunk count, and its detected MIME type.
#[must_use]
pub fn optimal_split_method(total_size: u64, desired_chunk_count: u32, mime: &str) -> (SplitMethod, usize) {
	if total_size == 0 || desired_chunk_count == 0 {
		return (SplitMethod::Default, DEFAULT_CHUNK_SIZE);
	}
	let raw_target = (total_size / u64::from(desired_chunk_count)).max(1) as usize;

	if mime.starts_with("text/") {
		return (SplitMethod::LineAligned, raw_target);
	}
	if mime.starts_with("application/octet-stream") || mime.starts_with("application/x-") {
		return (SplitMethod::PowerOfTwoAligned, raw_target.next_power_of_two());
	}
	if raw_target >= COMPRESSION_BLOCK {
		let rounded = raw_target.div_ceil(COMPRESSION_BLOCK) * COMPRESSION_BLOCK;
		return (SplitMethod::CompressionBlockAligned, rounded);
	}
	(SplitMethod::Default, DEFAULT_CHUNK_SIZE)
}

/// Splits the file at `path` into chunk slices of approximately
/// `target_chunk_size` bytes, aligned according to `method`.
pub fn split_file(path: &Path, target_chunk_size: usize, method: SplitMethod) -> Result<(FileRecord, Vec<ChunkSlice>), ChunkError> {
	let data = std::fs::read(path).map_err(|e| ChunkError::IoError { reason: e.to_string() })?;
	let mime = detect_mime(&data);
	let boundaries = match method {
		SplitMethod::LineAligned => line_aligned_boundaries(&data, target_chunk_size),
		_ => fixed_boundaries(data.len(), target_chunk_size.max(1)),
	};

	let mut chunks = Vec::with_capacity(boundaries.len());
	for (index, &(start, end)) in boundaries.iter().enumerate() {
		let slice = &data[start..end];
		let content_hash = hex_sha256(slice);
		chunks.push(ChunkSlice {
			chunk: Chunk {
				index: index as u32,
				content_hash,
				size: slice.len() as u64,
				start: start as u64,
				end: end as u64,
				status: ChunkStatus::Created,
			},
			bytes: slice.to_vec(),
		});
	}

	let file = FileRecord {
		content_hash: hex_sha256(&data),
		size: data.len() as u64,
		mime,
		chunk_count: chunks.len() as u32,
	};
	Ok((file, chunks))
}

fn fixed_boundaries(total: usize, chunk_size: usize) -> Vec<(usize, usize)> {
	if total == 0 {
		return vec![(0, 0)];
	}
	let mut bounds = Vec::new();
	let mut start = 0;
	while start < total {
		let end = (start + chunk_size).min(total);
		bounds.push((start, end));
		start = end;
	}
	bounds
}

fn line_aligned_boundaries(data: &[u8], target_chunk_size: usize) -> Vec<(usize, usize)> {
	let mut bounds = Vec::new();
	let mut start = 0;
	let mut cursor = 0;
	while cursor < data.len() {
		if cursor - start >= target_chunk_size && data[cursor] == b'\n' {
			bounds.push((start, cursor + 1));
			start = cursor + 1;
		}
		cursor += 1;
	}
	if start < data.len() {
		bounds.push((start, data.len()));
	}
	if bounds.is_empty() {
		bounds.push((0, data.len()));
	}
	bounds
}

fn detect_mime(data: &[u8]) -> String {
	if data.is_empty() || std::str::from_utf8(data).is_ok() {
		"text/plain".to_string()
	} else {
		"application/octet-stream".to_string()
	}
}

/// Lowercase hex-encoded SHA-256 of `bytes`.
#[must_use]
pub fn hex_sha256(bytes: &[u8]) -> String {
	let digest = Sha256::digest(bytes);
	hex_encode(&digest)
}

fn hex_encode(bytes: &[u8]) -> String {
	use std::fmt::Write;
	let mut s = String::with_capacity(bytes.len() * 2);
	for b in bytes {
		let _ = write!(s, "{b:02x}");
	}
	s
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fixed_split_covers_whole_file_with_dense_indices() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("data.bin");
		std::fs::write(&path, vec![7u8; 1000]).unwrap();

		let (file, chunks) = split_file(&path, 300, SplitMethod::FixedByte).unwrap();
		assert_eq!(file.size, 1000);
		assert_eq!(file.chunk_count, chunks.len() as u32);
		for (i, slice) in chunks.iter().enumerate() {
			assert_eq!(slice.chunk.index, i as u32);
		}
		let total: u64 = chunks.iter().map(|c| c.chunk.size).sum();
		assert_eq!(total, 1000);
	}

	#[test]
	fn line_aligned_split_never_splits_mid_line() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("lines.txt");
		let content = "aaaa\nbbbb\ncccc\ndddd\n".repeat(50);
		std::fs::write(&path, &content).unwrap();

		let (_, chunks) = split_file(&path, 40, SplitMethod::LineAligned).unwrap();
		for slice in &chunks {
			assert!(slice.bytes.is_empty() || *slice.bytes.last().unwrap() == b'\n' || slice.chunk.end as usize == content.len());
		}
	}

	#[test]
	fn chunk_hash_matches_recomputed_hash_of_its_bytes() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("data.bin");
		std::fs::write(&path, b"hello world, this is chunked data").unwrap();

		let (_, chunks) = split_file(&path, 8, SplitMethod::FixedByte).unwrap();
		for slice in &chunks {
			assert_eq!(slice.chunk.content_hash, hex_sha256(&slice.bytes));
		}
	}

	#[test]
	fn optimal_split_method_picks_line_aligned_for_text() {
		let (method, _) = optimal_split_method(10_000, 10, "text/plain");
		assert_eq!(method, SplitMethod::LineAligned);
	}

	#[test]
	fn optimal_split_method_falls_back_to_default_for_zero_size() {
		let (method, size) = optimal_split_method(0, 10, "text/plain");
		assert_eq!(method, SplitMethod::Default);
		assert_eq!(size, DEFAULT_CHUNK_SIZE);
	}
}
