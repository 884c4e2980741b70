//! Chunk-processing data model (spec §3 "Chunk-processing entities").

use serde::{Deserialize, Serialize};

/// A file registered with the chunk processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
	pub content_hash: String,
	pub size: u64,
	pub mime: String,
	pub chunk_count: u32,
}

/// A chunk's lifecycle. Monotonic except an explicit reset from `Failed`
/// back to `Created`, which this crate does not perform automatically
/// (spec §4.6 "Status machine").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkStatus {
	Created,
	Processing,
	Completed,
	Failed,
}

/// One contiguous slice of a split file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
	pub index: u32,
	pub content_hash: String,
	pub size: u64,
	pub start: u64,
	pub end: u64,
	pub status: ChunkStatus,
}

/// "Chunk A must complete before chunk B processes."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
	pub from: u32,
	pub to: u32,
}
