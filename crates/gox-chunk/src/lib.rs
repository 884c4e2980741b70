//! Chunk processor: file split, content-addressed chunk store, parallel
//! processing, dependency graph, reassembly, metrics (spec §4.6).

pub mod chunk;
pub mod coordinator;
pub mod graph;
pub mod metrics;
pub mod reassemble;
pub mod split;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use chunk::{Chunk, ChunkStatus, DependencyEdge, FileRecord};
pub use coordinator::{ChunkCoordinator, get_independent_chunks};
pub use graph::{chunk_vertex_id, register_split, store_chunk_bytes};
pub use metrics::{AlertThresholds, FileMetrics, SystemMetrics, WorkerMetrics};
pub use reassemble::reassemble;
pub use split::{ChunkSlice, SplitMethod, hex_sha256, optimal_split_method, split_file};
pub use store::{BatchOp, UnifiedStore};
