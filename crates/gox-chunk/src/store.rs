//! External collaborator contract: the unified graph + blob store (spec §6
//! "Unified store"). No implementation is bundled; any graph-capable
//! content-addressed blob store satisfies it. `crate::test_support` provides
//! an in-memory implementation used only to exercise the chunk processor's
//! own logic in tests.

use async_trait::async_trait;
use gox_types::error::ChunkError;
use serde_json::Value;

/// One operation in a `UnifiedStore::batch` call.
#[derive(Debug, Clone)]
pub enum BatchOp {
	CreateVertex { label: String, id: String, properties: Value },
	CreateEdge { label: String, from: String, to: String },
	UpdateVertex { id: String, properties: Value },
}

/// The graph + content-addressed blob store the chunk processor (and some
/// agents) depend on. Deliberately opaque: the query language is a string,
/// results are untyped JSON values.
#[async_trait]
pub trait UnifiedStore: Send + Sync {
	async fn create_vertex(&self, label: &str, id: &str, properties: Value) -> Result<(), ChunkError>;
	async fn create_edge(&self, label: &str, from: &str, to: &str) -> Result<(), ChunkError>;
	async fn query(&self, query: &str) -> Result<Vec<Value>, ChunkError>;
	async fn update_vertex(&self, id: &str, properties: Value) -> Result<(), ChunkError>;
	async fn batch(&self, ops: Vec<BatchOp>) -> Result<(), ChunkError>;
	/// Runs `queries` concurrently, preserving input order in the result.
	async fn parallel_query(&self, queries: Vec<String>) -> Result<Vec<Vec<Value>>, ChunkError>;
	async fn store_blob(&self, hash: &str, bytes: Vec<u8>) -> Result<(), ChunkError>;
	async fn retrieve_blob(&self, hash: &str) -> Result<Vec<u8>, ChunkError>;
}
