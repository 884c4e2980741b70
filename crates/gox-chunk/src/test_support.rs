//! In-memory `UnifiedStore` used only to exercise the chunk processor's own
//! logic in tests — never a candidate production implementation (spec §6
//! keeps the store external and opaque).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use gox_types::error::ChunkError;
use serde_json::Value;

use crate::store::{BatchOp, UnifiedStore};

#[derive(Default)]
struct Inner {
	vertices: HashMap<String, Value>,
	edges: Vec<(String, String, String)>,
	blobs: HashMap<String, Vec<u8>>,
}

/// A single-process, non-persistent `UnifiedStore`.
#[derive(Default)]
pub struct InMemoryStore {
	inner: Mutex<Inner>,
}

impl InMemoryStore {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn has_vertex(&self, id: &str) -> bool {
		self.inner.lock().unwrap().vertices.contains_key(id)
	}

	#[must_use]
	pub fn has_edge(&self, label: &str, from: &str, to: &str) -> bool {
		self.inner
			.lock()
			.unwrap()
			.edges
			.iter()
			.any(|(l, f, t)| l == label && f == from && t == to)
	}

	fn apply(&self, op: BatchOp) {
		let mut inner = self.inner.lock().unwrap();
		match op {
			BatchOp::CreateVertex { id, properties, .. } => {
				inner.vertices.insert(id, properties);
			}
			BatchOp::CreateEdge { label, from, to } => {
				inner.edges.push((label, from, to));
			}
			BatchOp::UpdateVertex { id, properties } => {
				inner.vertices.insert(id, properties);
			}
		}
	}
}

#[async_trait]
impl UnifiedStore for InMemoryStore {
	async fn create_vertex(&self, label: &str, id: &str, properties: Value) -> Result<(), ChunkError> {
		self.apply(BatchOp::CreateVertex {
			label: label.to_string(),
			id: id.to_string(),
			properties,
		});
		Ok(())
	}

	async fn create_edge(&self, label: &str, from: &str, to: &str) -> Result<(), ChunkError> {
		self.apply(BatchOp::CreateEdge {
			label: label.to_string(),
			from: from.to_string(),
			to: to.to_string(),
		});
		Ok(())
	}

	async fn query(&self, query: &str) -> Result<Vec<Value>, ChunkError> {
		let inner = self.inner.lock().unwrap();
		Ok(inner
			.vertices
			.iter()
			.filter(|(id, _)| id.contains(query))
			.map(|(_, v)| v.clone())
			.collect())
	}

	async fn update_vertex(&self, id: &str, properties: Value) -> Result<(), ChunkError> {
		self.apply(BatchOp::UpdateVertex {
			id: id.to_string(),
			properties,
		});
		Ok(())
	}

	async fn batch(&self, ops: Vec<BatchOp>) -> Result<(), ChunkError> {
		for op in ops {
			self.apply(op);
		}
		Ok(())
	}

	async fn parallel_query(&self, queries: Vec<String>) -> Result<Vec<Vec<Value>>, ChunkError> {
		let mut results = Vec::with_capacity(queries.len());
		for q in queries {
			results.push(self.query(&q).await?);
		}
		Ok(results)
	}

	async fn store_blob(&self, hash: &str, bytes: Vec<u8>) -> Result<(), ChunkError> {
		self.inner.lock().unwrap().blobs.insert(hash.to_string(), bytes);
		Ok(())
	}

	async fn retrieve_blob(&self, hash: &str) -> Result<Vec<u8>, ChunkError> {
		self.inner
			.lock()
			.unwrap()
			.blobs
			.get(hash)
			.cloned()
			.ok_or_else(|| ChunkError::IoError {
				reason: format!("blob {hash} not found"),
			})
	}
}
