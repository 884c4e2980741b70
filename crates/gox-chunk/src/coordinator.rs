//! Parallel chunk processing coordinator (spec §4.6 "Parallel processing").

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use gox_types::error::ChunkError;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::chunk::{Chunk, ChunkStatus, DependencyEdge, FileRecord};
use crate::graph::store_chunk_bytes;
use crate::metrics::{FileMetrics, WorkerMetrics};
use crate::split::ChunkSlice;
use crate::store::UnifiedStore;

/// Chunks with `Created` status and no unresolved incoming `DEPENDS_ON` edge.
#[must_use]
pub fn get_independent_chunks(chunks: &HashMap<u32, Chunk>, dependencies: &[DependencyEdge]) -> Vec<u32> {
	chunks
		.values()
		.filter(|c| matches!(c.status, ChunkStatus::Created))
		.filter(|c| {
			dependencies
				.iter()
				.filter(|edge| edge.to == c.index)
				.all(|edge| chunks.get(&edge.from).is_some_and(|dep| matches!(dep.status, ChunkStatus::Completed)))
		})
		.map(|c| c.index)
		.collect()
}

/// A completed or failed chunk outcome, as reported back from a worker task.
struct Outcome {
	index: u32,
	worker_slot: usize,
	bytes_len: u64,
	result: Result<(), ChunkError>,
}

/// Owns a bounded worker pool and drives independent chunks to completion.
pub struct ChunkCoordinator {
	worker_count: usize,
}

impl ChunkCoordinator {
	#[must_use]
	pub fn new(worker_count: usize) -> Self {
		Self {
			worker_count: worker_count.max(1),
		}
	}

	/// Processes every chunk of `file` to completion or failure, calling
	/// `process` on each chunk's bytes. Returns the final chunk states and
	/// per-file/per-worker metrics. A chunk whose dependency failed never
	/// becomes independent and is left `Created` forever — callers should
	/// treat a run that doesn't converge to all-`Completed`/`Failed` as a
	/// stalled dependency graph.
	pub async fn run<S, F, Fut>(
		&self,
		store: Arc<S>,
		file: &FileRecord,
		chunks: Vec<Chunk>,
		dependencies: Vec<DependencyEdge>,
		process: F,
	) -> Result<(Vec<Chunk>, FileMetrics, Vec<WorkerMetrics>), ChunkError>
	where
		S: UnifiedStore + 'static,
		F: Fn(Chunk, Vec<u8>) -> Fut + Send + Sync + Clone + 'static,
		Fut: Future<Output = Result<Vec<u8>, ChunkError>> + Send + 'static,
	{
		let semaphore = Arc::new(Semaphore::new(self.worker_count));
		let mut by_index: HashMap<u32, Chunk> = chunks.into_iter().map(|c| (c.index, c)).collect();
		let mut dispatched: HashSet<u32> = HashSet::new();
		let mut join_set: JoinSet<Outcome> = JoinSet::new();
		let slot_counter = Arc::new(AtomicU64::new(0));

		let mut worker_metrics: Vec<WorkerMetrics> = (0..self.worker_count).map(|_| WorkerMetrics::default()).collect();
		let mut file_metrics = FileMetrics::new(by_index.len() as u32);

		loop {
			let ready = get_independent_chunks(&by_index, &dependencies);
			for idx in ready {
				if !dispatched.insert(idx) {
					continue;
				}
				let chunk = by_index.get_mut(&idx).expect("just looked up in by_index");
				chunk.status = ChunkStatus::Processing;
				file_metrics.in_flight += 1;

				let chunk = chunk.clone();
				let store = store.clone();
				let process = process.clone();
				let permit = semaphore.clone().acquire_owned().await.expect("semaphore never closed");
				let slot = (slot_counter.fetch_add(1, Ordering::Relaxed) as usize) % self.worker_count;

				join_set.spawn(async move {
					let _permit = permit;
					let bytes_len = chunk.size;
					let result = async {
						let bytes = store.retrieve_blob(&chunk.content_hash).await?;
						let processed = process(chunk.clone(), bytes).await?;
						let slice = ChunkSlice {
							chunk: chunk.clone(),
							bytes: processed,
						};
						store_chunk_bytes(store.as_ref(), &slice).await
					}
					.await;
					Outcome {
						index: chunk.index,
						worker_slot: slot,
						bytes_len,
						result,
					}
				});
			}

			let Some(joined) = join_set.join_next().await else {
				break;
			};
			let outcome = joined.expect("worker task does not panic");
			file_metrics.in_flight -= 1;
			let slot_metrics = &mut worker_metrics[outcome.worker_slot];
			slot_metrics.last_active = Some(std::time::Instant::now());
			match outcome.result {
				Ok(()) => {
					by_index.get_mut(&outcome.index).expect("dispatched chunk stays tracked").status = ChunkStatus::Completed;
					file_metrics.completed += 1;
					slot_metrics.completed_count += 1;
					slot_metrics.bytes_processed += outcome.bytes_len;
				}
				Err(ref err) => {
					by_index.get_mut(&outcome.index).expect("dispatched chunk stays tracked").status = ChunkStatus::Failed;
					file_metrics.failed += 1;
					tracing::warn!(index = outcome.index, %err, "chunk processing failed");
				}
			}
			file_metrics.record_event();
		}

		let mut chunks: Vec<Chunk> = by_index.into_values().collect();
		chunks.sort_by_key(|c| c.index);
		Ok((chunks, file_metrics, worker_metrics))
	}
}
