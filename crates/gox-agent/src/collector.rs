//! Per-agent chunk collector (spec §4.4.1).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gox_envelope::Envelope;
use gox_types::error::EnvelopeError;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Default timeout after which an incomplete chunk group is dropped.
pub const DEFAULT_GROUP_TIMEOUT: Duration = Duration::from_secs(5 * 60);

struct PendingGroup {
	chunks: Vec<Envelope>,
	first_seen: Instant,
}

/// Reassembles inbound chunk envelopes, passing complete (unchunked or
/// fully-reassembled) envelopes through. Single lock guards the whole map,
/// per spec.
pub struct ChunkCollector {
	pending: Mutex<HashMap<String, PendingGroup>>,
	timeout: Duration,
}

impl ChunkCollector {
	#[must_use]
	pub fn new(timeout: Duration) -> Arc<Self> {
		Arc::new(Self {
			pending: Mutex::new(HashMap::new()),
			timeout,
		})
	}

	/// Feeds one inbound envelope. Returns `Some(envelope)` once a complete
	/// envelope is available — immediately for a non-chunk envelope, or once
	/// every chunk of its group has arrived. A duplicate chunk index within
	/// a still-open group is a no-op.
	pub async fn ingest(&self, envelope: Envelope) -> Result<Option<Envelope>, EnvelopeError> {
		let Some(group_id) = envelope.chunk_group().map(str::to_string) else {
			return Ok(Some(envelope));
		};

		let mut pending = self.pending.lock().await;
		let total: u32 = envelope
			.headers
			.get(gox_envelope::X_CHUNK_TOTAL)
			.and_then(|s| s.parse().ok())
			.unwrap_or(0);
		let index: u32 = envelope
			.headers
			.get(gox_envelope::X_CHUNK_INDEX)
			.and_then(|s| s.parse().ok())
			.unwrap_or(0);

		let entry = pending.entry(group_id.clone()).or_insert_with(|| PendingGroup {
			chunks: Vec::new(),
			first_seen: Instant::now(),
		});

		if entry.chunks.iter().any(|c| {
			c.headers
				.get(gox_envelope::X_CHUNK_INDEX)
				.and_then(|s| s.parse::<u32>().ok())
				== Some(index)
		}) {
			return Ok(None);
		}

		entry.chunks.push(envelope);

		if entry.chunks.len() as u32 == total {
			let group = pending.remove(&group_id).expect("just inserted above");
			let merged = gox_envelope::merge(&group.chunks)?;
			return Ok(Some(merged));
		}
		Ok(None)
	}

	/// Removes chunk groups whose first chunk arrived more than `timeout`
	/// ago, bounding memory when a group never completes.
	pub async fn sweep(&self) -> usize {
		let mut pending = self.pending.lock().await;
		let before = pending.len();
		pending.retain(|_, group| group.first_seen.elapsed() < self.timeout);
		before - pending.len()
	}

	/// Spawns a periodic sweeper task, cancelled by `cancel`.
	pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration, cancel: CancellationToken) {
		let collector = self.clone();
		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			loop {
				tokio::select! {
					_ = cancel.cancelled() => break,
					_ = ticker.tick() => {
						let swept = collector.sweep().await;
						if swept > 0 {
							tracing::debug!(swept, "chunk collector swept stale groups");
						}
					}
				}
			}
		});
	}
}
