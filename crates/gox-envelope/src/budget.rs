//! Token-budget estimation driving the "needs splitting?" decision (spec §4.1).

use std::collections::HashMap;
use std::sync::Arc;

use gox_types::ids::AgentId;

use crate::envelope::Envelope;

/// A destination-specific function estimating how many tokens a payload
/// will consume once delivered. Pluggable per destination; if none is
/// registered for a destination, no chunking is performed (spec §4.1).
pub trait TokenCounter: Send + Sync {
	fn estimate(&self, bytes: &[u8]) -> u64;
}

impl<F: Fn(&[u8]) -> u64 + Send + Sync> TokenCounter for F {
	fn estimate(&self, bytes: &[u8]) -> u64 {
		self(bytes)
	}
}

/// The result of estimating an envelope's transport size against a
/// destination's token budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetEstimate {
	pub needs_splitting: bool,
	/// Target chunk payload size in bytes, present only when splitting is needed.
	pub chunk_byte_budget: Option<usize>,
}

impl BudgetEstimate {
	fn no_split() -> Self {
		Self {
			needs_splitting: false,
			chunk_byte_budget: None,
		}
	}
}

/// Maps destination agent ids to their token counters.
#[derive(Default, Clone)]
pub struct TokenBudgetRegistry {
	counters: HashMap<AgentId, Arc<dyn TokenCounter>>,
}

impl TokenBudgetRegistry {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&mut self, destination: AgentId, counter: Arc<dyn TokenCounter>) {
		self.counters.insert(destination, counter);
	}

	/// Estimates whether `envelope` needs splitting to stay within
	/// `token_limit` tokens at `destination`, and if so, the target chunk
	/// byte size. Returns "no split" when no counter is registered.
	#[must_use]
	pub fn estimate_budget(
		&self,
		destination: &AgentId,
		envelope: &Envelope,
		token_limit: u64,
	) -> BudgetEstimate {
		let Some(counter) = self.counters.get(destination) else {
			return BudgetEstimate::no_split();
		};

		let tokens = counter.estimate(&envelope.payload);
		if tokens <= token_limit || envelope.payload.is_empty() {
			return BudgetEstimate::no_split();
		}

		let ratio = token_limit as f64 / tokens as f64;
		let target = ((envelope.payload.len() as f64) * ratio).floor().max(1.0) as usize;
		BudgetEstimate {
			needs_splitting: true,
			chunk_byte_budget: Some(target),
		}
	}
}
