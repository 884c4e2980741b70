//! Chunking-aware publish: split oversized envelopes before handing them to
//! the broker (spec §4.1, §4.2 — "a chunking-publisher wrapper").

use gox_envelope::{TokenBudgetRegistry, split};
use gox_types::error::BrokerError;
use gox_types::ids::{AgentId, Topic};

use crate::broker::Broker;

/// Wraps a `Broker` with automatic chunking for a destination whose token
/// budget is registered. All chunks of one envelope go to the same topic.
pub struct ChunkingPublisher<'a> {
	broker: &'a Broker,
	budgets: &'a TokenBudgetRegistry,
	token_limit: u64,
}

impl<'a> ChunkingPublisher<'a> {
	#[must_use]
	pub fn new(broker: &'a Broker, budgets: &'a TokenBudgetRegistry, token_limit: u64) -> Self {
		Self {
			broker,
			budgets,
			token_limit,
		}
	}

	/// Publishes `envelope` to `topic`, first splitting it into chunks if
	/// `destination`'s registered counter says it exceeds `token_limit`.
	pub async fn publish(
		&self,
		topic: Topic,
		destination: &AgentId,
		envelope: gox_envelope::Envelope,
	) -> Result<(), BrokerError> {
		let estimate = self.budgets.estimate_budget(destination, &envelope, self.token_limit);
		if !estimate.needs_splitting {
			return self.broker.publish(topic, envelope).await;
		}

		let budget = estimate.chunk_byte_budget.expect("needs_splitting implies a budget");
		let chunks = split(&envelope, budget).map_err(|_| BrokerError::PublisherClosed { topic: topic.clone() })?;
		for chunk in chunks {
			self.broker.publish(topic.clone(), chunk).await?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use gox_envelope::{Destination, Envelope, TokenCounter, X_CHUNK_ID, X_CHUNK_INDEX, X_CHUNK_TOTAL};
	use gox_types::ids::AgentId;

	use super::*;
	use crate::broker::BrokerConfig;

	struct DivFour;
	impl TokenCounter for DivFour {
		fn estimate(&self, bytes: &[u8]) -> u64 {
			(bytes.len() as u64) / 4
		}
	}

	#[tokio::test]
	async fn oversized_envelope_arrives_as_consistent_chunk_group() {
		let broker = Broker::start(BrokerConfig::default());
		let mut budgets = TokenBudgetRegistry::new();
		let sink = AgentId::new("sink-1");
		budgets.register(sink.clone(), Arc::new(DivFour));

		let mut sub = broker.subscribe(Topic::new("t")).await.unwrap();
		let publisher = ChunkingPublisher::new(&broker, &budgets, 1000);

		let payload = vec![b'x'; 20_000];
		let envelope = Envelope::new(AgentId::new("src"), Destination::Agent(sink.clone()), "text", payload.clone());
		publisher.publish(Topic::new("t"), &sink, envelope).await.unwrap();

		let mut received = Vec::new();
		loop {
			let next = tokio::time::timeout(std::time::Duration::from_millis(100), sub.recv()).await;
			match next {
				Ok(Some(env)) => received.push(env),
				_ => break,
			}
		}

		assert!(received.len() > 1);
		let group_id = received[0].headers[X_CHUNK_ID].clone();
		let total: u32 = received[0].headers[X_CHUNK_TOTAL].parse().unwrap();
		assert_eq!(total as usize, received.len());
		for (i, env) in received.iter().enumerate() {
			assert_eq!(env.headers[X_CHUNK_ID], group_id);
			assert_eq!(env.headers[X_CHUNK_INDEX].parse::<usize>().unwrap(), i);
		}

		let merged = gox_envelope::merge(&received).unwrap();
		assert_eq!(merged.payload, payload);
	}
}
