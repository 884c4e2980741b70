//! Public broker façade combining the topic and pipe transports (spec §4.2).

use gox_envelope::Envelope;
use gox_types::error::BrokerError;
use gox_types::ids::{PipeName, Topic};

use crate::pipe::{DEFAULT_PIPE_CAPACITY, PipeBroker};
use crate::topic::{DEFAULT_SUBSCRIBER_CAPACITY, Subscription, TopicHandle, TopicService};

/// Tuning knobs for a `Broker` instance.
#[derive(Debug, Clone, Copy)]
pub struct BrokerConfig {
	pub subscriber_capacity: usize,
	pub pipe_capacity: usize,
	/// `true` (the default): a full pipe blocks the sender. `false`: fails
	/// fast with `PipeFull`.
	pub pipe_blocking: bool,
}

impl Default for BrokerConfig {
	fn default() -> Self {
		Self {
			subscriber_capacity: DEFAULT_SUBSCRIBER_CAPACITY,
			pipe_capacity: DEFAULT_PIPE_CAPACITY,
			pipe_blocking: true,
		}
	}
}

/// The in-process pub/sub + pipe router. One instance is started by the
/// orchestrator per run; agents and host code share it through clones of
/// the handles it exposes.
#[derive(Clone)]
pub struct Broker {
	topics: TopicHandle,
	pipes: PipeBroker,
}

impl Broker {
	/// Starts the broker's topic actor and pipe registry.
	#[must_use]
	pub fn start(config: BrokerConfig) -> Self {
		let topics = TopicService::start(config.subscriber_capacity);
		let pipes = PipeBroker::new(config.pipe_capacity, config.pipe_blocking);
		Self { topics, pipes }
	}

	/// Delivers `envelope` to every current subscriber of `topic`.
	pub async fn publish(&self, topic: Topic, envelope: Envelope) -> Result<(), BrokerError> {
		self.topics.publish(topic, envelope).await
	}

	/// Subscribes to `topic` (literal or wildcard pattern).
	pub async fn subscribe(&self, topic: Topic) -> Result<Subscription, BrokerError> {
		self.topics.subscribe(topic).await
	}

	/// Total messages dropped for `topic` due to full subscriber buffers.
	pub async fn drop_count(&self, topic: &Topic) -> u64 {
		self.topics.drop_count(topic).await
	}

	/// Opens (idempotently) a named pipe.
	pub async fn open_pipe(&self, name: &PipeName) {
		self.pipes.open(name).await;
	}

	/// Sends on a named pipe, opening it first if needed.
	pub async fn send_pipe(&self, name: &PipeName, envelope: Envelope) -> Result<(), BrokerError> {
		self.pipes.send(name, envelope).await
	}

	/// Receives from a named pipe, opening it first if needed.
	pub async fn recv_pipe(&self, name: &PipeName) -> Option<Envelope> {
		self.pipes.recv(name).await
	}
}

#[cfg(test)]
mod tests {
	use gox_envelope::Destination;
	use gox_types::ids::AgentId;

	use super::*;

	fn env(payload: &[u8]) -> Envelope {
		Envelope::new(
			AgentId::new("src"),
			Destination::Topic(Topic::new("raw")),
			"text",
			payload.to_vec(),
		)
	}

	#[tokio::test]
	async fn publish_with_zero_subscribers_is_a_no_op() {
		let broker = Broker::start(BrokerConfig::default());
		broker.publish(Topic::new("raw"), env(b"hi")).await.unwrap();
	}

	#[tokio::test]
	async fn subscriber_receives_published_envelope() {
		let broker = Broker::start(BrokerConfig::default());
		let mut sub = broker.subscribe(Topic::new("raw")).await.unwrap();
		broker.publish(Topic::new("raw"), env(b"hello world")).await.unwrap();
		let received = sub.recv().await.unwrap();
		assert_eq!(received.payload, b"hello world");
	}

	#[tokio::test]
	async fn wildcard_subscription_matches_segment() {
		let broker = Broker::start(BrokerConfig::default());
		let mut sub = broker.subscribe(Topic::new("a:*")).await.unwrap();
		broker.publish(Topic::new("a:b"), env(b"1")).await.unwrap();
		assert!(sub.recv().await.is_some());

		broker.publish(Topic::new("a:b:c"), env(b"2")).await.unwrap();
		broker.publish(Topic::new("a"), env(b"3")).await.unwrap();
		// Neither of the above should have matched "a:*"; confirm no extra
		// delivery arrives promptly.
		let extra = tokio::time::timeout(std::time::Duration::from_millis(50), sub.recv()).await;
		assert!(extra.is_err(), "unexpected extra delivery: {extra:?}");
	}

	#[tokio::test]
	async fn full_subscriber_buffer_drops_and_counts() {
		let config = BrokerConfig {
			subscriber_capacity: 1,
			..BrokerConfig::default()
		};
		let broker = Broker::start(config);
		let mut sub = broker.subscribe(Topic::new("raw")).await.unwrap();
		broker.publish(Topic::new("raw"), env(b"1")).await.unwrap();
		broker.publish(Topic::new("raw"), env(b"2")).await.unwrap();
		tokio::time::sleep(std::time::Duration::from_millis(20)).await;
		assert_eq!(broker.drop_count(&Topic::new("raw")).await, 1);
		let first = sub.recv().await.unwrap();
		assert_eq!(first.payload, b"1");
	}

	#[tokio::test]
	async fn unsubscribe_closes_channel_and_is_idempotent() {
		let broker = Broker::start(BrokerConfig::default());
		let mut sub = broker.subscribe(Topic::new("raw")).await.unwrap();
		sub.unsubscribe().await;
		sub.unsubscribe().await;
		assert!(sub.recv().await.is_none());
	}
}
