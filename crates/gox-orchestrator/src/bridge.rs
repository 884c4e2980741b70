//! Host embedding API: Subscribe/Publish/PublishAndWait over the same
//! routing plane agents use (spec §4.5 "Host embedding (EventBridge)").

use std::collections::HashMap;
use std::time::Duration;

use gox_broker::Broker;
use gox_envelope::{Destination, Envelope};
use gox_types::error::BrokerError;
use gox_types::ids::{AgentId, ProjectId, Topic};
use serde_json::Value;

/// One event delivered to a host subscription.
#[derive(Debug, Clone)]
pub struct Event {
	pub topic: Topic,
	pub project_id: ProjectId,
	pub timestamp: chrono::DateTime<chrono::Utc>,
	pub payload: HashMap<String, Value>,
}

/// A live host subscription; `recv` yields events as they're published.
pub struct EventSubscription {
	inner: gox_broker::Subscription,
	project_id: ProjectId,
}

impl EventSubscription {
	pub async fn recv(&mut self) -> Option<Event> {
		let envelope = self.inner.recv().await?;
		Some(envelope_to_event(&envelope, self.project_id.clone()))
	}
}

fn envelope_to_event(envelope: &Envelope, project_id: ProjectId) -> Event {
	let topic = match &envelope.destination {
		Destination::Topic(topic) => topic.clone(),
		Destination::Agent(agent) => Topic::new(agent.as_str()),
	};
	let payload = serde_json::from_slice(&envelope.payload).unwrap_or_else(|_| {
		use base64::Engine;
		let mut map = HashMap::new();
		map.insert(
			"raw_base64".to_string(),
			Value::String(base64::engine::general_purpose::STANDARD.encode(&envelope.payload)),
		);
		map
	});
	Event {
		topic,
		project_id,
		timestamp: chrono::Utc::now(),
		payload,
	}
}

/// Host-facing facade over the orchestrator's embedded broker: lets host
/// code share the same routing plane as deployed agents.
pub struct EventBridge {
	broker: Broker,
	host_id: AgentId,
	project_id: ProjectId,
}

impl EventBridge {
	#[must_use]
	pub fn new(broker: Broker, project_id: ProjectId) -> Self {
		Self {
			broker,
			host_id: AgentId::new("__host__"),
			project_id,
		}
	}

	/// Subscribes to `topic` (literal or wildcard), returning a channel of
	/// events as agents publish to it.
	pub async fn subscribe(&self, topic: Topic) -> Result<EventSubscription, BrokerError> {
		let inner = self.broker.subscribe(topic).await?;
		Ok(EventSubscription {
			inner,
			project_id: self.project_id.clone(),
		})
	}

	/// Publishes `payload` on `topic`, reaching every current subscriber
	/// (host or agent) exactly as an agent's own publish would.
	pub async fn publish(&self, topic: Topic, payload: HashMap<String, Value>) -> Result<(), BrokerError> {
		let bytes = serde_json::to_vec(&payload).unwrap_or_default();
		let envelope = Envelope::new(self.host_id.clone(), Destination::Topic(topic.clone()), "application/json", bytes);
		self.broker.publish(topic, envelope).await
	}

	/// Publishes on `request_topic` and waits up to `timeout` for the first
	/// event on `reply_topic`, built from `subscribe` + `publish` + a
	/// deadline (spec §4.5: "PublishAndWait is built on Subscribe+Publish").
	pub async fn publish_and_wait(
		&self,
		request_topic: Topic,
		reply_topic: Topic,
		payload: HashMap<String, Value>,
		timeout: Duration,
	) -> Result<Event, PublishAndWaitError> {
		let mut subscription = self.subscribe(reply_topic).await?;
		self.publish(request_topic, payload).await?;
		tokio::time::timeout(timeout, subscription.recv())
			.await
			.map_err(|_| PublishAndWaitError::Timeout)?
			.ok_or(PublishAndWaitError::ChannelClosed)
	}
}

/// Failure modes of `EventBridge::publish_and_wait`.
#[derive(Debug, thiserror::Error)]
pub enum PublishAndWaitError {
	#[error(transparent)]
	Broker(#[from] BrokerError),
	#[error("no reply received within the deadline")]
	Timeout,
	#[error("reply subscription closed before a reply arrived")]
	ChannelClosed,
}
