//! Topic actor: pub/sub fan-out with wildcard subscriptions (spec §4.2).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use gox_envelope::Envelope;
use gox_types::error::BrokerError;
use gox_types::ids::Topic;
use tokio::sync::{mpsc, oneshot};

/// Default buffer capacity for a topic subscription's channel.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

enum TopicCmd {
	Subscribe {
		pattern: String,
		reply: oneshot::Sender<(SubscriptionId, mpsc::Receiver<Envelope>)>,
	},
	Unsubscribe {
		id: SubscriptionId,
	},
	Publish {
		topic: String,
		envelope: Envelope,
	},
	DropCount {
		topic: String,
		reply: oneshot::Sender<u64>,
	},
}

/// Handle for communicating with the `TopicService` actor.
#[derive(Clone)]
pub struct TopicHandle {
	tx: mpsc::Sender<TopicCmd>,
	stopped: Arc<AtomicU64>,
}

impl TopicHandle {
	/// Subscribes to `pattern` (a literal topic or a wildcard pattern per
	/// [`crate::pattern::matches`]). Topics spring into existence on first
	/// publish or subscribe — subscribing to an unseen topic is never an error.
	pub async fn subscribe(&self, pattern: Topic) -> Result<Subscription, BrokerError> {
		let (reply_tx, reply_rx) = oneshot::channel();
		self.tx
			.send(TopicCmd::Subscribe {
				pattern: pattern.as_str().to_string(),
				reply: reply_tx,
			})
			.await
			.map_err(|_| BrokerError::BrokerStopped)?;
		let (id, rx) = reply_rx.await.map_err(|_| BrokerError::BrokerStopped)?;
		Ok(Subscription {
			id,
			rx,
			handle: self.clone(),
		})
	}

	/// Unsubscribes, closing the subscription's channel. A no-op if already
	/// unsubscribed.
	pub async fn unsubscribe(&self, id: SubscriptionId) {
		let _ = self.tx.send(TopicCmd::Unsubscribe { id }).await;
	}

	/// Delivers `envelope` to every current subscriber whose pattern matches
	/// `topic`. Non-blocking: a subscriber whose buffer is full has the
	/// message dropped for it only; the publisher still sees success.
	pub async fn publish(&self, topic: Topic, envelope: Envelope) -> Result<(), BrokerError> {
		self.tx
			.send(TopicCmd::Publish {
				topic: topic.as_str().to_string(),
				envelope,
			})
			.await
			.map_err(|_| BrokerError::BrokerStopped)
	}

	/// Total messages dropped for `topic` due to full subscriber buffers.
	pub async fn drop_count(&self, topic: &Topic) -> u64 {
		let (reply_tx, reply_rx) = oneshot::channel();
		if self
			.tx
			.send(TopicCmd::DropCount {
				topic: topic.as_str().to_string(),
				reply: reply_tx,
			})
			.await
			.is_err()
		{
			return 0;
		}
		reply_rx.await.unwrap_or(0)
	}

	/// `true` once the actor task has stopped (best-effort; only set by tests
	/// and graceful shutdown helpers that track it explicitly).
	#[must_use]
	pub fn is_stopped(&self) -> bool {
		self.stopped.load(Ordering::Relaxed) != 0
	}
}

/// A live subscription: an envelope receiver plus the means to unsubscribe.
pub struct Subscription {
	id: SubscriptionId,
	rx: mpsc::Receiver<Envelope>,
	handle: TopicHandle,
}

impl Subscription {
	/// Receives the next envelope delivered to this subscription, or `None`
	/// once the broker has shut down and closed the channel.
	pub async fn recv(&mut self) -> Option<Envelope> {
		self.rx.recv().await
	}

	/// This subscription's id, for explicit `unsubscribe`.
	#[must_use]
	pub fn id(&self) -> SubscriptionId {
		self.id
	}

	/// Closes this subscription.
	pub async fn unsubscribe(&self) {
		self.handle.unsubscribe(self.id).await;
	}
}

struct Entry {
	pattern: String,
	sender: mpsc::Sender<Envelope>,
}

/// Actor owning the subscriber table. Single source of truth for fan-out and
/// drop accounting (spec §5: "guarded by a single read-write lock" — here the
/// actor's exclusive ownership of its own task serves the same purpose).
pub struct TopicService {
	rx: mpsc::Receiver<TopicCmd>,
	subscriptions: HashMap<u64, Entry>,
	next_id: u64,
	drop_counts: HashMap<String, u64>,
	subscriber_capacity: usize,
	stopped: Arc<AtomicU64>,
}

impl TopicService {
	/// Spawns the topic actor task and returns its handle.
	#[must_use]
	pub fn start(subscriber_capacity: usize) -> TopicHandle {
		let (tx, rx) = mpsc::channel(256);
		let stopped = Arc::new(AtomicU64::new(0));
		let service = Self {
			rx,
			subscriptions: HashMap::new(),
			next_id: 0,
			drop_counts: HashMap::new(),
			subscriber_capacity,
			stopped: stopped.clone(),
		};
		tokio::spawn(service.run());
		TopicHandle { tx, stopped }
	}

	async fn run(mut self) {
		while let Some(cmd) = self.rx.recv().await {
			match cmd {
				TopicCmd::Subscribe { pattern, reply } => {
					let id = self.next_id;
					self.next_id += 1;
					let (tx, rx) = mpsc::channel(self.subscriber_capacity);
					self.subscriptions.insert(id, Entry { pattern, sender: tx });
					let _ = reply.send((SubscriptionId(id), rx));
				}
				TopicCmd::Unsubscribe { id } => {
					self.subscriptions.remove(&id.0);
				}
				TopicCmd::Publish { topic, envelope } => {
					let mut dead = Vec::new();
					let mut dropped = 0u64;
					for (id, entry) in &self.subscriptions {
						if !crate::pattern::matches(&entry.pattern, &topic) {
							continue;
						}
						match entry.sender.try_send(envelope.clone()) {
							Ok(()) => {}
							Err(mpsc::error::TrySendError::Full(_)) => {
								dropped += 1;
								tracing::debug!(topic, "subscriber buffer full, dropping message");
							}
							Err(mpsc::error::TrySendError::Closed(_)) => dead.push(*id),
						}
					}
					for id in dead {
						self.subscriptions.remove(&id);
					}
					if dropped > 0 {
						*self.drop_counts.entry(topic).or_insert(0) += dropped;
					}
				}
				TopicCmd::DropCount { topic, reply } => {
					let _ = reply.send(self.drop_counts.get(&topic).copied().unwrap_or(0));
				}
			}
		}
		self.stopped.store(1, Ordering::Relaxed);
	}
}
