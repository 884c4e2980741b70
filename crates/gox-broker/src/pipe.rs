//! Point-to-point named pipes (spec §4.2).

use std::collections::HashMap;
use std::sync::Arc;

use gox_envelope::Envelope;
use gox_types::error::BrokerError;
use gox_types::ids::PipeName;
use tokio::sync::{Mutex, mpsc};

/// Default bounded capacity for a pipe's channel.
pub const DEFAULT_PIPE_CAPACITY: usize = 64;

struct PipeChannel {
	sender: mpsc::Sender<Envelope>,
	receiver: Arc<Mutex<mpsc::Receiver<Envelope>>>,
}

/// Registry of named bounded FIFO pipes. Unlike topics, a pipe needs no
/// fan-out logic, so it is a thin lock-guarded map rather than its own
/// actor (spec §5 only mandates actor-grade isolation for the subscriber
/// table; pipes get their backpressure for free from the underlying
/// channel).
#[derive(Clone)]
pub struct PipeBroker {
	capacity: usize,
	/// When `true` (the default per spec §4.2), a full pipe blocks the
	/// sender instead of failing with `PipeFull`.
	blocking: bool,
	channels: Arc<Mutex<HashMap<String, PipeChannel>>>,
}

impl PipeBroker {
	#[must_use]
	pub fn new(capacity: usize, blocking: bool) -> Self {
		Self {
			capacity,
			blocking,
			channels: Arc::new(Mutex::new(HashMap::new())),
		}
	}

	/// Ensures the named pipe exists; idempotent.
	pub async fn open(&self, name: &PipeName) {
		let mut channels = self.channels.lock().await;
		channels.entry(name.as_str().to_string()).or_insert_with(|| {
			let (tx, rx) = mpsc::channel(self.capacity);
			PipeChannel {
				sender: tx,
				receiver: Arc::new(Mutex::new(rx)),
			}
		});
	}

	/// Sends `envelope` on the named pipe, opening it first if needed.
	/// Blocks for space when `blocking` (the default); otherwise fails fast
	/// with `PipeFull`.
	pub async fn send(&self, name: &PipeName, envelope: Envelope) -> Result<(), BrokerError> {
		self.open(name).await;
		let sender = {
			let channels = self.channels.lock().await;
			channels
				.get(name.as_str())
				.expect("just opened")
				.sender
				.clone()
		};
		if self.blocking {
			sender.send(envelope).await.map_err(|_| BrokerError::BrokerStopped)
		} else {
			sender.try_send(envelope).map_err(|e| match e {
				mpsc::error::TrySendError::Full(_) => BrokerError::PipeFull { pipe: name.clone() },
				mpsc::error::TrySendError::Closed(_) => BrokerError::BrokerStopped,
			})
		}
	}

	/// Receives the next envelope from the named pipe, opening it first if
	/// needed. Returns `None` once the pipe is closed.
	pub async fn recv(&self, name: &PipeName) -> Option<Envelope> {
		self.open(name).await;
		let receiver = {
			let channels = self.channels.lock().await;
			channels.get(name.as_str())?.receiver.clone()
		};
		receiver.lock().await.recv().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn env(payload: &[u8]) -> Envelope {
		use gox_envelope::Destination;
		use gox_types::ids::{AgentId, Topic};
		Envelope::new(
			AgentId::new("src"),
			Destination::Topic(Topic::new("t")),
			"text",
			payload.to_vec(),
		)
	}

	#[tokio::test]
	async fn send_then_recv_round_trips() {
		let pipes = PipeBroker::new(4, true);
		let name = PipeName::new("out");
		pipes.send(&name, env(b"hello")).await.unwrap();
		let received = pipes.recv(&name).await.unwrap();
		assert_eq!(received.payload, b"hello");
	}

	#[tokio::test]
	async fn non_blocking_full_pipe_fails_with_pipe_full() {
		let pipes = PipeBroker::new(1, false);
		let name = PipeName::new("out");
		pipes.send(&name, env(b"one")).await.unwrap();
		let err = pipes.send(&name, env(b"two")).await.unwrap_err();
		assert!(matches!(err, BrokerError::PipeFull { .. }));
	}
}
