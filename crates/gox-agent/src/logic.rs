//! User-implemented agent hooks (spec §4.4 "A user implements only...").

use async_trait::async_trait;
use gox_envelope::Envelope;
use gox_types::error::AgentError;

/// The only trait a gox agent author implements. Every method is defaulted
/// to a no-op, so an agent can override just the hook it needs — replacing
/// any inheritance-based base-agent class with composition.
#[async_trait]
pub trait AgentLogic: Send + Sync {
	/// Called once after the framework has connected, registered, and
	/// opened ingress/egress, before the message loop starts.
	async fn init(&mut self) -> Result<(), AgentError> {
		Ok(())
	}

	/// Called for each complete inbound envelope (post chunk-reassembly).
	/// Returning `Ok(Some(envelope))` publishes it on egress; `Ok(None)`
	/// means no output for this input (sink agents still forward the
	/// original per step 9 of the lifecycle, others drop it).
	async fn process_message(&mut self, envelope: Envelope) -> Result<Option<Envelope>, AgentError> {
		let _ = envelope;
		Ok(None)
	}

	/// Called on shutdown, before broker connections are closed.
	async fn cleanup(&mut self) -> Result<(), AgentError> {
		Ok(())
	}

	/// Whether this agent is sink-style: a `None` from `process_message`
	/// forwards the original envelope on egress rather than dropping it.
	fn is_sink(&self) -> bool {
		false
	}
}
