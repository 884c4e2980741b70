//! Agent lifecycle state machine (spec §3, §4.3).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle states reported by an agent to the Support registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
	Registered,
	Configured,
	Running,
	Stopping,
	Stopped,
}

/// A lifecycle transition that does not follow the allowed graph.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid lifecycle transition: {from:?} -> {to:?}")]
pub struct InvalidTransition {
	pub from: LifecycleState,
	pub to: LifecycleState,
}

impl LifecycleState {
	/// The single allowed successor, if any. `None` for `Stopped` (terminal).
	#[must_use]
	pub fn next(self) -> Option<LifecycleState> {
		use LifecycleState::{Configured, Registered, Running, Stopped, Stopping};
		match self {
			Registered => Some(Configured),
			Configured => Some(Running),
			Running => Some(Stopping),
			Stopping => Some(Stopped),
			Stopped => None,
		}
	}

	/// Validates a transition against the linear
	/// `Registered -> Configured -> Running -> Stopping -> Stopped` graph.
	pub fn validate_transition(from: LifecycleState, to: LifecycleState) -> Result<(), InvalidTransition> {
		if from.next() == Some(to) {
			Ok(())
		} else {
			Err(InvalidTransition { from, to })
		}
	}
}

/// Tracks a single entity's lifecycle state and enforces the transition graph.
///
/// Used by both the Support registry (per agent) and the agent framework's
/// own local view of its state.
#[derive(Debug, Clone)]
pub struct LifecycleGraph {
	state: LifecycleState,
}

impl LifecycleGraph {
	/// Starts a new graph in the initial `Registered` state.
	#[must_use]
	pub fn new() -> Self {
		Self {
			state: LifecycleState::Registered,
		}
	}

	/// Current state.
	#[must_use]
	pub fn state(&self) -> LifecycleState {
		self.state
	}

	/// Attempts to move to `to`, rejecting disallowed transitions.
	pub fn transition(&mut self, to: LifecycleState) -> Result<(), InvalidTransition> {
		LifecycleState::validate_transition(self.state, to)?;
		self.state = to;
		Ok(())
	}
}

impl Default for LifecycleGraph {
	fn default() -> Self {
		Self::new()
	}
}
