//! Error taxonomy shared across gox crates (spec §7).
//!
//! Five kinds — Configuration, Connectivity, Protocol, Domain, Integrity —
//! map onto `Severity`, which call sites use to pick the right `tracing`
//! level instead of re-deciding per error site.

use thiserror::Error;

use crate::ids::{AgentId, CellId, ChunkGroupId, EnvelopeId, PipeName, Topic};

/// One of the five error kinds of spec §7, used to pick a consistent log
/// level at each call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
	/// Missing/invalid fields, missing cell, dependency cycle. Fatal at startup.
	Configuration,
	/// Cannot reach Support or Broker. Retried; fatal if the retry budget is exhausted.
	Connectivity,
	/// Malformed envelope, invalid chunk group, unknown message type. Logged, envelope dropped.
	Protocol,
	/// User `ProcessMessage` errors. Logged, envelope dropped, loop continues.
	Domain,
	/// Chunk hash/size mismatch. Fatal to the current file operation only.
	Integrity,
}

/// Envelope & chunking errors (spec §4.1).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
	#[error("payload cannot be chunked within budget {budget} bytes (no semantic boundary smaller than budget)")]
	InvalidPayload { budget: usize },
	#[error("chunk group {group} is missing chunk index {index} of {total}")]
	MissingChunk {
		group: ChunkGroupId,
		index: u32,
		total: u32,
	},
	#[error("chunk group {group} has inconsistent total/original-id across chunks")]
	InconsistentGroup { group: ChunkGroupId },
	#[error("chunk group {group} index {index} received twice with different payloads")]
	DuplicateChunk { group: ChunkGroupId, index: u32 },
	#[error("envelope codec error: {reason}")]
	Codec { reason: String },
}

impl EnvelopeError {
	#[must_use]
	pub fn severity(&self) -> Severity {
		match self {
			EnvelopeError::InvalidPayload { .. } => Severity::Configuration,
			EnvelopeError::MissingChunk { .. }
			| EnvelopeError::InconsistentGroup { .. }
			| EnvelopeError::DuplicateChunk { .. }
			| EnvelopeError::Codec { .. } => Severity::Protocol,
		}
	}
}

/// Broker errors (spec §4.2).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerError {
	#[error("publisher closed for topic {topic}")]
	PublisherClosed { topic: Topic },
	#[error("pipe {pipe} is full")]
	PipeFull { pipe: PipeName },
	#[error("broker is shutting down")]
	BrokerStopped,
}

impl BrokerError {
	#[must_use]
	pub fn severity(&self) -> Severity {
		match self {
			BrokerError::PublisherClosed { .. } => Severity::Protocol,
			BrokerError::PipeFull { .. } => Severity::Domain,
			BrokerError::BrokerStopped => Severity::Connectivity,
		}
	}
}

/// Support registry errors (spec §4.3).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
	#[error("agent {agent} is already registered")]
	AlreadyRegistered { agent: AgentId },
	#[error("no cell config found for agent {agent}")]
	NotFound { agent: AgentId },
	#[error(transparent)]
	InvalidTransition(#[from] crate::lifecycle::InvalidTransition),
	#[error("could not reach Support after the retry budget was exhausted")]
	Unreachable,
}

impl RegistryError {
	#[must_use]
	pub fn severity(&self) -> Severity {
		match self {
			RegistryError::AlreadyRegistered { .. } | RegistryError::NotFound { .. } => {
				Severity::Configuration
			}
			RegistryError::InvalidTransition(_) => Severity::Protocol,
			RegistryError::Unreachable => Severity::Connectivity,
		}
	}
}

/// Agent framework errors (spec §4.4).
#[derive(Debug, Error)]
pub enum AgentError {
	#[error("missing ingress/egress configuration for agent {agent}")]
	MissingConfiguration { agent: AgentId },
	#[error("could not connect to Support/Broker: {0}")]
	Connectivity(#[source] anyhow::Error),
	#[error("malformed envelope {envelope}: {reason}")]
	Protocol { envelope: EnvelopeId, reason: String },
	#[error("process_message failed for envelope {envelope}: {source}")]
	Domain {
		envelope: EnvelopeId,
		#[source]
		source: anyhow::Error,
	},
}

impl AgentError {
	#[must_use]
	pub fn severity(&self) -> Severity {
		match self {
			AgentError::MissingConfiguration { .. } => Severity::Configuration,
			AgentError::Connectivity(_) => Severity::Connectivity,
			AgentError::Protocol { .. } => Severity::Protocol,
			AgentError::Domain { .. } => Severity::Domain,
		}
	}
}

/// Orchestrator errors (spec §4.5).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
	#[error("dependency cycle detected in cell {cell}")]
	DependencyCycle { cell: CellId },
	#[error("cell {cell} is already running for project {project}")]
	CellAlreadyRunning { cell: CellId, project: String },
	#[error("configuration error: {reason}")]
	Configuration { reason: String },
	#[error("agent {agent} did not reach the required state before timeout")]
	DeploymentTimeout { agent: AgentId },
}

impl OrchestratorError {
	#[must_use]
	pub fn severity(&self) -> Severity {
		match self {
			OrchestratorError::DependencyCycle { .. }
			| OrchestratorError::CellAlreadyRunning { .. }
			| OrchestratorError::Configuration { .. } => Severity::Configuration,
			OrchestratorError::DeploymentTimeout { .. } => Severity::Connectivity,
		}
	}
}

/// Chunk processor errors (spec §4.6).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkError {
	#[error("I/O error reading/writing chunk data: {reason}")]
	IoError { reason: String },
	#[error("hash mismatch: expected {expected}, got {actual}")]
	HashMismatch { expected: String, actual: String },
	#[error("chunk {index} of file {file} is not completed (status: {status})")]
	NotCompleted {
		file: String,
		index: u32,
		status: String,
	},
	#[error("chunk {index} of file {file} has size mismatch: expected {expected}, got {actual}")]
	SizeMismatch {
		file: String,
		index: u32,
		expected: u64,
		actual: u64,
	},
}

impl ChunkError {
	#[must_use]
	pub fn severity(&self) -> Severity {
		match self {
			ChunkError::IoError { .. } => Severity::Configuration,
			ChunkError::HashMismatch { .. }
			| ChunkError::NotCompleted { .. }
			| ChunkError::SizeMismatch { .. } => Severity::Integrity,
		}
	}
}
