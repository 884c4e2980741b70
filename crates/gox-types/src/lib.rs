//! Shared identifiers, lifecycle state machine, and error taxonomy used by
//! every crate in the gox agent orchestration framework.

pub mod codec;
pub mod error;
pub mod ids;
pub mod lifecycle;

pub use codec::Codec;
pub use error::Severity;
pub use ids::{AgentId, AgentType, CellId, ChunkGroupId, EnvelopeId, PipeName, ProjectId, Topic};
pub use lifecycle::{InvalidTransition, LifecycleGraph, LifecycleState};
