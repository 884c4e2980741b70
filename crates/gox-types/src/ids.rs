//! Newtype identifiers shared across the gox workspace.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
		pub struct $name(pub String);

		impl $name {
			/// Wraps a raw string as this id type.
			pub fn new(id: impl Into<String>) -> Self {
				Self(id.into())
			}

			/// Borrows the underlying string.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str(&self.0)
			}
		}

		impl From<String> for $name {
			fn from(s: String) -> Self {
				Self(s)
			}
		}

		impl From<&str> for $name {
			fn from(s: &str) -> Self {
				Self(s.to_string())
			}
		}
	};
}

string_id!(AgentId, "Unique identifier of a running agent instance.");
string_id!(AgentType, "Declared type tag of an agent; keys a pool catalog entry.");
string_id!(CellId, "Identifier of a declarative cell.");
string_id!(
	ProjectId,
	"Identifier of a project; scopes a RunningCell's VFS root."
);
string_id!(
	ChunkGroupId,
	"Stable identifier shared by every chunk envelope of one group (`X-Chunk-ID`)."
);
string_id!(Topic, "Pub/sub topic name.");
string_id!(PipeName, "Point-to-point pipe name.");

/// Unique identifier of an envelope.
///
/// Distinct from the string-newtype ids above because envelope ids are
/// always freshly generated (never parsed out of user-authored config).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvelopeId(pub Uuid);

impl EnvelopeId {
	/// Generates a fresh random envelope id.
	#[must_use]
	pub fn generate() -> Self {
		Self(Uuid::new_v4())
	}
}

impl fmt::Display for EnvelopeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.0, f)
	}
}
