//! Envelope (de)serialization for the two wire codecs the broker address
//! can advertise (spec §6): JSON and msgpack. The payload field is always
//! base64-encoded as a string within the serde data model (see
//! `envelope::payload_b64`), so only the surrounding container format
//! differs between the two codecs.

use gox_types::Codec;
use gox_types::error::EnvelopeError;

use crate::envelope::Envelope;

/// Encodes `envelope` using `codec`.
pub fn encode(envelope: &Envelope, codec: Codec) -> Result<Vec<u8>, EnvelopeError> {
	match codec {
		Codec::Json => serde_json::to_vec(envelope).map_err(|e| EnvelopeError::Codec { reason: e.to_string() }),
		Codec::Msgpack => rmp_serde::to_vec_named(envelope).map_err(|e| EnvelopeError::Codec { reason: e.to_string() }),
	}
}

/// Decodes an envelope previously produced by `encode` with the same `codec`.
pub fn decode(bytes: &[u8], codec: Codec) -> Result<Envelope, EnvelopeError> {
	match codec {
		Codec::Json => serde_json::from_slice(bytes).map_err(|e| EnvelopeError::Codec { reason: e.to_string() }),
		Codec::Msgpack => rmp_serde::from_slice(bytes).map_err(|e| EnvelopeError::Codec { reason: e.to_string() }),
	}
}
