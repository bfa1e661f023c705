//! Structured token bodies.
//!
//! Context-establishment tokens of the pre-shared-key mechanism are CBOR
//! encoded; per-message tokens start with a fixed binary header.

pub mod handshake;
pub mod message;

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Errors from payload encoding and decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// CBOR serialization failed.
    #[error("payload encode failed: {reason}")]
    Encode {
        /// Description of the failure.
        reason: String,
    },

    /// CBOR deserialization failed or the token was malformed.
    #[error("payload decode failed: {reason}")]
    Decode {
        /// Description of the failure.
        reason: String,
    },
}

/// Encode a payload to CBOR.
pub fn encode_payload<T: Serialize>(value: &T) -> Result<Vec<u8>, PayloadError> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes)
        .map_err(|e| PayloadError::Encode { reason: e.to_string() })?;
    Ok(bytes)
}

/// Decode a CBOR payload.
pub fn decode_payload<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, PayloadError> {
    ciborium::de::from_reader(bytes).map_err(|e| PayloadError::Decode { reason: e.to_string() })
}
