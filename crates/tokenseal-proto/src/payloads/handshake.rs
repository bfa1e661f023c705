//! Context-establishment payloads of the pre-shared-key mechanism.
//!
//! # Protocol Flow
//!
//! 1. Initiator sends [`InitiatorHello`] (round 1, `ContinueNeeded`)
//! 2. Acceptor replies with [`AcceptorReply`], proving knowledge of the key
//! 3. Initiator verifies the proof and sends [`InitiatorFinish`] (round 2,
//!    `Complete`)
//!
//! The acceptor never sends a token after [`InitiatorFinish`], which is what
//! lets the initiator report `Complete` with a final outbound token.

use serde::{Deserialize, Serialize};

use crate::{ContextFlags, Oid};

/// Current handshake version.
pub const HANDSHAKE_VERSION: u8 = 1;

/// Size of handshake nonces in bytes.
pub const NONCE_SIZE: usize = 32;

/// First context-establishment token.
///
/// # Security
///
/// - **Debug Redaction**: `nonce` is printed as a length only.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiatorHello {
    /// Handshake version
    pub version: u8,
    /// Mechanism the initiator is speaking
    pub mechanism: Oid,
    /// Flags requested by the initiator
    pub flags: ContextFlags,
    /// Display name of the initiator
    pub initiator: String,
    /// Target service name (`service@host`)
    pub target: String,
    /// Fresh initiator randomness
    pub nonce: Vec<u8>,
}

impl std::fmt::Debug for InitiatorHello {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitiatorHello")
            .field("version", &self.version)
            .field("mechanism", &self.mechanism)
            .field("flags", &self.flags)
            .field("initiator", &self.initiator)
            .field("target", &self.target)
            .field("nonce", &format!("<redacted {} bytes>", self.nonce.len()))
            .finish()
    }
}

/// Acceptor response to [`InitiatorHello`].
///
/// # Security
///
/// - **Debug Redaction**: `nonce` and `proof` are printed as lengths only.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptorReply {
    /// Fresh acceptor randomness
    pub nonce: Vec<u8>,
    /// Display name the acceptor authenticated as
    pub acceptor: String,
    /// Flags the acceptor is willing to grant
    pub granted: ContextFlags,
    /// HMAC over the handshake transcript under the acceptor handshake key
    pub proof: Vec<u8>,
}

impl std::fmt::Debug for AcceptorReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcceptorReply")
            .field("nonce", &format!("<redacted {} bytes>", self.nonce.len()))
            .field("acceptor", &self.acceptor)
            .field("granted", &self.granted)
            .field("proof", &format!("<redacted {} bytes>", self.proof.len()))
            .finish()
    }
}

/// Final initiator token, proving knowledge of the key to the acceptor.
///
/// # Security
///
/// - **Debug Redaction**: `proof` is printed as a length only.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiatorFinish {
    /// HMAC over the handshake transcript under the initiator handshake key
    pub proof: Vec<u8>,
}

impl std::fmt::Debug for InitiatorFinish {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitiatorFinish")
            .field("proof", &format!("<redacted {} bytes>", self.proof.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode_payload, encode_payload};

    fn hello() -> InitiatorHello {
        InitiatorHello {
            version: HANDSHAKE_VERSION,
            mechanism: Oid::PSK,
            flags: ContextFlags::MUTUAL | ContextFlags::REPLAY,
            initiator: "alice".to_string(),
            target: "sign@server.example".to_string(),
            nonce: vec![0xaa; NONCE_SIZE],
        }
    }

    #[test]
    fn hello_serde() {
        let hello = hello();
        let bytes = encode_payload(&hello).expect("encode");
        let decoded: InitiatorHello = decode_payload(&bytes).expect("decode");
        assert_eq!(decoded, hello);
    }

    #[test]
    fn reply_serde() {
        let reply = AcceptorReply {
            nonce: vec![0xbb; NONCE_SIZE],
            acceptor: "sign@server.example".to_string(),
            granted: ContextFlags::MUTUAL | ContextFlags::CONF,
            proof: vec![1; 32],
        };

        let bytes = encode_payload(&reply).expect("encode");
        let decoded: AcceptorReply = decode_payload(&bytes).expect("decode");
        assert_eq!(decoded, reply);
    }

    #[test]
    fn wrong_message_type_fails_to_decode() {
        let bytes = encode_payload(&InitiatorFinish { proof: vec![1, 2, 3] }).expect("encode");
        assert!(decode_payload::<AcceptorReply>(&bytes).is_err());
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(decode_payload::<InitiatorHello>(&[0xff, 0x00, 0x13]).is_err());
    }

    #[test]
    fn debug_redacts_nonce() {
        let debug = format!("{:?}", hello());
        assert!(debug.contains("<redacted 32 bytes>"));
        assert!(!debug.contains("170"), "nonce byte values must not leak");
    }
}
