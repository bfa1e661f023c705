//! Tokenseal Cryptographic Primitives
//!
//! This crate provides the cryptographic building blocks for the tokenseal
//! pre-shared-key mechanism.
//!
//! # Design
//!
//! All functions in this crate are pure - they have no side effects and
//! produce deterministic outputs given the same inputs. Random bytes required
//! for nonces must be provided by the caller, enabling:
//!
//! - Deterministic testing with seeded RNG
//! - No coupling to the provider or session layers
//!
//! # Security Properties
//!
//! - Key Confirmation: both peers prove possession of the pre-shared key with
//!   an HMAC over the full handshake transcript
//! - Freshness: every key is bound to both handshake nonces
//! - Direction Separation: initiator and acceptor use distinct keys, so a
//!   token can never be reflected back to its sender

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod aead;
pub mod error;
pub mod key_schedule;
pub mod mac;

pub use aead::{AEAD_NONCE_SIZE, AEAD_TAG_SIZE, open, seal};
pub use error::CryptoError;
pub use key_schedule::{
    HandshakeKeys, KEY_SIZE, MIN_PSK_SIZE, SessionKeys, derive_handshake_keys,
    derive_session_keys, transcript_hash,
};
pub use mac::{MAC_SIZE, compute_mac, verify_mac};
