//! Tokenseal wire layer.
//!
//! Everything that crosses the byte stream between an initiator and an
//! acceptor lives here:
//!
//! - [`transport`]: the `[u32 BE length][payload]` token framing
//! - [`Token`]: the opaque byte blob carried by one frame
//! - [`ContextFlags`]: negotiated capability bits (RFC 2744 numbering)
//! - [`Oid`]: mechanism and name-type identifiers
//! - [`payloads`]: CBOR handshake messages and the per-message token header
//!   used by the pre-shared-key mechanism
//!
//! The framing layer has no protocol awareness. It never inspects token
//! contents and never retries; the first I/O failure is returned to the
//! caller.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod flags;
pub mod oid;
pub mod payloads;
pub mod token;
pub mod transport;

pub use flags::ContextFlags;
pub use oid::{Oid, OidError};
pub use payloads::{PayloadError, decode_payload, encode_payload};
pub use token::Token;
pub use transport::{
    DEFAULT_MAX_TOKEN_SIZE, Framed, LENGTH_PREFIX_SIZE, TokenTransport, TransportError,
    recv_token, recv_token_bounded, send_token,
};
