//! Length-prefixed token framing.
//!
//! Every token on the wire is a 4-byte big-endian length followed by exactly
//! that many payload bytes:
//!
//! ```text
//! +----------------+---------------------------+
//! | length: u32 BE | payload: `length` bytes   |
//! +----------------+---------------------------+
//! ```
//!
//! # Invariants
//!
//! - A zero-length token is never sent. Providers signal "nothing to send"
//!   with an empty token and callers skip the send; [`send_token`] rejects an
//!   empty token rather than emitting a frame the peer would misread.
//! - A declared length above the receive bound is rejected before any
//!   payload buffer is allocated.
//! - No retries: the first I/O failure is returned and the stream must be
//!   considered dead.

use std::io::{self, Read, Write};

use thiserror::Error;
use zerocopy::{
    FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, Unaligned,
    byteorder::{BigEndian, U32},
};

use crate::token::Token;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default upper bound on a received token (16 MiB).
///
/// Context-establishment tokens are at most a few tens of kilobytes; the
/// bound leaves room for wrapped file payloads while stopping a peer from
/// requesting a 4 GiB allocation with a single header.
pub const DEFAULT_MAX_TOKEN_SIZE: u32 = 16 * 1024 * 1024;

/// Errors from the framing layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying stream failed, hit EOF mid-frame, or was reset.
    #[error("token I/O failed: {0}")]
    Io(#[from] io::Error),

    /// A token length exceeds the bound (on receive) or the u32 prefix (on
    /// send).
    #[error("token of {declared} bytes exceeds limit of {max} bytes")]
    Oversized {
        /// Length declared by the peer, or the length of the outbound token.
        declared: u64,
        /// The bound that was exceeded.
        max: u64,
    },

    /// Attempted to send a zero-length token.
    #[error("refusing to send an empty token")]
    EmptyToken,
}

impl TransportError {
    /// True if the peer closed the stream before a full frame arrived.
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}

/// Wire representation of the length prefix.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
struct LengthPrefix {
    len: U32<BigEndian>,
}

/// Write one framed token to `stream`.
///
/// The prefix and payload are written with `write_all` and the stream is
/// flushed, so a partially written frame always surfaces as an error.
pub fn send_token<W: Write + ?Sized>(stream: &mut W, token: &[u8]) -> Result<(), TransportError> {
    if token.is_empty() {
        return Err(TransportError::EmptyToken);
    }

    let len = u32::try_from(token.len()).map_err(|_| TransportError::Oversized {
        declared: token.len() as u64,
        max: u64::from(u32::MAX),
    })?;

    let prefix = LengthPrefix { len: U32::new(len) };
    stream.write_all(prefix.as_bytes())?;
    stream.write_all(token)?;
    stream.flush()?;

    Ok(())
}

/// Read one framed token using [`DEFAULT_MAX_TOKEN_SIZE`] as the bound.
pub fn recv_token<R: Read + ?Sized>(stream: &mut R) -> Result<Token, TransportError> {
    recv_token_bounded(stream, DEFAULT_MAX_TOKEN_SIZE)
}

/// Read one framed token, rejecting declared lengths above `max_len`.
///
/// Only the 4-byte prefix is consumed when the length is rejected.
pub fn recv_token_bounded<R: Read + ?Sized>(
    stream: &mut R,
    max_len: u32,
) -> Result<Token, TransportError> {
    let mut prefix = LengthPrefix::new_zeroed();
    stream.read_exact(prefix.as_mut_bytes())?;

    let declared = prefix.len.get();
    if declared > max_len {
        return Err(TransportError::Oversized {
            declared: u64::from(declared),
            max: u64::from(max_len),
        });
    }

    let mut payload = vec![0u8; declared as usize];
    stream.read_exact(&mut payload)?;

    Ok(Token::from(payload))
}

/// A bidirectional token channel.
///
/// The negotiator and the session orchestrator talk to the peer only through
/// this trait, so tests can substitute recording or scripted channels.
pub trait TokenTransport {
    /// Send one token. Must not be called with an empty token.
    fn send_token(&mut self, token: &[u8]) -> Result<(), TransportError>;

    /// Block until one complete token has been received.
    fn recv_token(&mut self) -> Result<Token, TransportError>;
}

/// Framing adapter over any blocking byte stream.
#[derive(Debug)]
pub struct Framed<S> {
    inner: S,
    max_token_size: u32,
}

impl<S> Framed<S> {
    /// Wrap `inner` with the default receive bound.
    pub fn new(inner: S) -> Self {
        Self { inner, max_token_size: DEFAULT_MAX_TOKEN_SIZE }
    }

    /// Override the receive bound.
    #[must_use]
    pub fn with_max_token_size(mut self, max_token_size: u32) -> Self {
        self.max_token_size = max_token_size;
        self
    }

    /// Current receive bound.
    pub fn max_token_size(&self) -> u32 {
        self.max_token_size
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Unwrap the underlying stream.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Read + Write> TokenTransport for Framed<S> {
    fn send_token(&mut self, token: &[u8]) -> Result<(), TransportError> {
        send_token(&mut self.inner, token)
    }

    fn recv_token(&mut self) -> Result<Token, TransportError> {
        recv_token_bounded(&mut self.inner, self.max_token_size)
    }
}
