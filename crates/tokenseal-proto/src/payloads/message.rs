//! Per-message token header.
//!
//! ```text
//! +-----------+----------------+-----------------+---------------+
//! | kind: u8  | direction: u8  | seq: u64 BE     | body ...      |
//! +-----------+----------------+-----------------+---------------+
//! ```
//!
//! The header is authenticated in every token kind: it is MAC input for
//! `Wrap` and `Mic`, and AEAD associated data for `Sealed`.

use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
    byteorder::{BigEndian, U64},
};

use super::PayloadError;

/// Per-message token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TokenKind {
    /// Integrity-protected payload (payload followed by a MAC).
    Wrap = 1,
    /// Encrypted and integrity-protected payload.
    Sealed = 2,
    /// Detached integrity check over a payload the peer already has.
    Mic = 3,
}

impl TokenKind {
    /// Convert from the wire value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Wrap),
            2 => Some(Self::Sealed),
            3 => Some(Self::Mic),
            _ => None,
        }
    }
}

/// Which side of the context produced a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    /// Produced by the context initiator.
    InitiatorToAcceptor = 0,
    /// Produced by the context acceptor.
    AcceptorToInitiator = 1,
}

impl Direction {
    /// Convert from the wire value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::InitiatorToAcceptor),
            1 => Some(Self::AcceptorToInitiator),
            _ => None,
        }
    }
}

/// Fixed header at the start of every per-message token.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
pub struct PerMessageHeader {
    kind: u8,
    direction: u8,
    seq: U64<BigEndian>,
}

impl PerMessageHeader {
    /// Header size in bytes.
    pub const SIZE: usize = 10;

    /// Build a header.
    pub fn new(kind: TokenKind, direction: Direction, seq: u64) -> Self {
        Self { kind: kind as u8, direction: direction as u8, seq: U64::new(seq) }
    }

    /// Split a token into its header and body.
    pub fn parse(token: &[u8]) -> Result<(Self, &[u8]), PayloadError> {
        let (header, body) = Self::read_from_prefix(token).map_err(|_| PayloadError::Decode {
            reason: format!("per-message token shorter than {} bytes", Self::SIZE),
        })?;
        Ok((header, body))
    }

    /// Token kind, if known.
    pub fn kind(&self) -> Option<TokenKind> {
        TokenKind::from_u8(self.kind)
    }

    /// Direction, if known.
    pub fn direction(&self) -> Option<Direction> {
        Direction::from_u8(self.direction)
    }

    /// Sequence number.
    pub fn seq(&self) -> u64 {
        self.seq.get()
    }

    /// Raw header bytes.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out.copy_from_slice(self.as_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn header_size_matches_layout() {
        assert_eq!(std::mem::size_of::<PerMessageHeader>(), PerMessageHeader::SIZE);
    }

    #[test]
    fn header_layout_is_big_endian() {
        let header = PerMessageHeader::new(TokenKind::Mic, Direction::AcceptorToInitiator, 258);
        assert_eq!(header.to_bytes(), hex!("03 01 0000000000000102"));
    }

    #[test]
    fn parse_splits_body() {
        let mut token = PerMessageHeader::new(TokenKind::Wrap, Direction::InitiatorToAcceptor, 7)
            .to_bytes()
            .to_vec();
        token.extend_from_slice(b"body");

        let (header, body) = PerMessageHeader::parse(&token).unwrap();
        assert_eq!(header.kind(), Some(TokenKind::Wrap));
        assert_eq!(header.direction(), Some(Direction::InitiatorToAcceptor));
        assert_eq!(header.seq(), 7);
        assert_eq!(body, b"body");
    }

    #[test]
    fn parse_rejects_short_token() {
        assert!(PerMessageHeader::parse(&[1, 0, 0]).is_err());
    }

    #[test]
    fn unknown_kind_is_none() {
        let (header, _) = PerMessageHeader::parse(&hex!("09 00 0000000000000000")).unwrap();
        assert_eq!(header.kind(), None);
    }
}
