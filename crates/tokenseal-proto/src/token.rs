//! Opaque token type.

use std::ops::Deref;

use bytes::Bytes;

/// An opaque, length-delimited byte blob.
///
/// Tokens are produced by a security provider (context-establishment tokens,
/// wrap tokens, MIC tokens) and carried verbatim by the framing layer. The
/// framing layer never looks inside.
///
/// # Security
///
/// - **Debug Redaction**: The `Debug` impl prints only the length. Tokens can
///   carry key confirmation material and must not end up in logs by accident;
///   use an explicit hex dump at trace level when contents are needed.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Token(Bytes);

impl Token {
    /// Create a token from anything convertible into [`Bytes`].
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// The empty token.
    ///
    /// Returned by providers when there is nothing to send to the peer. An
    /// empty token is never written to the wire.
    pub fn empty() -> Self {
        Self(Bytes::new())
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the token carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the token, returning the underlying buffer.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl Deref for Token {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Token {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Token {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<Bytes> for Token {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<&'static [u8]> for Token {
    fn from(bytes: &'static [u8]) -> Self {
        Self(Bytes::from_static(bytes))
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Token(<{} bytes>)", self.0.len())
    }
}
