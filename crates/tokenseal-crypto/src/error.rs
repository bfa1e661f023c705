//! Crypto error types.

use thiserror::Error;

/// Errors from cryptographic operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Pre-shared key is too short to be used.
    #[error("pre-shared key of {len} bytes is shorter than {min} bytes")]
    WeakKey {
        /// Supplied key length.
        len: usize,
        /// Minimum accepted length.
        min: usize,
    },

    /// HKDF output could not be produced.
    #[error("key derivation failed")]
    KeyDerivation,

    /// AEAD encryption failed.
    #[error("encryption failed")]
    Encryption,

    /// AEAD tag did not verify.
    #[error("decryption failed: authentication tag mismatch")]
    Decryption,

    /// HMAC did not verify.
    #[error("MAC mismatch")]
    MacMismatch,
}

impl CryptoError {
    /// True if this error means the input was forged, corrupted, or produced
    /// under a different key.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::Decryption | Self::MacMismatch)
    }
}
