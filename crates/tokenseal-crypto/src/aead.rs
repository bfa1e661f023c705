//! XChaCha20-Poly1305 sealing for confidential per-message tokens.

use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};

use crate::{error::CryptoError, key_schedule::KEY_SIZE};

/// XChaCha20 nonce size in bytes.
pub const AEAD_NONCE_SIZE: usize = 24;

/// Poly1305 tag size in bytes.
pub const AEAD_TAG_SIZE: usize = 16;

/// Encrypt `plaintext`, authenticating `aad` alongside it.
///
/// The nonce must never repeat under the same key; callers draw it from a
/// CSPRNG.
pub fn seal(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; AEAD_NONCE_SIZE],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .encrypt(XNonce::from_slice(nonce), Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::Encryption)
}

/// Decrypt and authenticate `ciphertext` (which includes the tag).
pub fn open(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; AEAD_NONCE_SIZE],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(XNonce::from_slice(nonce), Payload { msg: ciphertext, aad })
        .map_err(|_| CryptoError::Decryption)
}
