//! Key schedule for the pre-shared-key mechanism.
//!
//! ```text
//! psk ──┬─ HKDF(salt = nonce_i || nonce_a) ──┬─ "initiator proof" ─> HandshakeKeys.initiator
//!       │                                     └─ "acceptor proof"  ─> HandshakeKeys.acceptor
//!       │
//!       └─ HKDF(salt = transcript hash) ──────┬─ "initiator mac" ───> SessionKeys.initiator_mac
//!                                             ├─ "acceptor mac"  ───> SessionKeys.acceptor_mac
//!                                             ├─ "initiator enc" ───> SessionKeys.initiator_enc
//!                                             └─ "acceptor enc"  ───> SessionKeys.acceptor_enc
//! ```

use hkdf::Hkdf;
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

/// Size of every derived key.
pub const KEY_SIZE: usize = 32;

/// Minimum accepted pre-shared key length.
pub const MIN_PSK_SIZE: usize = 16;

const LABEL_PREFIX: &[u8] = b"tokenseal psk v1 ";

/// Keys proving possession of the PSK during the handshake.
///
/// The `Debug` impl never prints key bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct HandshakeKeys {
    /// Keys the initiator's finish proof.
    pub initiator: [u8; KEY_SIZE],
    /// Keys the acceptor's reply proof.
    pub acceptor: [u8; KEY_SIZE],
}

impl std::fmt::Debug for HandshakeKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HandshakeKeys(<redacted>)")
    }
}

/// Directional per-message keys of an established context.
///
/// The `Debug` impl never prints key bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKeys {
    /// MAC key for tokens produced by the initiator.
    pub initiator_mac: [u8; KEY_SIZE],
    /// MAC key for tokens produced by the acceptor.
    pub acceptor_mac: [u8; KEY_SIZE],
    /// AEAD key for tokens sealed by the initiator.
    pub initiator_enc: [u8; KEY_SIZE],
    /// AEAD key for tokens sealed by the acceptor.
    pub acceptor_enc: [u8; KEY_SIZE],
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKeys(<redacted>)")
    }
}

fn check_psk(psk: &[u8]) -> Result<(), CryptoError> {
    if psk.len() < MIN_PSK_SIZE {
        return Err(CryptoError::WeakKey { len: psk.len(), min: MIN_PSK_SIZE });
    }
    Ok(())
}

fn expand(hk: &Hkdf<Sha256>, label: &str) -> Result<[u8; KEY_SIZE], CryptoError> {
    let mut info = Vec::with_capacity(LABEL_PREFIX.len() + label.len());
    info.extend_from_slice(LABEL_PREFIX);
    info.extend_from_slice(label.as_bytes());

    let mut okm = [0u8; KEY_SIZE];
    hk.expand(&info, &mut okm).map_err(|_| CryptoError::KeyDerivation)?;
    Ok(okm)
}

/// Derive the handshake proof keys from the PSK and both nonces.
pub fn derive_handshake_keys(
    psk: &[u8],
    initiator_nonce: &[u8],
    acceptor_nonce: &[u8],
) -> Result<HandshakeKeys, CryptoError> {
    check_psk(psk)?;

    let mut salt = Vec::with_capacity(initiator_nonce.len() + acceptor_nonce.len());
    salt.extend_from_slice(initiator_nonce);
    salt.extend_from_slice(acceptor_nonce);

    let hk = Hkdf::<Sha256>::new(Some(salt.as_slice()), psk);
    Ok(HandshakeKeys {
        initiator: expand(&hk, "initiator proof")?,
        acceptor: expand(&hk, "acceptor proof")?,
    })
}

/// Derive the per-message keys from the PSK and the final transcript hash.
pub fn derive_session_keys(
    psk: &[u8],
    transcript: &[u8; KEY_SIZE],
) -> Result<SessionKeys, CryptoError> {
    check_psk(psk)?;

    let hk = Hkdf::<Sha256>::new(Some(transcript.as_slice()), psk);
    Ok(SessionKeys {
        initiator_mac: expand(&hk, "initiator mac")?,
        acceptor_mac: expand(&hk, "acceptor mac")?,
        initiator_enc: expand(&hk, "initiator enc")?,
        acceptor_enc: expand(&hk, "acceptor enc")?,
    })
}

/// SHA-256 over length-prefixed parts.
///
/// Each part is prefixed with its u32 BE length so that moving bytes between
/// adjacent parts changes the hash.
pub fn transcript_hash(parts: &[&[u8]]) -> [u8; KEY_SIZE] {
    let mut hasher = Sha256::new();
    for part in parts {
        let len = u32::try_from(part.len()).unwrap_or(u32::MAX);
        hasher.update(len.to_be_bytes());
        hasher.update(part);
    }
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PSK: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn short_psk_is_rejected() {
        let err = derive_handshake_keys(b"short", &[1; 32], &[2; 32]).unwrap_err();
        assert_eq!(err, CryptoError::WeakKey { len: 5, min: MIN_PSK_SIZE });
    }

    #[test]
    fn handshake_keys_are_directional() {
        let keys = derive_handshake_keys(PSK, &[1; 32], &[2; 32]).unwrap();
        assert_ne!(keys.initiator, keys.acceptor);
    }

    #[test]
    fn handshake_keys_bind_nonces() {
        let a = derive_handshake_keys(PSK, &[1; 32], &[2; 32]).unwrap();
        let b = derive_handshake_keys(PSK, &[1; 32], &[3; 32]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn session_keys_are_deterministic() {
        let transcript = transcript_hash(&[b"hello", b"reply"]);
        let a = derive_session_keys(PSK, &transcript).unwrap();
        let b = derive_session_keys(PSK, &transcript).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.initiator_mac, a.acceptor_mac);
        assert_ne!(a.initiator_enc, a.initiator_mac);
    }

    #[test]
    fn transcript_hash_is_boundary_sensitive() {
        assert_ne!(transcript_hash(&[b"ab", b"c"]), transcript_hash(&[b"a", b"bc"]));
    }

    #[test]
    fn debug_redacts_keys() {
        let keys = derive_handshake_keys(PSK, &[1; 32], &[2; 32]).unwrap();
        assert_eq!(format!("{keys:?}"), "HandshakeKeys(<redacted>)");
    }
}
