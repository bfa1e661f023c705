//! Pre-shared-key mechanism.
//!
//! A two-round mechanism in which both peers hold the same secret key:
//!
//! ```text
//! Initiator                                   Acceptor
//!   │ InitiatorHello { flags, nonce_i }  ─────>  │  (ContinueNeeded)
//!   │ <───── AcceptorReply { nonce_a, granted,   │
//!   │                        proof_a }           │
//!   │ InitiatorFinish { proof_i }        ─────>  │  (Complete)
//! ```
//!
//! Proofs are HMACs over the handshake transcript under keys derived from the
//! PSK and both nonces, so each side learns that the other holds the key.
//! Verifying the acceptor proof is what grants `MUTUAL`. Per-message keys are
//! derived from the PSK and the transcript hash.
//!
//! [`PskProvider`] is the initiator half and implements
//! [`SecurityProvider`](crate::SecurityProvider). [`PskAcceptor`] is the
//! acceptor half, used by in-process peers.

mod acceptor;
mod initiator;
mod session;

use std::{fmt, time::Duration};

pub use acceptor::PskAcceptor;
pub use initiator::PskProvider;
pub use session::PskContext;
use tokenseal_crypto::{CryptoError, MIN_PSK_SIZE, transcript_hash};
use tokenseal_proto::ContextFlags;

/// Default context lifetime.
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(10 * 60 * 60);

/// Mechanism-specific minor status codes.
pub mod minor {
    /// A handshake proof did not verify.
    pub const BAD_PROOF: u32 = 1;
    /// A token could not be decoded.
    pub const MALFORMED: u32 = 2;
    /// A per-message token was produced for the other direction.
    pub const WRONG_DIRECTION: u32 = 3;
    /// The peer speaks a different handshake version.
    pub const VERSION: u32 = 4;
    /// A token arrived when none was expected.
    pub const UNEXPECTED_TOKEN: u32 = 5;
    /// A token was expected but none was supplied.
    pub const MISSING_TOKEN: u32 = 6;
    /// The acceptor identified itself as someone other than the target.
    pub const ACCEPTOR_MISMATCH: u32 = 7;
    /// The acceptor holds no key for the requested target.
    pub const UNKNOWN_TARGET: u32 = 8;
    /// The environment could not supply random bytes for a nonce.
    pub const NO_ENTROPY: u32 = 9;
}

/// Key material and identity for one side of the mechanism.
///
/// # Security
///
/// - **Debug Redaction**: the key is never printed.
#[derive(Clone)]
pub struct PskConfig {
    key: Vec<u8>,
    name: String,
    lifetime: Duration,
}

impl PskConfig {
    /// Config for `name` holding `key`.
    ///
    /// # Errors
    ///
    /// - `CryptoError::WeakKey` if the key is shorter than [`MIN_PSK_SIZE`]
    pub fn new(key: impl Into<Vec<u8>>, name: impl Into<String>) -> Result<Self, CryptoError> {
        let key = key.into();
        if key.len() < MIN_PSK_SIZE {
            return Err(CryptoError::WeakKey { len: key.len(), min: MIN_PSK_SIZE });
        }
        Ok(Self { key, name: name.into(), lifetime: DEFAULT_LIFETIME })
    }

    /// Override the context lifetime.
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Local display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Context lifetime.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub(crate) fn key(&self) -> &[u8] {
        &self.key
    }
}

impl fmt::Debug for PskConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PskConfig")
            .field("key", &format_args!("<{} bytes>", self.key.len()))
            .field("name", &self.name)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// Transcript hash both sides compute after the acceptor reply.
pub(crate) fn handshake_transcript(
    hello: &[u8],
    acceptor_nonce: &[u8],
    acceptor: &str,
    granted: ContextFlags,
) -> [u8; 32] {
    transcript_hash(&[hello, acceptor_nonce, acceptor.as_bytes(), &granted.bits().to_be_bytes()])
}

/// Flags the acceptor grants regardless of the request.
pub(crate) const ALWAYS_GRANTED: ContextFlags = ContextFlags::REPLAY
    .union(ContextFlags::SEQUENCE)
    .union(ContextFlags::INTEG);

/// Flags the initiator may end up with for a given request.
pub(crate) fn grantable(requested: ContextFlags) -> ContextFlags {
    requested | ALWAYS_GRANTED | ContextFlags::CONF
}

#[cfg(test)]
pub(crate) mod test_env {
    use std::{
        sync::{Arc, Mutex},
        time::Instant,
    };

    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    use crate::env::{EntropyError, Environment};

    /// Seeded environment for mechanism unit tests.
    #[derive(Clone)]
    pub struct TestEnv {
        rng: Arc<Mutex<ChaCha20Rng>>,
    }

    impl TestEnv {
        pub fn seeded(seed: u64) -> Self {
            Self { rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))) }
        }
    }

    impl Environment for TestEnv {
        fn now(&self) -> Instant {
            Instant::now()
        }

        fn random_bytes(&self, buffer: &mut [u8]) -> Result<(), EntropyError> {
            self.rng.lock().unwrap().fill_bytes(buffer);
            Ok(())
        }
    }

    /// Environment whose entropy source always fails.
    #[derive(Clone, Copy, Debug)]
    pub struct NoEntropy;

    impl Environment for NoEntropy {
        fn now(&self) -> Instant {
            Instant::now()
        }

        fn random_bytes(&self, _buffer: &mut [u8]) -> Result<(), EntropyError> {
            Err(EntropyError::new("no entropy"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_key_is_rejected() {
        let err = PskConfig::new(vec![0u8; 8], "client").unwrap_err();
        assert_eq!(err, CryptoError::WeakKey { len: 8, min: MIN_PSK_SIZE });
    }

    #[test]
    fn debug_redacts_key() {
        let config = PskConfig::new(b"super secret key material".to_vec(), "client").unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("super secret"));
        assert!(debug.contains("<25 bytes>"));
    }

    #[test]
    fn grantable_keeps_acceptor_defaults() {
        let flags = grantable(ContextFlags::MUTUAL);
        assert!(flags.contains(ContextFlags::SEQUENCE | ContextFlags::REPLAY | ContextFlags::INTEG));
        assert!(!flags.contains(ContextFlags::DELEG));
    }

    #[test]
    fn transcript_binds_granted_flags() {
        let a = handshake_transcript(b"hello", &[1; 32], "sign@host", ContextFlags::MUTUAL);
        let b = handshake_transcript(b"hello", &[1; 32], "sign@host", ContextFlags::empty());
        assert_ne!(a, b);
    }
}
