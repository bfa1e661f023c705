//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples mechanism logic from system resources
//! (time, randomness). This enables:
//!
//! - Deterministic tests: a seeded RNG makes handshake nonces, sealing nonces
//!   and therefore every token byte reproducible.
//!
//! - Production runtime: the system implementation uses real time and OS
//!   entropy without any change to the mechanism code.
//!
//! # Invariants
//!
//! - Monotonicity: `env.now()` must never go backwards
//! - Determinism: Given the same seed, `random_bytes()` produces the same
//!   sequence
//! - Isolation: Implementations must not share global state

use std::time::Instant;

use thiserror::Error;

/// The environment could not supply random bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("entropy source failed: {reason}")]
pub struct EntropyError {
    /// Description from the underlying source.
    pub reason: String,
}

impl EntropyError {
    /// Entropy failure with the given description.
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// Abstract environment providing time and randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// 1. Time monotonicity: `now()` never goes backwards
/// 2. RNG quality: `random_bytes()` uses cryptographically secure entropy in
///    production
pub trait Environment: Clone + Send + Sync + 'static {
    /// Returns the current time.
    ///
    /// Used for context lifetimes: a context whose lifetime has passed
    /// refuses further message protection.
    fn now(&self) -> Instant;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Security
    ///
    /// Production implementations MUST use OS entropy (`getrandom`), not a
    /// userspace PRNG, and MUST report failure rather than leave the buffer
    /// predictable.
    fn random_bytes(&self, buffer: &mut [u8]) -> Result<(), EntropyError>;

    /// Returns a fixed-size array of random bytes.
    ///
    /// Convenience for nonces.
    fn random_array<const N: usize>(&self) -> Result<[u8; N], EntropyError> {
        let mut bytes = [0u8; N];
        self.random_bytes(&mut bytes)?;
        Ok(bytes)
    }
}
