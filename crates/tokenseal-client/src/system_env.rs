//! Production Environment implementation using system time and RNG.

use std::time::Instant;

use tokenseal_core::{EntropyError, Environment};

/// Production environment using system time and cryptographic RNG.
///
/// # Security
///
/// The RNG uses `getrandom`, which provides OS-level cryptographic
/// randomness. This is what handshake and sealing nonces are drawn from.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn random_bytes(&self, buffer: &mut [u8]) -> Result<(), EntropyError> {
        getrandom::fill(buffer).map_err(|err| {
            tracing::error!(%err, "getrandom failed");
            EntropyError::new(err.to_string())
        })
    }
}
