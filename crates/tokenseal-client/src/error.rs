//! Client error types.

use std::{io, path::PathBuf};

use thiserror::Error;
use tokenseal_core::{NegotiationError, ProtectionError, StatusCode};
use tokenseal_crypto::CryptoError;
use tokenseal_proto::TransportError;

use crate::session::SessionState;

/// Errors that end a session.
///
/// Every variant is fatal: the session aborts, releases its context and
/// closes its connection.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The connection could not be opened.
    #[error("connecting to {addr}: {source}")]
    Connect {
        /// Address that was dialed.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Context establishment failed.
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    /// Wrapping or verification failed.
    #[error(transparent)]
    Protection(#[from] ProtectionError),

    /// Sending the protected message or receiving the signature failed.
    #[error("{operation}: {source}")]
    Transport {
        /// What was being exchanged.
        operation: &'static str,
        /// Underlying transport error.
        #[source]
        source: TransportError,
    },

    /// The payload file could not be read.
    #[error("reading payload from {}: {source}", path.display())]
    Payload {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The provider could not report on the established context.
    #[error("{operation}: {status}")]
    Inquire {
        /// Which inquiry failed.
        operation: &'static str,
        /// Provider status.
        status: StatusCode,
    },

    /// `run` was called on a session that already ran.
    #[error("session already {state}")]
    AlreadyRun {
        /// State the session ended in.
        state: SessionState,
    },
}

impl SessionError {
    /// Provider status behind the failure, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Negotiation(err) => err.status(),
            Self::Protection(err) => err.status(),
            Self::Inquire { status, .. } => Some(*status),
            Self::Connect { .. }
            | Self::Transport { .. }
            | Self::Payload { .. }
            | Self::AlreadyRun { .. } => None,
        }
    }
}

/// Errors loading client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The key file could not be read.
    #[error("reading key file {}: {source}", path.display())]
    Read {
        /// Key file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The key file is not hex.
    #[error("key file {} is not hex: {source}", path.display())]
    Hex {
        /// Key file path.
        path: PathBuf,
        /// Decoding error.
        #[source]
        source: hex::FromHexError,
    },

    /// The key is unusable.
    #[error("pre-shared key rejected: {0}")]
    Key(#[from] CryptoError),
}

#[cfg(test)]
mod tests {
    use tokenseal_core::MajorStatus;

    use super::*;

    #[test]
    fn transport_error_names_operation() {
        let err = SessionError::Transport {
            operation: "receiving signature block",
            source: TransportError::EmptyToken,
        };
        assert!(err.to_string().starts_with("receiving signature block: "));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn negotiation_status_is_surfaced() {
        let status = StatusCode::new(MajorStatus::BadMech, 0);
        let err = SessionError::from(NegotiationError::ProviderRejected(status));
        assert_eq!(err.status(), Some(status));
        assert!(err.to_string().starts_with("initializing context: "));
    }
}
