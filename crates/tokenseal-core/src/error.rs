//! Negotiation and protection errors.
//!
//! Every error in this crate is fatal to the session that produced it: the
//! handshake depends on exact round alternation with the peer, so nothing is
//! retried and partial state is released.

use thiserror::Error;
use tokenseal_proto::TransportError;

use crate::{context::ContextState, status::StatusCode};

/// Errors from context establishment.
#[derive(Debug, Error)]
pub enum NegotiationError {
    /// The provider rejected the target name.
    #[error("parsing name: {0}")]
    BadName(StatusCode),

    /// A context-initialization step failed.
    #[error("initializing context: {0}")]
    ProviderRejected(StatusCode),

    /// The handshake did not complete within the round bound.
    #[error("context not established after {max} rounds")]
    TooManyRounds {
        /// The configured bound.
        max: usize,
    },

    /// Sending or receiving a context token failed.
    #[error("exchanging context tokens: {0}")]
    Transport(#[from] TransportError),
}

impl NegotiationError {
    /// Provider status, if the provider reported the failure.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::BadName(status) | Self::ProviderRejected(status) => Some(*status),
            Self::TooManyRounds { .. } | Self::Transport(_) => None,
        }
    }
}

/// Errors from message protection.
#[derive(Debug, Error)]
pub enum ProtectionError {
    /// The provider refused to wrap or verify.
    #[error("message protection failed: {0}")]
    ProviderRejected(StatusCode),

    /// The integrity token did not validate (tampered, replayed, wrong key).
    #[error("verifying signature: {0}")]
    IntegrityFailed(StatusCode),

    /// The context is not open.
    #[error("context is {state}, not open")]
    ContextNotOpen {
        /// State the context was in.
        state: ContextState,
    },
}

impl ProtectionError {
    /// Provider status, if the provider reported the failure.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::ProviderRejected(status) | Self::IntegrityFailed(status) => Some(*status),
            Self::ContextNotOpen { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::MajorStatus;

    #[test]
    fn negotiation_error_names_operation() {
        let err = NegotiationError::ProviderRejected(StatusCode::new(MajorStatus::BadMech, 0));
        assert_eq!(
            err.to_string(),
            "initializing context: an unsupported mechanism was requested (major 0x00010000, minor 0)"
        );
    }

    #[test]
    fn too_many_rounds_display() {
        let err = NegotiationError::TooManyRounds { max: 100 };
        assert_eq!(err.to_string(), "context not established after 100 rounds");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn context_not_open_display() {
        let err = ProtectionError::ContextNotOpen { state: ContextState::Closed };
        assert_eq!(err.to_string(), "context is closed, not open");
    }
}
