//! In-memory transport wired straight into a PSK acceptor.
//!
//! Every token the initiator sends is fed to [`PskAcceptor::accept_step`]
//! and its non-empty output is queued for the next receive. No sockets or
//! threads, so property tests can run thousands of handshakes.

use std::{collections::VecDeque, io};

use tokenseal_core::{
    MajorStatus, StatusCode, StepStatus, Token,
    psk::{PskAcceptor, PskContext},
};
use tokenseal_proto::{TokenTransport, TransportError};

use crate::sim_env::SimEnv;

/// Loopback between an initiator and a [`PskAcceptor`].
#[derive(Debug)]
pub struct PskLink {
    acceptor: PskAcceptor<SimEnv>,
    context: Option<PskContext>,
    replies: VecDeque<Token>,
    failure: Option<StatusCode>,
}

impl PskLink {
    /// Link answered by `acceptor`.
    pub fn new(acceptor: PskAcceptor<SimEnv>) -> Self {
        Self { acceptor, context: None, replies: VecDeque::new(), failure: None }
    }

    /// Acceptor-side context, once the first token arrived.
    pub fn context(&self) -> Option<&PskContext> {
        self.context.as_ref()
    }

    /// Status of the acceptor step that failed, if any.
    pub fn failure(&self) -> Option<StatusCode> {
        self.failure
    }

    /// Unwrap a message token as the acceptor.
    pub fn unwrap(&mut self, token: &[u8]) -> Result<(Vec<u8>, bool), StatusCode> {
        let context = self.context.as_mut().ok_or_else(no_context)?;
        self.acceptor.unwrap(context, token)
    }

    /// MIC over `message` from the acceptor.
    pub fn get_mic(&mut self, message: &[u8]) -> Result<Token, StatusCode> {
        let context = self.context.as_mut().ok_or_else(no_context)?;
        self.acceptor.get_mic(context, message)
    }
}

fn no_context() -> StatusCode {
    StatusCode::from(MajorStatus::NoContext)
}

impl TokenTransport for PskLink {
    fn send_token(&mut self, token: &[u8]) -> Result<(), TransportError> {
        if token.is_empty() {
            return Err(TransportError::EmptyToken);
        }

        let step = self.acceptor.accept_step(&mut self.context, token);
        if let StepStatus::Failure(status) = step.status {
            tracing::debug!(%status, "acceptor rejected token");
            self.failure = Some(status);
        }
        if !step.output.is_empty() {
            self.replies.push_back(step.output);
        }
        Ok(())
    }

    fn recv_token(&mut self) -> Result<Token, TransportError> {
        self.replies
            .pop_front()
            .ok_or_else(|| TransportError::Io(io::Error::from(io::ErrorKind::UnexpectedEof)))
    }
}

#[cfg(test)]
mod tests {
    use tokenseal_core::{
        ContextFlags, NegotiationError, establish_context,
        psk::{PskConfig, PskProvider},
    };

    use super::*;

    const KEY: [u8; 32] = [9; 32];

    fn link(seed: u64) -> PskLink {
        let config = PskConfig::new(KEY, "sign@server.example").unwrap();
        PskLink::new(PskAcceptor::new(SimEnv::with_seed(seed), config).unwrap())
    }

    #[test]
    fn establishes_through_link() {
        let mut link = link(1);
        let mut provider =
            PskProvider::new(SimEnv::with_seed(2), PskConfig::new(KEY, "client").unwrap());

        let (context, granted) =
            establish_context(&mut link, &mut provider, "sign@server.example", ContextFlags::MUTUAL, None)
                .unwrap();

        assert!(context.is_open());
        assert!(granted.contains(ContextFlags::MUTUAL));
        assert!(link.context().is_some_and(PskContext::is_open));
        assert_eq!(link.failure(), None);
    }

    #[test]
    fn wrong_target_leaves_initiator_without_reply() {
        let mut link = link(3);
        let mut provider =
            PskProvider::new(SimEnv::with_seed(4), PskConfig::new(KEY, "client").unwrap());

        let err =
            establish_context(&mut link, &mut provider, "other@server.example", ContextFlags::empty(), None)
                .unwrap_err();

        assert!(matches!(err, NegotiationError::Transport(ref e) if e.is_eof()));
        assert_eq!(link.failure().map(|status| status.major), Some(MajorStatus::NoCred));
    }

    #[test]
    fn no_context_before_handshake() {
        let mut link = link(5);
        assert_eq!(link.get_mic(b"x").unwrap_err().major, MajorStatus::NoContext);
    }
}
