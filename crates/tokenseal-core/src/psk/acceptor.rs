//! Acceptor half of the PSK mechanism.
//!
//! Used by in-process peers to complete real handshakes against
//! [`PskProvider`](super::PskProvider) and to answer protected messages.

use tokenseal_crypto::{compute_mac, derive_handshake_keys, derive_session_keys, verify_mac};
use tokenseal_proto::{
    ContextFlags, Oid, Token, decode_payload, encode_payload,
    payloads::handshake::{
        AcceptorReply, HANDSHAKE_VERSION, InitiatorFinish, InitiatorHello, NONCE_SIZE,
    },
};

use super::{
    ALWAYS_GRANTED, PskConfig, handshake_transcript, minor,
    session::{Phase, PskContext, Session, crypto_status, entropy_status},
};
use crate::{
    env::Environment,
    name::ServiceName,
    provider::{ContextInfo, ContextStep, StepStatus},
    status::{MajorStatus, StatusCode},
};

/// Pre-shared-key acceptor.
#[derive(Debug)]
pub struct PskAcceptor<E: Environment> {
    env: E,
    config: PskConfig,
    name: ServiceName,
    allow_confidentiality: bool,
}

impl<E: Environment> PskAcceptor<E> {
    /// Acceptor for the service named in `config`.
    ///
    /// # Errors
    ///
    /// - `BadName` if the configured name is not a valid service name
    pub fn new(env: E, config: PskConfig) -> Result<Self, StatusCode> {
        let name = ServiceName::parse(config.name())?;
        Ok(Self { env, config, name, allow_confidentiality: true })
    }

    /// Whether to grant confidentiality to initiators.
    #[must_use]
    pub fn with_confidentiality(mut self, allow: bool) -> Self {
        self.allow_confidentiality = allow;
        self
    }

    /// Service this acceptor answers for.
    pub fn name(&self) -> &ServiceName {
        &self.name
    }

    /// Consume one initiator token.
    ///
    /// The first call answers the hello and returns `ContinueNeeded`. The
    /// second verifies the initiator proof and returns `Complete` with no
    /// output.
    pub fn accept_step(&mut self, context: &mut Option<PskContext>, input: &[u8]) -> ContextStep {
        let result = match context {
            None => self.reply(context, input),
            Some(context) => self.confirm(context, input),
        };
        result.unwrap_or_else(ContextStep::failure)
    }

    /// Recover the payload of a wrapped token sent by the initiator.
    pub fn unwrap(
        &mut self,
        context: &mut PskContext,
        token: &[u8],
    ) -> Result<(Vec<u8>, bool), StatusCode> {
        context.session_mut()?.unwrap(&self.env, token)
    }

    /// Detached integrity token over `message`.
    pub fn get_mic(&mut self, context: &mut PskContext, message: &[u8]) -> Result<Token, StatusCode> {
        context.session_mut()?.get_mic(&self.env, message)
    }

    /// Report context attributes.
    pub fn inquire(&self, context: &PskContext) -> ContextInfo {
        context.info()
    }

    fn reply(
        &mut self,
        context: &mut Option<PskContext>,
        input: &[u8],
    ) -> Result<ContextStep, StatusCode> {
        let malformed = || StatusCode::new(MajorStatus::DefectiveToken, minor::MALFORMED);

        let hello: InitiatorHello = decode_payload(input).map_err(|_| malformed())?;
        if hello.version != HANDSHAKE_VERSION {
            return Err(StatusCode::new(MajorStatus::DefectiveToken, minor::VERSION));
        }
        if hello.mechanism != Oid::PSK {
            return Err(StatusCode::from(MajorStatus::BadMech));
        }
        if hello.nonce.len() != NONCE_SIZE {
            return Err(malformed());
        }

        let target = ServiceName::parse(&hello.target)?;
        if !target.matches(&self.name) {
            tracing::debug!(%target, acceptor = %self.name, "no key for requested service");
            return Err(StatusCode::new(MajorStatus::NoCred, minor::UNKNOWN_TARGET));
        }

        let mut granted = (hello.flags & ContextFlags::MUTUAL) | ALWAYS_GRANTED;
        if self.allow_confidentiality {
            granted |= ContextFlags::CONF;
        }

        let nonce = self.env.random_array::<NONCE_SIZE>().map_err(entropy_status)?;
        let acceptor = self.name.to_string();
        let transcript = handshake_transcript(input, &nonce, &acceptor, granted);
        let keys =
            derive_handshake_keys(self.config.key(), &hello.nonce, &nonce).map_err(crypto_status)?;
        let proof = compute_mac(&keys.acceptor, &[transcript.as_slice()]).map_err(crypto_status)?;

        let reply = AcceptorReply {
            nonce: nonce.to_vec(),
            acceptor: acceptor.clone(),
            granted,
            proof: proof.to_vec(),
        };
        let reply = encode_payload(&reply)
            .map_err(|_| StatusCode::new(MajorStatus::Failure, minor::MALFORMED))?;

        tracing::trace!(initiator = %hello.initiator, %granted, "answering PSK hello");

        *context = Some(PskContext {
            initiator: hello.initiator,
            acceptor,
            locally_initiated: false,
            flags: granted,
            phase: Phase::AwaitingFinish { transcript, proof_key: keys.initiator },
        });

        Ok(ContextStep { status: StepStatus::ContinueNeeded, output: Token::from(reply), granted })
    }

    fn confirm(&mut self, context: &mut PskContext, input: &[u8]) -> Result<ContextStep, StatusCode> {
        let Phase::AwaitingFinish { transcript, proof_key } = &context.phase else {
            return Err(StatusCode::new(MajorStatus::Failure, minor::UNEXPECTED_TOKEN));
        };

        let finish: InitiatorFinish = decode_payload(input)
            .map_err(|_| StatusCode::new(MajorStatus::DefectiveToken, minor::MALFORMED))?;
        verify_mac(proof_key, &[transcript.as_slice()], &finish.proof)
            .map_err(|_| StatusCode::new(MajorStatus::BadMic, minor::BAD_PROOF))?;

        let keys = derive_session_keys(self.config.key(), transcript).map_err(crypto_status)?;
        let granted = context.flags | ContextFlags::PROT_READY | ContextFlags::TRANS;
        let expires_at = self.env.now().checked_add(self.config.lifetime());

        context.flags = granted;
        context.phase = Phase::Open(Session::new(&keys, false, granted, expires_at));

        tracing::trace!(initiator = %context.initiator, "PSK context accepted");

        Ok(ContextStep { status: StepStatus::Complete, output: Token::empty(), granted })
    }
}
