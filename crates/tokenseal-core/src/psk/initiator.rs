//! Initiator half of the PSK mechanism.

use tokenseal_crypto::{
    compute_mac, derive_handshake_keys, derive_session_keys, verify_mac,
};
use tokenseal_proto::{
    ContextFlags, Oid, Token, decode_payload, encode_payload,
    payloads::handshake::{
        AcceptorReply, HANDSHAKE_VERSION, InitiatorFinish, InitiatorHello, NONCE_SIZE,
    },
};

use super::{
    PskConfig, grantable, handshake_transcript, minor,
    session::{Phase, PskContext, Session, crypto_status, entropy_status},
};
use crate::{
    env::Environment,
    name::ServiceName,
    provider::{ContextInfo, ContextStep, SecurityProvider, StepStatus, Wrapped},
    status::{MajorStatus, StatusCode},
};

/// Pre-shared-key security provider (initiator side).
#[derive(Debug)]
pub struct PskProvider<E: Environment> {
    env: E,
    config: PskConfig,
}

impl<E: Environment> PskProvider<E> {
    /// Provider holding `config`'s key and identity.
    pub fn new(env: E, config: PskConfig) -> Self {
        Self { env, config }
    }

    /// Local identity.
    pub fn config(&self) -> &PskConfig {
        &self.config
    }

    /// Recover the payload of a wrapped token sent by the acceptor.
    pub fn unwrap(
        &mut self,
        context: &mut PskContext,
        token: &[u8],
    ) -> Result<(Vec<u8>, bool), StatusCode> {
        context.session_mut()?.unwrap(&self.env, token)
    }

    fn start(
        &mut self,
        context: &mut Option<PskContext>,
        target: &ServiceName,
        flags: ContextFlags,
    ) -> ContextStep {
        let nonce = match self.env.random_array::<NONCE_SIZE>() {
            Ok(nonce) => nonce.to_vec(),
            Err(err) => return ContextStep::failure(entropy_status(err)),
        };
        let hello = InitiatorHello {
            version: HANDSHAKE_VERSION,
            mechanism: Oid::PSK,
            flags,
            initiator: self.config.name().to_string(),
            target: target.to_string(),
            nonce: nonce.clone(),
        };
        let Ok(hello) = encode_payload(&hello) else {
            return ContextStep::failure(StatusCode::new(MajorStatus::Failure, minor::MALFORMED));
        };

        tracing::trace!(%target, %flags, "sending PSK hello");

        *context = Some(PskContext {
            initiator: self.config.name().to_string(),
            acceptor: target.to_string(),
            locally_initiated: true,
            flags: ContextFlags::empty(),
            phase: Phase::AwaitingReply { hello: hello.clone(), nonce, requested: flags },
        });

        ContextStep {
            status: StepStatus::ContinueNeeded,
            output: Token::from(hello),
            granted: ContextFlags::empty(),
        }
    }

    fn finish(
        &mut self,
        context: &mut PskContext,
        target: &ServiceName,
        input: Option<&[u8]>,
    ) -> Result<ContextStep, StatusCode> {
        let Phase::AwaitingReply { hello, nonce, requested } = &context.phase else {
            return Err(StatusCode::new(MajorStatus::Failure, minor::UNEXPECTED_TOKEN));
        };
        let input =
            input.ok_or(StatusCode::new(MajorStatus::DefectiveToken, minor::MISSING_TOKEN))?;
        let malformed = || StatusCode::new(MajorStatus::DefectiveToken, minor::MALFORMED);

        let reply: AcceptorReply = decode_payload(input).map_err(|_| malformed())?;
        if reply.nonce.len() != NONCE_SIZE {
            return Err(malformed());
        }

        let acceptor = ServiceName::parse(&reply.acceptor)?;
        if !target.matches(&acceptor) {
            tracing::debug!(%target, %acceptor, "acceptor answered for a different service");
            return Err(StatusCode::new(MajorStatus::Failure, minor::ACCEPTOR_MISMATCH));
        }

        let psk = self.config.key();
        let keys = derive_handshake_keys(psk, nonce, &reply.nonce).map_err(crypto_status)?;
        let transcript = handshake_transcript(hello, &reply.nonce, &reply.acceptor, reply.granted);

        verify_mac(&keys.acceptor, &[transcript.as_slice()], &reply.proof)
            .map_err(|_| StatusCode::new(MajorStatus::BadMic, minor::BAD_PROOF))?;

        let proof = compute_mac(&keys.initiator, &[transcript.as_slice()]).map_err(crypto_status)?;
        let session_keys = derive_session_keys(psk, &transcript).map_err(crypto_status)?;
        let finish = encode_payload(&InitiatorFinish { proof: proof.to_vec() })
            .map_err(|_| StatusCode::new(MajorStatus::Failure, minor::MALFORMED))?;

        let granted = (reply.granted & grantable(*requested))
            | ContextFlags::PROT_READY
            | ContextFlags::TRANS;
        let expires_at = self.env.now().checked_add(self.config.lifetime());

        context.acceptor = reply.acceptor;
        context.flags = granted;
        context.phase = Phase::Open(Session::new(&session_keys, true, granted, expires_at));

        tracing::trace!(%granted, "PSK handshake verified");

        Ok(ContextStep { status: StepStatus::Complete, output: Token::from(finish), granted })
    }
}

impl<E: Environment> SecurityProvider for PskProvider<E> {
    type Name = ServiceName;
    type Context = PskContext;

    fn import_name(&mut self, name: &str) -> Result<ServiceName, StatusCode> {
        ServiceName::parse(name)
    }

    fn init_step(
        &mut self,
        context: &mut Option<PskContext>,
        target: &ServiceName,
        mechanism: Option<&Oid>,
        flags: ContextFlags,
        input: Option<&[u8]>,
    ) -> ContextStep {
        if mechanism.is_some_and(|mechanism| *mechanism != Oid::PSK) {
            return ContextStep::failure(MajorStatus::BadMech);
        }

        match context {
            None if input.is_some() => {
                ContextStep::failure(StatusCode::new(MajorStatus::DefectiveToken, minor::UNEXPECTED_TOKEN))
            },
            None => self.start(context, target, flags),
            Some(context) => {
                self.finish(context, target, input).unwrap_or_else(ContextStep::failure)
            },
        }
    }

    fn wrap(
        &mut self,
        context: &mut PskContext,
        message: &[u8],
        confidential: bool,
    ) -> Result<Wrapped, StatusCode> {
        context.session_mut()?.wrap(&self.env, message, confidential)
    }

    fn verify_mic(
        &mut self,
        context: &mut PskContext,
        message: &[u8],
        token: &[u8],
    ) -> Result<(), StatusCode> {
        context.session_mut()?.verify_mic(&self.env, message, token)
    }

    fn inquire(&self, context: &PskContext) -> Result<ContextInfo, StatusCode> {
        Ok(context.info())
    }

    fn names_for_mech(&self, mechanism: &Oid) -> Result<Vec<Oid>, StatusCode> {
        if *mechanism != Oid::PSK {
            return Err(StatusCode::from(MajorStatus::BadMech));
        }
        Ok(vec![Oid::NT_HOSTBASED_SERVICE, Oid::NT_USER_NAME])
    }

    fn release(&mut self, context: PskContext) {
        tracing::trace!(?context, "releasing PSK context");
    }
}
