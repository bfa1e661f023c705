//! Per-message protection for an established PSK context.
//!
//! Every per-message token starts with a [`PerMessageHeader`]:
//!
//! ```text
//! Wrap:   header || payload || HMAC(mac_key, header || payload)
//! Sealed: header || nonce(24) || XChaCha20-Poly1305(enc_key, payload, aad = header)
//! Mic:    header || HMAC(mac_key, header || message)
//! ```
//!
//! Each direction has its own keys and a single sequence counter shared by
//! all token kinds. A received sequence number at or below the last accepted
//! one is a replay.

use std::{fmt, time::Instant};

use tokenseal_crypto::{
    AEAD_NONCE_SIZE, CryptoError, KEY_SIZE, MAC_SIZE, SessionKeys, compute_mac, open, seal,
    verify_mac,
};
use tokenseal_proto::{
    ContextFlags, Token,
    payloads::message::{Direction, PerMessageHeader, TokenKind},
};

use super::minor;
use crate::{
    env::{EntropyError, Environment},
    provider::{ContextInfo, Wrapped},
    status::{MajorStatus, StatusCode},
};

/// State of one side of a PSK context.
///
/// # Security
///
/// - **Debug Redaction**: key material and transcripts are never printed.
pub struct PskContext {
    pub(super) initiator: String,
    pub(super) acceptor: String,
    pub(super) locally_initiated: bool,
    pub(super) flags: ContextFlags,
    pub(super) phase: Phase,
}

pub(super) enum Phase {
    /// Initiator sent its hello and waits for the acceptor reply.
    AwaitingReply { hello: Vec<u8>, nonce: Vec<u8>, requested: ContextFlags },
    /// Acceptor sent its reply and waits for the initiator proof.
    AwaitingFinish { transcript: [u8; KEY_SIZE], proof_key: [u8; KEY_SIZE] },
    /// Handshake complete.
    Open(Session),
}

impl PskContext {
    /// True once the handshake has completed.
    pub fn is_open(&self) -> bool {
        matches!(self.phase, Phase::Open(_))
    }

    /// Flags in effect.
    pub fn flags(&self) -> ContextFlags {
        self.flags
    }

    pub(super) fn info(&self) -> ContextInfo {
        ContextInfo {
            initiator: self.initiator.clone(),
            acceptor: self.acceptor.clone(),
            mechanism: tokenseal_proto::Oid::PSK,
            flags: self.flags,
            expires_at: match &self.phase {
                Phase::Open(session) => session.expires_at,
                _ => None,
            },
            locally_initiated: self.locally_initiated,
            open: self.is_open(),
        }
    }

    pub(super) fn session_mut(&mut self) -> Result<&mut Session, StatusCode> {
        match &mut self.phase {
            Phase::Open(session) => Ok(session),
            _ => Err(StatusCode::from(MajorStatus::NoContext)),
        }
    }
}

impl fmt::Debug for PskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match &self.phase {
            Phase::AwaitingReply { .. } => "awaiting reply",
            Phase::AwaitingFinish { .. } => "awaiting finish",
            Phase::Open(_) => "open",
        };
        f.debug_struct("PskContext")
            .field("initiator", &self.initiator)
            .field("acceptor", &self.acceptor)
            .field("locally_initiated", &self.locally_initiated)
            .field("flags", &self.flags)
            .field("phase", &phase)
            .finish()
    }
}

/// Directional keys and counters of an open context.
pub(super) struct Session {
    send_mac: [u8; KEY_SIZE],
    recv_mac: [u8; KEY_SIZE],
    send_enc: [u8; KEY_SIZE],
    recv_enc: [u8; KEY_SIZE],
    outbound: Direction,
    send_seq: u64,
    last_recv_seq: Option<u64>,
    confidentiality: bool,
    expires_at: Option<Instant>,
}

impl Session {
    pub(super) fn new(
        keys: &SessionKeys,
        locally_initiated: bool,
        flags: ContextFlags,
        expires_at: Option<Instant>,
    ) -> Self {
        let (send_mac, recv_mac, send_enc, recv_enc, outbound) = if locally_initiated {
            (
                keys.initiator_mac,
                keys.acceptor_mac,
                keys.initiator_enc,
                keys.acceptor_enc,
                Direction::InitiatorToAcceptor,
            )
        } else {
            (
                keys.acceptor_mac,
                keys.initiator_mac,
                keys.acceptor_enc,
                keys.initiator_enc,
                Direction::AcceptorToInitiator,
            )
        };

        Self {
            send_mac,
            recv_mac,
            send_enc,
            recv_enc,
            outbound,
            send_seq: 0,
            last_recv_seq: None,
            confidentiality: flags.contains(ContextFlags::CONF),
            expires_at,
        }
    }

    fn inbound(&self) -> Direction {
        match self.outbound {
            Direction::InitiatorToAcceptor => Direction::AcceptorToInitiator,
            Direction::AcceptorToInitiator => Direction::InitiatorToAcceptor,
        }
    }

    fn check_expiry(&self, env: &impl Environment) -> Result<(), StatusCode> {
        match self.expires_at {
            Some(expires_at) if env.now() >= expires_at => {
                Err(StatusCode::from(MajorStatus::ContextExpired))
            },
            _ => Ok(()),
        }
    }

    fn next_header(&mut self, kind: TokenKind) -> Result<PerMessageHeader, StatusCode> {
        let seq = self.send_seq;
        self.send_seq = seq.checked_add(1).ok_or(StatusCode::from(MajorStatus::ContextExpired))?;
        Ok(PerMessageHeader::new(kind, self.outbound, seq))
    }

    /// Parse the header and check direction and replay, without accepting the
    /// sequence number yet.
    fn open_header<'t>(
        &self,
        token: &'t [u8],
    ) -> Result<(PerMessageHeader, [u8; PerMessageHeader::SIZE], &'t [u8]), StatusCode> {
        let (header, body) = PerMessageHeader::parse(token)
            .map_err(|_| StatusCode::new(MajorStatus::DefectiveToken, minor::MALFORMED))?;

        if header.direction() != Some(self.inbound()) {
            return Err(StatusCode::new(MajorStatus::DefectiveToken, minor::WRONG_DIRECTION));
        }
        if let Some(last) = self.last_recv_seq
            && header.seq() <= last
        {
            return Err(StatusCode::from(MajorStatus::DuplicateToken));
        }

        Ok((header, header.to_bytes(), body))
    }

    fn accept_seq(&mut self, header: &PerMessageHeader) {
        self.last_recv_seq = Some(header.seq());
    }

    /// Protect `message`, encrypting it if asked and allowed.
    pub(super) fn wrap(
        &mut self,
        env: &impl Environment,
        message: &[u8],
        confidential: bool,
    ) -> Result<Wrapped, StatusCode> {
        self.check_expiry(env)?;

        if confidential && self.confidentiality {
            let nonce: [u8; AEAD_NONCE_SIZE] = env.random_array().map_err(entropy_status)?;
            let header = self.next_header(TokenKind::Sealed)?.to_bytes();
            let ciphertext = seal(&self.send_enc, &nonce, &header, message).map_err(crypto_status)?;

            let mut token = Vec::with_capacity(header.len() + nonce.len() + ciphertext.len());
            token.extend_from_slice(&header);
            token.extend_from_slice(&nonce);
            token.extend_from_slice(&ciphertext);
            return Ok(Wrapped { token: Token::from(token), confidential: true });
        }

        let header = self.next_header(TokenKind::Wrap)?.to_bytes();
        let tag = compute_mac(&self.send_mac, &[header.as_slice(), message]).map_err(crypto_status)?;

        let mut token = Vec::with_capacity(header.len() + message.len() + tag.len());
        token.extend_from_slice(&header);
        token.extend_from_slice(message);
        token.extend_from_slice(&tag);
        Ok(Wrapped { token: Token::from(token), confidential: false })
    }

    /// Recover the payload of a `Wrap` or `Sealed` token.
    ///
    /// Returns the payload and whether it had been encrypted.
    pub(super) fn unwrap(
        &mut self,
        env: &impl Environment,
        token: &[u8],
    ) -> Result<(Vec<u8>, bool), StatusCode> {
        self.check_expiry(env)?;
        let (header, header_bytes, body) = self.open_header(token)?;

        let (message, confidential) = match header.kind() {
            Some(TokenKind::Sealed) => {
                let (nonce, ciphertext) = body
                    .split_first_chunk::<AEAD_NONCE_SIZE>()
                    .ok_or(StatusCode::new(MajorStatus::DefectiveToken, minor::MALFORMED))?;
                let plaintext =
                    open(&self.recv_enc, nonce, &header_bytes, ciphertext).map_err(crypto_status)?;
                (plaintext, true)
            },
            Some(TokenKind::Wrap) => {
                let (payload, tag) = body
                    .split_last_chunk::<MAC_SIZE>()
                    .ok_or(StatusCode::new(MajorStatus::DefectiveToken, minor::MALFORMED))?;
                verify_mac(&self.recv_mac, &[header_bytes.as_slice(), payload], tag).map_err(crypto_status)?;
                (payload.to_vec(), false)
            },
            Some(TokenKind::Mic) | None => {
                return Err(StatusCode::new(MajorStatus::DefectiveToken, minor::MALFORMED));
            },
        };

        self.accept_seq(&header);
        Ok((message, confidential))
    }

    /// Detached integrity token over `message`.
    pub(super) fn get_mic(
        &mut self,
        env: &impl Environment,
        message: &[u8],
    ) -> Result<Token, StatusCode> {
        self.check_expiry(env)?;

        let header = self.next_header(TokenKind::Mic)?.to_bytes();
        let tag = compute_mac(&self.send_mac, &[header.as_slice(), message]).map_err(crypto_status)?;

        let mut token = Vec::with_capacity(header.len() + tag.len());
        token.extend_from_slice(&header);
        token.extend_from_slice(&tag);
        Ok(Token::from(token))
    }

    /// Check a detached integrity token over `message`.
    pub(super) fn verify_mic(
        &mut self,
        env: &impl Environment,
        message: &[u8],
        token: &[u8],
    ) -> Result<(), StatusCode> {
        self.check_expiry(env)?;
        let (header, header_bytes, tag) = self.open_header(token)?;

        if header.kind() != Some(TokenKind::Mic) || tag.len() != MAC_SIZE {
            return Err(StatusCode::new(MajorStatus::DefectiveToken, minor::MALFORMED));
        }
        verify_mac(&self.recv_mac, &[header_bytes.as_slice(), message], tag).map_err(crypto_status)?;

        self.accept_seq(&header);
        Ok(())
    }
}

pub(super) fn entropy_status(err: EntropyError) -> StatusCode {
    tracing::error!(%err, "refusing to continue without fresh nonce");
    StatusCode::new(MajorStatus::Failure, minor::NO_ENTROPY)
}

pub(super) fn crypto_status(err: CryptoError) -> StatusCode {
    if err.is_authentication_failure() {
        StatusCode::from(MajorStatus::BadMic)
    } else {
        StatusCode::from(MajorStatus::Failure)
    }
}
