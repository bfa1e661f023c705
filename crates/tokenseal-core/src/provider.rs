//! Security provider seam.
//!
//! A provider is the opaque mechanism behind the protocol engine: it imports
//! names, produces and consumes context-establishment tokens, and wraps and
//! verifies messages. The negotiator and protector only ever see the types in
//! this module, so a mechanism can be swapped (or mocked) without touching
//! them.

use std::{fmt, time::Instant};

use tokenseal_proto::{ContextFlags, Oid, Token};

use crate::status::StatusCode;

/// Outcome of one context-establishment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// The context is fully established. There may still be a final output
    /// token to deliver to the peer.
    Complete,
    /// The peer will send another token that must be fed into the next step.
    ContinueNeeded,
    /// The step failed; the handshake cannot continue.
    Failure(StatusCode),
}

/// Result of one context-establishment step.
///
/// # Invariants
///
/// - `output` is non-empty if and only if the peer expects a token from us
/// - `status` is `ContinueNeeded` if and only if the peer will send us a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextStep {
    /// Step outcome.
    pub status: StepStatus,
    /// Token to send to the peer (empty when there is nothing to send).
    pub output: Token,
    /// Flags granted so far. Final once `status` is `Complete`.
    pub granted: ContextFlags,
}

impl ContextStep {
    /// A failed step with no output.
    pub fn failure(status: impl Into<StatusCode>) -> Self {
        Self {
            status: StepStatus::Failure(status.into()),
            output: Token::empty(),
            granted: ContextFlags::empty(),
        }
    }
}

/// A wrapped message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wrapped {
    /// The protected token.
    pub token: Token,
    /// Whether the mechanism actually encrypted the payload.
    pub confidential: bool,
}

/// Attributes of a context, as reported by [`SecurityProvider::inquire`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextInfo {
    /// Display name of the initiator.
    pub initiator: String,
    /// Display name of the acceptor.
    pub acceptor: String,
    /// Mechanism in use.
    pub mechanism: Oid,
    /// Flags in effect.
    pub flags: ContextFlags,
    /// When the context stops protecting messages, if it expires.
    pub expires_at: Option<Instant>,
    /// True if this side initiated the context.
    pub locally_initiated: bool,
    /// True once the context is fully established.
    pub open: bool,
}

/// A security mechanism.
///
/// Methods take `&mut self` so that implementations may keep per-provider
/// state (counters, call logs in mocks).
pub trait SecurityProvider {
    /// Imported target name.
    type Name: fmt::Display;

    /// Per-context mechanism state.
    type Context;

    /// Import a host-based service name (`service@host`).
    fn import_name(&mut self, name: &str) -> Result<Self::Name, StatusCode>;

    /// Run one context-initialization step.
    ///
    /// `context` is `None` on the first call; the provider creates it. On
    /// later calls it is refined in place. `input` is the token most recently
    /// received from the peer (`None` on the first call).
    fn init_step(
        &mut self,
        context: &mut Option<Self::Context>,
        target: &Self::Name,
        mechanism: Option<&Oid>,
        flags: ContextFlags,
        input: Option<&[u8]>,
    ) -> ContextStep;

    /// Produce a protected token for `message`.
    fn wrap(
        &mut self,
        context: &mut Self::Context,
        message: &[u8],
        confidential: bool,
    ) -> Result<Wrapped, StatusCode>;

    /// Verify a detached integrity token over `message`.
    fn verify_mic(
        &mut self,
        context: &mut Self::Context,
        message: &[u8],
        token: &[u8],
    ) -> Result<(), StatusCode>;

    /// Report context attributes.
    fn inquire(&self, context: &Self::Context) -> Result<ContextInfo, StatusCode>;

    /// Name types supported by `mechanism`.
    fn names_for_mech(&self, mechanism: &Oid) -> Result<Vec<Oid>, StatusCode>;

    /// Destroy a context.
    fn release(&mut self, context: Self::Context);
}
