//! Context-establishment loop.
//!
//! # Protocol Flow
//!
//! ```text
//! import_name(target)
//! loop (at most max_rounds):
//!     step = init_step(ctx, target, flags | REPLAY, inbound)
//!     if step.output non-empty: send it
//!     Failure        -> release ctx, error
//!     ContinueNeeded -> inbound = recv (not in the last round)
//!     Complete       -> done
//! ```
//!
//! The provider guarantees that the output token is non-empty exactly when
//! the peer expects one from us, and that `ContinueNeeded` is returned exactly
//! when the peer will send one back. The loop relies on both: it never sends
//! an empty token and never receives after `Complete`.

use tokenseal_proto::{ContextFlags, Oid, Token, TokenTransport};

use crate::{
    context::SecurityContext,
    error::NegotiationError,
    provider::{SecurityProvider, StepStatus},
};

/// Default bound on context-establishment rounds.
pub const DEFAULT_MAX_ROUNDS: usize = 100;

/// Drives a [`SecurityProvider`] through context establishment.
#[derive(Debug, Clone, Copy)]
pub struct Negotiator {
    max_rounds: usize,
}

impl Default for Negotiator {
    fn default() -> Self {
        Self { max_rounds: DEFAULT_MAX_ROUNDS }
    }
}

impl Negotiator {
    /// Negotiator that gives up after `max_rounds` provider steps.
    pub fn new(max_rounds: usize) -> Self {
        Self { max_rounds }
    }

    /// The configured round bound.
    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Establish a context with `target_name` over `transport`.
    ///
    /// Replay detection is always requested in addition to `requested`. The
    /// returned flags may be a strict subset of what was requested; a
    /// downgrade is logged but is not an error.
    ///
    /// On any failure the partially built context is released before the
    /// error is returned.
    pub fn establish<'p, P, T>(
        &self,
        transport: &mut T,
        provider: &'p mut P,
        target_name: &str,
        requested: ContextFlags,
        mechanism: Option<&Oid>,
    ) -> Result<(SecurityContext<'p, P>, ContextFlags), NegotiationError>
    where
        P: SecurityProvider,
        T: TokenTransport + ?Sized,
    {
        let target = provider.import_name(target_name).map_err(NegotiationError::BadName)?;
        let flags = requested | ContextFlags::REPLAY;

        tracing::debug!(%target, %flags, ?mechanism, "establishing security context");

        let mut context = SecurityContext::new(provider);
        let mut inbound: Option<Token> = None;

        for round in 1..=self.max_rounds {
            let input = inbound.take();
            let step = context.init_step(&target, mechanism, flags, input.as_deref());

            tracing::debug!(
                round,
                status = ?step.status,
                output_len = step.output.len(),
                "init_sec_context step"
            );

            if !step.output.is_empty() {
                tracing::trace!(token = %hex::encode(&step.output), "sending context token");
                transport.send_token(&step.output)?;
            }

            match step.status {
                StepStatus::Failure(status) => {
                    context.release();
                    return Err(NegotiationError::ProviderRejected(status));
                },
                StepStatus::ContinueNeeded if round == self.max_rounds => break,
                StepStatus::ContinueNeeded => {
                    let token = transport.recv_token()?;
                    tracing::trace!(token = %hex::encode(&token), "received context token");
                    inbound = Some(token);
                },
                StepStatus::Complete => {
                    let granted = step.granted;
                    let missing = granted.missing_from(flags);
                    if !missing.is_empty() {
                        tracing::warn!(%missing, %granted, "context established without requested flags");
                    }

                    tracing::debug!(rounds = round, %granted, "security context established");
                    context.mark_open(granted);
                    return Ok((context, granted));
                },
            }
        }

        tracing::warn!(max_rounds = self.max_rounds, "context not established within round bound");
        context.release();
        Err(NegotiationError::TooManyRounds { max: self.max_rounds })
    }
}

/// Establish a context using the default round bound.
pub fn establish_context<'p, P, T>(
    transport: &mut T,
    provider: &'p mut P,
    target_name: &str,
    requested: ContextFlags,
    mechanism: Option<&Oid>,
) -> Result<(SecurityContext<'p, P>, ContextFlags), NegotiationError>
where
    P: SecurityProvider,
    T: TokenTransport + ?Sized,
{
    Negotiator::default().establish(transport, provider, target_name, requested, mechanism)
}
