//! Session orchestrator.
//!
//! One session performs exactly one protected exchange over one connection:
//!
//! ```text
//! Idle ──connect──> Connected ──> Negotiating ──> Authenticated
//!                                                      │
//!         Closed <── Verifying <── Protecting <────────┘
//!
//! any failure ──> Aborted
//! ```
//!
//! The context is released and the connection closed on every exit path.
//! Nothing is retried: the handshake depends on exact round alternation with
//! the peer, so the first error ends the session.

use std::fmt;

use tokenseal_core::{
    ContextFlags, ContextInfo, Negotiator, SecurityContext, SecurityProvider, protect, verify,
};

use crate::{
    config::{SessionConfig, SessionRequest},
    connector::{Channel, Connector},
    error::SessionError,
};

/// Where a session is in its single exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not started.
    Idle,
    /// Connection open, no context yet.
    Connected,
    /// Exchanging context tokens.
    Negotiating,
    /// Context established.
    Authenticated,
    /// Wrapping and sending the message.
    Protecting,
    /// Waiting for and checking the signature block.
    Verifying,
    /// Finished successfully.
    Closed,
    /// Ended by a failure.
    Aborted,
}

impl SessionState {
    /// True once the session can make no further progress.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Aborted)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Connected => "connected",
            Self::Negotiating => "negotiating",
            Self::Authenticated => "authenticated",
            Self::Protecting => "protecting",
            Self::Verifying => "verifying",
            Self::Closed => "closed",
            Self::Aborted => "aborted",
        })
    }
}

/// Result of a successful session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Flags granted by the peer.
    pub granted: ContextFlags,
    /// Whether the message was actually encrypted.
    pub was_confidential: bool,
    /// Context attributes reported after establishment.
    pub context: ContextInfo,
}

/// Drives one request/response exchange.
pub struct Session<C: Connector, P: SecurityProvider> {
    config: SessionConfig,
    request: SessionRequest,
    connector: C,
    provider: P,
    state: SessionState,
}

impl<C: Connector, P: SecurityProvider> Session<C, P> {
    /// Session that will dial with `connector` and negotiate with `provider`.
    pub fn new(config: SessionConfig, request: SessionRequest, connector: C, provider: P) -> Self {
        Self { config, request, connector, provider, state: SessionState::Idle }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The connector.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// The provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Run the exchange to completion.
    ///
    /// Ends in [`SessionState::Closed`] on success and
    /// [`SessionState::Aborted`] on the first failure. A session runs once;
    /// later calls fail without touching the network.
    pub fn run(&mut self) -> Result<SessionOutcome, SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::AlreadyRun { state: self.state });
        }

        let result = self.connect_and_exchange();
        self.state = match &result {
            Ok(_) => SessionState::Closed,
            Err(err) => {
                tracing::debug!(state = %self.state, %err, "session aborted");
                SessionState::Aborted
            },
        };
        result
    }

    fn connect_and_exchange(&mut self) -> Result<SessionOutcome, SessionError> {
        let addr = self.config.addr();
        let mut channel = self
            .connector
            .connect(&self.config)
            .map_err(|source| SessionError::Connect { addr: addr.clone(), source })?;
        self.state = SessionState::Connected;
        tracing::debug!(%addr, "connection open");

        let result = exchange(
            &mut channel,
            &mut self.provider,
            &mut self.state,
            &self.config,
            &self.request,
        );

        if let Err(err) = channel.close() {
            tracing::debug!(%addr, %err, "closing connection");
        }
        result
    }
}

impl<C: Connector, P: SecurityProvider> fmt::Debug for Session<C, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("request", &self.request)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

fn exchange<Ch: Channel, P: SecurityProvider>(
    channel: &mut Ch,
    provider: &mut P,
    state: &mut SessionState,
    config: &SessionConfig,
    request: &SessionRequest,
) -> Result<SessionOutcome, SessionError> {
    *state = SessionState::Negotiating;
    let (mut context, granted) = Negotiator::new(config.max_rounds).establish(
        channel,
        provider,
        &request.service,
        request.flags,
        request.mechanism.as_ref(),
    )?;
    *state = SessionState::Authenticated;
    tracing::info!(%granted, "context flags");

    let info = describe(&context)?;
    let payload = request.payload.load()?;

    *state = SessionState::Protecting;
    let (token, was_confidential) = protect(&mut context, &payload, request.seal)?;
    channel
        .send_token(&token)
        .map_err(|source| SessionError::Transport { operation: "sending wrapped message", source })?;

    *state = SessionState::Verifying;
    let signature = channel
        .recv_token()
        .map_err(|source| SessionError::Transport { operation: "receiving signature block", source })?;
    verify(&mut context, &payload, &signature)?;
    tracing::info!("signature verified");

    context.release();
    Ok(SessionOutcome { granted, was_confidential, context: info })
}

/// Inquire the established context and the name types of its mechanism.
fn describe<P: SecurityProvider>(context: &SecurityContext<'_, P>) -> Result<ContextInfo, SessionError> {
    let info = context
        .inquire()
        .map_err(|status| SessionError::Inquire { operation: "inquiring context", status })?;

    let lifetime_secs = info
        .expires_at
        .map(|expires_at| expires_at.saturating_duration_since(std::time::Instant::now()).as_secs());
    tracing::info!(
        initiator = %info.initiator,
        acceptor = %info.acceptor,
        ?lifetime_secs,
        flags = %info.flags,
        locally_initiated = info.locally_initiated,
        open = info.open,
        "context established"
    );

    let names = context
        .names_for_mech(&info.mechanism)
        .map_err(|status| SessionError::Inquire { operation: "inquiring mech names", status })?;
    tracing::info!(mechanism = %info.mechanism, count = names.len(), "mechanism name types");
    for (index, name) in names.iter().enumerate() {
        tracing::debug!(index, name_type = %name, "supported name type");
    }

    Ok(info)
}
