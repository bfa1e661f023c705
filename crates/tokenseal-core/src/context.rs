//! Security context lifecycle.
//!
//! ```text
//! NotCreated ──init_step──> Negotiating ──Complete──> Open ──release──> Closed
//!      │                         │                                       ▲
//!      └─────────────────────────┴──────────── release / drop ───────────┘
//! ```
//!
//! [`SecurityContext`] owns the provider's context handle for the whole
//! session. Releasing is idempotent and also happens on drop, so every exit
//! path (success, early return, `?`) destroys the provider state exactly once.

use std::fmt;

use tokenseal_proto::{ContextFlags, Oid};

use crate::{
    provider::{ContextInfo, ContextStep, SecurityProvider},
    status::{MajorStatus, StatusCode},
};

/// Lifecycle state of a security context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// No provider context exists yet.
    NotCreated,
    /// Token exchange in progress.
    Negotiating,
    /// Established; message protection is allowed.
    Open,
    /// Released; no further use.
    Closed,
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotCreated => "not created",
            Self::Negotiating => "negotiating",
            Self::Open => "open",
            Self::Closed => "closed",
        })
    }
}

/// A provider context bound to the provider that created it.
pub struct SecurityContext<'p, P: SecurityProvider> {
    provider: &'p mut P,
    handle: Option<P::Context>,
    state: ContextState,
    granted: ContextFlags,
}

impl<'p, P: SecurityProvider> SecurityContext<'p, P> {
    /// A context that has not been created yet.
    pub fn new(provider: &'p mut P) -> Self {
        Self { provider, handle: None, state: ContextState::NotCreated, granted: ContextFlags::empty() }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ContextState {
        self.state
    }

    /// True if message protection is allowed.
    pub fn is_open(&self) -> bool {
        self.state == ContextState::Open
    }

    /// Flags granted at establishment (empty until open).
    pub fn granted_flags(&self) -> ContextFlags {
        self.granted
    }

    /// Run one initialization step, creating the provider context on the
    /// first call.
    pub(crate) fn init_step(
        &mut self,
        target: &P::Name,
        mechanism: Option<&Oid>,
        flags: ContextFlags,
        input: Option<&[u8]>,
    ) -> ContextStep {
        let step = self.provider.init_step(&mut self.handle, target, mechanism, flags, input);
        if self.handle.is_some() && self.state == ContextState::NotCreated {
            self.state = ContextState::Negotiating;
        }
        step
    }

    /// Mark the context established.
    pub(crate) fn mark_open(&mut self, granted: ContextFlags) {
        self.state = ContextState::Open;
        self.granted = granted;
    }

    /// Provider and handle, for message operations.
    pub(crate) fn parts_mut(&mut self) -> Option<(&mut P, &mut P::Context)> {
        let handle = self.handle.as_mut()?;
        Some((&mut *self.provider, handle))
    }

    /// Report context attributes.
    pub fn inquire(&self) -> Result<ContextInfo, StatusCode> {
        let handle = self.handle.as_ref().ok_or(StatusCode::from(MajorStatus::NoContext))?;
        self.provider.inquire(handle)
    }

    /// Name types supported by `mechanism`.
    pub fn names_for_mech(&self, mechanism: &Oid) -> Result<Vec<Oid>, StatusCode> {
        self.provider.names_for_mech(mechanism)
    }

    /// Destroy the provider context.
    ///
    /// Idempotent. Releasing a context that was never created only marks it
    /// closed.
    pub fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.provider.release(handle);
            tracing::debug!(state = %self.state, "security context released");
        }
        self.state = ContextState::Closed;
    }
}

impl<P: SecurityProvider> Drop for SecurityContext<'_, P> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<P: SecurityProvider> fmt::Debug for SecurityContext<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityContext")
            .field("state", &self.state)
            .field("granted", &self.granted)
            .field("has_handle", &self.handle.is_some())
            .finish_non_exhaustive()
    }
}
