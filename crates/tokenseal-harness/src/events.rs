//! Shared record of what a mock provider and a mock channel did, in order.

use std::sync::{Arc, Mutex, PoisonError};

use tokenseal_core::{StepStatus, Token};

/// One observable action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The provider finished a context step.
    Step {
        /// Reported status
        status: StepStatus,
        /// Output token produced
        output: Token,
    },
    /// A token went out on the channel.
    Sent(Token),
    /// A token was delivered from the channel.
    Received(Token),
    /// The provider wrapped a message.
    Wrap,
    /// The provider verified a MIC.
    VerifyMic,
    /// The provider released a context.
    Release,
    /// The channel was closed.
    Closed,
}

/// Append-only event log, shared by clones.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn record(&self, event: Event) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }

    /// Copy of everything recorded so far.
    pub fn snapshot(&self) -> Vec<Event> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of recorded events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.snapshot().iter().filter(|event| predicate(event)).count()
    }
}
