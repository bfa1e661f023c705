//! In-memory channel with a pre-loaded inbound queue.

use std::{collections::VecDeque, io};

use tokenseal_client::{Channel, Connector, SessionConfig};
use tokenseal_core::Token;
use tokenseal_proto::{TokenTransport, TransportError};

use crate::events::{Event, EventLog};

/// Channel that delivers queued tokens and records everything sent.
///
/// Receiving from an empty queue fails like a peer that hung up.
#[derive(Debug)]
pub struct MemoryChannel {
    inbound: VecDeque<Token>,
    events: EventLog,
    closed: bool,
}

impl MemoryChannel {
    /// Channel that will deliver `inbound` in order.
    pub fn new(inbound: impl IntoIterator<Item = Token>, events: EventLog) -> Self {
        Self {
            inbound: inbound.into_iter().collect(),
            events,
            closed: false,
        }
    }

    /// Tokens not yet delivered.
    pub fn pending(&self) -> usize {
        self.inbound.len()
    }

    fn check_open(&self) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Io(io::Error::from(io::ErrorKind::NotConnected)));
        }
        Ok(())
    }
}

impl TokenTransport for MemoryChannel {
    fn send_token(&mut self, token: &[u8]) -> Result<(), TransportError> {
        self.check_open()?;
        if token.is_empty() {
            return Err(TransportError::EmptyToken);
        }
        self.events.record(Event::Sent(Token::from(token.to_vec())));
        Ok(())
    }

    fn recv_token(&mut self) -> Result<Token, TransportError> {
        self.check_open()?;
        let token = self
            .inbound
            .pop_front()
            .ok_or_else(|| TransportError::Io(io::Error::from(io::ErrorKind::UnexpectedEof)))?;
        self.events.record(Event::Received(token.clone()));
        Ok(token)
    }
}

impl Channel for MemoryChannel {
    fn close(&mut self) -> io::Result<()> {
        if !self.closed {
            self.closed = true;
            self.events.record(Event::Closed);
        }
        Ok(())
    }
}

/// Connector handing out [`MemoryChannel`]s.
#[derive(Debug)]
pub struct MemoryConnector {
    inbound: Vec<Token>,
    events: EventLog,
    refuse: bool,
    connects: usize,
}

impl MemoryConnector {
    /// Connector whose channels deliver `inbound`.
    pub fn new(inbound: impl IntoIterator<Item = Token>, events: EventLog) -> Self {
        Self {
            inbound: inbound.into_iter().collect(),
            events,
            refuse: false,
            connects: 0,
        }
    }

    /// Connector that refuses every connection.
    pub fn refusing(events: EventLog) -> Self {
        Self { refuse: true, ..Self::new([], events) }
    }

    /// Connection attempts so far.
    pub fn connects(&self) -> usize {
        self.connects
    }
}

impl Connector for MemoryConnector {
    type Channel = MemoryChannel;

    fn connect(&mut self, _config: &SessionConfig) -> io::Result<MemoryChannel> {
        self.connects += 1;
        if self.refuse {
            return Err(io::Error::from(io::ErrorKind::ConnectionRefused));
        }
        Ok(MemoryChannel::new(self.inbound.clone(), self.events.clone()))
    }
}
