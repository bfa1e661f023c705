//! Deterministic test support for tokenseal.
//!
//! Protocol logic in `tokenseal-core` and `tokenseal-client` is written
//! against the `Environment`, `SecurityProvider`, `TokenTransport` and
//! `Connector` seams. This crate supplies test implementations of each:
//!
//! - [`SimEnv`]: seeded randomness and a manual clock
//! - [`ScriptedProvider`]: plays back a fixed list of context steps
//! - [`MemoryConnector`] / [`MemoryChannel`]: in-memory channels with a
//!   pre-loaded inbound queue
//! - [`EventLog`]: ordered record of provider and channel actions, for
//!   asserting cleanup and the no-empty-token rule
//! - [`MockPeer`] / [`PskPeer`]: loopback TCP servers on a background thread
//! - [`PskLink`]: socket-free loopback into a real PSK acceptor
//!
//! Given the same seed, a PSK session produces byte-identical tokens.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod events;
mod link;
mod memory;
mod peer;
mod scripted;
mod sim_env;

pub use events::{Event, EventLog};
pub use link::PskLink;
pub use memory::{MemoryChannel, MemoryConnector};
pub use peer::{MockPeer, MockPeerScript, PeerError, PeerHandle, PeerReport, PskPeer};
pub use scripted::{ScriptStep, ScriptedContext, ScriptedProvider, mock_mic, mock_unwrap};
pub use sim_env::SimEnv;
