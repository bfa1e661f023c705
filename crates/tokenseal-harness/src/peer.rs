//! In-process server peers on loopback TCP.
//!
//! Each peer binds `127.0.0.1:0`, accepts exactly one connection on a
//! background thread and plays the server side of one session:
//!
//! ```text
//! handshake tokens (peer-specific) -> recv wrapped message -> send MIC
//! ```
//!
//! [`PeerHandle::join`] returns what the peer observed.

use std::{
    io,
    net::{SocketAddr, TcpListener},
    thread::{self, JoinHandle},
};

use tokenseal_core::{StepStatus, Token, psk::PskAcceptor};
use tokenseal_proto::{Framed, TokenTransport, TransportError};

use crate::{
    scripted::{mock_mic, mock_unwrap},
    sim_env::SimEnv,
};

/// What a peer saw during its session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerReport {
    /// Context tokens received from the client.
    pub handshake_tokens: Vec<Token>,
    /// Plaintext recovered from the wrapped message.
    pub message: Vec<u8>,
    /// Whether the wrapped message had been encrypted.
    pub confidential: bool,
}

/// Errors a peer thread can end with.
#[derive(Debug)]
pub enum PeerError {
    /// Socket setup or accept failed.
    Io(io::Error),
    /// A token exchange failed.
    Transport(TransportError),
    /// The client sent something the peer could not accept.
    Protocol(String),
    /// The peer thread panicked.
    Panicked,
}

impl From<io::Error> for PeerError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<TransportError> for PeerError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

/// A running peer.
#[derive(Debug)]
pub struct PeerHandle {
    addr: SocketAddr,
    thread: JoinHandle<Result<PeerReport, PeerError>>,
}

impl PeerHandle {
    /// Address the peer listens on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Port the peer listens on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Wait for the peer to finish its session.
    pub fn join(self) -> Result<PeerReport, PeerError> {
        self.thread.join().map_err(|_| PeerError::Panicked)?
    }
}

fn spawn_peer<F>(serve: F) -> io::Result<PeerHandle>
where
    F: FnOnce(&mut Framed<std::net::TcpStream>) -> Result<PeerReport, PeerError> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;

    let thread = thread::spawn(move || {
        let (stream, client) = listener.accept()?;
        tracing::debug!(%client, "peer accepted connection");
        let mut framed = Framed::new(stream);
        serve(&mut framed)
    });

    Ok(PeerHandle { addr, thread })
}

/// How a scripted peer answers the handshake.
#[derive(Debug, Clone, Default)]
pub struct MockPeerScript {
    /// One reply per client token that expects an answer.
    pub replies: Vec<Vec<u8>>,
    /// Whether the client sends a final token that gets no reply.
    pub final_token: bool,
    /// Corrupt the MIC sent back.
    pub corrupt_mic: bool,
}

/// Peer for sessions driven by [`ScriptedProvider`](crate::ScriptedProvider).
#[derive(Debug)]
pub struct MockPeer;

impl MockPeer {
    /// Start a peer that follows `script`.
    pub fn spawn(script: MockPeerScript) -> io::Result<PeerHandle> {
        spawn_peer(move |framed| {
            let mut report = PeerReport::default();

            for reply in &script.replies {
                report.handshake_tokens.push(framed.recv_token()?);
                framed.send_token(reply)?;
            }
            if script.final_token {
                report.handshake_tokens.push(framed.recv_token()?);
            }

            let wrapped = framed.recv_token()?;
            let (message, confidential) = mock_unwrap(&wrapped)
                .ok_or_else(|| PeerError::Protocol("wrapped message is malformed".to_string()))?;

            let mut mic = mock_mic(&message).to_vec();
            if script.corrupt_mic {
                mic.push(0);
            }
            framed.send_token(&mic)?;

            report.message = message;
            report.confidential = confidential;
            Ok(report)
        })
    }
}

/// Peer running the real PSK acceptor.
#[derive(Debug)]
pub struct PskPeer;

impl PskPeer {
    /// Start a peer that accepts with `acceptor`.
    pub fn spawn(mut acceptor: PskAcceptor<SimEnv>) -> io::Result<PeerHandle> {
        spawn_peer(move |framed| {
            let mut report = PeerReport::default();
            let mut context = None;

            loop {
                let token = framed.recv_token()?;
                report.handshake_tokens.push(token.clone());

                let step = acceptor.accept_step(&mut context, &token);
                if !step.output.is_empty() {
                    framed.send_token(&step.output)?;
                }
                match step.status {
                    StepStatus::ContinueNeeded => {},
                    StepStatus::Complete => break,
                    StepStatus::Failure(status) => {
                        return Err(PeerError::Protocol(format!("accepting context: {status}")));
                    },
                }
            }

            let mut context = context
                .ok_or_else(|| PeerError::Protocol("no context after handshake".to_string()))?;

            let wrapped = framed.recv_token()?;
            let (message, confidential) = acceptor
                .unwrap(&mut context, &wrapped)
                .map_err(|status| PeerError::Protocol(format!("unsealing message: {status}")))?;

            let mic = acceptor
                .get_mic(&mut context, &message)
                .map_err(|status| PeerError::Protocol(format!("signing message: {status}")))?;
            framed.send_token(&mic)?;

            report.message = message;
            report.confidential = confidential;
            Ok(report)
        })
    }
}
