//! Fuzz target for PSK per-message tokens
//!
//! Prevent forged, replayed or reflected tokens from being accepted
//!
//! # Strategy
//!
//! - Garbage: arbitrary bytes presented as wrap and MIC tokens
//! - Tampering: genuine tokens with one byte flipped
//! - Interleaving: garbage between genuine tokens
//!
//! # Invariants
//!
//! - Arbitrary bytes never unwrap or verify
//! - A tampered token never unwraps
//! - Rejected tokens do not consume sequence numbers: genuine tokens sent
//!   afterwards still verify
//! - NEVER panic on any input

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tokenseal_core::{
    ContextFlags, Oid, SecurityProvider, StepStatus,
    psk::{PskAcceptor, PskConfig, PskContext, PskProvider},
};
use tokenseal_harness::SimEnv;

const SERVICE: &str = "sign@server.example";
const KEY: [u8; 32] = [0x17; 32];

#[derive(Debug, Arbitrary)]
enum Action {
    /// Present raw bytes to the acceptor as a wrap token.
    GarbageWrap(Vec<u8>),
    /// Present raw bytes to the initiator as a MIC over `message`.
    GarbageMic { message: Vec<u8>, token: Vec<u8> },
    /// Wrap `message`, flip one byte, and present it to the acceptor.
    TamperedWrap { message: Vec<u8>, seal: bool, index: usize, xor: u8 },
    /// Exchange a genuine wrap and MIC.
    Genuine { message: Vec<u8>, seal: bool },
}

struct Pair {
    initiator: PskProvider<SimEnv>,
    acceptor: PskAcceptor<SimEnv>,
    client: PskContext,
    server: PskContext,
}

fn handshake() -> Pair {
    let mut initiator =
        PskProvider::new(SimEnv::with_seed(3), PskConfig::new(KEY, "client").expect("valid key"));
    let mut acceptor = PskAcceptor::new(
        SimEnv::with_seed(4),
        PskConfig::new(KEY, SERVICE).expect("valid key"),
    )
    .expect("valid service name");

    let target = initiator.import_name(SERVICE).expect("valid target");
    let flags = ContextFlags::CONF | ContextFlags::MUTUAL;
    let (mut client, mut server) = (None, None);

    let hello = initiator.init_step(&mut client, &target, Some(&Oid::PSK), flags, None);
    let reply = acceptor.accept_step(&mut server, &hello.output);
    let finish = initiator.init_step(&mut client, &target, Some(&Oid::PSK), flags, Some(&reply.output));
    assert_eq!(finish.status, StepStatus::Complete);
    let done = acceptor.accept_step(&mut server, &finish.output);
    assert_eq!(done.status, StepStatus::Complete);

    Pair {
        initiator,
        acceptor,
        client: client.expect("initiator context"),
        server: server.expect("acceptor context"),
    }
}

fuzz_target!(|actions: Vec<Action>| {
    let mut pair = handshake();

    for action in actions {
        match action {
            Action::GarbageWrap(token) => {
                assert!(pair.acceptor.unwrap(&mut pair.server, &token).is_err());
            },
            Action::GarbageMic { message, token } => {
                assert!(pair.initiator.verify_mic(&mut pair.client, &message, &token).is_err());
            },
            Action::TamperedWrap { message, seal, index, xor } => {
                if xor == 0 {
                    continue;
                }
                let wrapped = pair.initiator.wrap(&mut pair.client, &message, seal).expect("wrap");
                let mut token = wrapped.token.to_vec();
                let index = index % token.len();
                token[index] ^= xor;
                assert!(pair.acceptor.unwrap(&mut pair.server, &token).is_err());
            },
            Action::Genuine { message, seal } => {
                let wrapped = pair.initiator.wrap(&mut pair.client, &message, seal).expect("wrap");
                let (plaintext, confidential) =
                    pair.acceptor.unwrap(&mut pair.server, &wrapped.token).expect("genuine unwrap");
                assert_eq!(plaintext, message);
                assert_eq!(confidential, seal);

                let mic = pair.acceptor.get_mic(&mut pair.server, &message).expect("mic");
                pair.initiator.verify_mic(&mut pair.client, &message, &mic).expect("genuine mic");
            },
        }
    }
});
