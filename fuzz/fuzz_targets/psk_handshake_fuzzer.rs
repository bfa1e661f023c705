//! Fuzz target for the PSK context-establishment handshake
//!
//! Prevent authentication bypass through malformed or forged handshake tokens
//!
//! # Strategy
//!
//! - Acceptor input: arbitrary hello followed by an arbitrary finish
//! - Initiator input: a genuine hello answered by an arbitrary or mutated
//!   reply
//!
//! # Invariants
//!
//! - A failed step never carries an output token
//! - `ContinueNeeded` always carries an output token
//! - Neither side completes without a proof computed from the shared key
//! - Delegation is never granted
//! - NEVER panic on any input

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tokenseal_core::{
    ContextFlags, ContextStep, Oid, SecurityProvider, StepStatus,
    psk::{PskAcceptor, PskConfig, PskProvider},
};
use tokenseal_harness::SimEnv;

const SERVICE: &str = "sign@server.example";
const KEY: [u8; 32] = [0x42; 32];

#[derive(Debug, Arbitrary)]
enum FuzzInput {
    /// Feed raw tokens to the acceptor.
    Acceptor { hello: Vec<u8>, finish: Vec<u8> },
    /// Answer a genuine hello with raw bytes.
    ForgedReply { flags: u32, reply: Vec<u8> },
    /// Answer a genuine hello with a genuine reply that has one byte flipped.
    MutatedReply { flags: u32, index: usize, xor: u8 },
}

fn check_step(step: &ContextStep) {
    match step.status {
        StepStatus::Failure(_) => assert!(step.output.is_empty()),
        StepStatus::ContinueNeeded => assert!(!step.output.is_empty()),
        StepStatus::Complete => assert!(!step.granted.contains(ContextFlags::DELEG)),
    }
}

fuzz_target!(|input: FuzzInput| {
    let acceptor_config = PskConfig::new(KEY, SERVICE).expect("valid key");
    let mut acceptor =
        PskAcceptor::new(SimEnv::with_seed(1), acceptor_config).expect("valid service name");
    let mut acceptor_ctx = None;

    match input {
        FuzzInput::Acceptor { hello, finish } => {
            let reply = acceptor.accept_step(&mut acceptor_ctx, &hello);
            check_step(&reply);
            assert_ne!(reply.status, StepStatus::Complete);

            if reply.status == StepStatus::ContinueNeeded {
                let done = acceptor.accept_step(&mut acceptor_ctx, &finish);
                check_step(&done);
                assert_ne!(done.status, StepStatus::Complete, "forged finish accepted");
            }
        },
        FuzzInput::ForgedReply { flags, reply } => {
            let mut initiator = initiator();
            let target = initiator.import_name(SERVICE).expect("valid target");
            let flags = ContextFlags::from_bits_truncate(flags);
            let mut ctx = None;

            let hello = initiator.init_step(&mut ctx, &target, Some(&Oid::PSK), flags, None);
            check_step(&hello);

            let step = initiator.init_step(&mut ctx, &target, Some(&Oid::PSK), flags, Some(&reply));
            check_step(&step);
            assert_ne!(step.status, StepStatus::Complete, "forged reply accepted");
        },
        FuzzInput::MutatedReply { flags, index, xor } => {
            let mut initiator = initiator();
            let target = initiator.import_name(SERVICE).expect("valid target");
            let flags = ContextFlags::from_bits_truncate(flags);
            let mut ctx = None;

            let hello = initiator.init_step(&mut ctx, &target, Some(&Oid::PSK), flags, None);
            let reply = acceptor.accept_step(&mut acceptor_ctx, &hello.output);
            assert_eq!(reply.status, StepStatus::ContinueNeeded);

            let mut mutated = reply.output.to_vec();
            let index = index % mutated.len();
            mutated[index] ^= xor;

            let step =
                initiator.init_step(&mut ctx, &target, Some(&Oid::PSK), flags, Some(&mutated));
            check_step(&step);
            if xor == 0 {
                assert_eq!(step.status, StepStatus::Complete);
            }
        },
    }
});

fn initiator() -> PskProvider<SimEnv> {
    let config = PskConfig::new(KEY, "client@workstation").expect("valid key");
    PskProvider::new(SimEnv::with_seed(2), config)
}
