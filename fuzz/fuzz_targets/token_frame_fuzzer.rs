//! Fuzz target for length-prefixed token framing
//!
//! Prevent oversized allocations and misframed reads from a hostile peer
//!
//! # Strategy
//!
//! - Raw streams: arbitrary bytes read as a sequence of frames
//! - Bounds: arbitrary receive bound, including zero
//!
//! # Invariants
//!
//! - A declared length above the bound is rejected without reading payload
//! - An accepted token is exactly the declared number of bytes after the
//!   prefix
//! - Re-framing an accepted non-empty token reproduces the input bytes
//! - NEVER panic on any input

#![no_main]

use std::io::Cursor;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tokenseal_proto::{LENGTH_PREFIX_SIZE, TransportError, recv_token_bounded, send_token};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    max_len: u16,
    stream: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let max_len = u32::from(input.max_len);
    let mut cursor = Cursor::new(input.stream.as_slice());

    loop {
        let start = cursor.position() as usize;
        match recv_token_bounded(&mut cursor, max_len) {
            Ok(token) => {
                let end = cursor.position() as usize;
                assert!(token.len() as u32 <= max_len);
                assert_eq!(end - start, LENGTH_PREFIX_SIZE + token.len());
                assert_eq!(token.as_bytes(), &input.stream[start + LENGTH_PREFIX_SIZE..end]);

                if !token.is_empty() {
                    let mut reframed = Vec::new();
                    send_token(&mut reframed, &token).expect("in-memory write");
                    assert_eq!(reframed.as_slice(), &input.stream[start..end]);
                }
            },
            Err(TransportError::Oversized { declared, max }) => {
                assert!(declared > max);
                assert_eq!(cursor.position() as usize, start + LENGTH_PREFIX_SIZE);
                break;
            },
            Err(TransportError::Io(_)) => break,
            Err(TransportError::EmptyToken) => panic!("receive never reports EmptyToken"),
        }
    }
});
