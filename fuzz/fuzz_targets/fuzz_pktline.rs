//! Fuzz target for Git pkt-line protocol parsing.
//!
//! Feeds arbitrary bytes through the pkt-line reader and re-encodes every
//! frame it recovers, checking that decode and encode agree on the frame
//! length. Malformed input must error out, never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let mut reader = packhorse_git::PktLineReader::new(Cursor::new(data));

    // Bound the walk so crafted input cannot spin forever.
    for _ in 0..100 {
        match reader.read() {
            Ok(Some(pkt)) => {
                let encoded = pkt.encode();
                match pkt.data() {
                    Some(payload) => assert_eq!(encoded.len(), payload.len() + 4),
                    None => assert_eq!(encoded.len(), 4),
                }
            }
            Ok(None) => break,
            Err(_) => break,
        }
    }
});
