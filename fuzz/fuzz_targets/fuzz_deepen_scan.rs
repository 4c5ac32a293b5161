//! Fuzz target for the shallow-clone request scan.
//!
//! Tests that deepen detection handles arbitrary sniffed prefixes without
//! panicking, whatever mix of valid and malformed pkt-lines they contain.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = packhorse_git::scan_deepen(data);
});
