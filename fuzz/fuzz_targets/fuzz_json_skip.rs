//! Fuzz target: `json::skip_value`
//!
//! A skipped value never extends past the input.
//!
//! cargo fuzz run fuzz_json_skip

#![no_main]

use hapstack::json::skip_value;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(n) = skip_value(data) {
        assert!(n <= data.len(), "skipped {n} bytes of {}", data.len());
    }
});
