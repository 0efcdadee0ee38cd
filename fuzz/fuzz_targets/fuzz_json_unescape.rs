//! Fuzz target: `json::unescape_in_place`
//!
//! Unescaping only ever shrinks the value, and escaping valid UTF-8 output
//! again must fit the size predicted by `escaped_len`.
//!
//! cargo fuzz run fuzz_json_unescape

#![no_main]

use hapstack::json::{escape_in_place, escaped_len, unescape_in_place};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut bytes = data.to_vec();
    let Ok(n) = unescape_in_place(&mut bytes) else {
        return;
    };
    assert!(n <= data.len());
    let Ok(text) = core::str::from_utf8(&bytes[..n]) else {
        return;
    };
    let need = escaped_len(text.as_bytes());
    let mut buf = vec![0u8; need.max(n)];
    buf[..n].copy_from_slice(text.as_bytes());
    assert_eq!(escape_in_place(&mut buf, n), Ok(need));
});
