//! Fuzz target: `TlvReader`
//!
//! Parses arbitrary bytes sequentially, then again in non-sequential mode
//! with lookups by type. Every returned value must lie inside the buffer
//! and the reader must never panic on malformed input.
//!
//! cargo fuzz run fuzz_tlv_reader

#![no_main]

use hapstack::TlvReader;
use hapstack::tlv::ValueEncoding;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut bytes = data.to_vec();
    let mut reader = TlvReader::new(&mut bytes);
    while let Ok(Some(tlv)) = reader.get_next() {
        assert!(tlv.offset() + tlv.len() <= data.len());
    }

    // First byte picks the types looked up; the rest is the document.
    let Some((&pick, body)) = data.split_first() else {
        return;
    };
    let mut bytes = body.to_vec();
    let mut reader = TlvReader::new(&mut bytes);
    if reader.enable_non_sequential_access(&[pick, pick.wrapping_add(1)]).is_err() {
        return;
    }
    if let Ok(Some(tlv)) = reader.find(pick, ValueEncoding::NulTerminated) {
        if let Ok(text) = reader.value_str(&tlv) {
            assert!(!text.contains('\0'), "NUL inside a terminated value");
        }
    }
    let _ = reader.get_all([pick.wrapping_add(1)]);
    while let Ok(Some(_)) = reader.get_next() {}
});
