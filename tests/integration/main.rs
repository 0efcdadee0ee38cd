//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below exercises one subsystem through the public API only.
//! Shared accessory graphs and sessions live in `fixtures`.

mod characteristic_tests;
mod fixtures;
mod pdu_tests;
mod serializer_tests;
mod tlv_tests;
