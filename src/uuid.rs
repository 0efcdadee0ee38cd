//! Service and characteristic type identifiers.
//!
//! UUIDs are stored as 16 bytes in reverse network order, so the Apple
//! base UUID `0000XXXX-0000-1000-8000-0026BB765291` keeps its short value
//! in the last four bytes, little-endian:
//!
//! ```text
//! bytes[0..12]   91 52 76 BB 26 00 00 80 00 10 00 00   base suffix
//! bytes[12..16]  XX XX XX XX                           short value (LE)
//! ```

use core::fmt::{self, Write};

use heapless::String;

/// Length of the dashed textual form `XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX`.
pub const MAX_DESCRIPTION_LEN: usize = 36;

/// Textual form of a UUID as it appears in JSON documents.
pub type UuidDescription = String<MAX_DESCRIPTION_LEN>;

const APPLE_BASE: [u8; 12] = [
    0x91, 0x52, 0x76, 0xBB, 0x26, 0x00, 0x00, 0x80, 0x00, 0x10, 0x00, 0x00,
];

/// A 128-bit type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uuid {
    bytes: [u8; 16],
}

impl Uuid {
    /// UUID derived from the Apple base UUID.
    pub const fn apple_defined(short: u32) -> Self {
        let s = short.to_le_bytes();
        let b = APPLE_BASE;
        Self {
            bytes: [
                b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7], b[8], b[9], b[10], b[11], s[0],
                s[1], s[2], s[3],
            ],
        }
    }

    /// Build from reverse-network-order bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self { bytes }
    }

    /// Parse the canonical dashed form. Hex digits may be either case.
    pub fn parse(text: &str) -> Option<Self> {
        let raw = text.as_bytes();
        if raw.len() != MAX_DESCRIPTION_LEN {
            return None;
        }
        let mut bytes = [0u8; 16];
        let mut n = 0;
        let mut i = 0;
        while i < raw.len() {
            if matches!(i, 8 | 13 | 18 | 23) {
                if raw[i] != b'-' {
                    return None;
                }
                i += 1;
                continue;
            }
            let hi = hex_value(raw[i])?;
            let lo = hex_value(*raw.get(i + 1)?)?;
            // Textual order is network order; storage is reversed.
            bytes[15 - n] = (hi << 4) | lo;
            n += 1;
            i += 2;
        }
        Some(Self { bytes })
    }

    /// Reverse-network-order bytes.
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.bytes
    }

    pub fn is_apple_defined(&self) -> bool {
        self.bytes[..12] == APPLE_BASE
    }

    /// Short value of an Apple-defined UUID.
    pub fn short_value(&self) -> Option<u32> {
        if !self.is_apple_defined() {
            return None;
        }
        let [a, b, c, d] = [self.bytes[12], self.bytes[13], self.bytes[14], self.bytes[15]];
        Some(u32::from_le_bytes([a, b, c, d]))
    }

    /// JSON description: uppercase hex without leading zeros for
    /// Apple-defined types ("3E", "126"), otherwise the dashed form.
    pub fn json_description(&self) -> UuidDescription {
        let mut out = UuidDescription::new();
        // Capacity always suffices for either form.
        let _ = write!(out, "{}", self);
        out
    }

    /// Compact form used on BLE.
    ///
    /// Apple-defined UUIDs drop the base and any zero high-order bytes of
    /// the short value (at least one byte remains); custom UUIDs are sent
    /// as all 16 bytes.
    pub fn short_form(&self) -> &[u8] {
        if !self.is_apple_defined() {
            return &self.bytes;
        }
        let mut len = 4;
        while len > 1 && self.bytes[12 + len - 1] == 0 {
            len -= 1;
        }
        &self.bytes[12..12 + len]
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(short) = self.short_value() {
            return write!(f, "{:X}", short);
        }
        for (n, byte) in self.bytes.iter().rev().enumerate() {
            if matches!(n, 4 | 6 | 8 | 10) {
                f.write_char('-')?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════
//  Well-known types
// ═══════════════════════════════════════════════════════════════

/// Types the protocol core treats specially. The full catalog lives with
/// the application.
pub mod types {
    use super::Uuid;

    // Services
    pub const ACCESSORY_INFORMATION: Uuid = Uuid::apple_defined(0x3E);
    pub const LIGHTBULB: Uuid = Uuid::apple_defined(0x43);
    pub const PAIRING: Uuid = Uuid::apple_defined(0x55);
    pub const PROTOCOL_INFORMATION: Uuid = Uuid::apple_defined(0xA2);

    // Characteristics
    pub const BRIGHTNESS: Uuid = Uuid::apple_defined(0x08);
    pub const IDENTIFY: Uuid = Uuid::apple_defined(0x14);
    pub const MANUFACTURER: Uuid = Uuid::apple_defined(0x20);
    pub const MODEL: Uuid = Uuid::apple_defined(0x21);
    pub const NAME: Uuid = Uuid::apple_defined(0x23);
    pub const ON: Uuid = Uuid::apple_defined(0x25);
    pub const SERIAL_NUMBER: Uuid = Uuid::apple_defined(0x30);
    pub const VERSION: Uuid = Uuid::apple_defined(0x37);
    pub const FIRMWARE_REVISION: Uuid = Uuid::apple_defined(0x52);
    pub const PROGRAMMABLE_SWITCH_EVENT: Uuid = Uuid::apple_defined(0x73);
    pub const SERVICE_SIGNATURE: Uuid = Uuid::apple_defined(0xA5);
    pub const BUTTON_EVENT: Uuid = Uuid::apple_defined(0x126);
}

// ── Tests ─────────────────────────────────────────────────────
