//! JSON helpers for the IP attribute database.
//!
//! All routines work in place on caller buffers. String escaping follows
//! RFC 7159 §7; [`skip_value`] walks exactly one value so request parsers
//! can step over members they do not understand.

use core::fmt::Write;

use heapless::String;
use log::warn;

use crate::error::{Error, Result};

/// Deepest object / array nesting [`skip_value`] walks through.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Room for the longest `f32` description (subnormals print in full).
pub const MAX_FLOAT_DESCRIPTION_LEN: usize = 64;

pub type FloatDescription = String<MAX_FLOAT_DESCRIPTION_LEN>;

// ═══════════════════════════════════════════════════════════════
//  Escaping
// ═══════════════════════════════════════════════════════════════

/// Number of bytes `bytes` occupies once escaped (quotes excluded).
pub fn escaped_len(bytes: &[u8]) -> usize {
    bytes.iter().map(|&c| escaped_char_len(c)).sum()
}

fn escaped_char_len(c: u8) -> usize {
    match c {
        b'"' | b'\\' | 0x08 | 0x0C | b'\n' | b'\r' | b'\t' => 2,
        0x00..=0x1F => 6,
        _ => 1,
    }
}

/// Escape `buf[..len]` in place, using the rest of `buf` as room to grow.
///
/// Returns the escaped length. On `OutOfResources` the buffer content is
/// clobbered; the caller owns a copy of the source value if it needs one.
pub fn escape_in_place(buf: &mut [u8], len: usize) -> Result<usize> {
    assert!(len <= buf.len(), "value exceeds buffer");
    debug_assert!(core::str::from_utf8(&buf[..len]).is_ok());
    if len == 0 {
        return Ok(0);
    }

    // Park the source at the end and rewrite it forward.
    let cap = buf.len();
    let mut j = cap - len;
    buf.copy_within(..len, j);
    let mut i = 0;

    while j < cap {
        let c = buf[j];
        let need = escaped_char_len(c);
        // Write index may reach the read index but never pass it.
        if i + need > j + 1 {
            return Err(Error::OutOfResources);
        }
        match c {
            b'"' | b'\\' => {
                buf[i] = b'\\';
                buf[i + 1] = c;
            }
            0x08 => buf[i..i + 2].copy_from_slice(b"\\b"),
            0x0C => buf[i..i + 2].copy_from_slice(b"\\f"),
            b'\n' => buf[i..i + 2].copy_from_slice(b"\\n"),
            b'\r' => buf[i..i + 2].copy_from_slice(b"\\r"),
            b'\t' => buf[i..i + 2].copy_from_slice(b"\\t"),
            0x00..=0x1F => {
                const HEX: &[u8; 16] = b"0123456789abcdef";
                buf[i..i + 4].copy_from_slice(b"\\u00");
                buf[i + 4] = HEX[(c >> 4) as usize];
                buf[i + 5] = HEX[(c & 0x0F) as usize];
            }
            _ => buf[i] = c,
        }
        i += need;
        j += 1;
    }
    Ok(i)
}

/// Unescape a JSON string body in place. Returns the new length.
///
/// `\uXXXX` escapes are re-encoded as UTF-8; surrogate pairs must be
/// complete and in order.
pub fn unescape_in_place(buf: &mut [u8]) -> Result<usize> {
    let len = buf.len();
    let mut i = 0;
    let mut j = 0;

    while j < len {
        let c = buf[j];
        j += 1;
        if c != b'\\' {
            buf[i] = c;
            i += 1;
            continue;
        }
        let Some(&esc) = buf.get(j) else {
            warn!("JSON: dangling escape at end of string");
            return Err(Error::InvalidData);
        };
        j += 1;
        let plain = match esc {
            b'"' | b'\\' | b'/' => esc,
            b'b' => 0x08,
            b'f' => 0x0C,
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'u' => {
                let mut code = read_hex4(buf, &mut j)?;
                if is_low_surrogate(code) {
                    warn!("JSON: unpaired low surrogate {:04x}", code);
                    return Err(Error::InvalidData);
                }
                if is_high_surrogate(code) {
                    if buf.get(j..j + 2) != Some(b"\\u".as_slice()) {
                        warn!("JSON: high surrogate {:04x} without partner", code);
                        return Err(Error::InvalidData);
                    }
                    j += 2;
                    let low = read_hex4(buf, &mut j)?;
                    if !is_low_surrogate(low) {
                        warn!("JSON: high surrogate {:04x} followed by {:04x}", code, low);
                        return Err(Error::InvalidData);
                    }
                    code = ((code - 0xD800) << 10) + (low - 0xDC00) + 0x1_0000;
                }
                let ch = char::from_u32(code).ok_or(Error::InvalidData)?;
                // An escape takes at least six bytes; UTF-8 at most four.
                i += ch.encode_utf8(&mut buf[i..j]).len();
                continue;
            }
            other => {
                warn!("JSON: invalid escape '\\{}'", other as char);
                return Err(Error::InvalidData);
            }
        };
        buf[i] = plain;
        i += 1;
    }
    Ok(i)
}

fn read_hex4(buf: &[u8], at: &mut usize) -> Result<u32> {
    let digits = buf.get(*at..*at + 4).ok_or(Error::InvalidData)?;
    let mut code = 0u32;
    for &d in digits {
        let v = (d as char).to_digit(16).ok_or(Error::InvalidData)?;
        code = (code << 4) | v;
    }
    *at += 4;
    Ok(code)
}

const fn is_high_surrogate(code: u32) -> bool {
    matches!(code, 0xD800..=0xDBFF)
}

const fn is_low_surrogate(code: u32) -> bool {
    matches!(code, 0xDC00..=0xDFFF)
}

// ═══════════════════════════════════════════════════════════════
//  Numbers
// ═══════════════════════════════════════════════════════════════

/// Shortest description that parses back to `value`, or `null` when the
/// value is not finite (JSON has no encoding for NaN / infinity).
pub fn float_description(value: f32) -> FloatDescription {
    let mut out = FloatDescription::new();
    // Capacity covers the longest f32 rendering.
    let _ = if value.is_finite() {
        write!(out, "{}", value)
    } else {
        out.push_str("null").map_err(|_| core::fmt::Error)
    };
    out
}

// ═══════════════════════════════════════════════════════════════
//  Skipping
// ═══════════════════════════════════════════════════════════════

/// Skip one JSON value starting at `bytes[0]` (leading whitespace allowed).
///
/// Returns the number of bytes consumed up to and including the last byte
/// of the value. A truncated or malformed value is `InvalidData`; nesting
/// deeper than [`MAX_NESTING_DEPTH`] is `OutOfResources`.
pub fn skip_value(bytes: &[u8]) -> Result<usize> {
    let mut scan = Scanner { bytes, pos: 0 };
    let mut stack = NestingStack::default();

    loop {
        scan.skip_whitespace();
        let mut value_done = true;
        match scan.peek()? {
            b'{' => {
                scan.pos += 1;
                scan.skip_whitespace();
                if scan.peek()? == b'}' {
                    scan.pos += 1;
                } else {
                    scan.member_name()?;
                    stack.push(Nesting::Object)?;
                    value_done = false;
                }
            }
            b'[' => {
                scan.pos += 1;
                scan.skip_whitespace();
                if scan.peek()? == b']' {
                    scan.pos += 1;
                } else {
                    stack.push(Nesting::Array)?;
                    value_done = false;
                }
            }
            b'"' => scan.string()?,
            b'-' | b'0'..=b'9' => scan.number()?,
            b't' => scan.literal(b"true")?,
            b'f' => scan.literal(b"false")?,
            b'n' => scan.literal(b"null")?,
            other => {
                warn!("JSON: unexpected '{}' at {}", other.escape_ascii(), scan.pos);
                return Err(Error::InvalidData);
            }
        }
        if !value_done {
            continue;
        }

        // Close every container the value completed.
        loop {
            let Some(top) = stack.top() else {
                return Ok(scan.pos);
            };
            scan.skip_whitespace();
            match (top, scan.next()?) {
                (Nesting::Object, b',') => {
                    scan.skip_whitespace();
                    scan.member_name()?;
                    break;
                }
                (Nesting::Array, b',') => break,
                (Nesting::Object, b'}') | (Nesting::Array, b']') => stack.pop(),
                (_, other) => {
                    warn!("JSON: unexpected '{}' after value", other.escape_ascii());
                    return Err(Error::InvalidData);
                }
            }
        }
    }
}

// ── Internal ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Nesting {
    Object,
    Array,
}

/// One bit per open container; set bits are arrays.
#[derive(Default)]
struct NestingStack {
    bits: u64,
    depth: usize,
}

impl NestingStack {
    fn push(&mut self, nesting: Nesting) -> Result<()> {
        if self.depth == MAX_NESTING_DEPTH {
            warn!("JSON: nesting deeper than {}", MAX_NESTING_DEPTH);
            return Err(Error::OutOfResources);
        }
        self.bits = (self.bits << 1) | u64::from(nesting == Nesting::Array);
        self.depth += 1;
        Ok(())
    }

    fn pop(&mut self) {
        self.bits >>= 1;
        self.depth -= 1;
    }

    fn top(&self) -> Option<Nesting> {
        if self.depth == 0 {
            None
        } else if self.bits & 1 == 1 {
            Some(Nesting::Array)
        } else {
            Some(Nesting::Object)
        }
    }
}

struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Scanner<'_> {
    fn peek(&self) -> Result<u8> {
        self.bytes.get(self.pos).copied().ok_or(Error::InvalidData)
    }

    fn next(&mut self) -> Result<u8> {
        let c = self.peek()?;
        self.pos += 1;
        Ok(c)
    }

    fn eat(&mut self, c: u8) -> bool {
        if self.bytes.get(self.pos) == Some(&c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.bytes.get(self.pos), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn literal(&mut self, word: &[u8]) -> Result<()> {
        if self.bytes.get(self.pos..self.pos + word.len()) != Some(word) {
            return Err(Error::InvalidData);
        }
        self.pos += word.len();
        Ok(())
    }

    fn string(&mut self) -> Result<()> {
        if !self.eat(b'"') {
            return Err(Error::InvalidData);
        }
        loop {
            match self.next()? {
                b'"' => return Ok(()),
                b'\\' => match self.next()? {
                    b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't' => {}
                    b'u' => {
                        read_hex4(self.bytes, &mut self.pos)?;
                    }
                    _ => return Err(Error::InvalidData),
                },
                0x00..=0x1F => return Err(Error::InvalidData),
                _ => {}
            }
        }
    }

    fn member_name(&mut self) -> Result<()> {
        self.string()?;
        self.skip_whitespace();
        if !self.eat(b':') {
            return Err(Error::InvalidData);
        }
        Ok(())
    }

    fn number(&mut self) -> Result<()> {
        self.eat(b'-');
        match self.next()? {
            b'0' => {}
            b'1'..=b'9' => self.digits(),
            _ => return Err(Error::InvalidData),
        }
        if self.eat(b'.') {
            self.digits1()?;
        }
        if self.eat(b'e') || self.eat(b'E') {
            let _ = self.eat(b'+') || self.eat(b'-');
            self.digits1()?;
        }
        Ok(())
    }

    fn digits(&mut self) {
        while matches!(self.bytes.get(self.pos), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
    }

    fn digits1(&mut self) -> Result<()> {
        let start = self.pos;
        self.digits();
        if self.pos == start {
            return Err(Error::InvalidData);
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────
