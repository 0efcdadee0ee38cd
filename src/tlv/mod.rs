//! TLV8 codec: in-place reader and append-only writer.
//!
//! ```text
//! ┌────────┬────────┬──────────────────┐
//! │ type:1 │ len:1  │ value: len bytes │   one fragment
//! └────────┴────────┴──────────────────┘
//!
//! value > 255 bytes:
//! [T][255][255 bytes] [T][255][255 bytes] ... [T][n][n bytes]   n in 1..=255
//! ```
//!
//! Consecutive fragments with the same type form one logical value. Only
//! the last fragment of a run may be shorter than 255 bytes.
//!
//! Neither half allocates. The [`TlvReader`] rewrites its buffer while
//! parsing (fragment merging, read markers); the [`TlvWriter`] hands out
//! its unused tail as scratch space and nests sub-writers inside it.

pub mod reader;
pub mod writer;

pub use reader::TlvReader;
pub use writer::TlvWriter;

/// Raw TLV type byte. Its meaning depends on the enclosing document.
pub type TlvType = u8;

/// Largest value carried by a single fragment.
pub const MAX_FRAGMENT_LEN: usize = 255;

/// Header bytes per fragment (type + length).
pub const FRAGMENT_HEADER_LEN: usize = 2;

/// A full fragment on the wire: header plus 255 value bytes.
pub const FULL_FRAGMENT_LEN: usize = FRAGMENT_HEADER_LEN + MAX_FRAGMENT_LEN;

/// One logical TLV item returned by the reader.
///
/// The value is addressed by offset into the reader's buffer rather than
/// borrowed, so several items can be held while the reader keeps
/// rewriting later parts of the buffer. Resolve it with
/// [`TlvReader::value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv {
    pub ty: TlvType,
    start: usize,
    len: usize,
}

impl Tlv {
    pub(crate) const fn new(ty: TlvType, start: usize, len: usize) -> Self {
        Self { ty, start, len }
    }

    /// Number of value bytes after fragment merging.
    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Offset of the first value byte within the reader's buffer.
    pub const fn offset(&self) -> usize {
        self.start
    }

    pub(crate) fn range(&self) -> core::ops::Range<usize> {
        self.start..self.start + self.len
    }
}

/// How a value is laid out once it has been read in non-sequential mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueEncoding {
    /// Binary value. Not guaranteed to be NUL-terminated.
    MayContainNul,
    /// Text value. Stored NUL-terminated; embedded NUL bytes are rejected.
    NulTerminated,
}

/// Total encoded size of a value of `len` bytes, including all fragment
/// headers. A zero-length value still takes one header.
pub const fn encoded_len(len: usize) -> usize {
    let fragments = if len == 0 { 1 } else { len.div_ceil(MAX_FRAGMENT_LEN) };
    len + fragments * FRAGMENT_HEADER_LEN
}
