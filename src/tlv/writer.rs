//! Append-only TLV writer with scratch space and nested sub-writers.
//!
//! ```text
//!  bytes: ┌──────────── written ────────────┬──────── scratch ────────┐
//!         │ [T][L][V..] [T][L][V..] ...     │  unused tail capacity   │
//!         └─────────────────────────────────┴─────────────────────────┘
//!                                           ▲
//!                                       num_bytes
//!
//!  value scratch / sub-writer region:
//!         ... written ... │ 2 │ staged value ..... │ 2 per extra fragment │
//! ```
//!
//! A value can be built directly in the value scratch region and then
//! committed with [`TlvWriter::append_from_scratch`]. Committing moves the
//! bytes right as fragment headers are inserted, so the region leaves room
//! for one header per possible fragment. A sub-writer is a writer over that
//! same region; [`TlvWriter::finalize_sub_writer`] wraps its content as the
//! value of one outer item.

use log::warn;

use super::{FRAGMENT_HEADER_LEN, FULL_FRAGMENT_LEN, MAX_FRAGMENT_LEN, TlvType, encoded_len};
use crate::error::{Error, Result};

#[derive(Debug)]
pub struct TlvWriter<'a> {
    bytes: &'a mut [u8],
    num_bytes: usize,
    last_type: Option<TlvType>,
}

impl<'a> TlvWriter<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self {
            bytes,
            num_bytes: 0,
            last_type: None,
        }
    }

    /// Discards everything written so far.
    pub fn reset(&mut self) {
        self.num_bytes = 0;
        self.last_type = None;
    }

    /// Bytes written so far.
    pub fn buffer(&self) -> &[u8] {
        &self.bytes[..self.num_bytes]
    }

    pub fn len(&self) -> usize {
        self.num_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.num_bytes == 0
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Type of the most recently written item, if any.
    pub fn last_type(&self) -> Option<TlvType> {
        self.last_type
    }

    /// Appends one item, splitting values longer than 255 bytes into
    /// consecutive fragments of the same type.
    ///
    /// Fails with `OutOfResources` and writes nothing if the encoded item
    /// does not fit.
    ///
    /// # Panics
    ///
    /// If `ty` equals the type of the previous item. Two adjacent items of
    /// the same type would read back as one fragmented value.
    pub fn append(&mut self, ty: TlvType, value: &[u8]) -> Result<()> {
        self.check_adjacent(ty);
        self.check_fits(ty, value.len())?;
        let start = self.num_bytes + FRAGMENT_HEADER_LEN;
        self.bytes[start..start + value.len()].copy_from_slice(value);
        self.commit(ty, value.len());
        Ok(())
    }

    /// Appends an item whose value was staged at the start of
    /// [`TlvWriter::scratch_bytes_for_value`].
    pub fn append_from_scratch(&mut self, ty: TlvType, len: usize) -> Result<()> {
        assert!(
            len <= self.value_scratch_len(),
            "TLV[{ty:02x}]: staged value exceeds value scratch region"
        );
        self.check_adjacent(ty);
        self.check_fits(ty, len)?;
        self.commit(ty, len);
        Ok(())
    }

    /// Appends already encoded TLV bytes. `last_type` must be the type of
    /// the final item in `bytes`.
    pub fn extend(&mut self, bytes: &[u8], last_type: TlvType) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let free = self.bytes.len() - self.num_bytes;
        if free < bytes.len() {
            warn!("TLV: no room to copy {} encoded bytes ({} free)", bytes.len(), free);
            return Err(Error::OutOfResources);
        }
        self.bytes[self.num_bytes..self.num_bytes + bytes.len()].copy_from_slice(bytes);
        self.num_bytes += bytes.len();
        self.last_type = Some(last_type);
        Ok(())
    }

    /// Unused tail capacity. Invalidated by the next write.
    pub fn scratch_bytes(&mut self) -> &mut [u8] {
        &mut self.bytes[self.num_bytes..]
    }

    /// Region of the tail in which a value can be staged so that it still
    /// fits once framed. Invalidated by the next write.
    pub fn scratch_bytes_for_value(&mut self) -> &mut [u8] {
        let len = self.value_scratch_len();
        if len == 0 {
            return &mut self.bytes[self.num_bytes..self.num_bytes];
        }
        let start = self.num_bytes + FRAGMENT_HEADER_LEN;
        &mut self.bytes[start..start + len]
    }

    /// Writer over the value scratch region. Its content becomes one item of
    /// this writer through [`TlvWriter::finalize_sub_writer`], which must
    /// happen before anything else is written here.
    pub fn create_sub_writer(&mut self) -> TlvWriter<'_> {
        let len = self.value_scratch_len();
        let start = if len == 0 {
            self.num_bytes
        } else {
            self.num_bytes + FRAGMENT_HEADER_LEN
        };
        TlvWriter::new(&mut self.bytes[start..start + len])
    }

    /// Wraps the `sub_len` bytes written by the last sub-writer as one item.
    pub fn finalize_sub_writer(&mut self, ty: TlvType, sub_len: usize) -> Result<()> {
        self.append_from_scratch(ty, sub_len)
    }

    /// Builds a nested TLV document and appends it as the value of `ty`.
    pub fn with_sub_writer<F>(&mut self, ty: TlvType, f: F) -> Result<()>
    where
        F: FnOnce(&mut TlvWriter<'_>) -> Result<()>,
    {
        let sub_len = {
            let mut sub = self.create_sub_writer();
            f(&mut sub)?;
            sub.len()
        };
        self.finalize_sub_writer(ty, sub_len)
    }

    // ── Internal ────────────────────────────────────────────────

    fn check_adjacent(&self, ty: TlvType) {
        if self.num_bytes > 0 {
            assert_ne!(
                self.last_type,
                Some(ty),
                "TLV[{ty:02x}]: adjacent items must have different types"
            );
        }
    }

    fn check_fits(&self, ty: TlvType, len: usize) -> Result<()> {
        let free = self.bytes.len() - self.num_bytes;
        if free < encoded_len(len) {
            warn!("TLV[{:02x}]: no room for {} byte value ({} free)", ty, len, free);
            return Err(Error::OutOfResources);
        }
        Ok(())
    }

    /// Frames the value staged right after the next header position.
    /// Space must have been checked.
    fn commit(&mut self, ty: TlvType, len: usize) {
        let mut remaining = len;
        loop {
            let fragment_len = remaining.min(MAX_FRAGMENT_LEN);
            self.bytes[self.num_bytes] = ty;
            self.bytes[self.num_bytes + 1] = fragment_len as u8;
            self.num_bytes += FRAGMENT_HEADER_LEN + fragment_len;
            remaining -= fragment_len;
            if remaining == 0 {
                break;
            }
            // Shift the rest of the value past the next header.
            let src = self.num_bytes;
            self.bytes
                .copy_within(src..src + remaining, src + FRAGMENT_HEADER_LEN);
        }
        self.last_type = Some(ty);
    }

    fn value_scratch_len(&self) -> usize {
        let free = self.bytes.len() - self.num_bytes;
        if free < FRAGMENT_HEADER_LEN {
            0
        } else if free <= FULL_FRAGMENT_LEN {
            free - FRAGMENT_HEADER_LEN
        } else {
            let fragments = free.div_ceil(FULL_FRAGMENT_LEN);
            let last = free - FULL_FRAGMENT_LEN * (fragments - 1);
            let last_len = last.saturating_sub(FRAGMENT_HEADER_LEN);
            MAX_FRAGMENT_LEN * (fragments - 1) + last_len
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────
