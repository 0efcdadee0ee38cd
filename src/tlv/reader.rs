//! In-place TLV reader.
//!
//! The reader owns a mutable view over the request body. Reading an item
//! merges its fragments into one contiguous value inside the same buffer,
//! so the original layout is destroyed as parsing proceeds.
//!
//! Two access modes:
//!
//! - **Sequential** (default): [`TlvReader::get_next`] walks items front to
//!   back. The consumed region holds the merged value followed by zeros.
//! - **Non-sequential**: after [`TlvReader::enable_non_sequential_access`]
//!   three unused type values are reserved as "already read" markers. Items
//!   can then be looked up by type in any order; each read rewrites the item
//!   into one of the encodings below, which keep the item's total size so
//!   later scans can still step over it.
//!
//! ```text
//! single fragment      [S ][len][value .........]
//! NUL single fragment  [N1][value .........][00]
//! NUL multi fragment   [N2][count varint: X bytes][last len][zeros][value ...][00]
//!                      count = fragments - 2, stored as FF FF .. FF <rest>
//!                      zeros = 2 * count - (X - 1)
//! ```

use log::{debug, error, warn};

use super::{FULL_FRAGMENT_LEN, MAX_FRAGMENT_LEN, Tlv, TlvType, ValueEncoding};
use crate::error::{Error, Result};

/// Type values standing in for items that have already been read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReservedTypes {
    single_fragment: TlvType,
    nul_single_fragment: TlvType,
    nul_multi_fragment: TlvType,
}

impl ReservedTypes {
    fn contains(self, ty: TlvType) -> bool {
        ty == self.single_fragment || ty == self.nul_single_fragment || ty == self.nul_multi_fragment
    }
}

/// Destructive, zero-copy TLV reader.
#[derive(Debug)]
pub struct TlvReader<'a> {
    bytes: &'a mut [u8],
    /// Start of the unread region.
    pos: usize,
    /// End of the TLV data. `bytes[num_bytes..]` is scratch space.
    num_bytes: usize,
    reserved: Option<ReservedTypes>,
}

impl<'a> TlvReader<'a> {
    /// Reader over the whole buffer; no scratch space.
    pub fn new(bytes: &'a mut [u8]) -> Self {
        let num_bytes = bytes.len();
        Self::with_capacity(bytes, num_bytes)
    }

    /// Reader over `bytes[..num_bytes]`. The remainder of `bytes` is
    /// available through [`TlvReader::scratch_bytes`].
    pub fn with_capacity(bytes: &'a mut [u8], num_bytes: usize) -> Self {
        assert!(num_bytes <= bytes.len(), "TLV data exceeds buffer");
        Self {
            bytes,
            pos: 0,
            num_bytes,
            reserved: None,
        }
    }

    /// Value bytes of an item previously returned by this reader.
    pub fn value(&self, tlv: &Tlv) -> &[u8] {
        &self.bytes[tlv.range()]
    }

    /// Value of an item interpreted as UTF-8 text.
    pub fn value_str(&self, tlv: &Tlv) -> Result<&str> {
        core::str::from_utf8(self.value(tlv)).map_err(|_| {
            warn!("TLV[{:02x}]: value is not valid UTF-8", tlv.ty);
            Error::InvalidData
        })
    }

    /// Unused capacity after the TLV data.
    pub fn scratch_bytes(&mut self) -> &mut [u8] {
        &mut self.bytes[self.num_bytes..]
    }

    pub fn is_non_sequential(&self) -> bool {
        self.reserved.is_some()
    }

    /// Reads the next logical item.
    ///
    /// Returns `Ok(None)` once the data is exhausted; further calls keep
    /// returning `Ok(None)` and leave the buffer alone. In non-sequential
    /// mode, items that were already read are skipped.
    pub fn get_next(&mut self) -> Result<Option<Tlv>> {
        if let Some(types) = self.reserved {
            return self.next_unread(types);
        }

        let base = self.pos;
        let end = self.num_bytes;
        if base == end {
            return Ok(None);
        }
        if end - base < 2 {
            warn!("TLV: incomplete fragment header ({} bytes)", end - base);
            return Err(Error::InvalidData);
        }

        let bytes = &mut *self.bytes;
        let ty = bytes[base];
        let mut o = 0;
        let mut len = 0;
        let mut fragments = 0;
        loop {
            let remaining = end - base - o;
            if fragments > 0 {
                if remaining < 2 {
                    warn!("TLV: incomplete fragment header ({} bytes)", remaining);
                    return Err(Error::InvalidData);
                }
                if len != fragments * MAX_FRAGMENT_LEN {
                    warn!("TLV[{:02x}]: fragment follows a fragment shorter than 255 bytes", ty);
                    return Err(Error::InvalidData);
                }
            }
            let fragment_len = bytes[base + o + 1] as usize;
            if fragments > 0 && fragment_len == 0 {
                warn!("TLV[{:02x}]: empty continuation fragment", ty);
                return Err(Error::InvalidData);
            }
            if remaining - 2 < fragment_len {
                warn!("TLV[{:02x}]: incomplete fragment body ({} bytes)", ty, remaining - 2);
                return Err(Error::InvalidData);
            }

            // Headers consumed so far collapse to the end of the region.
            let src = base + o + 2;
            bytes.copy_within(src..src + fragment_len, base + len);
            fragments += 1;
            len += fragment_len;
            o += fragment_len + 2;
            bytes[base + len..base + o].fill(0);

            if base + o == end || bytes[base + o] != ty {
                break;
            }
        }

        self.pos = base + o;
        Ok(Some(Tlv::new(ty, base, len)))
    }

    /// Reads every item once and picks out the requested types.
    ///
    /// Each slot of the result corresponds to the type at the same index.
    /// A requested type that occurs more than once is rejected. In
    /// sequential mode unrequested items are consumed and dropped; in
    /// non-sequential mode they stay available to [`TlvReader::get_next`].
    ///
    /// # Panics
    ///
    /// If `types` contains the same type twice.
    pub fn get_all<const N: usize>(&mut self, types: [TlvType; N]) -> Result<[Option<Tlv>; N]> {
        for (i, ty) in types.iter().enumerate() {
            assert!(!types[..i].contains(ty), "TLV[{ty:02x}]: type requested twice");
        }
        let mut slots = [None; N];

        if let Some(reserved) = self.reserved {
            for (slot, &ty) in slots.iter_mut().zip(types.iter()) {
                let Some((at, span)) = self.find_span(ty)? else {
                    continue;
                };
                *slot = Some(self.read_item(at, span, ValueEncoding::MayContainNul, reserved)?);
                if self.find_span(ty)?.is_some() {
                    warn!("TLV[{:02x}]: duplicate item", ty);
                    return Err(Error::InvalidData);
                }
            }
            return Ok(slots);
        }

        while let Some(tlv) = self.get_next()? {
            match types.iter().position(|&ty| ty == tlv.ty) {
                Some(i) if slots[i].is_some() => {
                    warn!("TLV[{:02x}]: duplicate item", tlv.ty);
                    return Err(Error::InvalidData);
                }
                Some(i) => slots[i] = Some(tlv),
                None => debug!("TLV[{:02x}]: item ignored", tlv.ty),
            }
        }
        Ok(slots)
    }

    /// Switches the reader to non-sequential access.
    ///
    /// The three smallest type values not listed in `used_types` become
    /// read markers. Items that already carry one of them are read and
    /// discarded, since they cannot be told apart from processed items.
    pub fn enable_non_sequential_access(&mut self, used_types: &[TlvType]) -> Result<()> {
        assert!(self.reserved.is_none(), "non-sequential access already enabled");

        let mut free = (0..=u8::MAX).filter(|ty| !used_types.contains(ty));
        let (Some(single_fragment), Some(nul_single_fragment), Some(nul_multi_fragment)) =
            (free.next(), free.next(), free.next())
        else {
            error!("TLV: can only parse up to 253 distinct types");
            return Err(Error::InvalidData);
        };
        let types = ReservedTypes {
            single_fragment,
            nul_single_fragment,
            nul_multi_fragment,
        };

        let mut at = self.pos;
        while at < self.num_bytes {
            let (ty, span) = self.item_span(at, None)?;
            if types.contains(ty) {
                let tlv = self.read_item(at, span, ValueEncoding::MayContainNul, types)?;
                debug!("TLV[{:02x}]: ignoring item with reserved type ({} bytes)", ty, tlv.len());
            }
            at += span;
        }

        self.reserved = Some(types);
        Ok(())
    }

    /// Reads the first unread item of type `ty`, if any.
    ///
    /// Requires non-sequential access. Each item can be found only once.
    pub fn find(&mut self, ty: TlvType, encoding: ValueEncoding) -> Result<Option<Tlv>> {
        let types = self.reserved_types();
        assert!(!types.contains(ty), "TLV[{ty:02x}]: type is reserved");
        match self.find_span(ty)? {
            Some((at, span)) => self.read_item(at, span, encoding, types).map(Some),
            None => Ok(None),
        }
    }

    /// Marks every unread item whose type is not in `used_types` as read.
    pub fn skip_unexpected(&mut self, used_types: &[TlvType]) -> Result<()> {
        let types = self.reserved_types();
        let mut at = self.pos;
        while at < self.num_bytes {
            let (ty, span) = self.item_span(at, Some(types))?;
            if !types.contains(ty) && !used_types.contains(&ty) {
                let tlv = self.read_item(at, span, ValueEncoding::MayContainNul, types)?;
                debug!("TLV[{:02x}]: ignored ({} bytes)", ty, tlv.len());
            }
            at += span;
        }
        Ok(())
    }

    // ── Internal ────────────────────────────────────────────────

    fn reserved_types(&self) -> ReservedTypes {
        match self.reserved {
            Some(types) => types,
            None => panic!("non-sequential access is not enabled"),
        }
    }

    fn next_unread(&mut self, types: ReservedTypes) -> Result<Option<Tlv>> {
        let mut at = self.pos;
        while at < self.num_bytes {
            let (ty, span) = self.item_span(at, Some(types))?;
            if !types.contains(ty) {
                return self.read_item(at, span, ValueEncoding::MayContainNul, types).map(Some);
            }
            at += span;
        }
        Ok(None)
    }

    fn find_span(&self, ty: TlvType) -> Result<Option<(usize, usize)>> {
        let types = self.reserved;
        let mut at = self.pos;
        while at < self.num_bytes {
            let (item_ty, span) = self.item_span(at, types)?;
            if item_ty == ty {
                return Ok(Some((at, span)));
            }
            at += span;
        }
        Ok(None)
    }

    fn byte(&self, at: usize) -> Result<u8> {
        if at < self.num_bytes {
            Ok(self.bytes[at])
        } else {
            warn!("TLV: malformed item at offset {}", at);
            Err(Error::InvalidData)
        }
    }

    /// Type and total size of the item starting at `at`, including all
    /// headers. Understands the read-marker encodings when `reserved` is set.
    fn item_span(&self, at: usize, reserved: Option<ReservedTypes>) -> Result<(TlvType, usize)> {
        let ty = self.byte(at)?;
        let mut n = 1;

        match reserved {
            Some(types) if ty == types.single_fragment => {
                n += 1 + self.byte(at + 1)? as usize;
            }
            Some(types) if ty == types.nul_single_fragment => {
                while self.byte(at + n)? != 0 {
                    n += 1;
                }
                n += 1;
            }
            Some(types) if ty == types.nul_multi_fragment => {
                let mut fragments = 2;
                let mut x = 0;
                loop {
                    let part = self.byte(at + n)?;
                    n += 1;
                    x += 1;
                    fragments += part as usize;
                    if part != u8::MAX {
                        break;
                    }
                }
                let last = self.byte(at + n)? as usize;
                n += 1;
                n += 2 * (fragments - 2) - (x - 1);
                n += (fragments - 1) * MAX_FRAGMENT_LEN + last;
                if self.byte(at + n)? != 0 {
                    warn!("TLV: read marker without terminator at offset {}", at);
                    return Err(Error::InvalidData);
                }
                n += 1;
            }
            _ => {
                let mut fragment_len = self.byte(at + n)? as usize;
                n += 1 + fragment_len;
                if at + n > self.num_bytes {
                    warn!("TLV[{:02x}]: malformed item", ty);
                    return Err(Error::InvalidData);
                }
                while at + n < self.num_bytes && self.bytes[at + n] == ty {
                    if fragment_len != MAX_FRAGMENT_LEN {
                        warn!("TLV[{:02x}]: fragment follows a fragment shorter than 255 bytes", ty);
                        return Err(Error::InvalidData);
                    }
                    fragment_len = self.byte(at + n + 1)? as usize;
                    n += 2 + fragment_len;
                    if at + n > self.num_bytes {
                        warn!("TLV[{:02x}]: malformed item", ty);
                        return Err(Error::InvalidData);
                    }
                }
            }
        }
        Ok((ty, n))
    }

    /// Reads the raw item `bytes[at..at + span]` once and rewrites it into
    /// its read-marker encoding.
    fn read_item(
        &mut self,
        at: usize,
        span: usize,
        encoding: ValueEncoding,
        types: ReservedTypes,
    ) -> Result<Tlv> {
        let non_sequential = self.reserved.is_some();
        let bytes = &mut *self.bytes;
        assert!(span >= 2, "TLV item shorter than its header");
        let ty = bytes[at];
        if non_sequential {
            assert!(!types.contains(ty), "TLV[{ty:02x}]: item already read");
        }

        if span <= FULL_FRAGMENT_LEN {
            let len = bytes[at + 1] as usize;
            assert_eq!(span, 2 + len, "TLV[{ty:02x}]: span does not match length");
            return match encoding {
                ValueEncoding::MayContainNul => {
                    bytes[at] = types.single_fragment;
                    Ok(Tlv::new(ty, at + 2, len))
                }
                ValueEncoding::NulTerminated => {
                    bytes[at] = types.nul_single_fragment;
                    bytes.copy_within(at + 2..at + 2 + len, at + 1);
                    bytes[at + 1 + len] = 0;
                    if bytes[at + 1..at + 1 + len].contains(&0) {
                        warn!("TLV[{:02x}]: value contains unexpected NUL bytes", ty);
                        return Err(Error::InvalidData);
                    }
                    Ok(Tlv::new(ty, at + 1, len))
                }
            };
        }

        let mut fragments = 0;
        let mut last = 0;
        let mut len = 0;
        for i in (0..span).step_by(FULL_FRAGMENT_LEN) {
            assert_eq!(bytes[at + i], ty, "TLV[{ty:02x}]: fragment type mismatch");
            if i > 0 {
                assert_eq!(last, MAX_FRAGMENT_LEN, "TLV[{ty:02x}]: short inner fragment");
            }
            fragments += 1;
            last = bytes[at + i + 1] as usize;
            len += last;
        }
        assert_eq!(span, (fragments - 1) * FULL_FRAGMENT_LEN + 2 + last);

        // Merge back to front, leaving one byte for the terminator.
        for i in 0..fragments {
            let count = if i == 0 { last } else { MAX_FRAGMENT_LEN };
            let src = at + span - last - i * FULL_FRAGMENT_LEN;
            let dst = at + span - 1 - last - i * MAX_FRAGMENT_LEN;
            bytes.copy_within(src..src + count, dst);
        }
        let value_start = at + span - 1 - len;

        let mut o = at;
        bytes[o] = types.nul_multi_fragment;
        o += 1;
        let mut count = fragments - 2;
        let mut x = 0;
        while count >= MAX_FRAGMENT_LEN {
            bytes[o] = u8::MAX;
            o += 1;
            count -= MAX_FRAGMENT_LEN;
            x += 1;
        }
        bytes[o] = count as u8;
        o += 1;
        x += 1;
        bytes[o] = last as u8;
        o += 1;
        let zeros = 2 * (fragments - 2) - (x - 1);
        bytes[o..o + zeros].fill(0);
        o += zeros;
        assert_eq!(o, value_start);
        o += len;
        bytes[o] = 0;
        assert_eq!(o + 1, at + span);

        if encoding == ValueEncoding::NulTerminated && bytes[value_start..o].contains(&0) {
            warn!("TLV[{:02x}]: value contains unexpected NUL bytes", ty);
            return Err(Error::InvalidData);
        }
        Ok(Tlv::new(ty, value_start, len))
    }
}

// ── Tests ───────────────────────────────────────────────────────
