//! Read / write / subscribe dispatch over [`Format`].
//!
//! Every callback result is checked against the allow-list of its
//! operation. An error outside the list is a defect in the application and
//! aborts; constraint violations on incoming writes are a peer error and
//! come back as `InvalidData`.

use core::fmt::Debug;

use log::{debug, error, warn};

use super::{Characteristic, Constraint, Format, Request, Scalar, WriteContext, WriteRequest};
use crate::error::{Error, Result};
use crate::tlv::{TlvReader, TlvWriter};

/// A value returned by [`Characteristic::handle_read`]. Variable-length
/// values borrow the caller's buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'b> {
    Bool(bool),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Int(i32),
    Float(f32),
    String(&'b str),
    Data(&'b [u8]),
    /// Encoded TLV8 document.
    Tlv8(&'b [u8]),
}

/// A decoded value handed to [`Characteristic::handle_write`].
#[derive(Debug, PartialEq)]
pub enum WriteValue<'v> {
    Bool(bool),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Int(i32),
    Float(f32),
    String(&'v str),
    Data(&'v [u8]),
    /// Raw TLV8 document. Parsed in place, so it is consumed by the write.
    Tlv8(&'v mut [u8]),
}

impl<'a> Characteristic<'a> {
    /// Reads the current value through the application callback.
    ///
    /// String, data and TLV8 values are produced into `buf`.
    ///
    /// # Panics
    ///
    /// If the callback returns an error outside the read allow-list,
    /// reports more bytes than `buf` holds or produces text that is not
    /// valid UTF-8.
    pub fn handle_read<'b>(&self, request: &Request, buf: &'b mut [u8]) -> Result<Value<'b>> {
        self.check_target(request);
        match &self.format {
            Format::Bool(s) => self.read_scalar(s, request).map(Value::Bool),
            Format::UInt8(s) => self.read_scalar(s, request).map(Value::UInt8),
            Format::UInt16(s) => self.read_scalar(s, request).map(Value::UInt16),
            Format::UInt32(s) => self.read_scalar(s, request).map(Value::UInt32),
            Format::UInt64(s) => self.read_scalar(s, request).map(Value::UInt64),
            Format::Int(s) => self.read_scalar(s, request).map(Value::Int),
            Format::Float(s) => self.read_scalar(s, request).map(Value::Float),
            Format::String(f) => {
                if buf.is_empty() {
                    warn!("CHAR[{}]: no room for string value", self.iid);
                    return Err(Error::OutOfResources);
                }
                let read = f.read.ok_or_else(|| self.missing_callback("read"))?;
                let len = self.read_bytes(read, request, buf)?;
                let buf: &'b [u8] = buf;
                let Ok(text) = core::str::from_utf8(&buf[..len]) else {
                    error!("CHAR[{}]: read callback returned invalid UTF-8", self.iid);
                    panic!("CHAR[{}]: string value is not valid UTF-8", self.iid);
                };
                assert!(
                    !text.contains('\0'),
                    "CHAR[{}]: string value contains a NUL byte",
                    self.iid
                );
                if text.len() > f.max_length {
                    warn!(
                        "CHAR[{}]: read value too long ({} > max length {})",
                        self.iid,
                        text.len(),
                        f.max_length
                    );
                    return Err(Error::InvalidData);
                }
                Ok(Value::String(text))
            }
            Format::Data(f) => {
                let read = f.read.ok_or_else(|| self.missing_callback("read"))?;
                let len = self.read_bytes(read, request, buf)?;
                if len > f.max_length {
                    warn!(
                        "CHAR[{}]: read value too long ({} > max length {})",
                        self.iid, len, f.max_length
                    );
                    return Err(Error::InvalidData);
                }
                let buf: &'b [u8] = buf;
                Ok(Value::Data(&buf[..len]))
            }
            Format::Tlv8(f) => {
                let read = f.read.ok_or_else(|| self.missing_callback("read"))?;
                let mut writer = TlvWriter::new(&mut *buf);
                self.check_allowed(read(request, &mut writer), Error::READ_ALLOWED, "read")?;
                let len = writer.len();
                let buf: &'b [u8] = buf;
                Ok(Value::Tlv8(&buf[..len]))
            }
        }
    }

    /// Validates `value` and hands it to the application write callback.
    ///
    /// Nothing reaches the application if the value violates the
    /// constraints or does not match the format.
    ///
    /// # Panics
    ///
    /// If the callback returns an error outside the write allow-list, or
    /// `writes` already records a write in flight.
    pub fn handle_write(
        &self,
        writes: &mut WriteContext,
        request: &WriteRequest<'_>,
        value: WriteValue<'_>,
    ) -> Result<()> {
        self.check_target(&request.request);
        match (&self.format, value) {
            (Format::Bool(s), WriteValue::Bool(v)) => self.write_scalar(s, writes, request, v),
            (Format::UInt8(s), WriteValue::UInt8(v)) => self.write_scalar(s, writes, request, v),
            (Format::UInt16(s), WriteValue::UInt16(v)) => self.write_scalar(s, writes, request, v),
            (Format::UInt32(s), WriteValue::UInt32(v)) => self.write_scalar(s, writes, request, v),
            (Format::UInt64(s), WriteValue::UInt64(v)) => self.write_scalar(s, writes, request, v),
            (Format::Int(s), WriteValue::Int(v)) => self.write_scalar(s, writes, request, v),
            (Format::Float(s), WriteValue::Float(v)) => self.write_scalar(s, writes, request, v),
            (Format::String(f), WriteValue::String(text)) => {
                if text.len() > f.max_length {
                    warn!(
                        "CHAR[{}]: value too long ({} > max length {})",
                        self.iid,
                        text.len(),
                        f.max_length
                    );
                    return Err(Error::InvalidData);
                }
                let write = f.write.ok_or_else(|| self.missing_callback("write"))?;
                self.invoke_write(writes, request, |w| write(request, w, text))
            }
            (Format::Data(f), WriteValue::Data(bytes)) => {
                if bytes.len() > f.max_length {
                    warn!(
                        "CHAR[{}]: value too long ({} > max length {})",
                        self.iid,
                        bytes.len(),
                        f.max_length
                    );
                    return Err(Error::InvalidData);
                }
                let write = f.write.ok_or_else(|| self.missing_callback("write"))?;
                self.invoke_write(writes, request, |w| write(request, w, bytes))
            }
            (Format::Tlv8(f), WriteValue::Tlv8(bytes)) => {
                let write = f.write.ok_or_else(|| self.missing_callback("write"))?;
                let mut reader = TlvReader::new(bytes);
                self.invoke_write(writes, request, |w| write(request, w, &mut reader))
            }
            (format, value) => {
                warn!(
                    "CHAR[{}]: {:?} value written to {} characteristic",
                    self.iid,
                    value,
                    format.kind()
                );
                Err(Error::InvalidData)
            }
        }
    }

    /// Notifies the application that a controller enabled events. No-op
    /// without a subscribe callback.
    pub fn handle_subscribe(&self, writes: &mut WriteContext, request: &Request) {
        self.check_target(request);
        if let Some(subscribe) = self.subscribe {
            debug!("CHAR[{}]: calling subscribe handler", self.iid);
            writes.will_handle_write(request.session, request.aid, request.iid);
            subscribe(request, writes);
            writes.did_handle_write();
        }
    }

    /// Notifies the application that a controller disabled events. No-op
    /// without an unsubscribe callback.
    pub fn handle_unsubscribe(&self, writes: &mut WriteContext, request: &Request) {
        self.check_target(request);
        if let Some(unsubscribe) = self.unsubscribe {
            debug!("CHAR[{}]: calling unsubscribe handler", self.iid);
            writes.will_handle_write(request.session, request.aid, request.iid);
            unsubscribe(request, writes);
            writes.did_handle_write();
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn check_target(&self, request: &Request) {
        debug_assert_eq!(request.iid, self.iid, "CHAR: request addressed to another characteristic");
    }

    fn missing_callback(&self, op: &str) -> Error {
        warn!("CHAR[{}]: no {} callback registered", self.iid, op);
        Error::InvalidState
    }

    /// Passes callback errors through, aborting on any outside `allowed`.
    fn check_allowed<T>(&self, result: Result<T>, allowed: &[Error], op: &str) -> Result<T> {
        if let Err(e) = &result {
            if !allowed.contains(e) {
                error!("CHAR[{}]: {} callback returned unexpected error: {}", self.iid, op, e);
                panic!("CHAR[{}]: {} callback returned {:?}", self.iid, op, e);
            }
        }
        result
    }

    fn read_scalar<T, C>(&self, scalar: &Scalar<'a, T, C>, request: &Request) -> Result<T>
    where
        T: Copy + Debug,
        C: Constraint<T>,
    {
        let read = scalar.read.ok_or_else(|| self.missing_callback("read"))?;
        let value = self.check_allowed(read(request), Error::READ_ALLOWED, "read")?;
        if !scalar.constraints.accepts(value, &self.characteristic_type) {
            warn!("CHAR[{}]: read value {:?} violates constraints", self.iid, value);
            return Err(Error::InvalidData);
        }
        Ok(scalar.constraints.normalize(value))
    }

    fn read_bytes(
        &self,
        read: super::BytesReadFn<'a>,
        request: &Request,
        buf: &mut [u8],
    ) -> Result<usize> {
        let capacity = buf.len();
        let len = self.check_allowed(read(request, buf), Error::READ_ALLOWED, "read")?;
        if len > capacity {
            error!("CHAR[{}]: read callback overflowed its buffer", self.iid);
            panic!("CHAR[{}]: read callback reported {} bytes for a {} byte buffer", self.iid, len, capacity);
        }
        Ok(len)
    }

    fn write_scalar<T, C>(
        &self,
        scalar: &Scalar<'a, T, C>,
        writes: &mut WriteContext,
        request: &WriteRequest<'_>,
        value: T,
    ) -> Result<()>
    where
        T: Copy + Debug,
        C: Constraint<T>,
    {
        if !scalar.constraints.accepts(value, &self.characteristic_type) {
            warn!("CHAR[{}]: value {:?} violates constraints", self.iid, value);
            return Err(Error::InvalidData);
        }
        let value = scalar.constraints.normalize(value);
        let write = scalar.write.ok_or_else(|| self.missing_callback("write"))?;
        self.invoke_write(writes, request, |w| write(request, w, value))
    }

    fn invoke_write<F>(&self, writes: &mut WriteContext, request: &WriteRequest<'_>, f: F) -> Result<()>
    where
        F: FnOnce(&WriteContext) -> Result<()>,
    {
        let r = &request.request;
        debug!("CHAR[{}]: calling write handler", self.iid);
        writes.will_handle_write(r.session, r.aid, r.iid);
        let result = f(writes);
        writes.did_handle_write();
        self.check_allowed(result, Error::WRITE_ALLOWED, "write")
    }
}

// ── Tests ─────────────────────────────────────────────────────
