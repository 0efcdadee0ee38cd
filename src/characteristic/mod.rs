//! Characteristic value codec.
//!
//! A characteristic is one typed value on a service. Its [`Format`] is a
//! tagged enum with one variant per wire format; each variant carries the
//! constraints and the application callbacks for that value shape.
//!
//! ```text
//!  controller ──► handle_write ──► constraints ──► will_handle_write
//!                                                   │
//!                                             app write callback
//!                                                   │
//!                                              did_handle_write
//!
//!  serializer ──► handle_read ──► app read callback ──► constraints ──► rounding
//! ```
//!
//! Callbacks are borrowed `&dyn Fn` so the whole graph can live in
//! statics or on the stack without allocation.

pub mod constraints;
mod dispatch;

pub use constraints::{
    Constraint, DEFAULT_DATA_MAX_LENGTH, DEFAULT_STRING_MAX_LENGTH, FLOAT_STEP_TOLERANCE, FloatRange,
    NumericRange, UInt8Constraints, Unconstrained, ValidValuesRange,
};
pub use dispatch::{Value, WriteValue};

use core::fmt;

use heapless::Vec;

use crate::accessory::Transport;
use crate::error::Result;
use crate::session::SessionId;
use crate::tlv::{TlvReader, TlvWriter};
use crate::uuid::Uuid;

// ═══════════════════════════════════════════════════════════════
//  Requests
// ═══════════════════════════════════════════════════════════════

/// Addressing shared by every callback invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub transport: Transport,
    pub session: SessionId,
    pub aid: u64,
    pub service_iid: u64,
    pub iid: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRequest<'r> {
    pub request: Request,
    /// Write arrived through a remote (relayed) connection.
    pub remote: bool,
    /// Additional authorization data supplied with the write.
    pub authorization_data: Option<&'r [u8]>,
}

impl<'r> WriteRequest<'r> {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            remote: false,
            authorization_data: None,
        }
    }
}

/// Record of the write (or subscription change) currently being handled.
///
/// Application code consults it to tell a value change it caused itself
/// from one caused by a controller, so it does not echo an event back to
/// the session that made the change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteContext {
    in_flight: Option<(SessionId, u64, u64)>,
}

impl WriteContext {
    pub const fn new() -> Self {
        Self { in_flight: None }
    }

    /// # Panics
    ///
    /// If another write is still being handled.
    pub fn will_handle_write(&mut self, session: SessionId, aid: u64, iid: u64) {
        assert!(
            self.in_flight.is_none(),
            "CHAR[{aid}.{iid}]: write started while {:?} is in flight",
            self.in_flight
        );
        self.in_flight = Some((session, aid, iid));
    }

    /// # Panics
    ///
    /// If no write is being handled.
    pub fn did_handle_write(&mut self) {
        assert!(self.in_flight.is_some(), "CHAR: no write in flight");
        self.in_flight = None;
    }

    pub fn is_handling_write(&self, session: SessionId, aid: u64, iid: u64) -> bool {
        self.in_flight == Some((session, aid, iid))
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_none()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Callbacks
// ═══════════════════════════════════════════════════════════════

pub type ReadFn<'a, T> = &'a dyn Fn(&Request) -> Result<T>;
pub type WriteFn<'a, T> = &'a dyn Fn(&WriteRequest<'_>, &WriteContext, T) -> Result<()>;

/// Fills the buffer and returns the number of bytes written.
pub type BytesReadFn<'a> = &'a dyn Fn(&Request, &mut [u8]) -> Result<usize>;
pub type BytesWriteFn<'a> = &'a dyn Fn(&WriteRequest<'_>, &WriteContext, &[u8]) -> Result<()>;
pub type StringWriteFn<'a> = &'a dyn Fn(&WriteRequest<'_>, &WriteContext, &str) -> Result<()>;

pub type Tlv8ReadFn<'a> = &'a dyn Fn(&Request, &mut TlvWriter<'_>) -> Result<()>;
pub type Tlv8WriteFn<'a> = &'a dyn Fn(&WriteRequest<'_>, &WriteContext, &mut TlvReader<'_>) -> Result<()>;

/// Subscribe / unsubscribe notification.
pub type NotifyFn<'a> = &'a dyn Fn(&Request, &WriteContext);

// ═══════════════════════════════════════════════════════════════
//  Formats
// ═══════════════════════════════════════════════════════════════

/// A fixed-size value with a constraint strategy.
pub struct Scalar<'a, T: Copy, C: Constraint<T>> {
    pub constraints: C,
    pub read: Option<ReadFn<'a, T>>,
    pub write: Option<WriteFn<'a, T>>,
}

impl<'a, T: Copy, C: Constraint<T>> Scalar<'a, T, C> {
    pub fn new(constraints: C) -> Self {
        Self {
            constraints,
            read: None,
            write: None,
        }
    }

    #[must_use]
    pub fn on_read(mut self, read: ReadFn<'a, T>) -> Self {
        self.read = Some(read);
        self
    }

    #[must_use]
    pub fn on_write(mut self, write: WriteFn<'a, T>) -> Self {
        self.write = Some(write);
        self
    }
}

impl<T: Copy, C: Constraint<T> + Default> Default for Scalar<'_, T, C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

pub struct DataFormat<'a> {
    pub max_length: usize,
    pub read: Option<BytesReadFn<'a>>,
    pub write: Option<BytesWriteFn<'a>>,
}

impl Default for DataFormat<'_> {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_DATA_MAX_LENGTH,
            read: None,
            write: None,
        }
    }
}

pub struct StringFormat<'a> {
    pub max_length: usize,
    pub read: Option<BytesReadFn<'a>>,
    pub write: Option<StringWriteFn<'a>>,
}

impl Default for StringFormat<'_> {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_STRING_MAX_LENGTH,
            read: None,
            write: None,
        }
    }
}

#[derive(Default)]
pub struct Tlv8Format<'a> {
    pub read: Option<Tlv8ReadFn<'a>>,
    pub write: Option<Tlv8WriteFn<'a>>,
}

/// Value format together with its constraints and callbacks.
pub enum Format<'a> {
    Data(DataFormat<'a>),
    Bool(Scalar<'a, bool, Unconstrained>),
    UInt8(Scalar<'a, u8, UInt8Constraints<'a>>),
    UInt16(Scalar<'a, u16, NumericRange<u16>>),
    UInt32(Scalar<'a, u32, NumericRange<u32>>),
    UInt64(Scalar<'a, u64, NumericRange<u64>>),
    Int(Scalar<'a, i32, NumericRange<i32>>),
    Float(Scalar<'a, f32, FloatRange>),
    String(StringFormat<'a>),
    Tlv8(Tlv8Format<'a>),
}

impl Format<'_> {
    pub fn kind(&self) -> FormatKind {
        match self {
            Self::Data(_) => FormatKind::Data,
            Self::Bool(_) => FormatKind::Bool,
            Self::UInt8(_) => FormatKind::UInt8,
            Self::UInt16(_) => FormatKind::UInt16,
            Self::UInt32(_) => FormatKind::UInt32,
            Self::UInt64(_) => FormatKind::UInt64,
            Self::Int(_) => FormatKind::Int,
            Self::Float(_) => FormatKind::Float,
            Self::String(_) => FormatKind::String,
            Self::Tlv8(_) => FormatKind::Tlv8,
        }
    }
}

/// Format tag without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    Data,
    Bool,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int,
    Float,
    String,
    Tlv8,
}

impl FormatKind {
    /// Name used in the `"format"` field of the JSON database.
    pub const fn json_name(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Bool => "bool",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Tlv8 => "tlv8",
        }
    }

    /// Bluetooth SIG presentation format code.
    pub const fn bt_sig_code(self) -> u8 {
        match self {
            Self::Bool => 0x01,
            Self::UInt8 => 0x04,
            Self::UInt16 => 0x06,
            Self::UInt32 => 0x08,
            Self::UInt64 => 0x0A,
            Self::Int => 0x10,
            Self::Float => 0x14,
            Self::String => 0x19,
            Self::Data | Self::Tlv8 => 0x1B,
        }
    }

    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64 | Self::Int | Self::Float
        )
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.json_name())
    }
}

/// Unit of a numeric value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Unit {
    #[default]
    None,
    Celsius,
    ArcDegrees,
    Percentage,
    Lux,
    Seconds,
}

impl Unit {
    /// Name used in the `"unit"` field; `None` for unitless values.
    pub const fn json_name(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Celsius => Some("celsius"),
            Self::ArcDegrees => Some("arcdegrees"),
            Self::Percentage => Some("percentage"),
            Self::Lux => Some("lux"),
            Self::Seconds => Some("seconds"),
        }
    }

    /// Bluetooth SIG unit code.
    pub const fn bt_sig_code(self) -> u16 {
        match self {
            Self::None => 0x2700,
            Self::Celsius => 0x272F,
            Self::ArcDegrees => 0x2763,
            Self::Percentage => 0x27AD,
            Self::Lux => 0x2731,
            Self::Seconds => 0x2703,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Properties
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IpProperties {
    /// Write-only value whose writes are answered through a read.
    pub control_point: bool,
    pub supports_write_response: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BleProperties {
    pub supports_broadcast_notification: bool,
    pub supports_disconnected_notification: bool,
    pub readable_without_security: bool,
    pub writable_without_security: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Properties {
    pub readable: bool,
    pub writable: bool,
    pub supports_event_notification: bool,
    pub hidden: bool,
    pub read_requires_admin: bool,
    pub write_requires_admin: bool,
    pub requires_timed_write: bool,
    pub supports_authorization_data: bool,
    pub supports_event_notification_context_information: bool,
    pub ip: IpProperties,
    pub ble: BleProperties,
}

/// Maximum number of entries in a `"perms"` array.
pub const MAX_PERMISSIONS: usize = 8;

impl Properties {
    /// Readable, writable and notifying.
    pub const fn read_write_notify() -> Self {
        let mut p = Self::none();
        p.readable = true;
        p.writable = true;
        p.supports_event_notification = true;
        p
    }

    pub const fn read_only() -> Self {
        let mut p = Self::none();
        p.readable = true;
        p
    }

    pub const fn none() -> Self {
        Self {
            readable: false,
            writable: false,
            supports_event_notification: false,
            hidden: false,
            read_requires_admin: false,
            write_requires_admin: false,
            requires_timed_write: false,
            supports_authorization_data: false,
            supports_event_notification_context_information: false,
            ip: IpProperties {
                control_point: false,
                supports_write_response: false,
            },
            ble: BleProperties {
                supports_broadcast_notification: false,
                supports_disconnected_notification: false,
                readable_without_security: false,
                writable_without_security: false,
            },
        }
    }

    /// Permission tokens in wire order: pr, pw, ev, enc, aa, tw, wr, hd.
    pub fn permissions(&self) -> Vec<&'static str, MAX_PERMISSIONS> {
        let flags = [
            (self.readable, "pr"),
            (self.writable, "pw"),
            (self.supports_event_notification, "ev"),
            (self.supports_event_notification_context_information, "enc"),
            (self.supports_authorization_data, "aa"),
            (self.requires_timed_write, "tw"),
            (self.ip.supports_write_response, "wr"),
            (self.hidden, "hd"),
        ];
        let mut out = Vec::new();
        for (_, token) in flags.into_iter().filter(|(on, _)| *on) {
            // Eight flags, eight slots.
            let _ = out.push(token);
        }
        out
    }
}

// ═══════════════════════════════════════════════════════════════
//  Characteristic
// ═══════════════════════════════════════════════════════════════

pub struct Characteristic<'a> {
    pub iid: u64,
    pub characteristic_type: Uuid,
    pub debug_description: &'a str,
    /// Free-form description shown to users.
    pub manufacturer_description: Option<&'a str>,
    pub properties: Properties,
    pub unit: Unit,
    pub format: Format<'a>,
    pub subscribe: Option<NotifyFn<'a>>,
    pub unsubscribe: Option<NotifyFn<'a>>,
}

impl<'a> Characteristic<'a> {
    pub fn new(iid: u64, characteristic_type: Uuid, debug_description: &'a str, format: Format<'a>) -> Self {
        Self {
            iid,
            characteristic_type,
            debug_description,
            manufacturer_description: None,
            properties: Properties::none(),
            unit: Unit::None,
            format,
            subscribe: None,
            unsubscribe: None,
        }
    }

    #[must_use]
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    #[must_use]
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    #[must_use]
    pub fn with_manufacturer_description(mut self, description: &'a str) -> Self {
        self.manufacturer_description = Some(description);
        self
    }

    #[must_use]
    pub fn on_subscribe(mut self, f: NotifyFn<'a>) -> Self {
        self.subscribe = Some(f);
        self
    }

    #[must_use]
    pub fn on_unsubscribe(mut self, f: NotifyFn<'a>) -> Self {
        self.unsubscribe = Some(f);
        self
    }

    pub fn format_kind(&self) -> FormatKind {
        self.format.kind()
    }

    /// Units only apply to numeric formats.
    pub fn unit(&self) -> Unit {
        if self.format_kind().is_numeric() {
            self.unit
        } else {
            Unit::None
        }
    }
}

impl fmt::Debug for Characteristic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Characteristic")
            .field("iid", &self.iid)
            .field("type", &self.characteristic_type)
            .field("debug_description", &self.debug_description)
            .field("format", &self.format_kind())
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────
