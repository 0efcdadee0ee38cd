//! Resumable serializer for the JSON attribute database.
//!
//! The document is produced by a state machine that appends one small,
//! self-contained chunk per transition. A call runs transitions until at
//! least `min_bytes` have been written or the document is complete, so the
//! caller can flush a bounded buffer and call again.
//!
//! ```text
//! {"accessories":[
//!   {"aid":1,"services":[
//!     {"iid":1,"type":"3E","primary":false,"hidden":false,"linked":[..],
//!      "characteristics":[
//!        {"iid":2,"type":"23","format":"string","value":"Lamp",
//!         "perms":["pr"],"ev":false,"enc":false,"maxLen":32}
//!      ]}
//!   ]}
//! ]}
//! ```
//!
//! A transition that does not fit in the rest of the buffer fails the call
//! with `OutOfResources` and rolls the context back to where the call
//! started. Services and characteristics that the IP transport does not
//! expose are skipped as part of the transitions that move to the next
//! sibling.

use core::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use log::{debug, error};

use crate::accessory::{Accessory, AttributeDatabase, Service, Transport};
use crate::characteristic::{
    Characteristic, DEFAULT_DATA_MAX_LENGTH, DEFAULT_STRING_MAX_LENGTH, Format, FormatKind, Request,
    UInt8Constraints, Unit, Value,
};
use crate::error::{Error, Result};
use crate::json::{escape_in_place, float_description};
use crate::session::Session;
use crate::uuid::types;

// ═══════════════════════════════════════════════════════════════
//  Context
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ResponseBegin,
    AccessoryBegin,
    AccessorySeparator,
    AccessoryId,
    ServicesArrayBegin,
    ServiceBegin,
    ServiceSeparator,
    ServiceId,
    ServiceType,
    ServicePrimary,
    ServiceHidden,
    LinkedArrayBegin,
    LinkedValue,
    LinkedSeparator,
    LinkedArrayEnd,
    CharacteristicsArrayBegin,
    CharacteristicBegin,
    CharacteristicSeparator,
    CharacteristicId,
    CharacteristicType,
    CharacteristicFormat,
    CharacteristicValue,
    PermissionsBegin,
    Permission,
    PermissionSeparator,
    PermissionsEnd,
    EventNotifications,
    EventContext,
    Description,
    Unit,
    MinimumValue,
    MaximumValue,
    StepValue,
    MaxLength,
    MaxDataLength,
    ValidValuesBegin,
    ValidValue,
    ValidValueSeparator,
    ValidValuesEnd,
    ValidRangesBegin,
    ValidRange,
    ValidRangeSeparator,
    ValidRangesEnd,
    CharacteristicEnd,
    CharacteristicsArrayEnd,
    ServiceEnd,
    ServicesArrayEnd,
    AccessoryEnd,
    AccessoriesArrayEnd,
    ResponseEnd,
    Complete,
}

/// Optional characteristic members, in document order. Each is emitted
/// only if [`has_field`] holds; the scan resumes after the member that was
/// just finished.
const CHARACTERISTIC_FIELDS: [State; 12] = [
    State::CharacteristicFormat,
    State::CharacteristicValue,
    State::PermissionsBegin,
    State::EventNotifications,
    State::EventContext,
    State::Description,
    State::Unit,
    State::MinimumValue,
    State::MaxLength,
    State::MaxDataLength,
    State::ValidValuesBegin,
    State::ValidRangesBegin,
];

/// Position in the attribute database document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializationContext {
    state: State,
    /// Element index inside the array currently being written (perms,
    /// linked services, valid values).
    index: usize,
    accessory_index: usize,
    service_index: usize,
    characteristic_index: usize,
}

impl SerializationContext {
    pub const fn new() -> Self {
        Self {
            state: State::ResponseBegin,
            index: 0,
            accessory_index: 0,
            service_index: 0,
            characteristic_index: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state == State::Complete
    }
}

impl Default for SerializationContext {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Entry point
// ═══════════════════════════════════════════════════════════════

/// Continues serializing the attribute database into `bytes`.
///
/// Returns the number of bytes written, which is at least `min_bytes`
/// unless the document completed first. On `OutOfResources` nothing
/// usable was written and `context` is unchanged.
///
/// # Panics
///
/// If `min_bytes` is 0 or exceeds `bytes.len()`, or the document is
/// already complete.
pub fn serialize_read_response(
    context: &mut SerializationContext,
    db: &AttributeDatabase<'_>,
    session: &dyn Session,
    bytes: &mut [u8],
    min_bytes: usize,
) -> Result<usize> {
    assert!(min_bytes >= 1, "SER: min_bytes must be positive");
    assert!(bytes.len() >= min_bytes, "SER: buffer smaller than min_bytes");
    assert!(!context.is_complete(), "SER: document already complete");

    let saved = *context;
    let mut out = Sink { bytes, len: 0 };
    while out.len < min_bytes && !context.is_complete() {
        if let Err(e) = context.step(db, session, &mut out) {
            if e == Error::OutOfResources {
                error!(
                    "SER: not enough resources to serialize accessory database ({} byte buffer)",
                    out.bytes.len()
                );
            }
            *context = saved;
            return Err(e);
        }
    }
    Ok(out.len)
}

// ═══════════════════════════════════════════════════════════════
//  Transitions
// ═══════════════════════════════════════════════════════════════

impl SerializationContext {
    fn accessory<'d>(&self, db: &AttributeDatabase<'d>) -> &'d Accessory<'d> {
        match self.accessory_index {
            0 => db.primary,
            i => &db.bridged[i - 1],
        }
    }

    fn service<'d>(&self, db: &AttributeDatabase<'d>) -> &'d Service<'d> {
        &self.accessory(db).services[self.service_index]
    }

    fn characteristic<'d>(&self, db: &AttributeDatabase<'d>) -> &'d Characteristic<'d> {
        &self.service(db).characteristics[self.characteristic_index]
    }

    fn step(&mut self, db: &AttributeDatabase<'_>, session: &dyn Session, out: &mut Sink<'_>) -> Result<()> {
        use State as S;
        self.state = match self.state {
            // ── Accessories ──
            S::ResponseBegin => {
                out.emit(format_args!("{{\"accessories\":["))?;
                self.accessory_index = 0;
                S::AccessoryBegin
            }
            S::AccessoryBegin => {
                out.emit(format_args!("{{"))?;
                S::AccessoryId
            }
            S::AccessorySeparator => {
                out.emit(format_args!(","))?;
                S::AccessoryBegin
            }
            S::AccessoryId => {
                out.emit(format_args!("\"aid\":{},", self.accessory(db).aid))?;
                S::ServicesArrayBegin
            }
            S::ServicesArrayBegin => {
                out.emit(format_args!("\"services\":["))?;
                match next_service(self.accessory(db), 0) {
                    Some(i) => {
                        self.service_index = i;
                        S::ServiceBegin
                    }
                    None => S::ServicesArrayEnd,
                }
            }

            // ── Services ──
            S::ServiceBegin => {
                out.emit(format_args!("{{"))?;
                S::ServiceId
            }
            S::ServiceSeparator => {
                out.emit(format_args!(","))?;
                S::ServiceBegin
            }
            S::ServiceId => {
                out.emit(format_args!("\"iid\":{},", self.service(db).iid))?;
                S::ServiceType
            }
            S::ServiceType => {
                let ty = self.service(db).service_type.json_description();
                out.emit(format_args!("\"type\":\"{}\",", ty))?;
                S::ServicePrimary
            }
            S::ServicePrimary => {
                out.emit(format_args!("\"primary\":{},", self.service(db).properties.primary))?;
                S::ServiceHidden
            }
            S::ServiceHidden => {
                let service = self.service(db);
                out.emit(format_args!("\"hidden\":{},", service.properties.hidden))?;
                if service.linked_services.is_empty() {
                    S::CharacteristicsArrayBegin
                } else {
                    S::LinkedArrayBegin
                }
            }
            S::LinkedArrayBegin => {
                out.emit(format_args!("\"linked\":["))?;
                self.index = 0;
                S::LinkedValue
            }
            S::LinkedValue => {
                let linked = self.service(db).linked_services;
                out.emit(format_args!("{}", linked[self.index]))?;
                self.index += 1;
                if self.index < linked.len() {
                    S::LinkedSeparator
                } else {
                    S::LinkedArrayEnd
                }
            }
            S::LinkedSeparator => {
                out.emit(format_args!(","))?;
                S::LinkedValue
            }
            S::LinkedArrayEnd => {
                out.emit(format_args!("],"))?;
                S::CharacteristicsArrayBegin
            }
            S::CharacteristicsArrayBegin => {
                out.emit(format_args!("\"characteristics\":["))?;
                match next_characteristic(self.service(db), 0) {
                    Some(i) => {
                        self.characteristic_index = i;
                        S::CharacteristicBegin
                    }
                    None => S::CharacteristicsArrayEnd,
                }
            }

            // ── Characteristics ──
            S::CharacteristicBegin => {
                out.emit(format_args!("{{"))?;
                S::CharacteristicId
            }
            S::CharacteristicSeparator => {
                out.emit(format_args!(","))?;
                S::CharacteristicBegin
            }
            S::CharacteristicId => {
                out.emit(format_args!("\"iid\":{},", self.characteristic(db).iid))?;
                S::CharacteristicType
            }
            S::CharacteristicType => {
                let ty = self.characteristic(db).characteristic_type.json_description();
                out.emit(format_args!("\"type\":\"{}\",", ty))?;
                S::CharacteristicFormat
            }
            S::CharacteristicFormat => {
                let c = self.characteristic(db);
                out.emit(format_args!("\"format\":\"{}\",", c.format_kind().json_name()))?;
                next_field(S::CharacteristicFormat, c)
            }
            S::CharacteristicValue => {
                let c = self.characteristic(db);
                let request = Request {
                    transport: Transport::Ip,
                    session: session.id(),
                    aid: self.accessory(db).aid,
                    service_iid: self.service(db).iid,
                    iid: c.iid,
                };
                out.emit_with(|buf| render_value_member(buf, c, &request))?;
                next_field(S::CharacteristicValue, c)
            }
            S::PermissionsBegin => {
                let c = self.characteristic(db);
                out.emit(format_args!("\"perms\":["))?;
                self.index = 0;
                if c.properties.permissions().is_empty() {
                    S::PermissionsEnd
                } else {
                    S::Permission
                }
            }
            S::Permission => {
                let perms = self.characteristic(db).properties.permissions();
                out.emit(format_args!("\"{}\"", perms[self.index]))?;
                self.index += 1;
                if self.index < perms.len() {
                    S::PermissionSeparator
                } else {
                    S::PermissionsEnd
                }
            }
            S::PermissionSeparator => {
                out.emit(format_args!(","))?;
                S::Permission
            }
            S::PermissionsEnd => {
                out.emit(format_args!("]"))?;
                next_field(S::PermissionsBegin, self.characteristic(db))
            }
            S::EventNotifications => {
                let c = self.characteristic(db);
                let enabled = session.are_events_enabled(self.accessory(db).aid, c.iid);
                out.emit(format_args!(",\"ev\":{}", enabled))?;
                next_field(S::EventNotifications, c)
            }
            S::EventContext => {
                let c = self.characteristic(db);
                let enc = c.properties.supports_event_notification_context_information;
                out.emit(format_args!(",\"enc\":{}", enc))?;
                next_field(S::EventContext, c)
            }
            S::Description => {
                let c = self.characteristic(db);
                let text = c.manufacturer_description.unwrap_or_default();
                out.emit_with(|buf| render_description_member(buf, text))?;
                next_field(S::Description, c)
            }
            S::Unit => {
                let c = self.characteristic(db);
                let name = c.unit().json_name().unwrap_or_default();
                out.emit(format_args!(",\"unit\":\"{}\"", name))?;
                next_field(S::Unit, c)
            }
            S::MinimumValue => {
                emit_bound(out, self.characteristic(db), Bound::Min)?;
                S::MaximumValue
            }
            S::MaximumValue => {
                emit_bound(out, self.characteristic(db), Bound::Max)?;
                S::StepValue
            }
            S::StepValue => {
                let c = self.characteristic(db);
                emit_bound(out, c, Bound::Step)?;
                next_field(S::MinimumValue, c)
            }
            S::MaxLength => {
                let c = self.characteristic(db);
                if let Format::String(f) = &c.format {
                    out.emit(format_args!(",\"maxLen\":{}", f.max_length))?;
                }
                next_field(S::MaxLength, c)
            }
            S::MaxDataLength => {
                let c = self.characteristic(db);
                if let Format::Data(f) = &c.format {
                    out.emit(format_args!(",\"maxDataLen\":{}", f.max_length))?;
                }
                next_field(S::MaxDataLength, c)
            }

            // ── UInt8 enumerations ──
            S::ValidValuesBegin => {
                let values = valid_values(self.characteristic(db));
                out.emit(format_args!(",\"valid-values\":["))?;
                self.index = 0;
                if values.is_empty() { S::ValidValuesEnd } else { S::ValidValue }
            }
            S::ValidValue => {
                let values = valid_values(self.characteristic(db));
                out.emit(format_args!("{}", values[self.index]))?;
                self.index += 1;
                if self.index < values.len() {
                    S::ValidValueSeparator
                } else {
                    S::ValidValuesEnd
                }
            }
            S::ValidValueSeparator => {
                out.emit(format_args!(","))?;
                S::ValidValue
            }
            S::ValidValuesEnd => {
                out.emit(format_args!("]"))?;
                next_field(S::ValidValuesBegin, self.characteristic(db))
            }
            S::ValidRangesBegin => {
                let ranges = valid_ranges(self.characteristic(db));
                out.emit(format_args!(",\"valid-values-range\":["))?;
                self.index = 0;
                if ranges.is_empty() { S::ValidRangesEnd } else { S::ValidRange }
            }
            S::ValidRange => {
                let ranges = valid_ranges(self.characteristic(db));
                let r = ranges[self.index];
                out.emit(format_args!("[{},{}]", r.start, r.end))?;
                self.index += 1;
                if self.index < ranges.len() {
                    S::ValidRangeSeparator
                } else {
                    S::ValidRangesEnd
                }
            }
            S::ValidRangeSeparator => {
                out.emit(format_args!(","))?;
                S::ValidRange
            }
            S::ValidRangesEnd => {
                out.emit(format_args!("]"))?;
                next_field(S::ValidRangesBegin, self.characteristic(db))
            }

            // ── Closing ──
            S::CharacteristicEnd => {
                out.emit(format_args!("}}"))?;
                match next_characteristic(self.service(db), self.characteristic_index + 1) {
                    Some(i) => {
                        self.characteristic_index = i;
                        S::CharacteristicSeparator
                    }
                    None => S::CharacteristicsArrayEnd,
                }
            }
            S::CharacteristicsArrayEnd => {
                out.emit(format_args!("]"))?;
                S::ServiceEnd
            }
            S::ServiceEnd => {
                out.emit(format_args!("}}"))?;
                match next_service(self.accessory(db), self.service_index + 1) {
                    Some(i) => {
                        self.service_index = i;
                        S::ServiceSeparator
                    }
                    None => S::ServicesArrayEnd,
                }
            }
            S::ServicesArrayEnd => {
                out.emit(format_args!("]"))?;
                S::AccessoryEnd
            }
            S::AccessoryEnd => {
                out.emit(format_args!("}}"))?;
                if self.accessory_index + 1 < db.accessory_count() {
                    self.accessory_index += 1;
                    S::AccessorySeparator
                } else {
                    S::AccessoriesArrayEnd
                }
            }
            S::AccessoriesArrayEnd => {
                out.emit(format_args!("]"))?;
                S::ResponseEnd
            }
            S::ResponseEnd => {
                out.emit(format_args!("}}"))?;
                S::Complete
            }
            S::Complete => S::Complete,
        };
        Ok(())
    }
}

fn next_service(accessory: &Accessory<'_>, from: usize) -> Option<usize> {
    (from..accessory.services.len()).find(|&i| Transport::Ip.supports_service(&accessory.services[i]))
}

fn next_characteristic(service: &Service<'_>, from: usize) -> Option<usize> {
    (from..service.characteristics.len())
        .find(|&i| Transport::Ip.supports_characteristic(&service.characteristics[i]))
}

/// First member after `after` that `c` carries, or the closing brace.
fn next_field(after: State, c: &Characteristic<'_>) -> State {
    let start = CHARACTERISTIC_FIELDS
        .iter()
        .position(|&s| s == after)
        .map_or(CHARACTERISTIC_FIELDS.len(), |p| p + 1);
    CHARACTERISTIC_FIELDS[start..]
        .iter()
        .copied()
        .find(|&s| has_field(s, c))
        .unwrap_or(State::CharacteristicEnd)
}

fn has_field(field: State, c: &Characteristic<'_>) -> bool {
    match field {
        State::CharacteristicValue | State::EventNotifications | State::EventContext => c.properties.readable,
        State::PermissionsBegin => true,
        State::Description => c.manufacturer_description.is_some(),
        State::Unit => c.unit() != Unit::None,
        State::MinimumValue => has_range(c),
        State::MaxLength => matches!(&c.format, Format::String(f) if f.max_length != DEFAULT_STRING_MAX_LENGTH),
        State::MaxDataLength => matches!(&c.format, Format::Data(f) if f.max_length != DEFAULT_DATA_MAX_LENGTH),
        State::ValidValuesBegin => uint8_lists(c).is_some_and(|k| k.valid_values.is_some()),
        State::ValidRangesBegin => uint8_lists(c).is_some_and(|k| k.valid_values_ranges.is_some()),
        _ => false,
    }
}

/// Numeric ranges other than the type's full domain are serialized.
fn has_range(c: &Characteristic<'_>) -> bool {
    match &c.format {
        Format::UInt8(s) => !s.constraints.range.is_full_range(),
        Format::UInt16(s) => !s.constraints.is_full_range(),
        Format::UInt32(s) => !s.constraints.is_full_range(),
        Format::UInt64(s) => !s.constraints.is_full_range(),
        Format::Int(s) => !s.constraints.is_full_range(),
        Format::Float(s) => !s.constraints.is_unbounded(),
        _ => false,
    }
}

/// Enumerations only exist on Apple-defined UInt8 characteristics.
fn uint8_lists<'c, 'a>(c: &'c Characteristic<'a>) -> Option<&'c UInt8Constraints<'a>> {
    match &c.format {
        Format::UInt8(s) if c.characteristic_type.is_apple_defined() => Some(&s.constraints),
        _ => None,
    }
}

fn valid_values<'a>(c: &Characteristic<'a>) -> &'a [u8] {
    uint8_lists(c).and_then(|k| k.valid_values).unwrap_or_default()
}

fn valid_ranges<'a>(c: &Characteristic<'a>) -> &'a [crate::characteristic::ValidValuesRange] {
    uint8_lists(c).and_then(|k| k.valid_values_ranges).unwrap_or_default()
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Min,
    Max,
    Step,
}

impl Bound {
    fn key(self) -> &'static str {
        match self {
            Self::Min => "minValue",
            Self::Max => "maxValue",
            Self::Step => "minStep",
        }
    }

    fn pick<T>(self, min: T, max: T, step: T) -> T {
        match self {
            Self::Min => min,
            Self::Max => max,
            Self::Step => step,
        }
    }
}

fn emit_bound(out: &mut Sink<'_>, c: &Characteristic<'_>, bound: Bound) -> Result<()> {
    let key = bound.key();
    macro_rules! integer {
        ($r:expr) => {{
            let r = $r;
            out.emit(format_args!(",\"{}\":{}", key, bound.pick(r.min, r.max, r.step)))
        }};
    }
    match &c.format {
        Format::UInt8(s) => integer!(s.constraints.range),
        Format::UInt16(s) => integer!(s.constraints),
        Format::UInt32(s) => integer!(s.constraints),
        Format::UInt64(s) => integer!(s.constraints),
        Format::Int(s) => integer!(s.constraints),
        Format::Float(s) => {
            let r = s.constraints;
            let text = float_description(bound.pick(r.min, r.max, r.step));
            out.emit(format_args!(",\"{}\":{}", key, text))
        }
        _ => Ok(()),
    }
}

// ═══════════════════════════════════════════════════════════════
//  Values
// ═══════════════════════════════════════════════════════════════

/// `"value":<v>,` for a readable characteristic.
fn render_value_member(out: &mut [u8], c: &Characteristic<'_>, request: &Request) -> Result<usize> {
    const HEAD: &[u8] = b"\"value\":";
    if out.len() < HEAD.len() + 1 {
        return Err(Error::OutOfResources);
    }
    out[..HEAD.len()].copy_from_slice(HEAD);
    let end = out.len() - 1;
    let n = render_value(&mut out[HEAD.len()..end], c, request)?;
    let pos = HEAD.len() + n;
    out[pos] = b',';
    Ok(pos + 1)
}

fn render_value(out: &mut [u8], c: &Characteristic<'_>, request: &Request) -> Result<usize> {
    if out.len() < 2 {
        return Err(Error::OutOfResources);
    }
    let kind = c.format_kind();
    let ty = c.characteristic_type;
    if ty == types::BUTTON_EVENT || ty == types::PROGRAMMABLE_SWITCH_EVENT {
        debug!("SER[{}]: event-only characteristic, sending null", c.iid);
        return copy_literal(out, "null");
    }
    if kind == FormatKind::Tlv8 && c.properties.ip.control_point {
        return copy_literal(out, "\"\"");
    }

    let end = out.len() - 1;
    let value = match c.handle_read(request, &mut out[1..end]) {
        Ok(v) => v,
        Err(e) => {
            debug!("SER[{}]: read failed ({}), sending empty value", c.iid, e);
            return copy_literal(out, if kind == FormatKind::Tlv8 { "\"\"" } else { "null" });
        }
    };
    match value {
        Value::Bool(v) => format_into(out, format_args!("{}", u8::from(v))),
        Value::UInt8(v) => format_into(out, format_args!("{}", v)),
        Value::UInt16(v) => format_into(out, format_args!("{}", v)),
        Value::UInt32(v) => format_into(out, format_args!("{}", v)),
        Value::UInt64(v) => format_into(out, format_args!("{}", v)),
        Value::Int(v) => format_into(out, format_args!("{}", v)),
        Value::Float(v) => format_into(out, format_args!("{}", float_description(v))),
        Value::String(text) => {
            let len = text.len();
            quote(out, |region| escape_in_place(region, len))
        }
        Value::Data(bytes) | Value::Tlv8(bytes) => {
            let len = bytes.len();
            quote(out, |region| base64_in_place(region, len))
        }
    }
}

/// `,"description":"<escaped>"`.
fn render_description_member(out: &mut [u8], text: &str) -> Result<usize> {
    const HEAD: &[u8] = b",\"description\":";
    if out.len() < HEAD.len() + 2 + text.len() {
        return Err(Error::OutOfResources);
    }
    out[..HEAD.len()].copy_from_slice(HEAD);
    let rest = &mut out[HEAD.len()..];
    rest[1..=text.len()].copy_from_slice(text.as_bytes());
    let n = quote(rest, |region| escape_in_place(region, text.len()))?;
    Ok(HEAD.len() + n)
}

/// Wraps the content produced by `f` in `out[1..]` with quotes. The last
/// byte of `out` is reserved for the closing quote.
fn quote(out: &mut [u8], f: impl FnOnce(&mut [u8]) -> Result<usize>) -> Result<usize> {
    let end = out.len() - 1;
    let n = f(&mut out[1..end])?;
    out[0] = b'"';
    out[n + 1] = b'"';
    Ok(n + 2)
}

/// Base64-encodes `buf[..len]` in place.
///
/// The raw bytes are first parked at the end of `buf`; encoding then runs
/// front to back, and the output never overtakes the unread input as long
/// as the encoded form fits.
fn base64_in_place(buf: &mut [u8], len: usize) -> Result<usize> {
    let encoded = base64::encoded_len(len, true).ok_or(Error::OutOfResources)?;
    if encoded > buf.len() {
        return Err(Error::OutOfResources);
    }
    let cap = buf.len();
    buf.copy_within(..len, cap - len);

    let mut dst = 0;
    for start in (cap - len..cap).step_by(3) {
        let n = (cap - start).min(3);
        let mut chunk = [0u8; 3];
        chunk[..n].copy_from_slice(&buf[start..start + n]);
        dst += STANDARD
            .encode_slice(&chunk[..n], &mut buf[dst..dst + 4])
            .map_err(|_| Error::OutOfResources)?;
    }
    Ok(dst)
}

fn copy_literal(out: &mut [u8], text: &str) -> Result<usize> {
    let Some(dst) = out.get_mut(..text.len()) else {
        return Err(Error::OutOfResources);
    };
    dst.copy_from_slice(text.as_bytes());
    Ok(text.len())
}

// ── Internal ──────────────────────────────────────────────────

/// Output buffer. Bytes past `len` are scratch until committed.
struct Sink<'b> {
    bytes: &'b mut [u8],
    len: usize,
}

impl Sink<'_> {
    fn emit(&mut self, args: fmt::Arguments<'_>) -> Result<()> {
        let n = format_into(&mut self.bytes[self.len..], args)?;
        self.len += n;
        Ok(())
    }

    fn emit_with(&mut self, f: impl FnOnce(&mut [u8]) -> Result<usize>) -> Result<()> {
        let n = f(&mut self.bytes[self.len..])?;
        self.len += n;
        Ok(())
    }
}

struct SliceWriter<'b> {
    buf: &'b mut [u8],
    pos: usize,
}

impl fmt::Write for SliceWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.pos + s.len();
        let dst = self.buf.get_mut(self.pos..end).ok_or(fmt::Error)?;
        dst.copy_from_slice(s.as_bytes());
        self.pos = end;
        Ok(())
    }
}

fn format_into(out: &mut [u8], args: fmt::Arguments<'_>) -> Result<usize> {
    let mut w = SliceWriter { buf: out, pos: 0 };
    fmt::write(&mut w, args).map_err(|_| Error::OutOfResources)?;
    Ok(w.pos)
}

// ── Tests ─────────────────────────────────────────────────────
