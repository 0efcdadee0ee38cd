//! Shared fixtures: a recording session and a small bridge graph.
//!
//! Graphs borrow their callbacks, so they are built inside `with_*`
//! helpers and handed to the test as a closure argument.

use std::cell::Cell;

use hapstack::characteristic::{Scalar, StringFormat, UInt8Constraints};
use hapstack::uuid::types;
use hapstack::{
    Accessory, AttributeDatabase, Characteristic, Format, Properties, Request, SerializationContext, Service,
    ServiceProperties, Session, SessionId, Transport, Unit, WriteContext, WriteRequest, serialize_read_response,
};

// ── Session ───────────────────────────────────────────────────

pub struct TestSession {
    pub id: u32,
    pub events: bool,
}

impl Session for TestSession {
    fn id(&self) -> SessionId {
        SessionId(self.id)
    }

    fn are_events_enabled(&self, _aid: u64, _iid: u64) -> bool {
        self.events
    }
}

pub const QUIET: TestSession = TestSession { id: 1, events: false };

pub fn request(aid: u64, service_iid: u64, iid: u64) -> Request {
    Request {
        transport: Transport::Ip,
        session: SessionId(1),
        aid,
        service_iid,
        iid,
    }
}

// ── Serialization helpers ─────────────────────────────────────

/// Serializes the whole document in one call.
pub fn serialize_whole(db: &AttributeDatabase<'_>, session: &dyn Session) -> String {
    let mut context = SerializationContext::new();
    let mut buf = vec![0u8; 16 * 1024];
    let len = buf.len();
    let n = serialize_read_response(&mut context, db, session, &mut buf, len).unwrap();
    assert!(context.is_complete(), "document did not fit in one call");
    String::from_utf8(buf[..n].to_vec()).unwrap()
}

/// Serializes with `min_bytes` per call and concatenates the chunks.
pub fn serialize_chunked(db: &AttributeDatabase<'_>, session: &dyn Session, min_bytes: usize) -> String {
    let mut context = SerializationContext::new();
    let mut buf = vec![0u8; min_bytes + 1024];
    let mut out = Vec::new();
    while !context.is_complete() {
        let n = serialize_read_response(&mut context, db, session, &mut buf, min_bytes).unwrap();
        assert!(n >= min_bytes || context.is_complete());
        out.extend_from_slice(&buf[..n]);
    }
    String::from_utf8(out).unwrap()
}

pub fn copy_str(buf: &mut [u8], s: &str) -> hapstack::Result<usize> {
    let dst = buf.get_mut(..s.len()).ok_or(hapstack::Error::OutOfResources)?;
    dst.copy_from_slice(s.as_bytes());
    Ok(s.len())
}

// ── Graphs ────────────────────────────────────────────────────

/// Bridge (aid 1) with one bridged light bulb (aid 2).
///
/// Bulb state lives in `on` / `level` so tests can observe writes.
pub fn with_bridge<R>(on: &Cell<bool>, level: &Cell<u8>, f: impl FnOnce(&AttributeDatabase<'_>) -> R) -> R {
    let read_bridge_name = |_: &Request, buf: &mut [u8]| -> hapstack::Result<usize> { copy_str(buf, "Bridge") };
    let read_bulb_name = |_: &Request, buf: &mut [u8]| -> hapstack::Result<usize> { copy_str(buf, "Bulb \"1\"") };
    let read_on = |_: &Request| -> hapstack::Result<bool> { Ok(on.get()) };
    let write_on = |_: &WriteRequest<'_>, _: &WriteContext, v: bool| -> hapstack::Result<()> {
        on.set(v);
        Ok(())
    };
    let read_level = |_: &Request| -> hapstack::Result<u8> { Ok(level.get()) };
    let write_level = |_: &WriteRequest<'_>, _: &WriteContext, v: u8| -> hapstack::Result<()> {
        level.set(v);
        Ok(())
    };

    let identify = Properties { writable: true, ..Properties::none() };
    let bridge_info = [
        Characteristic::new(2, types::IDENTIFY, "identify", Format::Bool(Scalar::default())).with_properties(identify),
        Characteristic::new(
            3,
            types::NAME,
            "name",
            Format::String(StringFormat { read: Some(&read_bridge_name), ..StringFormat::default() }),
        )
        .with_properties(Properties::read_only()),
    ];
    let bulb_info = [
        Characteristic::new(2, types::IDENTIFY, "identify", Format::Bool(Scalar::default())).with_properties(identify),
        Characteristic::new(
            3,
            types::NAME,
            "name",
            Format::String(StringFormat { read: Some(&read_bulb_name), ..StringFormat::default() }),
        )
        .with_properties(Properties::read_only()),
    ];
    let bulb = [
        Characteristic::new(
            11,
            types::ON,
            "on",
            Format::Bool(Scalar::default().on_read(&read_on).on_write(&write_on)),
        )
        .with_properties(Properties::read_write_notify()),
        Characteristic::new(
            12,
            types::BRIGHTNESS,
            "brightness",
            Format::UInt8(
                Scalar::new(UInt8Constraints::from_range(0, 100, 1))
                    .on_read(&read_level)
                    .on_write(&write_level),
            ),
        )
        .with_properties(Properties::read_write_notify())
        .with_unit(Unit::Percentage),
    ];
    let pairing = [];

    let bridge_services = [
        Service::new(1, types::ACCESSORY_INFORMATION, "info", &bridge_info),
        Service::new(5, types::PAIRING, "pairing", &pairing),
    ];
    let linked = [1u16];
    let bulb_services = [
        Service::new(1, types::ACCESSORY_INFORMATION, "info", &bulb_info),
        Service::new(10, types::LIGHTBULB, "bulb", &bulb)
            .with_properties(ServiceProperties { primary: true, ..ServiceProperties::default() })
            .with_linked_services(&linked),
    ];
    let primary = Accessory { aid: 1, name: "Bridge", services: &bridge_services };
    let bridged = [Accessory { aid: 2, name: "Bulb", services: &bulb_services }];
    let db = AttributeDatabase::new(&primary, &bridged);
    f(&db)
}
