//! Attribute database serializer: full documents, chunked resumption and
//! retry after `OutOfResources`.

use std::cell::Cell;

use hapstack::characteristic::Scalar;
use hapstack::uuid::types;
use hapstack::{
    Accessory, AttributeDatabase, Characteristic, Error, Format, Properties, Request, SerializationContext,
    Service, ServiceProperties, serialize_read_response,
};

use crate::fixtures::{QUIET, TestSession, serialize_chunked, serialize_whole, with_bridge};

#[test]
fn single_bool_accessory_end_to_end() {
    let read = |_: &Request| -> hapstack::Result<bool> { Ok(true) };
    let chars = [Characteristic::new(2, types::ON, "on", Format::Bool(Scalar::default().on_read(&read)))
        .with_properties(Properties { readable: true, writable: true, ..Properties::none() })];
    let services = [Service::new(1, types::LIGHTBULB, "bulb", &chars)
        .with_properties(ServiceProperties { primary: true, ..ServiceProperties::default() })];
    let accessory = Accessory { aid: 1, name: "Lamp", services: &services };
    let db = AttributeDatabase::new(&accessory, &[]);

    let mut context = SerializationContext::new();
    let mut buf = [0u8; 4096];
    let n = serialize_read_response(&mut context, &db, &QUIET, &mut buf, 4096).unwrap();
    assert!(context.is_complete());

    let doc = core::str::from_utf8(&buf[..n]).unwrap();
    assert!(doc.contains(r#""aid":1"#));
    assert!(doc.contains(r#"{"iid":1,"type":"43","primary":true"#));
    assert!(doc.contains(r#""value":1,"perms":["pr","pw"]"#));

    // A minimum of one byte per call yields the same document.
    assert_eq!(serialize_chunked(&db, &QUIET, 1), doc);
}

#[test]
fn bridge_document_is_valid_json() {
    let on = Cell::new(true);
    let level = Cell::new(40);
    let doc = with_bridge(&on, &level, |db| serialize_whole(db, &TestSession { id: 1, events: true }));

    let parsed: serde_json::Value = serde_json::from_str(&doc).unwrap();
    let accessories = parsed["accessories"].as_array().unwrap();
    assert_eq!(accessories.len(), 2);
    assert_eq!(accessories[0]["aid"], 1);
    assert_eq!(accessories[1]["aid"], 2);

    // Pairing is not part of the IP attribute database.
    let bridge_services = accessories[0]["services"].as_array().unwrap();
    assert_eq!(bridge_services.len(), 1);

    let bulb = &accessories[1]["services"][1];
    assert_eq!(bulb["type"], "43");
    assert_eq!(bulb["primary"], true);
    assert_eq!(bulb["linked"], serde_json::json!([1]));
    let brightness = &bulb["characteristics"][1];
    assert_eq!(brightness["value"], 40);
    assert_eq!(brightness["unit"], "percentage");
    assert_eq!(brightness["maxValue"], 100);
    assert_eq!(brightness["ev"], true);
    assert_eq!(brightness["perms"], serde_json::json!(["pr", "pw", "ev"]));

    assert_eq!(accessories[1]["services"][0]["characteristics"][1]["value"], "Bulb \"1\"");
}

#[test]
fn values_are_read_at_serialization_time() {
    let on = Cell::new(false);
    let level = Cell::new(7);
    with_bridge(&on, &level, |db| {
        let before = serialize_whole(db, &QUIET);
        assert!(before.contains(r#""value":0,"perms":["pr","pw","ev"]"#));
        assert!(before.contains(r#""value":7,"#));

        on.set(true);
        level.set(99);
        let after = serialize_whole(db, &QUIET);
        assert!(after.contains(r#""value":1,"perms":["pr","pw","ev"]"#));
        assert!(after.contains(r#""value":99,"#));
    });
}

#[test]
fn every_chunk_size_produces_the_same_document() {
    let on = Cell::new(true);
    let level = Cell::new(55);
    with_bridge(&on, &level, |db| {
        let whole = serialize_whole(db, &QUIET);
        for min_bytes in 1..=whole.len() {
            assert_eq!(serialize_chunked(db, &QUIET, min_bytes), whole, "min_bytes = {min_bytes}");
        }
    });
}

#[test]
fn small_buffers_are_retried_without_corruption() {
    let on = Cell::new(true);
    let level = Cell::new(55);
    with_bridge(&on, &level, |db| {
        let whole = serialize_whole(db, &QUIET);

        let mut context = SerializationContext::new();
        let mut out = Vec::new();
        let mut size = 1;
        let mut failures = 0;
        while !context.is_complete() {
            let mut buf = vec![0u8; size];
            match serialize_read_response(&mut context, db, &QUIET, &mut buf, size) {
                Ok(n) => {
                    out.extend_from_slice(&buf[..n]);
                    size = 1;
                }
                Err(Error::OutOfResources) => {
                    failures += 1;
                    size += 1;
                }
                Err(e) => panic!("unexpected {e:?}"),
            }
        }
        assert!(failures > 0, "some member must exceed a one byte buffer");
        assert_eq!(String::from_utf8(out).unwrap(), whole);
    });
}

#[test]
#[should_panic(expected = "already complete")]
fn serializing_a_complete_document_panics() {
    let chars = [];
    let services = [Service::new(1, types::ACCESSORY_INFORMATION, "info", &chars)];
    let accessory = Accessory { aid: 1, name: "x", services: &services };
    let db = AttributeDatabase::new(&accessory, &[]);
    let mut context = SerializationContext::new();
    let mut buf = [0u8; 512];
    serialize_read_response(&mut context, &db, &QUIET, &mut buf, 512).unwrap();
    let _ = serialize_read_response(&mut context, &db, &QUIET, &mut buf, 512);
}
