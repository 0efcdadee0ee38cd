//! Characteristic reads, writes and subscriptions through the public API.

use std::cell::{Cell, RefCell};

use hapstack::characteristic::{
    DataFormat, FloatRange, NumericRange, Scalar, StringFormat, Tlv8Format, UInt8Constraints, Value, WriteValue,
};
use hapstack::uuid::{Uuid, types};
use hapstack::{Characteristic, Error, Format, Request, TlvReader, TlvWriter, WriteContext, WriteRequest};

use crate::fixtures::{copy_str, request};

#[test]
fn uint8_step_boundaries() {
    let seen = RefCell::new(Vec::new());
    let write = |_: &WriteRequest<'_>, _: &WriteContext, v: u8| -> hapstack::Result<()> {
        seen.borrow_mut().push(v);
        Ok(())
    };
    let c = Characteristic::new(
        12,
        types::BRIGHTNESS,
        "level",
        Format::UInt8(Scalar::new(UInt8Constraints::from_range(10, 20, 5)).on_write(&write)),
    );
    let mut writes = WriteContext::new();
    let req = WriteRequest::new(request(2, 10, 12));

    let results: Vec<_> = [10, 15, 20, 9, 21, 12]
        .into_iter()
        .map(|v| c.handle_write(&mut writes, &req, WriteValue::UInt8(v)))
        .collect();
    assert_eq!(
        results,
        [Ok(()), Ok(()), Ok(()), Err(Error::InvalidData), Err(Error::InvalidData), Err(Error::InvalidData)]
    );
    assert_eq!(*seen.borrow(), [10, 15, 20]);
    assert!(writes.is_idle());
}

#[test]
fn float_within_step_tolerance_is_rounded() {
    let seen = Cell::new(f32::NAN);
    let write = |_: &WriteRequest<'_>, _: &WriteContext, v: f32| -> hapstack::Result<()> {
        seen.set(v);
        Ok(())
    };
    let c = Characteristic::new(
        13,
        types::BRIGHTNESS,
        "ratio",
        Format::Float(Scalar::new(FloatRange::new(0.0, 1.0, 0.1)).on_write(&write)),
    );
    let mut writes = WriteContext::new();
    let req = WriteRequest::new(request(2, 10, 13));

    assert_eq!(c.handle_write(&mut writes, &req, WriteValue::Float(0.300_000_01)), Ok(()));
    assert!((seen.get() - 0.3).abs() < 1e-6);
    assert_eq!(c.handle_write(&mut writes, &req, WriteValue::Float(1.5)), Err(Error::InvalidData));
    assert_eq!(c.handle_write(&mut writes, &req, WriteValue::Float(f32::NAN)), Err(Error::InvalidData));
}

#[test]
fn int_and_uint16_ranges() {
    let noop_i = |_: &WriteRequest<'_>, _: &WriteContext, _: i32| -> hapstack::Result<()> { Ok(()) };
    let noop_u = |_: &WriteRequest<'_>, _: &WriteContext, _: u16| -> hapstack::Result<()> { Ok(()) };
    let temp = Characteristic::new(
        20,
        types::BRIGHTNESS,
        "offset",
        Format::Int(Scalar::new(NumericRange::<i32>::new(-10, 10, 2)).on_write(&noop_i)),
    );
    let count = Characteristic::new(
        21,
        types::BRIGHTNESS,
        "count",
        Format::UInt16(Scalar::new(NumericRange::<u16>::new(0, 1000, 1)).on_write(&noop_u)),
    );
    let mut writes = WriteContext::new();

    let req = WriteRequest::new(request(2, 10, 20));
    assert_eq!(temp.handle_write(&mut writes, &req, WriteValue::Int(-10)), Ok(()));
    assert_eq!(temp.handle_write(&mut writes, &req, WriteValue::Int(4)), Ok(()));
    assert_eq!(temp.handle_write(&mut writes, &req, WriteValue::Int(-9)), Err(Error::InvalidData));
    assert_eq!(temp.handle_write(&mut writes, &req, WriteValue::Int(12)), Err(Error::InvalidData));

    let req = WriteRequest::new(request(2, 10, 21));
    assert_eq!(count.handle_write(&mut writes, &req, WriteValue::UInt16(1000)), Ok(()));
    assert_eq!(count.handle_write(&mut writes, &req, WriteValue::UInt16(1001)), Err(Error::InvalidData));
}

#[test]
fn valid_values_restrict_apple_defined_uint8() {
    let noop = |_: &WriteRequest<'_>, _: &WriteContext, _: u8| -> hapstack::Result<()> { Ok(()) };
    let constraints = UInt8Constraints {
        valid_values: Some(&[0, 2]),
        ..UInt8Constraints::from_range(0, 3, 1)
    };
    let c = Characteristic::new(
        30,
        Uuid::apple_defined(0x8F),
        "state",
        Format::UInt8(Scalar::new(constraints).on_write(&noop)),
    );
    let mut writes = WriteContext::new();
    let req = WriteRequest::new(request(1, 10, 30));
    assert_eq!(c.handle_write(&mut writes, &req, WriteValue::UInt8(2)), Ok(()));
    assert_eq!(c.handle_write(&mut writes, &req, WriteValue::UInt8(1)), Err(Error::InvalidData));
}

#[test]
fn string_and_data_reads_borrow_the_buffer() {
    let name = |_: &Request, buf: &mut [u8]| -> hapstack::Result<usize> { copy_str(buf, "Kitchen") };
    let blob = |_: &Request, buf: &mut [u8]| -> hapstack::Result<usize> {
        buf[..3].copy_from_slice(&[0, 0xFF, 7]);
        Ok(3)
    };
    let text = Characteristic::new(
        3,
        types::NAME,
        "name",
        Format::String(StringFormat { read: Some(&name), ..StringFormat::default() }),
    );
    let data = Characteristic::new(
        4,
        types::NAME,
        "blob",
        Format::Data(DataFormat { read: Some(&blob), ..DataFormat::default() }),
    );

    let mut buf = [0u8; 64];
    assert_eq!(text.handle_read(&request(1, 1, 3), &mut buf), Ok(Value::String("Kitchen")));
    assert_eq!(data.handle_read(&request(1, 1, 4), &mut buf), Ok(Value::Data(&[0, 0xFF, 7])));
}

#[test]
fn string_write_longer_than_max_length_is_rejected() {
    let stored = RefCell::new(String::new());
    let write = |_: &WriteRequest<'_>, _: &WriteContext, s: &str| -> hapstack::Result<()> {
        *stored.borrow_mut() = s.to_owned();
        Ok(())
    };
    let c = Characteristic::new(
        3,
        types::NAME,
        "name",
        Format::String(StringFormat { max_length: 5, read: None, write: Some(&write) }),
    );
    let mut writes = WriteContext::new();
    let req = WriteRequest::new(request(1, 1, 3));
    assert_eq!(c.handle_write(&mut writes, &req, WriteValue::String("Hall")), Ok(()));
    assert_eq!(c.handle_write(&mut writes, &req, WriteValue::String("Hallway")), Err(Error::InvalidData));
    assert_eq!(*stored.borrow(), "Hall");
}

#[test]
fn tlv8_write_is_parsed_in_place() {
    let fields = RefCell::new(Vec::new());
    let write = |_: &WriteRequest<'_>, _: &WriteContext, reader: &mut TlvReader<'_>| -> hapstack::Result<()> {
        while let Some(tlv) = reader.get_next()? {
            fields.borrow_mut().push((tlv.ty, reader.value(&tlv).to_vec()));
        }
        Ok(())
    };
    let read = |_: &Request, writer: &mut TlvWriter<'_>| -> hapstack::Result<()> {
        writer.append(0x01, &[1, 2])?;
        writer.append(0x02, b"ok")
    };
    let c = Characteristic::new(
        40,
        Uuid::apple_defined(0x118),
        "config",
        Format::Tlv8(Tlv8Format { read: Some(&read), write: Some(&write) }),
    );

    let mut body = [0x01, 0x01, 0xAA, 0x03, 0x00];
    let mut writes = WriteContext::new();
    let req = WriteRequest::new(request(1, 10, 40));
    assert_eq!(c.handle_write(&mut writes, &req, WriteValue::Tlv8(&mut body)), Ok(()));
    assert_eq!(*fields.borrow(), [(0x01, vec![0xAA]), (0x03, vec![])]);

    let mut buf = [0u8; 16];
    assert_eq!(
        c.handle_read(&request(1, 10, 40), &mut buf),
        Ok(Value::Tlv8(&[0x01, 2, 1, 2, 0x02, 2, b'o', b'k']))
    );
}

#[test]
fn mismatched_value_format_is_invalid_data() {
    let c = Characteristic::new(11, types::ON, "on", Format::Bool(Scalar::default()));
    let mut writes = WriteContext::new();
    let req = WriteRequest::new(request(1, 10, 11));
    assert_eq!(c.handle_write(&mut writes, &req, WriteValue::UInt8(1)), Err(Error::InvalidData));
}

#[test]
fn subscription_callbacks_see_the_write_context() {
    let events = RefCell::new(Vec::new());
    let subscribe = |r: &Request, w: &WriteContext| {
        assert!(w.is_handling_write(r.session, r.aid, r.iid));
        events.borrow_mut().push("subscribe");
    };
    let unsubscribe = |_: &Request, _: &WriteContext| events.borrow_mut().push("unsubscribe");
    let c = Characteristic::new(11, types::ON, "on", Format::Bool(Scalar::default()))
        .on_subscribe(&subscribe)
        .on_unsubscribe(&unsubscribe);

    let mut writes = WriteContext::new();
    c.handle_subscribe(&mut writes, &request(1, 10, 11));
    c.handle_unsubscribe(&mut writes, &request(1, 10, 11));
    assert_eq!(*events.borrow(), ["subscribe", "unsubscribe"]);
    assert!(writes.is_idle());
}

#[test]
#[should_panic(expected = "callback returned")]
fn read_error_outside_allow_list_panics() {
    let read = |_: &Request| -> hapstack::Result<bool> { Err(Error::NotAuthorized) };
    let c = Characteristic::new(11, types::ON, "on", Format::Bool(Scalar::default().on_read(&read)));
    let _ = c.handle_read(&request(1, 10, 11), &mut [0u8; 0]);
}
