//! TLV writer and reader working against each other.

use hapstack::tlv::{ValueEncoding, encoded_len};
use hapstack::{Error, TlvReader, TlvWriter};

#[test]
fn six_hundred_byte_value_splits_into_three_fragments() {
    let value: Vec<u8> = (0..600u16).map(|i| (i % 251) as u8).collect();
    let mut buf = vec![0u8; encoded_len(600) + 3];
    let mut writer = TlvWriter::new(&mut buf);
    writer.append(0x07, &value).unwrap();
    writer.append(0x08, b"x").unwrap();
    let n = writer.len();
    assert_eq!(n, 606 + 3);

    assert_eq!(&buf[..2], &[0x07, 255]);
    assert_eq!(&buf[257..259], &[0x07, 255]);
    assert_eq!(&buf[514..516], &[0x07, 90]);

    let mut reader = TlvReader::new(&mut buf[..n]);
    let first = reader.get_next().unwrap().unwrap();
    assert_eq!(first.ty, 0x07);
    assert_eq!(reader.value(&first), value.as_slice());
    let second = reader.get_next().unwrap().unwrap();
    assert_eq!((second.ty, reader.value(&second)), (0x08, &b"x"[..]));
    assert_eq!(reader.get_next(), Ok(None));
}

#[test]
fn exhausted_reader_stops_mutating() {
    let mut buf = [0x01, 0x01, 0x05];
    let mut reader = TlvReader::new(&mut buf);
    assert!(reader.get_next().unwrap().is_some());
    for _ in 0..3 {
        assert_eq!(reader.get_next(), Ok(None));
    }
    drop(reader);
    // The read moved the value to the front and zeroed the header bytes.
    assert_eq!(buf, [0x05, 0x00, 0x00]);
}

#[test]
fn truncated_item_is_invalid_data() {
    let mut buf = [0x01, 0x04, 0xAA, 0xBB];
    let mut reader = TlvReader::new(&mut buf);
    assert_eq!(reader.get_next(), Err(Error::InvalidData));
}

#[test]
fn lookup_by_type_leaves_other_items_for_get_next() {
    let mut buf = [0u8; 64];
    let mut writer = TlvWriter::new(&mut buf);
    writer.append(0x06, &[1]).unwrap();
    writer.append(0x01, b"alice").unwrap();
    writer.append(0x0A, &[2, 3]).unwrap();
    writer.append(0x03, &[4]).unwrap();
    let n = writer.len();

    let mut reader = TlvReader::new(&mut buf[..n]);
    reader.enable_non_sequential_access(&[0x01, 0x03, 0x06, 0x0A]).unwrap();
    let [name, state] = reader.get_all([0x01, 0x06]).unwrap();
    assert_eq!(reader.value_str(&name.unwrap()), Ok("alice"));
    assert_eq!(reader.value(&state.unwrap()), &[1]);

    let rest: Vec<_> = std::iter::from_fn(|| reader.get_next().unwrap())
        .map(|t| t.ty)
        .collect();
    assert_eq!(rest, [0x0A, 0x03]);
    assert_eq!(reader.find(0x01, ValueEncoding::MayContainNul), Ok(None));
}

#[test]
fn text_values_are_nul_terminated_in_place() {
    let long: String = "h".repeat(300);
    let mut buf = vec![0u8; 400];
    let mut writer = TlvWriter::new(&mut buf);
    writer.append(0x02, &[9]).unwrap();
    writer.append(0x01, long.as_bytes()).unwrap();
    let n = writer.len();

    let mut reader = TlvReader::new(&mut buf[..n]);
    reader.enable_non_sequential_access(&[0x01, 0x02]).unwrap();
    let text = reader.find(0x01, ValueEncoding::NulTerminated).unwrap().unwrap();
    assert_eq!(reader.value_str(&text), Ok(long.as_str()));
    let end = text.offset() + text.len();
    drop(reader);
    assert_eq!(buf[end], 0);
}

#[test]
fn embedded_nul_in_text_is_rejected() {
    let mut buf = [0x01, 0x03, b'a', 0, b'b'];
    let mut reader = TlvReader::new(&mut buf);
    reader.enable_non_sequential_access(&[0x01]).unwrap();
    assert_eq!(reader.find(0x01, ValueEncoding::NulTerminated), Err(Error::InvalidData));
}

#[test]
fn nested_document_through_sub_writer() {
    let mut buf = [0u8; 32];
    let mut writer = TlvWriter::new(&mut buf);
    writer.append(0x01, &[0xAA]).unwrap();
    writer
        .with_sub_writer(0x02, |sub| {
            sub.append(0x10, &[1])?;
            sub.append(0x11, &[2, 3])
        })
        .unwrap();
    assert_eq!(writer.buffer(), &[0x01, 1, 0xAA, 0x02, 7, 0x10, 1, 1, 0x11, 2, 2, 3]);

    let n = writer.len();
    let mut reader = TlvReader::new(&mut buf[..n]);
    reader.get_next().unwrap();
    let outer = reader.get_next().unwrap().unwrap();
    let mut inner_bytes = reader.value(&outer).to_vec();
    let mut inner = TlvReader::new(&mut inner_bytes);
    let a = inner.get_next().unwrap().unwrap();
    assert_eq!((a.ty, inner.value(&a)), (0x10, &[1u8][..]));
}

#[test]
fn full_writer_reports_out_of_resources_and_keeps_content() {
    let mut buf = [0u8; 6];
    let mut writer = TlvWriter::new(&mut buf);
    writer.append(0x01, &[1, 2]).unwrap();
    assert_eq!(writer.append(0x02, &[3, 4]), Err(Error::OutOfResources));
    assert_eq!(writer.buffer(), &[0x01, 2, 1, 2]);
    writer.append(0x02, &[]).unwrap();
    assert_eq!(writer.len(), 6);
}
