//! BLE signature bodies read back with the TLV reader.

use std::cell::Cell;

use hapstack::pdu::{
    TLV_CHARACTERISTIC_TYPE, TLV_LINKED_SERVICES, TLV_PRESENTATION_FORMAT, TLV_PROPERTIES,
    TLV_SERVICE_IID, TLV_SERVICE_PROPERTIES, TLV_SERVICE_TYPE, TLV_STEP_VALUE, TLV_USER_DESCRIPTION,
    TLV_VALID_RANGE, write_characteristic_signature, write_service_signature,
};
use hapstack::uuid::types;
use hapstack::{TlvReader, TlvWriter};

use crate::fixtures::with_bridge;

#[test]
fn brightness_signature_round_trips_through_reader() {
    let on = Cell::new(true);
    let level = Cell::new(0);
    let mut buf = [0u8; 128];
    let n = with_bridge(&on, &level, |db| {
        let bulb = db.accessory_by_aid(2).unwrap();
        let (service, brightness) = bulb.characteristic(12).unwrap();
        let mut writer = TlvWriter::new(&mut buf);
        write_characteristic_signature(&mut writer, service, brightness).unwrap();
        writer.len()
    });

    let mut reader = TlvReader::new(&mut buf[..n]);
    reader
        .enable_non_sequential_access(&[
            TLV_CHARACTERISTIC_TYPE,
            TLV_SERVICE_IID,
            TLV_SERVICE_TYPE,
            TLV_PROPERTIES,
            TLV_USER_DESCRIPTION,
            TLV_PRESENTATION_FORMAT,
            TLV_VALID_RANGE,
            TLV_STEP_VALUE,
        ])
        .unwrap();
    let [ty, service_iid, service_ty, props, description, format, range, step] = reader
        .get_all([
            TLV_CHARACTERISTIC_TYPE,
            TLV_SERVICE_IID,
            TLV_SERVICE_TYPE,
            TLV_PROPERTIES,
            TLV_USER_DESCRIPTION,
            TLV_PRESENTATION_FORMAT,
            TLV_VALID_RANGE,
            TLV_STEP_VALUE,
        ])
        .unwrap();

    assert_eq!(reader.value(&ty.unwrap()), types::BRIGHTNESS.as_bytes());
    assert_eq!(reader.value(&service_iid.unwrap()), &[10, 0]);
    assert_eq!(reader.value(&service_ty.unwrap()), types::LIGHTBULB.as_bytes());
    assert_eq!(reader.value(&props.unwrap()), &[0xB0, 0x00]);
    assert!(description.is_none());
    assert_eq!(reader.value(&format.unwrap()), &[0x04, 0, 0xAD, 0x27, 1, 0, 0]);
    assert_eq!(reader.value(&range.unwrap()), &[0, 100]);
    // Step 1 is the default and stays off the wire.
    assert!(step.is_none());
    assert_eq!(reader.get_next(), Ok(None));
}

#[test]
fn bulb_service_signature_lists_links() {
    let on = Cell::new(true);
    let level = Cell::new(0);
    let mut buf = [0u8; 32];
    let n = with_bridge(&on, &level, |db| {
        let bulb = db.accessory_by_aid(2).unwrap();
        let mut writer = TlvWriter::new(&mut buf);
        write_service_signature(&mut writer, &bulb.services[1]).unwrap();
        writer.len()
    });
    assert_eq!(
        &buf[..n],
        &[TLV_SERVICE_PROPERTIES, 2, 0x01, 0x00, TLV_LINKED_SERVICES, 2, 0x01, 0x00]
    );
}
