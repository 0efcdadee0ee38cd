//! BLE signature bodies: the TLV documents a controller reads to learn how
//! a service or characteristic is shaped.
//!
//! ```text
//! characteristic signature          service signature
//! 04  type (16 bytes)               0F  service properties (u16, optional)
//! 07  service iid (u16)             10  linked services (u16 each)
//! 06  service type (16 bytes)
//! 0A  properties (u16)
//! 0B  user description              (optional)
//! 0C  presentation format (7 bytes)
//! 0D  valid range                   (optional)
//! 0E  step                          (optional)
//! 11  valid values                  (optional, uint8)
//! 12  valid values ranges           (optional, uint8)
//! ```
//!
//! All multi-byte integers are little-endian. Floats travel as their IEEE
//! bit pattern.

use log::warn;

use crate::accessory::Service;
use crate::characteristic::{Characteristic, Format, NumericRange, Properties};
use crate::error::{Error, Result};
use crate::tlv::{TlvType, TlvWriter};

pub const TLV_CHARACTERISTIC_TYPE: TlvType = 0x04;
pub const TLV_CHARACTERISTIC_IID: TlvType = 0x05;
pub const TLV_SERVICE_TYPE: TlvType = 0x06;
pub const TLV_SERVICE_IID: TlvType = 0x07;
pub const TLV_PROPERTIES: TlvType = 0x0A;
pub const TLV_USER_DESCRIPTION: TlvType = 0x0B;
pub const TLV_PRESENTATION_FORMAT: TlvType = 0x0C;
pub const TLV_VALID_RANGE: TlvType = 0x0D;
pub const TLV_STEP_VALUE: TlvType = 0x0E;
pub const TLV_SERVICE_PROPERTIES: TlvType = 0x0F;
pub const TLV_LINKED_SERVICES: TlvType = 0x10;
pub const TLV_VALID_VALUES: TlvType = 0x11;
pub const TLV_VALID_VALUES_RANGE: TlvType = 0x12;

/// Body of a characteristic signature read response.
pub fn write_characteristic_signature(
    writer: &mut TlvWriter<'_>,
    service: &Service<'_>,
    characteristic: &Characteristic<'_>,
) -> Result<()> {
    writer.append(TLV_CHARACTERISTIC_TYPE, characteristic.characteristic_type.as_bytes())?;
    writer.append(TLV_SERVICE_IID, &instance_id(service.iid))?;
    writer.append(TLV_SERVICE_TYPE, service.service_type.as_bytes())?;
    write_descriptors(writer, characteristic)
}

/// Compact variant used inside accessory-wide signatures: instance id and
/// short-form type instead of the service fields.
pub fn write_compact_characteristic_signature(
    writer: &mut TlvWriter<'_>,
    characteristic: &Characteristic<'_>,
) -> Result<()> {
    writer.append(TLV_CHARACTERISTIC_IID, &instance_id(characteristic.iid))?;
    writer.append(TLV_CHARACTERISTIC_TYPE, characteristic.characteristic_type.short_form())?;
    write_descriptors(writer, characteristic)
}

/// Body of a service signature read response.
pub fn write_service_signature(writer: &mut TlvWriter<'_>, service: &Service<'_>) -> Result<()> {
    let p = service.properties;
    let bits = u16::from(p.primary) | (u16::from(p.hidden) << 1) | (u16::from(p.supports_configuration) << 2);
    // Only services with non-default properties or links carry the item.
    if bits != 0 || !service.linked_services.is_empty() {
        writer.append(TLV_SERVICE_PROPERTIES, &bits.to_le_bytes())?;
    }

    let linked = service.linked_services;
    let scratch = writer.scratch_bytes_for_value();
    if scratch.len() < 2 * linked.len() {
        warn!("PDU: not enough memory to stage {} linked services", linked.len());
        return Err(Error::OutOfResources);
    }
    for (dst, iid) in scratch.chunks_exact_mut(2).zip(linked) {
        dst.copy_from_slice(&iid.to_le_bytes());
    }
    writer.append_from_scratch(TLV_LINKED_SERVICES, 2 * linked.len())
}

/// Properties bitfield as carried in [`TLV_PROPERTIES`].
pub fn properties_bits(p: &Properties) -> u16 {
    [
        (p.ble.readable_without_security, 0x0001),
        (p.ble.writable_without_security, 0x0002),
        (p.supports_authorization_data, 0x0004),
        (p.requires_timed_write, 0x0008),
        (p.readable, 0x0010),
        (p.writable, 0x0020),
        (p.hidden, 0x0040),
        (p.supports_event_notification, 0x0080),
        (p.ble.supports_disconnected_notification, 0x0100),
        (p.ble.supports_broadcast_notification, 0x0200),
        (p.supports_event_notification_context_information, 0x0400),
    ]
    .into_iter()
    .filter(|(on, _)| *on)
    .fold(0, |acc, (_, bit)| acc | bit)
}

// ── Internal ──────────────────────────────────────────────────

fn instance_id(iid: u64) -> [u8; 2] {
    let Ok(iid) = u16::try_from(iid) else {
        panic!("PDU: instance id {iid} does not fit in 16 bits");
    };
    iid.to_le_bytes()
}

fn write_descriptors(writer: &mut TlvWriter<'_>, c: &Characteristic<'_>) -> Result<()> {
    writer.append(TLV_PROPERTIES, &properties_bits(&c.properties).to_le_bytes())?;
    if let Some(description) = c.manufacturer_description {
        writer.append(TLV_USER_DESCRIPTION, description.as_bytes())?;
    }

    let unit = c.unit().bt_sig_code().to_le_bytes();
    // format, exponent, unit, namespace, description
    let presentation = [c.format_kind().bt_sig_code(), 0, unit[0], unit[1], 1, 0, 0];
    writer.append(TLV_PRESENTATION_FORMAT, &presentation)?;

    write_range_and_step(writer, &c.format)?;

    if let Format::UInt8(s) = &c.format {
        let k = &s.constraints;
        if k.valid_values.is_some_and(|v| !v.is_empty()) || k.valid_values_ranges.is_some_and(|r| !r.is_empty()) {
            assert!(
                c.characteristic_type.is_apple_defined(),
                "PDU: valid values on a custom characteristic type"
            );
        }
        if let Some(values) = k.valid_values.filter(|v| !v.is_empty()) {
            assert!(
                values.windows(2).all(|w| w[0] < w[1]),
                "PDU: valid values must be strictly increasing"
            );
            stage(writer, TLV_VALID_VALUES, values.len(), |dst| dst.copy_from_slice(values))?;
        }
        if let Some(ranges) = k.valid_values_ranges.filter(|r| !r.is_empty()) {
            assert!(
                ranges.iter().all(|r| r.start <= r.end) && ranges.windows(2).all(|w| w[1].start > w[0].end),
                "PDU: valid value ranges must be ordered and disjoint"
            );
            stage(writer, TLV_VALID_VALUES_RANGE, 2 * ranges.len(), |dst| {
                for (pair, r) in dst.chunks_exact_mut(2).zip(ranges) {
                    pair[0] = r.start;
                    pair[1] = r.end;
                }
            })?;
        }
    }
    Ok(())
}

/// Builds a value of `len` bytes in the writer's scratch space and appends it.
fn stage(writer: &mut TlvWriter<'_>, ty: TlvType, len: usize, fill: impl FnOnce(&mut [u8])) -> Result<()> {
    let scratch = writer.scratch_bytes_for_value();
    let Some(dst) = scratch.get_mut(..len) else {
        warn!("PDU[{ty:02x}]: not enough memory to stage {len} bytes");
        return Err(Error::OutOfResources);
    };
    fill(dst);
    writer.append_from_scratch(ty, len)
}

/// Valid range and step. Default ranges and steps of 0 or 1 are left out.
fn write_range_and_step(writer: &mut TlvWriter<'_>, format: &Format<'_>) -> Result<()> {
    macro_rules! unsigned {
        ($r:expr, $t:ty) => {{
            let r: NumericRange<$t> = $r;
            if !(r.min == 0 && r.max == <$t>::MAX) {
                let mut range = [0u8; 2 * size_of::<$t>()];
                range[..size_of::<$t>()].copy_from_slice(&r.min.to_le_bytes());
                range[size_of::<$t>()..].copy_from_slice(&r.max.to_le_bytes());
                writer.append(TLV_VALID_RANGE, &range)?;
            }
            if r.step > 1 {
                writer.append(TLV_STEP_VALUE, &r.step.to_le_bytes())?;
            }
        }};
    }

    match format {
        Format::UInt8(s) => unsigned!(s.constraints.range, u8),
        Format::UInt16(s) => unsigned!(s.constraints, u16),
        Format::UInt32(s) => unsigned!(s.constraints, u32),
        Format::UInt64(s) => unsigned!(s.constraints, u64),
        Format::Int(s) => {
            let r = s.constraints;
            assert!(r.step >= 0, "PDU: negative step");
            if !(r.min == i32::MIN && r.max == i32::MAX) {
                let mut range = [0u8; 8];
                range[..4].copy_from_slice(&r.min.to_le_bytes());
                range[4..].copy_from_slice(&r.max.to_le_bytes());
                writer.append(TLV_VALID_RANGE, &range)?;
            }
            if r.step > 1 {
                writer.append(TLV_STEP_VALUE, &r.step.to_le_bytes())?;
            }
        }
        Format::Float(s) => {
            let r = s.constraints;
            if !(r.min == f32::NEG_INFINITY && r.max == f32::INFINITY) {
                let mut range = [0u8; 8];
                range[..4].copy_from_slice(&r.min.to_bits().to_le_bytes());
                range[4..].copy_from_slice(&r.max.to_bits().to_le_bytes());
                writer.append(TLV_VALID_RANGE, &range)?;
            }
            if r.step != 0.0 {
                writer.append(TLV_STEP_VALUE, &r.step.to_bits().to_le_bytes())?;
            }
        }
        // No range descriptor exists for the remaining formats.
        Format::Data(_) | Format::Bool(_) | Format::String(_) | Format::Tlv8(_) => {}
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────
