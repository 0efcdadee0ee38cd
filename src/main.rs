//! hapstack-dump: prints the attribute database of a demo bridge.
//!
//! ```text
//! hapstack-dump [config.json]
//!
//!   config ──► StackConfig::validate
//!   demo bridge (aid 1) + bridged bulb (aid 2)
//!   serialize_read_response in max-chunk buffers ──► stdout
//!   BLE service / characteristic signatures ──► debug log (hex)
//! ```

use std::cell::Cell;
use std::io::Write as _;

use anyhow::{Context as _, Result, bail};
use log::{debug, info};

use hapstack::characteristic::{Scalar, StringFormat, UInt8Constraints};
use hapstack::pdu;
use hapstack::uuid::types;
use hapstack::{
    Accessory, AttributeDatabase, Characteristic, Format, Properties, Request, SerializationContext, Service,
    ServiceProperties, Session, SessionId, StackConfig, TlvWriter, Unit, WriteContext, WriteRequest,
    serialize_read_response,
};

// ── Logging ───────────────────────────────────────────────────

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}][{}]: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging() -> Result<()> {
    let level = match std::env::var("HAPSTACK_LOG").as_deref() {
        Ok("trace") => log::LevelFilter::Trace,
        Ok("debug") => log::LevelFilter::Debug,
        Ok("warn") => log::LevelFilter::Warn,
        Ok("error") => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };
    log::set_logger(&LOGGER).map_err(|e| anyhow::anyhow!("logger: {e}"))?;
    log::set_max_level(level);
    Ok(())
}

// ── Session ───────────────────────────────────────────────────

/// Local session with notifications enabled on every characteristic.
struct DumpSession;

impl Session for DumpSession {
    fn id(&self) -> SessionId {
        SessionId(0)
    }

    fn are_events_enabled(&self, _aid: u64, _iid: u64) -> bool {
        true
    }
}

// ── Config ────────────────────────────────────────────────────

fn load_config() -> Result<StackConfig> {
    let Some(path) = std::env::args().nth(1) else {
        info!("No config given, using defaults");
        return Ok(StackConfig::default());
    };
    let bytes = std::fs::read(&path).with_context(|| format!("reading {path}"))?;
    let config = StackConfig::from_json(&bytes).map_err(|e| anyhow::anyhow!("{path}: {e}"))?;
    info!("Config loaded from {}", path);
    Ok(config)
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    init_logging()?;
    info!("hapstack-dump v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    let on = Cell::new(true);
    let brightness = Cell::new(40u8);

    let read_name = |_: &Request, buf: &mut [u8]| -> hapstack::Result<usize> { copy_str(buf, "Demo Bridge") };
    let read_bulb_name = |_: &Request, buf: &mut [u8]| -> hapstack::Result<usize> { copy_str(buf, "Desk Lamp") };
    let identify = |_: &WriteRequest<'_>, _: &WriteContext, _: bool| -> hapstack::Result<()> {
        info!("Identify requested");
        Ok(())
    };
    let read_on = |_: &Request| -> hapstack::Result<bool> { Ok(on.get()) };
    let write_on = |_: &WriteRequest<'_>, _: &WriteContext, v: bool| -> hapstack::Result<()> {
        on.set(v);
        Ok(())
    };
    let read_brightness = |_: &Request| -> hapstack::Result<u8> { Ok(brightness.get()) };

    let bridge_info = [
        Characteristic::new(2, types::IDENTIFY, "identify", Format::Bool(Scalar::default().on_write(&identify)))
            .with_properties(Properties { writable: true, ..Properties::none() }),
        Characteristic::new(
            3,
            types::NAME,
            "name",
            Format::String(StringFormat { read: Some(&read_name), ..StringFormat::default() }),
        )
        .with_properties(Properties::read_only()),
    ];
    let bulb_info = [Characteristic::new(
        3,
        types::NAME,
        "name",
        Format::String(StringFormat { read: Some(&read_bulb_name), ..StringFormat::default() }),
    )
    .with_properties(Properties::read_only())];
    let bulb = [
        Characteristic::new(11, types::ON, "on", Format::Bool(Scalar::default().on_read(&read_on).on_write(&write_on)))
            .with_properties(Properties::read_write_notify()),
        Characteristic::new(
            12,
            types::BRIGHTNESS,
            "brightness",
            Format::UInt8(Scalar::new(UInt8Constraints::from_range(0, 100, 1)).on_read(&read_brightness)),
        )
        .with_properties(Properties::read_write_notify())
        .with_unit(Unit::Percentage),
    ];

    let bridge_services = [Service::new(1, types::ACCESSORY_INFORMATION, "info", &bridge_info)];
    let bulb_services = [
        Service::new(1, types::ACCESSORY_INFORMATION, "info", &bulb_info),
        Service::new(10, types::LIGHTBULB, "bulb", &bulb)
            .with_properties(ServiceProperties { primary: true, ..ServiceProperties::default() }),
    ];
    let primary = Accessory { aid: 1, name: "Demo Bridge", services: &bridge_services };
    let bridged = [Accessory { aid: 2, name: "Desk Lamp", services: &bulb_services }];
    let db = AttributeDatabase::new(&primary, &bridged);

    dump_json(&config, &db)?;
    dump_signatures(&config, &bulb_services)?;
    Ok(())
}

fn dump_json(config: &StackConfig, db: &AttributeDatabase<'_>) -> Result<()> {
    if let Err(e) = config.validate() {
        bail!("invalid config: {e}");
    }
    let mut buf = vec![0u8; config.serializer_max_chunk_bytes];
    let mut context = SerializationContext::new();
    let mut stdout = std::io::stdout().lock();
    let mut chunks = 0usize;
    while !context.is_complete() {
        let n = serialize_read_response(&mut context, db, &DumpSession, &mut buf, config.serializer_min_chunk_bytes)
            .map_err(|e| anyhow::anyhow!("serializer: {e}"))?;
        stdout.write_all(&buf[..n])?;
        chunks += 1;
        if config.log_sensitive_values {
            debug!("SER: chunk {} {}", chunks, String::from_utf8_lossy(&buf[..n]));
        } else {
            debug!("SER: chunk {} ({} bytes)", chunks, n);
        }
    }
    writeln!(stdout)?;
    info!("Attribute database written in {} chunk(s)", chunks);
    Ok(())
}

fn dump_signatures(config: &StackConfig, services: &[Service<'_>]) -> Result<()> {
    let mut scratch = vec![0u8; config.value_scratch_bytes];
    for service in services {
        let mut writer = TlvWriter::new(&mut scratch);
        pdu::write_service_signature(&mut writer, service).map_err(|e| anyhow::anyhow!("service signature: {e}"))?;
        debug!("PDU: service {} signature {}", service.iid, hex(writer.buffer()));
        for characteristic in service.characteristics {
            writer.reset();
            pdu::write_characteristic_signature(&mut writer, service, characteristic)
                .map_err(|e| anyhow::anyhow!("characteristic signature: {e}"))?;
            debug!("PDU: characteristic {} signature {}", characteristic.iid, hex(writer.buffer()));
        }
    }
    Ok(())
}

fn copy_str(buf: &mut [u8], s: &str) -> hapstack::Result<usize> {
    let dst = buf.get_mut(..s.len()).ok_or(hapstack::Error::OutOfResources)?;
    dst.copy_from_slice(s.as_bytes());
    Ok(s.len())
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02X}");
        s
    })
}
