//! hapstack: accessory-side protocol core.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  transports (HTTP / BLE GATT, outside this crate)            │
//! │                                                              │
//! │   serializer ──► JSON attribute document (resumable)         │
//! │   pdu        ──► BLE signature TLVs                          │
//! │        │                                                     │
//! │        ▼                                                     │
//! │   characteristic ── constraints · read/write dispatch        │
//! │        │                                                     │
//! │   accessory graph · uuid · session                           │
//! │                                                              │
//! │   tlv (reader / writer) · json (escape, skip, floats)        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here allocates on the protocol paths: every encoder writes into
//! a caller-provided buffer and reports `Error::OutOfResources` when it
//! does not fit.

#![deny(unused_must_use)]

pub mod accessory;
pub mod characteristic;
pub mod config;
pub mod error;
pub mod json;
pub mod pdu;
pub mod serializer;
pub mod session;
pub mod tlv;
pub mod uuid;

pub use accessory::{Accessory, AttributeDatabase, Service, ServiceProperties, Transport};
pub use characteristic::{Characteristic, Format, FormatKind, Properties, Request, Unit, WriteContext, WriteRequest};
pub use config::{ConfigError, StackConfig};
pub use error::{Error, Result};
pub use serializer::{SerializationContext, serialize_read_response};
pub use session::{Session, SessionId};
pub use tlv::{Tlv, TlvReader, TlvType, TlvWriter};
pub use uuid::Uuid;
