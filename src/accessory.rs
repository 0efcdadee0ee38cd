//! The attribute database: accessories, their services and characteristics.
//!
//! ```text
//! AttributeDatabase
//!  ├── primary: Accessory (aid 1)
//!  │    └── services[] ── characteristics[]
//!  └── bridged[]: Accessory (aid 2..)
//! ```
//!
//! The graph is owned by the application and borrowed read-only for the
//! lifetime of the server. Instance ids are stable; nothing here mutates.

use crate::characteristic::Characteristic;
use crate::uuid::{Uuid, types};

/// Transport a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Ip,
    Ble,
}

impl Transport {
    /// Pairing runs over dedicated HTTP endpoints on IP, so the Pairing
    /// service only exists on BLE.
    pub fn supports_service(self, service: &Service<'_>) -> bool {
        match self {
            Self::Ip => service.service_type != types::PAIRING,
            Self::Ble => true,
        }
    }

    /// The Service Signature characteristic is BLE-only.
    pub fn supports_characteristic(self, characteristic: &Characteristic<'_>) -> bool {
        match self {
            Self::Ip => characteristic.characteristic_type != types::SERVICE_SIGNATURE,
            Self::Ble => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceProperties {
    pub primary: bool,
    pub hidden: bool,
    /// BLE only.
    pub supports_configuration: bool,
}

pub struct Service<'a> {
    pub iid: u64,
    pub service_type: Uuid,
    pub debug_description: &'a str,
    pub properties: ServiceProperties,
    /// Instance ids of linked services on the same accessory.
    pub linked_services: &'a [u16],
    pub characteristics: &'a [Characteristic<'a>],
}

impl<'a> Service<'a> {
    pub fn new(iid: u64, service_type: Uuid, debug_description: &'a str, characteristics: &'a [Characteristic<'a>]) -> Self {
        Self {
            iid,
            service_type,
            debug_description,
            properties: ServiceProperties::default(),
            linked_services: &[],
            characteristics,
        }
    }

    #[must_use]
    pub fn with_properties(mut self, properties: ServiceProperties) -> Self {
        self.properties = properties;
        self
    }

    #[must_use]
    pub fn with_linked_services(mut self, linked_services: &'a [u16]) -> Self {
        self.linked_services = linked_services;
        self
    }

    pub fn characteristic(&self, iid: u64) -> Option<&Characteristic<'a>> {
        self.characteristics.iter().find(|c| c.iid == iid)
    }
}

impl core::fmt::Debug for Service<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Service")
            .field("iid", &self.iid)
            .field("type", &self.service_type)
            .field("debug_description", &self.debug_description)
            .field("characteristics", &self.characteristics.len())
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct Accessory<'a> {
    pub aid: u64,
    pub name: &'a str,
    pub services: &'a [Service<'a>],
}

impl<'a> Accessory<'a> {
    /// Finds a characteristic by instance id along with its service.
    pub fn characteristic(&self, iid: u64) -> Option<(&Service<'a>, &Characteristic<'a>)> {
        self.services
            .iter()
            .find_map(|s| s.characteristic(iid).map(|c| (s, c)))
    }
}

/// The primary accessory plus any bridged accessories behind it.
#[derive(Debug, Clone, Copy)]
pub struct AttributeDatabase<'a> {
    pub primary: &'a Accessory<'a>,
    pub bridged: &'a [Accessory<'a>],
}

impl<'a> AttributeDatabase<'a> {
    pub fn new(primary: &'a Accessory<'a>, bridged: &'a [Accessory<'a>]) -> Self {
        Self { primary, bridged }
    }

    /// Accessories in enumeration order; index 0 is the primary one.
    pub fn accessory(&self, index: usize) -> Option<&'a Accessory<'a>> {
        match index {
            0 => Some(self.primary),
            i => self.bridged.get(i - 1),
        }
    }

    pub fn accessory_count(&self) -> usize {
        1 + self.bridged.len()
    }

    pub fn accessory_by_aid(&self, aid: u64) -> Option<&'a Accessory<'a>> {
        (0..self.accessory_count())
            .filter_map(|i| self.accessory(i))
            .find(|a| a.aid == aid)
    }
}

// ── Tests ─────────────────────────────────────────────────────
