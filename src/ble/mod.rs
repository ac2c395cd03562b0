//! Bluetooth Low Energy side of the bridge.
//!
//! The bridge runs as a **Central** holding two independent links:
//!
//! 1. **Scan** - one discovery window classifies advertisements against the
//!    controller and hub name filters and fills both peripheral records.
//! 2. **Supervisor** - one per peripheral; runs that peripheral's connection
//!    state machine on top of a platform [`link::Link`].
//! 3. **Record** - the per-peripheral state shared with transport callbacks
//!    through an explicit [`record::LinkContext`] handle.
//!
//! The radio itself lives behind the traits in [`link`]; the firmware binary
//! implements them on the Nordic SoftDevice.

pub mod adv_parser;
pub mod link;
pub mod record;
pub mod scan;
pub mod supervisor;

use core::fmt;

pub use link::{Link, Scanner};
pub use record::{ConnectionState, LinkContext, PeripheralRecord, PeripheralSlot};
pub use scan::{IdentityFilters, ScanControl, ScanCoordinator, ScanOutcome};
pub use supervisor::ConnectionSupervisor;

/// Which of the two bridged peripherals an event or record belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// The game controller (input side).
    Controller,
    /// The motor hub (output side).
    Hub,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Controller, Role::Hub];

    pub const fn label(self) -> &'static str {
        match self {
            Role::Controller => "controller",
            Role::Hub => "hub",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// BLE address type, mirrors the GAP address kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressKind {
    Public,
    RandomStatic,
    RandomPrivateResolvable,
    RandomPrivateNonResolvable,
    Anonymous,
}

impl AddressKind {
    pub const fn to_raw(self) -> u8 {
        match self {
            AddressKind::Public => 0,
            AddressKind::RandomStatic => 1,
            AddressKind::RandomPrivateResolvable => 2,
            AddressKind::RandomPrivateNonResolvable => 3,
            AddressKind::Anonymous => 4,
        }
    }

    /// Unknown values fall back to random static.
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => AddressKind::Public,
            2 => AddressKind::RandomPrivateResolvable,
            3 => AddressKind::RandomPrivateNonResolvable,
            4 => AddressKind::Anonymous,
            _ => AddressKind::RandomStatic,
        }
    }
}

/// Transport address of a peripheral. `bytes` are little-endian as on air.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeerAddress {
    pub kind: AddressKind,
    pub bytes: [u8; 6],
}

impl PeerAddress {
    pub const fn new(kind: AddressKind, bytes: [u8; 6]) -> Self {
        Self { kind, bytes }
    }
}

impl fmt::Display for PeerAddress {
    /// Conventional most-significant-first `AA:BB:CC:DD:EE:FF`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bytes;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[5], b[4], b[3], b[2], b[1], b[0]
        )
    }
}

/// One received advertisement, already reduced to what classification needs.
#[derive(Clone, Copy, Debug)]
pub struct Advertisement<'a> {
    pub address: PeerAddress,
    pub name: &'a str,
    /// Received Signal Strength Indicator (dBm).
    pub rssi: i8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_prints_most_significant_byte_first() {
        let addr = PeerAddress::new(AddressKind::Public, [0x01, 0x02, 0x03, 0x04, 0x05, 0xAB]);
        let mut s: heapless::String<24> = heapless::String::new();
        core::fmt::write(&mut s, format_args!("{}", addr)).unwrap();
        assert_eq!(s.as_str(), "AB:05:04:03:02:01");
    }

    #[test]
    fn address_kind_raw_values_are_stable() {
        for kind in [
            AddressKind::Public,
            AddressKind::RandomStatic,
            AddressKind::RandomPrivateResolvable,
            AddressKind::RandomPrivateNonResolvable,
            AddressKind::Anonymous,
        ] {
            assert_eq!(AddressKind::from_raw(kind.to_raw()), kind);
        }
        assert_eq!(AddressKind::from_raw(0xEE), AddressKind::RandomStatic);
    }
}
