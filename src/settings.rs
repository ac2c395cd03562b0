//! Operator settings and their flash record.
//!
//! The record is a fixed little binary layout, small enough for a single
//! `sequential-storage` map item:
//!
//! ```text
//! [version][max_speed][deadzone][flags][light]
//! [ctrl present][6 addr + kind][hub present][6 addr + kind]
//! ```
//!
//! `flags` bit 0 = trigger mode, bit 1 = invert steering.  Address blocks
//! are 7 bytes (6 address bytes, LSB first, then the address kind) and are
//! always written, zeroed when absent.

use crate::ble::{AddressKind, PeerAddress};
use crate::config::{
    DEFAULT_DEADZONE_PERCENT, DEFAULT_INVERT_STEERING, DEFAULT_MAX_SPEED_PERCENT,
    DEFAULT_TRIGGER_MODE, MAX_DEADZONE_PERCENT, SETTINGS_VERSION,
};
use crate::error::SettingsError;
use crate::hub::LightMode;

/// Mapper configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlSettings {
    /// Output cap, 0..=100.
    pub max_speed_percent: u8,
    /// 0..=`MAX_DEADZONE_PERCENT`.
    pub deadzone_percent: u8,
    /// Throttle from the trigger pair rather than the left stick.
    pub trigger_mode: bool,
    pub invert_steering: bool,
    /// Used whenever no D-pad direction is held.
    pub light_mode: LightMode,
}

impl ControlSettings {
    /// Same settings with every numeric field forced into range.
    pub fn clamped(self) -> Self {
        Self {
            max_speed_percent: self.max_speed_percent.min(100),
            deadzone_percent: self.deadzone_percent.min(MAX_DEADZONE_PERCENT),
            ..self
        }
    }
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            max_speed_percent: DEFAULT_MAX_SPEED_PERCENT,
            deadzone_percent: DEFAULT_DEADZONE_PERCENT,
            trigger_mode: DEFAULT_TRIGGER_MODE,
            invert_steering: DEFAULT_INVERT_STEERING,
            light_mode: LightMode::BothOn,
        }
    }
}

const FLAG_TRIGGER_MODE: u8 = 1 << 0;
const FLAG_INVERT_STEERING: u8 = 1 << 1;

const ADDR_BLOCK_LEN: usize = 1 + 6 + 1;

/// Serialized size of a [`PersistedSettings`] record.
pub const SETTINGS_RECORD_LEN: usize = 5 + 2 * ADDR_BLOCK_LEN;

/// Everything kept across power cycles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PersistedSettings {
    pub control: ControlSettings,
    /// Last controller seen Active (diagnostics only).
    pub controller_addr: Option<PeerAddress>,
    /// Last hub seen Active (diagnostics only).
    pub hub_addr: Option<PeerAddress>,
}

fn write_addr(buf: &mut [u8], addr: Option<PeerAddress>) {
    buf.fill(0);
    if let Some(addr) = addr {
        buf[0] = 1;
        buf[1..7].copy_from_slice(&addr.bytes);
        buf[7] = addr.kind.to_raw();
    }
}

fn read_addr(buf: &[u8]) -> Option<PeerAddress> {
    if buf[0] == 0 {
        return None;
    }
    let mut bytes = [0u8; 6];
    bytes.copy_from_slice(&buf[1..7]);
    Some(PeerAddress::new(AddressKind::from_raw(buf[7]), bytes))
}

impl PersistedSettings {
    /// Serialize into `buf`; returns the number of bytes written.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, SettingsError> {
        if buf.len() < SETTINGS_RECORD_LEN {
            return Err(SettingsError::BufferOverflow);
        }
        let control = self.control.clamped();

        let mut flags = 0;
        if control.trigger_mode {
            flags |= FLAG_TRIGGER_MODE;
        }
        if control.invert_steering {
            flags |= FLAG_INVERT_STEERING;
        }

        buf[0] = SETTINGS_VERSION;
        buf[1] = control.max_speed_percent;
        buf[2] = control.deadzone_percent;
        buf[3] = flags;
        buf[4] = control.light_mode.code();
        write_addr(&mut buf[5..5 + ADDR_BLOCK_LEN], self.controller_addr);
        write_addr(
            &mut buf[5 + ADDR_BLOCK_LEN..SETTINGS_RECORD_LEN],
            self.hub_addr,
        );
        Ok(SETTINGS_RECORD_LEN)
    }

    /// Parse a stored record.
    ///
    /// Numeric fields outside their range are clamped; an unknown light
    /// byte falls back to the default mode.
    pub fn decode(data: &[u8]) -> Result<Self, SettingsError> {
        let Some(&version) = data.first() else {
            return Err(SettingsError::Truncated);
        };
        if version != SETTINGS_VERSION {
            return Err(SettingsError::UnsupportedVersion(version));
        }
        if data.len() < SETTINGS_RECORD_LEN {
            return Err(SettingsError::Truncated);
        }

        let flags = data[3];
        let control = ControlSettings {
            max_speed_percent: data[1],
            deadzone_percent: data[2],
            trigger_mode: flags & FLAG_TRIGGER_MODE != 0,
            invert_steering: flags & FLAG_INVERT_STEERING != 0,
            light_mode: LightMode::try_from(data[4]).unwrap_or_default(),
        }
        .clamped();

        Ok(Self {
            control,
            controller_addr: read_addr(&data[5..5 + ADDR_BLOCK_LEN]),
            hub_addr: read_addr(&data[5 + ADDR_BLOCK_LEN..SETTINGS_RECORD_LEN]),
        })
    }

    /// Record the addresses of a pair that just went Active.
    ///
    /// Returns `true` if anything changed and the record should be saved.
    pub fn remember_pair(&mut self, controller: Option<PeerAddress>, hub: Option<PeerAddress>) -> bool {
        if self.controller_addr == controller && self.hub_addr == hub {
            return false;
        }
        self.controller_addr = controller;
        self.hub_addr = hub;
        true
    }
}
