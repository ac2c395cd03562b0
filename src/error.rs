//! Error types for pad2hub.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Every variant is recoverable: the scheduler reports it to the status
//! sink and falls back to a fresh discovery cycle.

use core::fmt;

use crate::ble::Role;

/// Bridge-level error taxonomy reported to the status interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeError {
    /// The scan window elapsed without matching both peripherals.
    DiscoveryIncomplete {
        controller_found: bool,
        hub_found: bool,
    },

    /// A connect attempt timed out or was rejected.
    ConnectFailed { which: Role },

    /// The link dropped while the bridge was active.
    UnexpectedDisconnect { which: Role },

    /// A malformed motion command reached the encoder.
    InvalidCommand,
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::DiscoveryIncomplete {
                controller_found,
                hub_found,
            } => match (controller_found, hub_found) {
                (false, false) => f.write_str("no devices found"),
                (false, true) => f.write_str("controller not found"),
                (true, false) => f.write_str("hub not found"),
                (true, true) => f.write_str("scan incomplete"),
            },
            BridgeError::ConnectFailed { which } => write!(f, "{} connect failed", which),
            BridgeError::UnexpectedDisconnect { which } => write!(f, "{} disconnected", which),
            BridgeError::InvalidCommand => f.write_str("invalid command"),
        }
    }
}

/// Rejections from the hub command encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Throttle outside -100..=100.
    ThrottleOutOfRange(i16),
    /// Steering outside -100..=100.
    SteeringOutOfRange(i16),
    /// Light byte is not one of the four hub light modes.
    UnknownLightMode(u8),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::ThrottleOutOfRange(v) => write!(f, "throttle {} out of range", v),
            EncodeError::SteeringOutOfRange(v) => write!(f, "steering {} out of range", v),
            EncodeError::UnknownLightMode(v) => write!(f, "unknown light mode {:#04x}", v),
        }
    }
}

impl From<EncodeError> for BridgeError {
    fn from(_: EncodeError) -> Self {
        BridgeError::InvalidCommand
    }
}

/// Transport-level failures surfaced by a [`Link`](crate::ble::link::Link).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Connect did not complete within the configured bound.
    Timeout,
    /// The peer or the stack refused the connection / GATT setup.
    Rejected,
    /// The radio could not start a scan.
    ScanFailed,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LinkError::Timeout => "timeout",
            LinkError::Rejected => "rejected",
            LinkError::ScanFailed => "scan failed",
        })
    }
}

/// Errors decoding the persisted settings record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingsError {
    /// Record shorter than the fixed layout.
    Truncated,
    /// Record written by a different layout version.
    UnsupportedVersion(u8),
    /// Output buffer too small.
    BufferOverflow,
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Truncated => f.write_str("settings record truncated"),
            SettingsError::UnsupportedVersion(v) => write!(f, "settings version {} unsupported", v),
            SettingsError::BufferOverflow => f.write_str("settings buffer too small"),
        }
    }
}
