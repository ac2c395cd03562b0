//! LEGO Technic Move hub command protocol.
//!
//! The hub takes fixed 13-byte writes on its LWP3 characteristic
//! (`00001624-1212-efde-1623-785feabcd123`):
//!
//! ```text
//! Byte 0..9 : 0d 00 81 36 11 51 00 03 00   constant header
//! Byte 9    : throttle  (i8, -100..=100, two's complement)
//! Byte 10   : steering  (i8, -100..=100, positive = right)
//! Byte 11   : light mode, or a calibration code
//! Byte 12   : 0x00
//! ```
//!
//! No length prefix, checksum or acknowledgement exists; delivery is the
//! transport's problem.

pub mod frame;

use core::fmt;

use crate::error::EncodeError;

pub use frame::{encode, CommandFrame, Encoded};

/// Fixed header of every hub command.
pub const COMMAND_HEADER: [u8; 9] = [0x0d, 0x00, 0x81, 0x36, 0x11, 0x51, 0x00, 0x03, 0x00];

/// Total length of every hub command.
pub const COMMAND_LEN: usize = 13;

/// Hub light behaviour, carried in byte 11 of a drive frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LightMode {
    /// Front and rear on.
    #[default]
    BothOn = 0x00,
    /// Both on, rear brightens while braking.
    BothOnWithBrake = 0x01,
    AllOff = 0x04,
    /// Rear only, with brake function.
    RearOnlyWithBrake = 0x05,
}

impl LightMode {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn label(self) -> &'static str {
        match self {
            LightMode::BothOn => "lights on",
            LightMode::BothOnWithBrake => "lights+brake",
            LightMode::AllOff => "lights off",
            LightMode::RearOnlyWithBrake => "rear+brake",
        }
    }
}

impl TryFrom<u8> for LightMode {
    type Error = EncodeError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0x00 => Ok(LightMode::BothOn),
            0x01 => Ok(LightMode::BothOnWithBrake),
            0x04 => Ok(LightMode::AllOff),
            0x05 => Ok(LightMode::RearOnlyWithBrake),
            other => Err(EncodeError::UnknownLightMode(other)),
        }
    }
}

impl fmt::Display for LightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Steering calibration codes. The hub expects both, in this order, each
/// in its own frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CalibrationStep {
    First = 0x10,
    Second = 0x08,
}

impl CalibrationStep {
    pub const SEQUENCE: [CalibrationStep; 2] = [CalibrationStep::First, CalibrationStep::Second];

    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// What the operator wants the hub to do this control tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionCommand {
    /// -100..=100, positive forward.
    pub throttle: i8,
    /// -100..=100, positive right.
    pub steering: i8,
    pub lights: LightMode,
    /// Run the steering calibration instead of driving.
    pub calibrate: bool,
}

impl MotionCommand {
    /// Stopped, wheels centred.
    pub const fn stop(lights: LightMode) -> Self {
        Self {
            throttle: 0,
            steering: 0,
            lights,
            calibrate: false,
        }
    }
}
