//! Controller input model and the input-to-motion mapper.
//!
//! Inputs arrive pre-parsed: sticks as signed 16-bit axes, triggers as
//! unsigned 10-bit values, buttons as a bitfield.  Decoding the controller's
//! native HID report is the platform binding's job.

pub mod mapper;

use core::ops::BitOr;

pub use mapper::{map, scale_stick, scale_trigger};

/// Controller buttons as a bitfield.
///
/// ```
/// use pad2hub::control::Buttons;
///
/// let held = Buttons::A | Buttons::DPAD_UP;
/// assert!(held.contains(Buttons::DPAD_UP));
/// assert!(!held.contains(Buttons::B));
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buttons(pub u16);

impl Buttons {
    pub const A: Self = Self(1 << 0);
    pub const B: Self = Self(1 << 1);
    pub const X: Self = Self(1 << 2);
    pub const Y: Self = Self(1 << 3);
    pub const LB: Self = Self(1 << 4);
    pub const RB: Self = Self(1 << 5);
    pub const VIEW: Self = Self(1 << 6); // Back
    pub const MENU: Self = Self(1 << 7); // Start
    pub const GUIDE: Self = Self(1 << 8);
    pub const LS: Self = Self(1 << 9);
    pub const RS: Self = Self(1 << 10);
    pub const DPAD_UP: Self = Self(1 << 11);
    pub const DPAD_DOWN: Self = Self(1 << 12);
    pub const DPAD_LEFT: Self = Self(1 << 13);
    pub const DPAD_RIGHT: Self = Self(1 << 14);

    pub const NONE: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn contains(self, button: Buttons) -> bool {
        (self.0 & button.0) == button.0
    }

    #[inline]
    pub fn set(&mut self, button: Buttons, pressed: bool) {
        if pressed {
            self.0 |= button.0;
        } else {
            self.0 &= !button.0;
        }
    }
}

impl BitOr for Buttons {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Analog stick, both axes in [-32768, 32767]. Positive Y is up.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AnalogStick {
    pub x: i16,
    pub y: i16,
}

impl AnalogStick {
    pub const NEUTRAL: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}

/// One normalized controller sample.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerInput {
    pub left_stick: AnalogStick,
    pub right_stick: AnalogStick,
    /// 0..=1023
    pub left_trigger: u16,
    /// 0..=1023
    pub right_trigger: u16,
    pub buttons: Buttons,
}

impl ControllerInput {
    pub const fn neutral() -> Self {
        Self {
            left_stick: AnalogStick::NEUTRAL,
            right_stick: AnalogStick::NEUTRAL,
            left_trigger: 0,
            right_trigger: 0,
            buttons: Buttons::NONE,
        }
    }
}

/// Latest-value source of controller samples.
///
/// Implemented by the controller link: the notification handler overwrites
/// the held sample and the control loop reads whatever is newest.
pub trait InputSource {
    /// Most recent sample, or `None` if nothing has arrived on this link yet.
    fn latest(&mut self) -> Option<ControllerInput>;
}
