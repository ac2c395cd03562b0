//! Maps a controller sample onto a hub [`MotionCommand`].
//!
//! Each axis is deadzone-clamped, then rescaled so the deadzone edge maps to
//! 0 and full deflection maps to `max_speed_percent`.  The operator can cap
//! output without losing resolution inside the cap.
//!
//! Pure: everything that changes behaviour arrives in [`ControlSettings`].

use crate::config::TRIGGER_MAX;
use crate::control::{Buttons, ControllerInput};
use crate::hub::{LightMode, MotionCommand};
use crate::settings::ControlSettings;

/// Rescale `magnitude` (0..=`full`) past a percentage deadzone to
/// 0..=`max_percent`, rounding to nearest.
fn scale_magnitude(magnitude: u32, full: u32, deadzone_percent: u8, max_percent: u8) -> u32 {
    let deadzone = full * u32::from(deadzone_percent) / 100;
    if magnitude <= deadzone || full <= deadzone {
        return 0;
    }
    let span = full - deadzone;
    let live = (magnitude - deadzone).min(span);
    let max_percent = u32::from(max_percent.min(100));
    (live * max_percent + span / 2) / span
}

/// Signed stick axis to -max..=max.
///
/// Each direction uses its own full scale (32768 negative, 32767 positive)
/// so both extremes reach exactly ±max.
pub fn scale_stick(raw: i16, deadzone_percent: u8, max_percent: u8) -> i8 {
    let value = i32::from(raw);
    let full = if value < 0 { 32_768 } else { 32_767 };
    let scaled = scale_magnitude(value.unsigned_abs(), full, deadzone_percent, max_percent) as i32;
    (if value < 0 { -scaled } else { scaled }) as i8
}

/// Trigger (0..=1023) to 0..=max.
pub fn scale_trigger(raw: u16, deadzone_percent: u8, max_percent: u8) -> i8 {
    let raw = raw.min(TRIGGER_MAX);
    scale_magnitude(raw.into(), TRIGGER_MAX.into(), deadzone_percent, max_percent) as i8
}

/// Light mode picked by a held D-pad direction, if any.
fn dpad_light_mode(buttons: Buttons) -> Option<LightMode> {
    if buttons.contains(Buttons::DPAD_UP) {
        Some(LightMode::BothOn)
    } else if buttons.contains(Buttons::DPAD_RIGHT) {
        Some(LightMode::BothOnWithBrake)
    } else if buttons.contains(Buttons::DPAD_DOWN) {
        Some(LightMode::AllOff)
    } else if buttons.contains(Buttons::DPAD_LEFT) {
        Some(LightMode::RearOnlyWithBrake)
    } else {
        None
    }
}

/// Turn one controller sample into the command for this tick.
///
/// - trigger mode: throttle = right trigger - left trigger, steering = left stick X
/// - stick mode: throttle = left stick Y, steering = right stick X
/// - `VIEW` requests calibration; throttle and steering are then zero
pub fn map(input: &ControllerInput, settings: &ControlSettings) -> MotionCommand {
    let settings = settings.clamped();
    let dz = settings.deadzone_percent;
    let max = settings.max_speed_percent;

    let lights = dpad_light_mode(input.buttons).unwrap_or(settings.light_mode);

    if input.buttons.contains(Buttons::VIEW) {
        return MotionCommand {
            calibrate: true,
            ..MotionCommand::stop(lights)
        };
    }

    let (throttle, steer_axis) = if settings.trigger_mode {
        let forward = scale_trigger(input.right_trigger, dz, max);
        let reverse = scale_trigger(input.left_trigger, dz, max);
        (forward - reverse, input.left_stick.x)
    } else {
        (scale_stick(input.left_stick.y, dz, max), input.right_stick.x)
    };

    let mut steering = scale_stick(steer_axis, dz, max);
    if settings.invert_steering {
        steering = -steering;
    }

    MotionCommand {
        throttle,
        steering,
        lights,
        calibrate: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::AnalogStick;

    fn defaults() -> ControlSettings {
        ControlSettings::default()
    }

    #[test]
    fn full_negative_steering_hits_negative_cap() {
        // 3% deadzone, 75% max speed
        assert_eq!(scale_stick(-32768, 3, 75), -75);
        assert_eq!(scale_stick(32767, 3, 75), 75);
    }

    #[test]
    fn inputs_inside_deadzone_are_exactly_zero() {
        // 3% of 32767 = 983
        for raw in [-983, -500, -1, 0, 1, 500, 983] {
            assert_eq!(scale_stick(raw, 3, 75), 0, "raw {}", raw);
        }
        // 3% of 1023 = 30
        for raw in [0, 10, 30] {
            assert_eq!(scale_trigger(raw, 3, 75), 0, "raw {}", raw);
        }
    }

    #[test]
    fn just_past_deadzone_is_small() {
        assert_eq!(scale_stick(1400, 3, 100), 1);
        assert_eq!(scale_stick(-1400, 3, 100), -1);
    }

    #[test]
    fn scaling_is_linear_after_deadzone() {
        // Halfway between deadzone edge and full scale -> half of max.
        let dz = 32767 * 10 / 100;
        let mid = (dz + (32767 - dz) / 2) as i16;
        assert_eq!(scale_stick(mid, 10, 80), 40);
    }

    #[test]
    fn cap_above_full_scale_saturates_at_100() {
        assert_eq!(scale_stick(32767, 0, 200), 100);
        assert_eq!(scale_stick(-32768, 0, 255), -100);
        assert_eq!(scale_trigger(1023, 0, 150), 100);
    }

    #[test]
    fn zero_deadzone_full_scale() {
        assert_eq!(scale_stick(i16::MIN, 0, 100), -100);
        assert_eq!(scale_trigger(1023, 0, 100), 100);
        assert_eq!(scale_trigger(0, 0, 100), 0);
    }

    #[test]
    fn trigger_out_of_range_is_clamped() {
        assert_eq!(scale_trigger(4000, 3, 75), 75);
    }

    #[test]
    fn trigger_mode_combines_triggers() {
        let input = ControllerInput {
            right_trigger: 1023,
            left_trigger: 0,
            left_stick: AnalogStick::new(-32768, 0),
            ..ControllerInput::neutral()
        };
        let cmd = map(&input, &defaults());
        assert_eq!(cmd.throttle, 75);
        assert_eq!(cmd.steering, -75);
        assert!(!cmd.calibrate);

        let braking = ControllerInput {
            right_trigger: 1023,
            left_trigger: 1023,
            ..ControllerInput::neutral()
        };
        assert_eq!(map(&braking, &defaults()).throttle, 0);

        let reverse = ControllerInput {
            left_trigger: 1023,
            ..ControllerInput::neutral()
        };
        assert_eq!(map(&reverse, &defaults()).throttle, -75);
    }

    #[test]
    fn stick_mode_uses_sticks() {
        let settings = ControlSettings {
            trigger_mode: false,
            ..defaults()
        };
        let input = ControllerInput {
            left_stick: AnalogStick::new(-32768, 32767),
            right_stick: AnalogStick::new(32767, 0),
            right_trigger: 1023,
            ..ControllerInput::neutral()
        };
        let cmd = map(&input, &settings);
        assert_eq!(cmd.throttle, 75);
        assert_eq!(cmd.steering, 75);
    }

    #[test]
    fn invert_flips_steering_only() {
        let settings = ControlSettings {
            invert_steering: true,
            ..defaults()
        };
        let input = ControllerInput {
            right_trigger: 1023,
            left_stick: AnalogStick::new(32767, 0),
            ..ControllerInput::neutral()
        };
        let cmd = map(&input, &settings);
        assert_eq!(cmd.steering, -75);
        assert_eq!(cmd.throttle, 75);
    }

    #[test]
    fn neutral_input_is_stop() {
        let cmd = map(&ControllerInput::neutral(), &defaults());
        assert_eq!(cmd, MotionCommand::stop(LightMode::BothOn));
    }

    #[test]
    fn dpad_overrides_light_mode() {
        let mut input = ControllerInput::neutral();
        input.buttons = Buttons::DPAD_DOWN;
        assert_eq!(map(&input, &defaults()).lights, LightMode::AllOff);
        input.buttons = Buttons::DPAD_LEFT;
        assert_eq!(map(&input, &defaults()).lights, LightMode::RearOnlyWithBrake);
        input.buttons = Buttons::DPAD_RIGHT;
        assert_eq!(map(&input, &defaults()).lights, LightMode::BothOnWithBrake);

        let settings = ControlSettings {
            light_mode: LightMode::AllOff,
            ..defaults()
        };
        assert_eq!(map(&ControllerInput::neutral(), &settings).lights, LightMode::AllOff);
    }

    #[test]
    fn calibration_never_carries_motion() {
        let input = ControllerInput {
            right_trigger: 1023,
            left_stick: AnalogStick::new(20000, 0),
            buttons: Buttons::VIEW,
            ..ControllerInput::neutral()
        };
        let cmd = map(&input, &defaults());
        assert!(cmd.calibrate);
        assert_eq!(cmd.throttle, 0);
        assert_eq!(cmd.steering, 0);
    }

    #[test]
    fn out_of_range_settings_are_clamped() {
        let settings = ControlSettings {
            max_speed_percent: 250,
            deadzone_percent: 90,
            ..defaults()
        };
        let input = ControllerInput {
            right_trigger: 1023,
            ..ControllerInput::neutral()
        };
        assert_eq!(map(&input, &settings).throttle, 100);
    }
}
