//! Hub command frame encoder.

use crate::error::EncodeError;
use crate::hub::{CalibrationStep, LightMode, MotionCommand, COMMAND_HEADER, COMMAND_LEN};

const THROTTLE_OFFSET: usize = 9;
const STEERING_OFFSET: usize = 10;
const MODE_OFFSET: usize = 11;

/// One complete 13-byte hub command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandFrame([u8; COMMAND_LEN]);

impl CommandFrame {
    fn with_payload(throttle: i8, steering: i8, mode: u8) -> Self {
        let mut buf = [0u8; COMMAND_LEN];
        buf[..COMMAND_HEADER.len()].copy_from_slice(&COMMAND_HEADER);
        buf[THROTTLE_OFFSET] = throttle as u8;
        buf[STEERING_OFFSET] = steering as u8;
        buf[MODE_OFFSET] = mode;
        Self(buf)
    }

    /// Drive frame. Throttle and steering must be within -100..=100.
    pub fn drive(throttle: i8, steering: i8, lights: LightMode) -> Result<Self, EncodeError> {
        if !(-100..=100).contains(&throttle) {
            return Err(EncodeError::ThrottleOutOfRange(throttle.into()));
        }
        if !(-100..=100).contains(&steering) {
            return Err(EncodeError::SteeringOutOfRange(steering.into()));
        }
        Ok(Self::with_payload(throttle, steering, lights.code()))
    }

    /// Standalone calibration frame; motion bytes are always zero.
    pub fn calibration(step: CalibrationStep) -> Self {
        Self::with_payload(0, 0, step.code())
    }

    pub fn as_bytes(&self) -> &[u8; COMMAND_LEN] {
        &self.0
    }

    pub fn throttle(&self) -> i8 {
        self.0[THROTTLE_OFFSET] as i8
    }

    pub fn steering(&self) -> i8 {
        self.0[STEERING_OFFSET] as i8
    }

    pub fn mode_byte(&self) -> u8 {
        self.0[MODE_OFFSET]
    }
}

/// Frames to send for one control tick.
///
/// A calibration request replaces the drive frame entirely for that tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoded {
    Drive(CommandFrame),
    Calibrate([CommandFrame; 2]),
}

impl Encoded {
    pub fn frames(&self) -> &[CommandFrame] {
        match self {
            Encoded::Drive(frame) => core::slice::from_ref(frame),
            Encoded::Calibrate(frames) => frames,
        }
    }
}

/// Encode a motion command into hub frames.
pub fn encode(cmd: &MotionCommand) -> Result<Encoded, EncodeError> {
    if cmd.calibrate {
        return Ok(Encoded::Calibrate(
            CalibrationStep::SEQUENCE.map(CommandFrame::calibration),
        ));
    }
    CommandFrame::drive(cmd.throttle, cmd.steering, cmd.lights).map(Encoded::Drive)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drive_frame_layout() {
        let frame = CommandFrame::drive(50, -25, LightMode::BothOnWithBrake).unwrap();
        assert_eq!(
            frame.as_bytes(),
            &[0x0d, 0x00, 0x81, 0x36, 0x11, 0x51, 0x00, 0x03, 0x00, 0x32, 0xE7, 0x01, 0x00]
        );
    }

    #[test]
    fn full_reverse_is_twos_complement() {
        let frame = CommandFrame::drive(-100, 100, LightMode::AllOff).unwrap();
        assert_eq!(frame.as_bytes()[9], 0x9C);
        assert_eq!(frame.as_bytes()[10], 0x64);
        assert_eq!(frame.as_bytes()[11], 0x04);
        assert_eq!(frame.throttle(), -100);
        assert_eq!(frame.steering(), 100);
    }

    #[test]
    fn every_valid_command_keeps_header_and_length() {
        let modes = [
            LightMode::BothOn,
            LightMode::BothOnWithBrake,
            LightMode::AllOff,
            LightMode::RearOnlyWithBrake,
        ];
        for throttle in (-100..=100).step_by(10) {
            for steering in (-100..=100).step_by(25) {
                for lights in modes {
                    let cmd = MotionCommand {
                        throttle,
                        steering,
                        lights,
                        calibrate: false,
                    };
                    let Encoded::Drive(frame) = encode(&cmd).unwrap() else {
                        panic!("expected drive frame");
                    };
                    assert_eq!(frame.as_bytes().len(), COMMAND_LEN);
                    assert_eq!(&frame.as_bytes()[..9], &COMMAND_HEADER);
                    assert_eq!(frame.as_bytes()[12], 0x00);
                }
            }
        }
    }

    #[test]
    fn out_of_range_motion_is_rejected() {
        assert_eq!(
            CommandFrame::drive(101, 0, LightMode::BothOn),
            Err(EncodeError::ThrottleOutOfRange(101))
        );
        assert_eq!(
            CommandFrame::drive(0, -128, LightMode::BothOn),
            Err(EncodeError::SteeringOutOfRange(-128))
        );
    }

    #[test]
    fn unknown_light_byte_is_rejected() {
        assert_eq!(LightMode::try_from(0x05), Ok(LightMode::RearOnlyWithBrake));
        assert_eq!(LightMode::try_from(0x02), Err(EncodeError::UnknownLightMode(0x02)));
    }

    #[test]
    fn calibration_is_two_standalone_frames() {
        let cmd = MotionCommand {
            throttle: 80,
            steering: -40,
            lights: LightMode::BothOn,
            calibrate: true,
        };
        let Encoded::Calibrate([first, second]) = encode(&cmd).unwrap() else {
            panic!("expected calibration frames");
        };
        assert_eq!(first.mode_byte(), 0x10);
        assert_eq!(second.mode_byte(), 0x08);
        for frame in [first, second] {
            assert_eq!(&frame.as_bytes()[..9], &COMMAND_HEADER);
            assert_eq!(frame.throttle(), 0);
            assert_eq!(frame.steering(), 0);
        }
    }

    #[test]
    fn encoded_frames_slice() {
        let drive = encode(&MotionCommand::stop(LightMode::BothOn)).unwrap();
        assert_eq!(drive.frames().len(), 1);
        let cal = encode(&MotionCommand {
            calibrate: true,
            ..MotionCommand::default()
        })
        .unwrap();
        assert_eq!(cal.frames().len(), 2);
    }
}
