//! Read-only status snapshots and the sink that presents them.

use crate::ble::PeripheralRecord;
use crate::bridge::AppStateKind;
use crate::error::BridgeError;
use crate::hub::MotionCommand;

/// Per-peripheral view: name, address, signal strength, found flag and
/// connection state.
pub type PeripheralSnapshot = PeripheralRecord;

/// Bridge-wide view handed to the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeSnapshot {
    pub state: AppStateKind,
    pub controller: PeripheralSnapshot,
    pub hub: PeripheralSnapshot,
    /// Most recent error reported, cleared when a pair goes Active.
    pub last_error: Option<BridgeError>,
    /// Last command handed to the encoder.
    pub last_command: Option<MotionCommand>,
    pub frames_sent: u32,
    pub send_failures: u32,
    pub uptime_ms: u64,
}

/// Consumer of bridge status.
///
/// The scheduler calls `report_error` once per error before recovering, and
/// `display` / `status` at their own rates.
pub trait StatusSink {
    fn report_error(&mut self, error: &BridgeError);

    /// Fast refresh (screen).
    fn display(&mut self, _snapshot: &BridgeSnapshot) {}

    /// Slow refresh (log).
    fn status(&mut self, snapshot: &BridgeSnapshot) {
        info!(
            "state {} | controller {} | hub {} | frames {} failed {} | up {} s",
            snapshot.state,
            snapshot.controller.state,
            snapshot.hub.state,
            snapshot.frames_sent,
            snapshot.send_failures,
            snapshot.uptime_ms / 1000
        );
    }
}
