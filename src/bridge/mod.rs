//! Application state machine and the cooperative scheduler that runs it.
//!
//! ```text
//! Init -> Scanning -> Connecting -> Connected -> Active
//!           ^  |          |                        |
//!           |  +-backoff  +-------> Error <--------+
//!           +--------- (recovery delay) --+
//! ```

pub mod led;
pub mod scheduler;
pub mod timing;

use core::fmt;

use crate::error::BridgeError;

pub use led::{led_pattern, LedPattern};
pub use scheduler::BridgeScheduler;
pub use timing::{Clock, Interval};

/// Where a `Connecting` pass is.  Connects are serialized: controller,
/// a settle pause, then the hub.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectPhase {
    Controller,
    /// Waiting out the stabilization delay after the controller connected.
    Stabilizing { until: u64 },
    Hub,
}

/// Bridge-wide state, owned by the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AppState {
    Init,
    /// `backoff_until` is set while waiting to start the next window.
    Scanning { backoff_until: Option<u64> },
    Connecting(ConnectPhase),
    Connected,
    Active,
    Error { cause: BridgeError, retry_at: u64 },
}

impl AppState {
    pub const fn kind(&self) -> AppStateKind {
        match self {
            AppState::Init => AppStateKind::Init,
            AppState::Scanning { .. } => AppStateKind::Scanning,
            AppState::Connecting(_) => AppStateKind::Connecting,
            AppState::Connected => AppStateKind::Connected,
            AppState::Active => AppStateKind::Active,
            AppState::Error { .. } => AppStateKind::Error,
        }
    }
}

/// [`AppState`] without its bookkeeping, for status output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AppStateKind {
    Init,
    Scanning,
    Connecting,
    Connected,
    Active,
    Error,
}

impl AppStateKind {
    pub const fn label(self) -> &'static str {
        match self {
            AppStateKind::Init => "INIT",
            AppStateKind::Scanning => "SCANNING",
            AppStateKind::Connecting => "CONNECTING",
            AppStateKind::Connected => "CONNECTED",
            AppStateKind::Active => "ACTIVE",
            AppStateKind::Error => "ERROR",
        }
    }
}

impl fmt::Display for AppStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
