//! Application-wide constants and compile-time configuration.
//!
//! Timing budgets, identity filters, protocol constants and flash layout
//! live here so they can be tuned in one place.  `BridgeConfig` wraps the
//! timing values for the scheduler so tests can shrink them.

use crate::ble::scan::IdentityFilters;

// BLE discovery / connection

/// Duration of one discovery window (seconds).
pub const BLE_SCAN_DURATION_SECS: u32 = 10;

/// Upper bound for a single connect attempt (ms).
pub const BLE_CONNECT_TIMEOUT_MS: u32 = 5_000;

/// Pause between the controller and hub connect attempts (ms).
/// Back-to-back connects on a single radio are unreliable.
pub const BLE_STABILIZATION_DELAY_MS: u64 = 500;

/// Delay before retrying a scan that did not find both peripherals (ms).
pub const RESCAN_BACKOFF_MS: u64 = 3_000;

/// Delay between entering `Error` and starting a fresh scan (ms).
pub const ERROR_RECOVERY_DELAY_MS: u64 = 2_000;

/// Controller advertisements start with this name ("Xbox Wireless Controller").
pub const CONTROLLER_NAME_PREFIX: &str = "Xbox";

/// Hub advertisements contain this name.
pub const HUB_NAME_FRAGMENT: &str = "Technic Move";

/// BLE connection interval range (in 1.25 ms units). 12..24 = 15..30 ms.
pub const BLE_CONN_INTERVAL_MIN: u16 = 12;
pub const BLE_CONN_INTERVAL_MAX: u16 = 24;

/// BLE slave latency (number of connection events the peripheral can skip).
pub const BLE_SLAVE_LATENCY: u16 = 0;

/// BLE supervision timeout (in 10 ms units). 400 = 4 s.
pub const BLE_SUP_TIMEOUT: u16 = 400;

// Loop timing

/// Motor command rate: 20 Hz.
pub const CONTROL_PERIOD_MS: u64 = 50;

/// Display refresh rate: 5 Hz.
pub const DISPLAY_PERIOD_MS: u64 = 200;

/// Status log rate: 1 Hz.
pub const STATUS_PERIOD_MS: u64 = 1_000;

/// Main loop idle sleep between ticks (ms).
pub const LOOP_IDLE_MS: u64 = 1;

// Control defaults

pub const DEFAULT_MAX_SPEED_PERCENT: u8 = 75;
pub const DEFAULT_DEADZONE_PERCENT: u8 = 3;
pub const DEFAULT_TRIGGER_MODE: bool = true;
pub const DEFAULT_INVERT_STEERING: bool = false;

/// Highest deadzone an operator may configure.
pub const MAX_DEADZONE_PERCENT: u8 = 50;

// Controller input ranges

pub const STICK_MIN: i16 = i16::MIN;
pub const STICK_MAX: i16 = i16::MAX;
pub const TRIGGER_MAX: u16 = 1023;

// Status LED

pub const LED_SCAN_BLINK_MS: u64 = 500;
pub const LED_ERROR_BLINK_MS: u64 = 100;

// Settings storage

/// Layout version of the persisted settings record.
pub const SETTINGS_VERSION: u8 = 1;

/// Flash page index where settings storage starts (4 KB per page on nRF52840).
pub const STORAGE_FLASH_PAGE_START: u32 = 240;

/// Number of flash pages reserved for settings storage.
pub const STORAGE_FLASH_PAGE_COUNT: u32 = 4;

/// Runtime timing and filter configuration for the bridge scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BridgeConfig {
    pub scan_duration_secs: u32,
    pub connect_timeout_ms: u32,
    pub stabilization_delay_ms: u64,
    pub rescan_backoff_ms: u64,
    pub error_recovery_delay_ms: u64,
    pub control_period_ms: u64,
    pub display_period_ms: u64,
    pub status_period_ms: u64,
    pub filters: IdentityFilters,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            scan_duration_secs: BLE_SCAN_DURATION_SECS,
            connect_timeout_ms: BLE_CONNECT_TIMEOUT_MS,
            stabilization_delay_ms: BLE_STABILIZATION_DELAY_MS,
            rescan_backoff_ms: RESCAN_BACKOFF_MS,
            error_recovery_delay_ms: ERROR_RECOVERY_DELAY_MS,
            control_period_ms: CONTROL_PERIOD_MS,
            display_period_ms: DISPLAY_PERIOD_MS,
            status_period_ms: STATUS_PERIOD_MS,
            filters: IdentityFilters {
                controller_prefix: CONTROLLER_NAME_PREFIX,
                hub_fragment: HUB_NAME_FRAGMENT,
            },
        }
    }
}
