//! The cooperative bridge loop.
//!
//! [`BridgeScheduler::tick`] is called repeatedly from one task.  Each call
//! advances the application state machine by at most one step and then runs
//! the rate-limited branches that are due:
//!
//! - control (20 Hz, Active only): input -> [`map`] -> [`encode`] -> hub
//! - display (5 Hz) and status (1 Hz): snapshot -> [`StatusSink`]
//!
//! Only a connect attempt awaits; everything else returns immediately.
//! Delays (stabilization, scan backoff, error recovery) are deadlines kept in
//! the state itself, so nothing sleeps inside a tick.

use crate::ble::{
    ConnectionState, ConnectionSupervisor, Link, LinkContext, Role, ScanCoordinator, ScanOutcome,
    Scanner,
};
use crate::bridge::timing::{Clock, Interval};
use crate::bridge::{AppState, AppStateKind, ConnectPhase};
use crate::config::BridgeConfig;
use crate::control::{map, ControllerInput, InputSource};
use crate::error::BridgeError;
use crate::hub::{encode, MotionCommand};
use crate::settings::ControlSettings;
use crate::status::{BridgeSnapshot, StatusSink};

/// Send counters exposed through the snapshot.
#[derive(Clone, Copy, Debug, Default)]
struct Telemetry {
    frames_sent: u32,
    send_failures: u32,
    last_command: Option<MotionCommand>,
    last_error: Option<BridgeError>,
}

/// Owns both supervisors and the scan coordinator and runs the bridge.
///
/// - `S`: radio scanner
/// - `C`: controller link, also the source of controller samples
/// - `H`: hub link
/// - `P`: status sink
/// - `K`: monotonic clock
pub struct BridgeScheduler<'a, S, C, H, P, K> {
    ctx: &'a LinkContext,
    scan: ScanCoordinator<'a, S>,
    controller: ConnectionSupervisor<'a, C>,
    hub: ConnectionSupervisor<'a, H>,
    sink: P,
    clock: K,
    config: BridgeConfig,
    settings: ControlSettings,
    state: AppState,
    started_at: u64,
    control_tick: Interval,
    display_tick: Interval,
    status_tick: Interval,
    calibrate_held: bool,
    telemetry: Telemetry,
}

impl<'a, S, C, H, P, K> BridgeScheduler<'a, S, C, H, P, K>
where
    S: Scanner,
    C: Link + InputSource,
    H: Link,
    P: StatusSink,
    K: Clock,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ctx: &'a LinkContext,
        scanner: S,
        controller_link: C,
        hub_link: H,
        sink: P,
        clock: K,
        config: BridgeConfig,
        settings: ControlSettings,
    ) -> Self {
        let started_at = clock.now_ms();
        Self {
            ctx,
            scan: ScanCoordinator::new(scanner, ctx),
            controller: ConnectionSupervisor::new(
                Role::Controller,
                ctx.slot(Role::Controller),
                controller_link,
                config.connect_timeout_ms,
            ),
            hub: ConnectionSupervisor::new(
                Role::Hub,
                ctx.slot(Role::Hub),
                hub_link,
                config.connect_timeout_ms,
            ),
            sink,
            clock,
            config,
            settings: settings.clamped(),
            state: AppState::Init,
            started_at,
            control_tick: Interval::new(config.control_period_ms),
            display_tick: Interval::new(config.display_period_ms),
            status_tick: Interval::new(config.status_period_ms),
            calibrate_held: false,
            telemetry: Telemetry::default(),
        }
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn settings(&self) -> &ControlSettings {
        &self.settings
    }

    /// Replace the mapper settings; applied from the next control tick.
    pub fn set_settings(&mut self, settings: ControlSettings) {
        self.settings = settings.clamped();
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut P {
        &mut self.sink
    }

    pub fn controller(&self) -> &ConnectionSupervisor<'a, C> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ConnectionSupervisor<'a, C> {
        &mut self.controller
    }

    pub fn hub(&self) -> &ConnectionSupervisor<'a, H> {
        &self.hub
    }

    pub fn hub_mut(&mut self) -> &mut ConnectionSupervisor<'a, H> {
        &mut self.hub
    }

    pub fn scan(&self) -> &ScanCoordinator<'a, S> {
        &self.scan
    }

    /// `Init -> Scanning`.  Call once both links exist.  Later calls are
    /// ignored.
    pub fn start(&mut self) {
        if self.state != AppState::Init {
            return;
        }
        info!("bridge start");
        self.begin_scan();
    }

    /// One pass of the loop.
    pub async fn tick(&mut self) {
        let now = self.clock.now_ms();

        self.step(now).await;

        if self.state == AppState::Active && self.control_tick.due(now) {
            self.control(now);
        }
        if self.display_tick.due(now) {
            let snapshot = self.snapshot();
            self.sink.display(&snapshot);
        }
        if self.status_tick.due(now) {
            let snapshot = self.snapshot();
            self.sink.status(&snapshot);
        }
    }

    /// Advance the application state machine by one step.
    async fn step(&mut self, now: u64) {
        match self.state {
            AppState::Init => {}

            AppState::Scanning {
                backoff_until: Some(until),
            } => {
                if now >= until {
                    self.begin_scan();
                }
            }

            AppState::Scanning {
                backoff_until: None,
            } => {
                if !self.scan.is_scan_complete() {
                    return;
                }
                match self.scan.outcome() {
                    ScanOutcome::BothFound => {
                        info!("scan complete: both peripherals found");
                        self.state = AppState::Connecting(ConnectPhase::Controller);
                    }
                    ScanOutcome::Incomplete {
                        controller_found,
                        hub_found,
                    } => {
                        self.report(BridgeError::DiscoveryIncomplete {
                            controller_found,
                            hub_found,
                        });
                        info!("rescan in {} ms", self.config.rescan_backoff_ms);
                        self.state = AppState::Scanning {
                            backoff_until: Some(now + self.config.rescan_backoff_ms),
                        };
                    }
                }
            }

            AppState::Connecting(ConnectPhase::Controller) => {
                match self.controller.begin_connect().await {
                    Ok(()) => {
                        // The connect may have used most of its timeout.
                        let until = self.clock.now_ms() + self.config.stabilization_delay_ms;
                        self.state = AppState::Connecting(ConnectPhase::Stabilizing { until });
                    }
                    Err(e) => self.fail(e),
                }
            }

            AppState::Connecting(ConnectPhase::Stabilizing { until }) => {
                if !self.controller.is_connected() {
                    self.fail(BridgeError::UnexpectedDisconnect {
                        which: Role::Controller,
                    });
                } else if now >= until {
                    self.state = AppState::Connecting(ConnectPhase::Hub);
                }
            }

            AppState::Connecting(ConnectPhase::Hub) => {
                if !self.controller.is_connected() {
                    self.fail(BridgeError::UnexpectedDisconnect {
                        which: Role::Controller,
                    });
                    return;
                }
                match self.hub.begin_connect().await {
                    Ok(()) => {
                        self.state = AppState::Connected;
                        self.activate();
                    }
                    Err(e) => self.fail(e),
                }
            }

            AppState::Connected => self.activate(),

            AppState::Active => {
                for role in Role::ALL {
                    if !self.is_connected(role) {
                        self.fail(BridgeError::UnexpectedDisconnect { which: role });
                        return;
                    }
                }
            }

            AppState::Error { retry_at, .. } => {
                if now >= retry_at {
                    info!("recovering: rescanning");
                    // A peripheral that is still linked will not advertise.
                    self.controller.disconnect();
                    self.hub.disconnect();
                    self.begin_scan();
                }
            }
        }
    }

    /// `Connected -> Active`.
    fn activate(&mut self) {
        info!("both peripherals connected, bridge active");
        self.telemetry.last_error = None;
        self.calibrate_held = false;
        self.control_tick.reset();
        self.state = AppState::Active;
    }

    fn begin_scan(&mut self) {
        self.state = AppState::Scanning {
            backoff_until: None,
        };
        self.scan.start_scan(self.config.scan_duration_secs);
    }

    fn is_connected(&self, role: Role) -> bool {
        match role {
            Role::Controller => self.controller.is_connected(),
            Role::Hub => self.hub.is_connected(),
        }
    }

    fn report(&mut self, error: BridgeError) {
        warn!("{}", error);
        self.telemetry.last_error = Some(error);
        self.sink.report_error(&error);
    }

    /// Report `cause` and schedule recovery.
    fn fail(&mut self, cause: BridgeError) {
        self.report(cause);
        let retry_at = self.clock.now_ms() + self.config.error_recovery_delay_ms;
        self.state = AppState::Error { cause, retry_at };
    }

    /// One control tick: sample, map, encode and send.
    fn control(&mut self, now: u64) {
        let input = self
            .controller
            .link_mut()
            .latest()
            .unwrap_or(ControllerInput::neutral());
        let mut cmd = map(&input, &self.settings);

        // One calibration per press.
        let pressed = cmd.calibrate;
        cmd.calibrate = pressed && !self.calibrate_held;
        self.calibrate_held = pressed;
        if cmd.calibrate {
            info!("calibrating steering");
        }

        self.telemetry.last_command = Some(cmd);

        let encoded = match encode(&cmd) {
            Ok(encoded) => encoded,
            Err(e) => {
                error!("dropping command at {} ms: {}", now, e);
                self.report(e.into());
                return;
            }
        };

        for frame in encoded.frames() {
            if self.hub.send_frame(frame.as_bytes()) {
                self.telemetry.frames_sent = self.telemetry.frames_sent.wrapping_add(1);
            } else {
                self.telemetry.send_failures = self.telemetry.send_failures.wrapping_add(1);
                debug!("hub refused frame");
            }
        }
    }

    /// Current status for the presentation layer.
    pub fn snapshot(&self) -> BridgeSnapshot {
        BridgeSnapshot {
            state: self.state.kind(),
            controller: self.ctx.slot(Role::Controller).record(),
            hub: self.ctx.slot(Role::Hub).record(),
            last_error: self.telemetry.last_error,
            last_command: self.telemetry.last_command,
            frames_sent: self.telemetry.frames_sent,
            send_failures: self.telemetry.send_failures,
            uptime_ms: self.clock.now_ms().saturating_sub(self.started_at),
        }
    }

    pub fn state_kind(&self) -> AppStateKind {
        self.state.kind()
    }

    /// Connection state of one peripheral as recorded in its slot.
    pub fn peripheral_state(&self, role: Role) -> ConnectionState {
        self.ctx.slot(role).state()
    }
}
