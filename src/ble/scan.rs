//! Discovery cycle: finds the controller and the hub in one scan window.
//!
//! The binding forwards every advertisement to
//! [`LinkContext::on_advertisement`], in any order and possibly many times
//! per device.  Classification never overwrites a confirmed match, so the
//! first matching advertisement wins rather than the strongest one.  Once
//! both records are filled the window is closed early.

use crate::ble::link::Scanner;
use crate::ble::record::{ConnectionState, LinkContext};
use crate::ble::{Advertisement, PeerAddress, Role};

/// Name predicates for the two peripherals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdentityFilters {
    /// Controller name must start with this.
    pub controller_prefix: &'static str,
    /// Hub name must contain this.
    pub hub_fragment: &'static str,
}

impl IdentityFilters {
    pub fn matches(&self, role: Role, name: &str) -> bool {
        match role {
            Role::Controller => name.starts_with(self.controller_prefix),
            Role::Hub => name.contains(self.hub_fragment),
        }
    }
}

/// Answer to the binding after each advertisement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanControl {
    Continue,
    /// Both peripherals located (or the window is already closed): stop.
    Stop,
}

/// Result of a finished discovery cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanOutcome {
    BothFound,
    Incomplete {
        controller_found: bool,
        hub_found: bool,
    },
}

impl LinkContext {
    /// Classify one advertisement. Called from the binding's scan callback.
    pub fn on_advertisement(&self, adv: &Advertisement<'_>) -> ScanControl {
        if !self.is_scanning() {
            return ScanControl::Stop;
        }

        trace!("adv {} rssi {}", adv.name, adv.rssi);

        for role in Role::ALL {
            if !self.filters.matches(role, adv.name) || self.claimed_elsewhere(role, &adv.address) {
                continue;
            }
            if self.slot(role).claim(adv.name, adv.address, adv.rssi) {
                info!("found {}: {} ({}) rssi {}", role, adv.name, adv.address, adv.rssi);
                // One peer fills one role.
                break;
            }
        }

        if self.both_found() {
            info!("both peripherals found, closing scan window");
            self.close_window();
            ScanControl::Stop
        } else {
            ScanControl::Continue
        }
    }

    /// Transport notification: the scan window ended.
    pub fn on_scan_complete(&self) {
        if self.is_scanning() {
            debug!("scan window elapsed");
        }
        self.close_window();
    }

    /// Whether the other role already holds `address` this cycle.
    fn claimed_elsewhere(&self, role: Role, address: &PeerAddress) -> bool {
        Role::ALL
            .into_iter()
            .any(|other| other != role && self.slot(other).holds(address))
    }

    /// End the cycle; records nobody claimed fall back to `Idle`.
    fn close_window(&self) {
        self.set_scanning(false);
        for role in Role::ALL {
            self.slot(role)
                .transition(ConnectionState::Scanning, ConnectionState::Idle);
        }
    }
}

/// Drives discovery cycles on a [`Scanner`] and reports their outcome.
pub struct ScanCoordinator<'a, S> {
    scanner: S,
    ctx: &'a LinkContext,
}

impl<'a, S: Scanner> ScanCoordinator<'a, S> {
    pub fn new(scanner: S, ctx: &'a LinkContext) -> Self {
        Self { scanner, ctx }
    }

    /// Reset both records and open a new discovery window. Non-blocking.
    ///
    /// If the radio refuses to scan the cycle is immediately complete (and
    /// unsuccessful), so the caller's normal retry path applies.
    pub fn start_scan(&mut self, duration_secs: u32) {
        info!(
            "scan start ({} s): controller '{}*', hub '*{}*'",
            duration_secs,
            self.ctx.filters.controller_prefix,
            self.ctx.filters.hub_fragment
        );

        for role in Role::ALL {
            self.ctx.slot(role).reset(ConnectionState::Scanning);
        }
        self.ctx.set_scanning(true);

        if let Err(e) = self.scanner.start_discovery(duration_secs) {
            error!("scan could not start: {}", e);
            self.ctx.close_window();
        }
    }

    /// The window has closed, naturally or early.
    pub fn is_scan_complete(&self) -> bool {
        !self.ctx.is_scanning()
    }

    /// Which peripherals the last cycle located.
    pub fn outcome(&self) -> ScanOutcome {
        let controller_found = self.ctx.slot(Role::Controller).is_found();
        let hub_found = self.ctx.slot(Role::Hub).is_found();
        if controller_found && hub_found {
            ScanOutcome::BothFound
        } else {
            ScanOutcome::Incomplete {
                controller_found,
                hub_found,
            }
        }
    }

    pub fn scanner(&self) -> &S {
        &self.scanner
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::{AddressKind, PeerAddress};
    use crate::config::BridgeConfig;
    use crate::error::LinkError;

    #[derive(Default)]
    struct CountingScanner {
        starts: usize,
        fail: bool,
    }

    impl Scanner for CountingScanner {
        fn start_discovery(&mut self, _duration_secs: u32) -> Result<(), LinkError> {
            self.starts += 1;
            if self.fail {
                Err(LinkError::ScanFailed)
            } else {
                Ok(())
            }
        }
    }

    fn adv(name: &str, last: u8, rssi: i8) -> Advertisement<'_> {
        Advertisement {
            address: PeerAddress::new(AddressKind::Public, [last, 1, 2, 3, 4, 5]),
            name,
            rssi,
        }
    }

    #[test]
    fn filters_use_prefix_and_substring() {
        let f = BridgeConfig::default().filters;
        assert!(f.matches(Role::Controller, "Xbox Wireless Controller"));
        assert!(!f.matches(Role::Controller, "My Xbox"));
        assert!(f.matches(Role::Hub, "Technic Move"));
        assert!(f.matches(Role::Hub, "LEGO Technic Move Hub"));
        assert!(!f.matches(Role::Hub, "Technic"));
    }

    #[test]
    fn start_scan_resets_records() {
        let ctx = LinkContext::new(BridgeConfig::default().filters);
        ctx.slot(Role::Hub)
            .claim("Technic Move", PeerAddress::new(AddressKind::Public, [9; 6]), -40);

        let mut scan = ScanCoordinator::new(CountingScanner::default(), &ctx);
        scan.start_scan(10);

        assert_eq!(scan.scanner().starts, 1);
        assert!(!scan.is_scan_complete());
        assert!(!ctx.slot(Role::Hub).is_found());
        assert_eq!(ctx.slot(Role::Hub).state(), ConnectionState::Scanning);
        assert_eq!(ctx.slot(Role::Controller).state(), ConnectionState::Scanning);
    }

    #[test]
    fn both_found_stops_scan_early() {
        let ctx = LinkContext::new(BridgeConfig::default().filters);
        let mut scan = ScanCoordinator::new(CountingScanner::default(), &ctx);
        scan.start_scan(10);

        assert_eq!(ctx.on_advertisement(&adv("Phone", 1, -60)), ScanControl::Continue);
        assert_eq!(
            ctx.on_advertisement(&adv("Xbox Wireless Controller", 2, -60)),
            ScanControl::Continue
        );
        assert_eq!(ctx.on_advertisement(&adv("Technic Move", 3, -60)), ScanControl::Stop);

        assert!(scan.is_scan_complete());
        assert_eq!(scan.outcome(), ScanOutcome::BothFound);
    }

    #[test]
    fn later_matches_do_not_overwrite_first() {
        let ctx = LinkContext::new(BridgeConfig::default().filters);
        let mut scan = ScanCoordinator::new(CountingScanner::default(), &ctx);
        scan.start_scan(10);

        ctx.on_advertisement(&adv("Xbox Wireless Controller", 1, -90));
        ctx.on_advertisement(&adv("Xbox Elite", 2, -20));

        let rec = ctx.slot(Role::Controller).record();
        assert_eq!(rec.name.as_str(), "Xbox Wireless Controller");
        assert_eq!(rec.rssi, -90);
        assert_eq!(rec.address.unwrap().bytes[0], 1);
    }

    #[test]
    fn elapsed_window_reports_incomplete() {
        let ctx = LinkContext::new(BridgeConfig::default().filters);
        let mut scan = ScanCoordinator::new(CountingScanner::default(), &ctx);
        scan.start_scan(10);

        ctx.on_advertisement(&adv("Technic Move", 3, -60));
        ctx.on_scan_complete();

        assert!(scan.is_scan_complete());
        assert_eq!(
            scan.outcome(),
            ScanOutcome::Incomplete {
                controller_found: false,
                hub_found: true
            }
        );
    }

    #[test]
    fn advertisements_after_window_are_ignored() {
        let ctx = LinkContext::new(BridgeConfig::default().filters);
        let mut scan = ScanCoordinator::new(CountingScanner::default(), &ctx);
        scan.start_scan(10);
        ctx.on_scan_complete();

        assert_eq!(
            ctx.on_advertisement(&adv("Xbox Wireless Controller", 2, -60)),
            ScanControl::Stop
        );
        assert!(!ctx.slot(Role::Controller).is_found());
    }

    #[test]
    fn failed_start_completes_cycle_immediately() {
        let ctx = LinkContext::new(BridgeConfig::default().filters);
        let scanner = CountingScanner {
            fail: true,
            ..Default::default()
        };
        let mut scan = ScanCoordinator::new(scanner, &ctx);
        scan.start_scan(10);

        assert!(scan.is_scan_complete());
        assert!(matches!(scan.outcome(), ScanOutcome::Incomplete { .. }));
        assert_eq!(ctx.slot(Role::Controller).state(), ConnectionState::Idle);
    }

    #[test]
    fn unfound_records_go_idle_when_window_closes() {
        let ctx = LinkContext::new(BridgeConfig::default().filters);
        let mut scan = ScanCoordinator::new(CountingScanner::default(), &ctx);
        scan.start_scan(10);

        ctx.on_advertisement(&adv("Xbox Wireless Controller", 1, -60));
        ctx.on_scan_complete();

        assert_eq!(ctx.slot(Role::Controller).state(), ConnectionState::Found);
        assert_eq!(ctx.slot(Role::Hub).state(), ConnectionState::Idle);
        assert!(!ctx.slot(Role::Hub).is_found());
    }

    #[test]
    fn one_peer_never_fills_both_roles() {
        let ctx = LinkContext::new(BridgeConfig::default().filters);
        let mut scan = ScanCoordinator::new(CountingScanner::default(), &ctx);
        scan.start_scan(10);

        // Name passes both filters; the repeat must not land in the hub slot.
        let name = "Xbox Technic Move";
        assert_eq!(ctx.on_advertisement(&adv(name, 7, -50)), ScanControl::Continue);
        assert_eq!(ctx.on_advertisement(&adv(name, 7, -50)), ScanControl::Continue);
        assert!(ctx.slot(Role::Controller).is_found());
        assert!(!ctx.slot(Role::Hub).is_found());

        assert_eq!(ctx.on_advertisement(&adv("Technic Move", 8, -50)), ScanControl::Stop);
        assert_eq!(ctx.slot(Role::Hub).record().address.unwrap().bytes[0], 8);
    }
}
