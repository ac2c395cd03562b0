//! Per-peripheral discovery/connection records and the context handle
//! shared with transport callbacks.
//!
//! Callbacks may run outside the control loop (SoftDevice event handler,
//! another executor task).  Each record sits behind a
//! `critical_section::Mutex` so every read or write is a short, complete
//! critical section; no field needs multi-record consistency.

use core::cell::{Cell, RefCell};
use core::fmt;

use critical_section::Mutex;
use heapless::String;

use crate::ble::scan::IdentityFilters;
use crate::ble::{PeerAddress, Role};

/// Connection state of one peripheral.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    #[default]
    Idle,
    Scanning,
    Found,
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl ConnectionState {
    pub const fn label(self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Scanning => "scanning",
            ConnectionState::Found => "found",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Discovery and connection data for one peripheral.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeripheralRecord {
    /// Advertised name (truncated to 32 bytes for `heapless::String`).
    pub name: String<32>,
    pub address: Option<PeerAddress>,
    /// Signal strength of the matching advertisement (dBm).
    pub rssi: i8,
    /// Matched during the current scan cycle.
    pub found: bool,
    pub state: ConnectionState,
}

impl PeripheralRecord {
    pub const fn empty() -> Self {
        Self {
            name: String::new(),
            address: None,
            rssi: 0,
            found: false,
            state: ConnectionState::Idle,
        }
    }
}

impl Default for PeripheralRecord {
    fn default() -> Self {
        Self::empty()
    }
}

/// Interior-mutable home of one [`PeripheralRecord`].
pub struct PeripheralSlot {
    record: Mutex<RefCell<PeripheralRecord>>,
}

impl PeripheralSlot {
    pub const fn new() -> Self {
        Self {
            record: Mutex::new(RefCell::new(PeripheralRecord::empty())),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut PeripheralRecord) -> R) -> R {
        critical_section::with(|cs| f(&mut self.record.borrow_ref_mut(cs)))
    }

    /// Copy of the current record.
    pub fn record(&self) -> PeripheralRecord {
        self.with(|r| r.clone())
    }

    pub fn state(&self) -> ConnectionState {
        self.with(|r| r.state)
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.with(|r| r.state = state);
    }

    /// Move `from -> to` only if the state is still `from`.
    ///
    /// Returns `false` when another writer got there first (e.g. an async
    /// disconnect landed while a connect was in flight).
    pub fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        self.with(|r| {
            if r.state == from {
                r.state = to;
                true
            } else {
                false
            }
        })
    }

    pub fn is_found(&self) -> bool {
        self.with(|r| r.found)
    }

    /// True when this cycle's match is the peer at `address`.
    pub fn holds(&self, address: &PeerAddress) -> bool {
        self.with(|r| r.found && r.address.as_ref() == Some(address))
    }

    /// Recreate the record empty, entering `state`.
    pub fn reset(&self, state: ConnectionState) {
        self.with(|r| {
            *r = PeripheralRecord::empty();
            r.state = state;
        });
    }

    /// Fill the record from a matching advertisement.
    ///
    /// The first match in a cycle wins; later matches leave every field
    /// untouched and return `false`.
    pub fn claim(&self, name: &str, address: PeerAddress, rssi: i8) -> bool {
        self.with(|r| {
            if r.found {
                return false;
            }
            r.name.clear();
            for c in name.chars() {
                if r.name.push(c).is_err() {
                    break;
                }
            }
            r.address = Some(address);
            r.rssi = rssi;
            r.found = true;
            r.state = ConnectionState::Found;
            true
        })
    }
}

impl Default for PeripheralSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything transport callbacks may touch, passed to the binding at
/// construction instead of living in a global.
///
/// `const`-constructible so firmware can keep it in a `static`.
pub struct LinkContext {
    controller: PeripheralSlot,
    hub: PeripheralSlot,
    scanning: Mutex<Cell<bool>>,
    pub(crate) filters: IdentityFilters,
}

impl LinkContext {
    pub const fn new(filters: IdentityFilters) -> Self {
        Self {
            controller: PeripheralSlot::new(),
            hub: PeripheralSlot::new(),
            scanning: Mutex::new(Cell::new(false)),
            filters,
        }
    }

    pub fn slot(&self, role: Role) -> &PeripheralSlot {
        match role {
            Role::Controller => &self.controller,
            Role::Hub => &self.hub,
        }
    }

    pub fn filters(&self) -> &IdentityFilters {
        &self.filters
    }

    /// A discovery window is currently open.
    pub fn is_scanning(&self) -> bool {
        critical_section::with(|cs| self.scanning.borrow(cs).get())
    }

    pub(crate) fn set_scanning(&self, scanning: bool) {
        critical_section::with(|cs| self.scanning.borrow(cs).set(scanning));
    }

    pub fn both_found(&self) -> bool {
        self.controller.is_found() && self.hub.is_found()
    }

    /// Transport notification: the link for `role` went down.
    ///
    /// Unconditional; the control loop picks it up on its next poll.
    pub fn on_disconnect(&self, role: Role) {
        warn!("{} link dropped (notification)", role);
        self.slot(role).set_state(ConnectionState::Disconnected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::AddressKind;
    use crate::config::BridgeConfig;

    fn addr(last: u8) -> PeerAddress {
        PeerAddress::new(AddressKind::Public, [last, 0, 0, 0, 0, 0])
    }

    #[test]
    fn claim_is_first_match_wins() {
        let slot = PeripheralSlot::new();
        assert!(slot.claim("Xbox Wireless Controller", addr(1), -70));
        assert!(!slot.claim("Xbox Other", addr(2), -30));

        let rec = slot.record();
        assert_eq!(rec.name.as_str(), "Xbox Wireless Controller");
        assert_eq!(rec.address, Some(addr(1)));
        assert_eq!(rec.rssi, -70);
        assert!(rec.found);
        assert_eq!(rec.state, ConnectionState::Found);
    }

    #[test]
    fn reset_clears_identity() {
        let slot = PeripheralSlot::new();
        slot.claim("Technic Move", addr(3), -50);
        slot.reset(ConnectionState::Scanning);

        let rec = slot.record();
        assert!(!rec.found);
        assert!(rec.address.is_none());
        assert!(rec.name.is_empty());
        assert_eq!(rec.state, ConnectionState::Scanning);
    }

    #[test]
    fn transition_only_from_expected_state() {
        let slot = PeripheralSlot::new();
        slot.set_state(ConnectionState::Found);
        assert!(slot.transition(ConnectionState::Found, ConnectionState::Connecting));
        assert!(!slot.transition(ConnectionState::Found, ConnectionState::Connecting));
        assert_eq!(slot.state(), ConnectionState::Connecting);
    }

    #[test]
    fn disconnect_notification_is_unconditional() {
        let ctx = LinkContext::new(BridgeConfig::default().filters);
        for state in [
            ConnectionState::Idle,
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Error,
        ] {
            ctx.slot(Role::Hub).set_state(state);
            ctx.on_disconnect(Role::Hub);
            assert_eq!(ctx.slot(Role::Hub).state(), ConnectionState::Disconnected);
        }
        assert_eq!(ctx.slot(Role::Controller).state(), ConnectionState::Idle);
    }
}
