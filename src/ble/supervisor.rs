//! Connection state machine for one peripheral.
//!
//! ```text
//! Found --begin_connect--> Connecting --ok--> Connected
//!                              |                  |
//!                              +--fail--> Error   +--notification--> Disconnected
//! any --disconnect()--> Disconnected
//! ```
//!
//! Attempts are never retried here; a failure is surfaced once and the
//! scheduler decides whether to rescan.

use crate::ble::link::Link;
use crate::ble::record::{ConnectionState, PeripheralRecord, PeripheralSlot};
use crate::ble::Role;
use crate::error::BridgeError;

pub struct ConnectionSupervisor<'a, L> {
    role: Role,
    slot: &'a PeripheralSlot,
    link: L,
    connect_timeout_ms: u32,
}

impl<'a, L: Link> ConnectionSupervisor<'a, L> {
    pub fn new(role: Role, slot: &'a PeripheralSlot, link: L, connect_timeout_ms: u32) -> Self {
        Self {
            role,
            slot,
            link,
            connect_timeout_ms,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> ConnectionState {
        self.slot.state()
    }

    pub fn record(&self) -> PeripheralRecord {
        self.slot.record()
    }

    /// Connect to the peripheral located by the last scan.
    ///
    /// Only valid from `Found`.  Holds the caller for at most the configured
    /// timeout.
    pub async fn begin_connect(&mut self) -> Result<(), BridgeError> {
        let failed = BridgeError::ConnectFailed { which: self.role };

        let record = self.slot.record();
        let Some(address) = record.address.filter(|_| record.found) else {
            warn!("cannot connect {}: not found in last scan", self.role);
            return Err(failed);
        };

        if !self
            .slot
            .transition(ConnectionState::Found, ConnectionState::Connecting)
        {
            warn!("cannot connect {}: state is {}", self.role, record.state);
            return Err(failed);
        }

        info!("connecting {} at {}", self.role, address);

        match self.link.connect(&address, self.connect_timeout_ms).await {
            Ok(()) => {
                if self
                    .slot
                    .transition(ConnectionState::Connecting, ConnectionState::Connected)
                {
                    info!("{} connected", self.role);
                    Ok(())
                } else {
                    warn!("{} dropped while connecting", self.role);
                    self.link.disconnect();
                    self.slot.set_state(ConnectionState::Error);
                    Err(failed)
                }
            }
            Err(e) => {
                error!("{} connect failed: {}", self.role, e);
                self.slot.set_state(ConnectionState::Error);
                Err(failed)
            }
        }
    }

    /// Drop the link if the transport still has it. Valid from any state.
    pub fn disconnect(&mut self) {
        if self.link.is_connected() {
            info!("disconnecting {}", self.role);
            self.link.disconnect();
        }
        self.slot.set_state(ConnectionState::Disconnected);
    }

    /// Same effect as the transport's own disconnect notification.
    pub fn on_async_disconnect(&self) {
        self.slot.set_state(ConnectionState::Disconnected);
    }

    /// Transport says connected *and* our state says connected.
    pub fn is_connected(&self) -> bool {
        self.link.is_connected() && self.slot.state() == ConnectionState::Connected
    }

    /// Hand one frame to the transport.
    pub fn send_frame(&mut self, frame: &[u8]) -> bool {
        self.link.send_frame(frame)
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::{AddressKind, PeerAddress};
    use crate::error::LinkError;
    use core::future::Future;
    use embassy_futures::block_on;

    struct FakeLink {
        connected: bool,
        result: Result<(), LinkError>,
        connects: usize,
        disconnects: usize,
        drop_during_connect: Option<&'static PeripheralSlot>,
    }

    impl FakeLink {
        fn answering(result: Result<(), LinkError>) -> Self {
            Self {
                connected: false,
                result,
                connects: 0,
                disconnects: 0,
                drop_during_connect: None,
            }
        }
    }

    impl Link for FakeLink {
        fn connect(
            &mut self,
            _address: &PeerAddress,
            _timeout_ms: u32,
        ) -> impl Future<Output = Result<(), LinkError>> {
            self.connects += 1;
            self.connected = self.result.is_ok();
            if let Some(slot) = self.drop_during_connect {
                slot.set_state(ConnectionState::Disconnected);
            }
            core::future::ready(self.result)
        }

        fn disconnect(&mut self) {
            self.disconnects += 1;
            self.connected = false;
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn send_frame(&mut self, _frame: &[u8]) -> bool {
            self.connected
        }
    }

    fn found_slot() -> PeripheralSlot {
        let slot = PeripheralSlot::new();
        slot.claim(
            "Technic Move",
            PeerAddress::new(AddressKind::Public, [1, 2, 3, 4, 5, 6]),
            -55,
        );
        slot
    }

    #[test]
    fn connect_from_found_reaches_connected() {
        let slot = found_slot();
        let mut sup = ConnectionSupervisor::new(Role::Hub, &slot, FakeLink::answering(Ok(())), 5000);

        assert_eq!(block_on(sup.begin_connect()), Ok(()));
        assert_eq!(sup.state(), ConnectionState::Connected);
        assert!(sup.is_connected());
    }

    #[test]
    fn connect_requires_found() {
        let slot = PeripheralSlot::new();
        let mut sup = ConnectionSupervisor::new(Role::Hub, &slot, FakeLink::answering(Ok(())), 5000);

        assert_eq!(
            block_on(sup.begin_connect()),
            Err(BridgeError::ConnectFailed { which: Role::Hub })
        );
        assert_eq!(sup.link().connects, 0);
        assert_eq!(sup.state(), ConnectionState::Idle);
    }

    #[test]
    fn connect_requires_found_state() {
        let slot = found_slot();
        slot.set_state(ConnectionState::Connected);
        let mut sup = ConnectionSupervisor::new(Role::Hub, &slot, FakeLink::answering(Ok(())), 5000);

        assert!(block_on(sup.begin_connect()).is_err());
        assert_eq!(sup.link().connects, 0);
    }

    #[test]
    fn timeout_moves_to_error() {
        let slot = found_slot();
        let mut sup = ConnectionSupervisor::new(
            Role::Controller,
            &slot,
            FakeLink::answering(Err(LinkError::Timeout)),
            5000,
        );

        assert_eq!(
            block_on(sup.begin_connect()),
            Err(BridgeError::ConnectFailed {
                which: Role::Controller
            })
        );
        assert_eq!(sup.state(), ConnectionState::Error);
        assert!(!sup.is_connected());
    }

    #[test]
    fn drop_during_connect_is_a_failure() {
        static SLOT: PeripheralSlot = PeripheralSlot::new();
        SLOT.claim(
            "Technic Move",
            PeerAddress::new(AddressKind::Public, [1, 2, 3, 4, 5, 6]),
            -55,
        );
        let mut link = FakeLink::answering(Ok(()));
        link.drop_during_connect = Some(&SLOT);
        let mut sup = ConnectionSupervisor::new(Role::Hub, &SLOT, link, 5000);

        assert!(block_on(sup.begin_connect()).is_err());
        assert_eq!(sup.state(), ConnectionState::Error);
        assert_eq!(sup.link().disconnects, 1);
    }

    #[test]
    fn async_disconnect_clears_is_connected() {
        let slot = found_slot();
        let mut sup = ConnectionSupervisor::new(Role::Hub, &slot, FakeLink::answering(Ok(())), 5000);
        block_on(sup.begin_connect()).unwrap();

        // Transport has not noticed yet, the notification has.
        sup.on_async_disconnect();
        assert!(sup.link().is_connected());
        assert!(!sup.is_connected());
        assert!(!sup.is_connected());
    }

    #[test]
    fn transport_loss_clears_is_connected() {
        let slot = found_slot();
        let mut sup = ConnectionSupervisor::new(Role::Hub, &slot, FakeLink::answering(Ok(())), 5000);
        block_on(sup.begin_connect()).unwrap();

        sup.link_mut().connected = false;
        assert_eq!(sup.state(), ConnectionState::Connected);
        assert!(!sup.is_connected());
    }

    #[test]
    fn disconnect_from_any_state() {
        let slot = found_slot();
        let mut sup = ConnectionSupervisor::new(Role::Hub, &slot, FakeLink::answering(Ok(())), 5000);
        sup.disconnect();
        assert_eq!(sup.state(), ConnectionState::Disconnected);
        assert_eq!(sup.link().disconnects, 0);

        slot.set_state(ConnectionState::Found);
        block_on(sup.begin_connect()).unwrap();
        sup.disconnect();
        assert_eq!(sup.state(), ConnectionState::Disconnected);
        assert_eq!(sup.link().disconnects, 1);
    }
}
