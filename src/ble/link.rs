//! Transport traits the platform binding implements.
//!
//! Discovery results and disconnect notifications do not flow back through
//! these traits.  The binding is handed a [`LinkContext`] reference when it
//! is built and calls [`LinkContext::on_advertisement`],
//! [`LinkContext::on_scan_complete`] and [`LinkContext::on_disconnect`]
//! from whatever context its callbacks run in.
//!
//! [`LinkContext`]: crate::ble::LinkContext
//! [`LinkContext::on_advertisement`]: crate::ble::LinkContext::on_advertisement
//! [`LinkContext::on_scan_complete`]: crate::ble::LinkContext::on_scan_complete
//! [`LinkContext::on_disconnect`]: crate::ble::LinkContext::on_disconnect

use core::future::Future;

use crate::ble::PeerAddress;
use crate::error::LinkError;

/// One peripheral connection as seen by its supervisor.
pub trait Link {
    /// Connect to `address`, giving up after `timeout_ms`.
    ///
    /// This is the only operation allowed to hold up the control loop.
    fn connect(
        &mut self,
        address: &PeerAddress,
        timeout_ms: u32,
    ) -> impl Future<Output = Result<(), LinkError>>;

    /// Tear the link down. A no-op when not connected.
    fn disconnect(&mut self);

    /// Transport-level view of the link.
    fn is_connected(&self) -> bool;

    /// Queue one frame for transmission. `false` if the transport refused it.
    fn send_frame(&mut self, frame: &[u8]) -> bool;
}

/// Time-bounded discovery on the shared radio.
pub trait Scanner {
    /// Start an asynchronous scan lasting at most `duration_secs`.
    ///
    /// Must not block.  The binding reports each advertisement and the end of
    /// the window through the `LinkContext` it was built with, and stops
    /// early when `on_advertisement` answers [`ScanControl::Stop`].
    ///
    /// [`ScanControl::Stop`]: crate::ble::ScanControl::Stop
    fn start_discovery(&mut self, duration_secs: u32) -> Result<(), LinkError>;
}
