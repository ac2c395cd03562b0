//! SoftDevice binding for the bridge transport traits.
//!
//! One scan task and one link task per role run beside the scheduler.
//! The scheduler-facing handles ([`SdScanner`], [`ControllerLink`],
//! [`HubLink`]) only talk to those tasks through signals, so none of the
//! trait methods block except `connect`, which waits for the link task's
//! answer under a timeout.
//!
//! Controller: HID service 0x1812, input report 0x2A4D (notify).
//! Hub: LWP3 service `00001623-1212-efde-1623-785feabcd123`, characteristic
//! `00001624-...` (write without response).

use core::sync::atomic::{AtomicBool, Ordering};

use defmt::{debug, info, warn};
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::{with_timeout, Duration, Instant};
use heapless::Vec;
use nrf_softdevice::ble::{central, gatt_client, Address, AddressType, Connection};
use nrf_softdevice::raw;
use nrf_softdevice::Softdevice;

use pad2hub::ble::adv_parser::extract_local_name;
use pad2hub::ble::{Advertisement, AddressKind, Link, LinkContext, PeerAddress, Role, ScanControl, Scanner};
use pad2hub::config;
use pad2hub::control::{AnalogStick, Buttons, ControllerInput, InputSource};
use pad2hub::error::LinkError;
use pad2hub::hub::COMMAND_LEN;

type Frame = [u8; COMMAND_LEN];

/// Handshake between one link handle and its task.
pub struct LinkShared {
    connect: Signal<CriticalSectionRawMutex, PeerAddress>,
    outcome: Signal<CriticalSectionRawMutex, Result<(), LinkError>>,
    hangup: Signal<CriticalSectionRawMutex, ()>,
    connected: AtomicBool,
}

impl LinkShared {
    pub const fn new() -> Self {
        Self {
            connect: Signal::new(),
            outcome: Signal::new(),
            hangup: Signal::new(),
            connected: AtomicBool::new(false),
        }
    }

    async fn connect(&self, address: &PeerAddress, timeout_ms: u32) -> Result<(), LinkError> {
        self.outcome.reset();
        self.hangup.reset();
        self.connect.signal(*address);
        match with_timeout(Duration::from_millis(timeout_ms.into()), self.outcome.wait()).await {
            Ok(result) => result,
            Err(_) => {
                self.hangup.signal(());
                Err(LinkError::Timeout)
            }
        }
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
        self.hangup.signal(());
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

pub static CONTROLLER_LINK: LinkShared = LinkShared::new();
pub static HUB_LINK: LinkShared = LinkShared::new();

/// Latest controller sample; newer notifications overwrite older ones.
static CONTROLLER_INPUT: Signal<CriticalSectionRawMutex, ControllerInput> = Signal::new();

/// Hub frames waiting for the link task.
static HUB_FRAMES: Channel<CriticalSectionRawMutex, Frame, 4> = Channel::new();

/// Discovery window requests (seconds).
static SCAN_REQUEST: Signal<CriticalSectionRawMutex, u32> = Signal::new();

fn to_sd_address(address: &PeerAddress) -> Address {
    let kind = match address.kind {
        AddressKind::Public => AddressType::Public,
        AddressKind::RandomStatic => AddressType::RandomStatic,
        AddressKind::RandomPrivateResolvable => AddressType::RandomPrivateResolvable,
        AddressKind::RandomPrivateNonResolvable => AddressType::RandomPrivateNonResolvable,
        AddressKind::Anonymous => AddressType::Anonymous,
    };
    Address::new(kind, address.bytes)
}

fn from_sd_address(address: &Address) -> PeerAddress {
    let kind = match address.address_type() {
        AddressType::Public => AddressKind::Public,
        AddressType::RandomStatic => AddressKind::RandomStatic,
        AddressType::RandomPrivateResolvable => AddressKind::RandomPrivateResolvable,
        AddressType::RandomPrivateNonResolvable => AddressKind::RandomPrivateNonResolvable,
        AddressType::Anonymous => AddressKind::Anonymous,
    };
    PeerAddress::new(kind, address.bytes())
}

// Scanning

/// [`Scanner`] handle: hands the window to [`scan_task`].
pub struct SdScanner;

impl Scanner for SdScanner {
    fn start_discovery(&mut self, duration_secs: u32) -> Result<(), LinkError> {
        SCAN_REQUEST.signal(duration_secs);
        Ok(())
    }
}

/// Runs one discovery window per request and feeds every named
/// advertisement into the context.
#[embassy_executor::task]
pub async fn scan_task(sd: &'static Softdevice, ctx: &'static LinkContext) -> ! {
    loop {
        let secs = SCAN_REQUEST.wait().await;

        let config = central::ScanConfig {
            // Active scan to get scan-response data (device names).
            active: true,
            // 10 ms units.
            timeout: (secs * 100).min(u16::MAX as u32) as u16,
            ..Default::default()
        };
        let deadline = Instant::now() + Duration::from_secs(secs.into());

        let result = central::scan(sd, &config, |params| {
            if Instant::now() > deadline {
                return Some(());
            }

            let data =
                unsafe { core::slice::from_raw_parts(params.data.p_data, params.data.len as usize) };
            let Some(name) = extract_local_name(data) else {
                return None;
            };

            let adv = Advertisement {
                address: from_sd_address(&Address::from_raw(params.peer_addr)),
                name: name.as_str(),
                rssi: params.rssi,
            };
            match ctx.on_advertisement(&adv) {
                ScanControl::Continue => None,
                ScanControl::Stop => Some(()),
            }
        })
        .await;

        match result {
            Ok(()) => debug!("scan stopped early"),
            Err(central::ScanError::Timeout) => debug!("scan window elapsed"),
            Err(_) => warn!("scan ended with error"),
        }
        ctx.on_scan_complete();
    }
}

// Links

async fn open(sd: &Softdevice, address: &PeerAddress) -> Result<Connection, LinkError> {
    let address = to_sd_address(address);
    let whitelist = [&address];
    let conn_cfg = central::ConnectConfig {
        scan_config: central::ScanConfig {
            whitelist: Some(&whitelist),
            ..Default::default()
        },
        conn_params: raw::ble_gap_conn_params_t {
            min_conn_interval: config::BLE_CONN_INTERVAL_MIN,
            max_conn_interval: config::BLE_CONN_INTERVAL_MAX,
            slave_latency: config::BLE_SLAVE_LATENCY,
            conn_sup_timeout: config::BLE_SUP_TIMEOUT,
        },
        ..Default::default()
    };
    central::connect(sd, &conn_cfg)
        .await
        .map_err(|_| LinkError::Rejected)
}

/// Connect, run the role's session until it ends or the scheduler hangs
/// up, then report the drop.
async fn serve<F, Fut>(
    sd: &'static Softdevice,
    ctx: &'static LinkContext,
    role: Role,
    shared: &'static LinkShared,
    session: F,
) -> !
where
    F: Fn(Connection) -> Fut,
    Fut: core::future::Future<Output = Result<(), LinkError>>,
{
    loop {
        let address = shared.connect.wait().await;

        let conn = match select(open(sd, &address), shared.hangup.wait()).await {
            Either::First(Ok(conn)) => conn,
            Either::First(Err(e)) => {
                shared.outcome.signal(Err(e));
                continue;
            }
            Either::Second(()) => continue,
        };

        let ended = match select(session(conn.clone()), shared.hangup.wait()).await {
            Either::First(Err(e)) => {
                // Discovery failed before the link was reported up.
                shared.outcome.signal(Err(e));
                false
            }
            Either::First(Ok(())) => true,
            Either::Second(()) => false,
        };

        let _ = conn.disconnect();
        let was_up = shared.connected.swap(false, Ordering::AcqRel);
        if ended && was_up {
            ctx.on_disconnect(role);
        }
        info!("{} link closed", role.label());
    }
}

// Controller

#[nrf_softdevice::gatt_client(uuid = "1812")]
pub struct XboxHidClient {
    /// Input report: 16 bytes on current firmware.
    #[characteristic(uuid = "2a4d", read, notify)]
    pub report: Vec<u8, 32>,
}

/// Decode an Xbox Wireless Controller BLE input report.
///
/// `[lx lx ly ly rx rx ry ry lt lt rt rt hat b0 b1 b2]`, sticks unsigned
/// with centre 0x8000 and Y pointing down, triggers 0..=1023.
fn decode_xbox_report(data: &[u8]) -> Option<ControllerInput> {
    if data.len() < 15 {
        return None;
    }
    let word = |i: usize| u16::from_le_bytes([data[i], data[i + 1]]);
    let axis = |i: usize| (i32::from(word(i)) - 32768) as i16;
    let axis_up = |i: usize| (32767 - i32::from(word(i))) as i16;

    let mut buttons = Buttons::NONE;
    let (b0, b1) = (data[13], data[14]);
    buttons.set(Buttons::A, b0 & 0x01 != 0);
    buttons.set(Buttons::B, b0 & 0x02 != 0);
    buttons.set(Buttons::X, b0 & 0x08 != 0);
    buttons.set(Buttons::Y, b0 & 0x10 != 0);
    buttons.set(Buttons::LB, b0 & 0x40 != 0);
    buttons.set(Buttons::RB, b0 & 0x80 != 0);
    buttons.set(Buttons::VIEW, b1 & 0x04 != 0);
    buttons.set(Buttons::MENU, b1 & 0x08 != 0);
    buttons.set(Buttons::GUIDE, b1 & 0x10 != 0);
    buttons.set(Buttons::LS, b1 & 0x20 != 0);
    buttons.set(Buttons::RS, b1 & 0x40 != 0);

    // Hat: 0 = released, 1 = N, clockwise to 8 = NW.
    let hat = data[12];
    buttons.set(Buttons::DPAD_UP, matches!(hat, 1 | 2 | 8));
    buttons.set(Buttons::DPAD_RIGHT, matches!(hat, 2..=4));
    buttons.set(Buttons::DPAD_DOWN, matches!(hat, 4..=6));
    buttons.set(Buttons::DPAD_LEFT, matches!(hat, 6..=8));

    Some(ControllerInput {
        left_stick: AnalogStick::new(axis(0), axis_up(2)),
        right_stick: AnalogStick::new(axis(4), axis_up(6)),
        left_trigger: word(8).min(config::TRIGGER_MAX),
        right_trigger: word(10).min(config::TRIGGER_MAX),
        buttons,
    })
}

async fn controller_session(conn: Connection) -> Result<(), LinkError> {
    let client: XboxHidClient = gatt_client::discover(&conn)
        .await
        .map_err(|_| LinkError::Rejected)?;
    client
        .report_cccd_write(true)
        .await
        .map_err(|_| LinkError::Rejected)?;

    CONTROLLER_INPUT.reset();
    CONTROLLER_LINK.connected.store(true, Ordering::Release);
    CONTROLLER_LINK.outcome.signal(Ok(()));

    let _ = gatt_client::run(&conn, &client, |event| match event {
        XboxHidClientEvent::ReportNotification(data) => {
            if let Some(input) = decode_xbox_report(&data) {
                CONTROLLER_INPUT.signal(input);
            }
        }
    })
    .await;
    Ok(())
}

#[embassy_executor::task]
pub async fn controller_link_task(sd: &'static Softdevice, ctx: &'static LinkContext) -> ! {
    serve(sd, ctx, Role::Controller, &CONTROLLER_LINK, controller_session).await
}

/// Controller side of the bridge: a link plus the sample source.
pub struct ControllerLink {
    last: Option<ControllerInput>,
}

impl ControllerLink {
    pub const fn new() -> Self {
        Self { last: None }
    }
}

impl Link for ControllerLink {
    async fn connect(&mut self, address: &PeerAddress, timeout_ms: u32) -> Result<(), LinkError> {
        self.last = None;
        CONTROLLER_LINK.connect(address, timeout_ms).await
    }

    fn disconnect(&mut self) {
        CONTROLLER_LINK.disconnect();
    }

    fn is_connected(&self) -> bool {
        CONTROLLER_LINK.is_connected()
    }

    fn send_frame(&mut self, _frame: &[u8]) -> bool {
        false
    }
}

impl InputSource for ControllerLink {
    fn latest(&mut self) -> Option<ControllerInput> {
        if let Some(input) = CONTROLLER_INPUT.try_take() {
            self.last = Some(input);
        }
        self.last
    }
}

// Hub

#[nrf_softdevice::gatt_client(uuid = "00001623-1212-efde-1623-785feabcd123")]
pub struct HubClient {
    #[characteristic(uuid = "00001624-1212-efde-1623-785feabcd123", write_without_response, notify)]
    pub command: Vec<u8, 32>,
}

async fn hub_session(conn: Connection) -> Result<(), LinkError> {
    let client: HubClient = gatt_client::discover(&conn)
        .await
        .map_err(|_| LinkError::Rejected)?;

    HUB_FRAMES.clear();
    HUB_LINK.connected.store(true, Ordering::Release);
    HUB_LINK.outcome.signal(Ok(()));

    let writer = async {
        loop {
            let frame = HUB_FRAMES.receive().await;
            let mut value: Vec<u8, 32> = Vec::new();
            let _ = value.extend_from_slice(&frame);
            if client.command_write_without_response(&value).await.is_err() {
                warn!("hub write failed");
            }
        }
    };
    // Hub notifications are not used; `run` returns when the link drops.
    let _ = select(gatt_client::run(&conn, &client, |_| {}), writer).await;
    Ok(())
}

#[embassy_executor::task]
pub async fn hub_link_task(sd: &'static Softdevice, ctx: &'static LinkContext) -> ! {
    serve(sd, ctx, Role::Hub, &HUB_LINK, hub_session).await
}

pub struct HubLink;

impl Link for HubLink {
    async fn connect(&mut self, address: &PeerAddress, timeout_ms: u32) -> Result<(), LinkError> {
        HUB_LINK.connect(address, timeout_ms).await
    }

    fn disconnect(&mut self) {
        HUB_LINK.disconnect();
    }

    fn is_connected(&self) -> bool {
        HUB_LINK.is_connected()
    }

    fn send_frame(&mut self, frame: &[u8]) -> bool {
        let Ok(frame) = Frame::try_from(frame) else {
            return false;
        };
        self.is_connected() && HUB_FRAMES.try_send(frame).is_ok()
    }
}
