//! pad2hub firmware - nRF52840 + SoftDevice S140.
//!
//! Scans for an Xbox Wireless Controller and a LEGO Technic Move hub,
//! connects to both as a BLE Central and forwards the controller's sticks,
//! triggers and D-pad to the hub as motor/light commands at 20 Hz.
//!
//! Tasks:
//! - `softdevice_task`: SoftDevice event pump
//! - `scan_task`, `controller_link_task`, `hub_link_task`: radio side
//! - `main`: the bridge scheduler loop, status LED and OLED

#![no_std]
#![no_main]

mod display;
mod radio;
mod storage;

use core::mem;

use defmt::{error, info, unwrap};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_nrf::gpio::{Level, Output, OutputDrive};
use embassy_nrf::interrupt::{InterruptExt, Priority};
use embassy_nrf::twim::{self, Twim};
use embassy_nrf::{bind_interrupts, interrupt, peripherals};
use embassy_time::{Instant, Timer};
use nrf_softdevice::{raw, Softdevice};
use panic_probe as _;

use pad2hub::ble::{IdentityFilters, LinkContext};
use pad2hub::bridge::{led_pattern, AppStateKind, BridgeScheduler};
use pad2hub::config::{self, BridgeConfig};
use pad2hub::status::{BridgeSnapshot, StatusSink};
use pad2hub::BridgeError;

use crate::radio::{ControllerLink, HubLink, SdScanner};
use crate::storage::SettingsStore;

bind_interrupts!(struct Irqs {
    TWISPI0 => twim::InterruptHandler<peripherals::TWISPI0>;
});

/// Shared with the radio tasks; the only state their callbacks touch.
static LINK_CTX: LinkContext = LinkContext::new(IdentityFilters {
    controller_prefix: config::CONTROLLER_NAME_PREFIX,
    hub_fragment: config::HUB_NAME_FRAGMENT,
});

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

/// Status output: errors and the 1 Hz line over RTT, snapshot on the OLED.
struct FirmwareSink<I2C: embedded_hal::i2c::I2c> {
    display: display::Display<I2C>,
}

impl<I2C: embedded_hal::i2c::I2c> StatusSink for FirmwareSink<I2C> {
    fn report_error(&mut self, err: &BridgeError) {
        error!("bridge error: {}", err);
    }

    fn display(&mut self, snapshot: &BridgeSnapshot) {
        display::draw_status(&mut self.display, snapshot);
    }
}

fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 2,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 128 }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 0,
            central_role_count: 2,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: b"pad2hub" as *const u8 as _,
            current_len: 7,
            max_len: 7,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("pad2hub starting");

    // Priorities 0, 1 and 4 belong to the SoftDevice.
    let mut nrf_config = embassy_nrf::config::Config::default();
    nrf_config.gpiote_interrupt_priority = Priority::P2;
    nrf_config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(nrf_config);
    interrupt::TWISPI0.set_priority(Priority::P3);

    // Status LED (LED1 on the DK, active low).
    let mut led = Output::new(p.P0_13, Level::High, OutputDrive::Standard);

    let twim_config = twim::Config::default();
    let i2c = Twim::new(p.TWISPI0, Irqs, p.P0_26, p.P0_27, twim_config);
    let oled = display::init(i2c);

    let sd = Softdevice::enable(&softdevice_config());
    unwrap!(spawner.spawn(softdevice_task(sd)));

    let mut flash = nrf_softdevice::Flash::take(sd);
    let mut store = SettingsStore::new();
    store.load_from_flash(&mut flash).await;

    unwrap!(spawner.spawn(radio::scan_task(sd, &LINK_CTX)));
    unwrap!(spawner.spawn(radio::controller_link_task(sd, &LINK_CTX)));
    unwrap!(spawner.spawn(radio::hub_link_task(sd, &LINK_CTX)));

    let clock = || Instant::now().as_millis();
    let mut bridge = BridgeScheduler::new(
        &LINK_CTX,
        SdScanner,
        ControllerLink::new(),
        HubLink,
        FirmwareSink { display: oled },
        clock,
        BridgeConfig::default(),
        store.settings().control,
    );
    bridge.start();

    let mut last_kind = bridge.state_kind();
    loop {
        bridge.tick().await;

        let kind = bridge.state_kind();
        if kind != last_kind {
            info!("state {} -> {}", last_kind, kind);
            if kind == AppStateKind::Active {
                let snapshot = bridge.snapshot();
                store.remember_pair(snapshot.controller.address, snapshot.hub.address);
                store.save_to_flash(&mut flash).await;
            }
            last_kind = kind;
        }

        let lit = led_pattern(kind).is_lit(Instant::now().as_millis());
        led.set_level(if lit { Level::Low } else { Level::High });

        Timer::after_millis(config::LOOP_IDLE_MS).await;
    }
}
