//! Bridge logic for pad2hub.
//!
//! Everything that does not touch the radio lives here so it can be
//! tested on the host: peripheral records and the connection state
//! machine, the discovery cycle, the controller-to-motion mapper, the hub
//! command encoder and the cooperative scheduler that ties them together.
//!
//! Usage: `cargo test` (host), `cargo run --release --features embedded`
//! (nRF52840 + probe-rs).
//!
//! The firmware in `main.rs` implements the [`ble::Link`] and
//! [`ble::Scanner`] traits on the Nordic SoftDevice and drives
//! [`bridge::BridgeScheduler`] from an Embassy task.

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to every module.
#[macro_use]
mod fmt;

pub mod ble;
pub mod bridge;
pub mod config;
pub mod control;
pub mod error;
pub mod hub;
pub mod settings;
pub mod status;

pub use bridge::{AppState, AppStateKind, BridgeScheduler};
pub use error::BridgeError;
