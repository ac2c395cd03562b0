//! Persistent operator settings in internal flash.
//!
//! Uses `sequential-storage` as a key-value map over a few reserved
//! pages; the map handles wear levelling and garbage collection.  One
//! item, key [`KEY_SETTINGS`], holds the [`PersistedSettings`] record.

use defmt::{debug, error, info, warn};
use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;
use sequential_storage::map;

use pad2hub::ble::PeerAddress;
use pad2hub::config::{STORAGE_FLASH_PAGE_COUNT, STORAGE_FLASH_PAGE_START};
use pad2hub::settings::{PersistedSettings, SETTINGS_RECORD_LEN};

/// nRF52840 flash page size (4 KB).
const FLASH_PAGE_SIZE: u32 = 4096;

const STORAGE_START: u32 = STORAGE_FLASH_PAGE_START * FLASH_PAGE_SIZE;
const STORAGE_END: u32 = (STORAGE_FLASH_PAGE_START + STORAGE_FLASH_PAGE_COUNT) * FLASH_PAGE_SIZE;

const KEY_SETTINGS: u8 = 0x01;

/// Scratch space for `sequential-storage` (item plus its header).
const BUF_SIZE: usize = 64;

/// In-RAM copy of the settings, synced with flash.
pub struct SettingsStore {
    settings: PersistedSettings,
    dirty: bool,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self {
            settings: PersistedSettings::default(),
            dirty: false,
        }
    }

    pub fn settings(&self) -> &PersistedSettings {
        &self.settings
    }

    /// Load the record, falling back to defaults if it is missing or
    /// unreadable.
    pub async fn load_from_flash(&mut self, flash: &mut impl NorFlash) {
        let mut buf = [0u8; BUF_SIZE];

        let fetched = map::fetch_item::<u8, &[u8], _>(
            flash,
            STORAGE_START..STORAGE_END,
            &mut NoCache::new(),
            &mut buf,
            &KEY_SETTINGS,
        )
        .await;

        self.settings = match fetched {
            Ok(Some(data)) => match PersistedSettings::decode(data) {
                Ok(settings) => {
                    info!("settings loaded: {}", settings.control);
                    settings
                }
                Err(e) => {
                    warn!("stored settings rejected: {}", e);
                    PersistedSettings::default()
                }
            },
            Ok(None) => {
                info!("no stored settings, using defaults");
                PersistedSettings::default()
            }
            Err(e) => {
                error!("flash read error: {:?}", defmt::Debug2Format(&e));
                PersistedSettings::default()
            }
        };
        self.dirty = false;
    }

    /// Note the pair that just went Active.
    pub fn remember_pair(&mut self, controller: Option<PeerAddress>, hub: Option<PeerAddress>) {
        if self.settings.remember_pair(controller, hub) {
            self.dirty = true;
        }
    }

    /// Write the record if it changed since the last load or save.
    pub async fn save_to_flash(&mut self, flash: &mut impl NorFlash) {
        if !self.dirty {
            debug!("settings unchanged, not saving");
            return;
        }

        let mut record = [0u8; SETTINGS_RECORD_LEN];
        let len = match self.settings.encode(&mut record) {
            Ok(len) => len,
            Err(e) => {
                error!("settings encode failed: {}", e);
                return;
            }
        };
        let item: &[u8] = &record[..len];

        let mut buf = [0u8; BUF_SIZE];
        match map::store_item::<u8, &[u8], _>(
            flash,
            STORAGE_START..STORAGE_END,
            &mut NoCache::new(),
            &mut buf,
            &KEY_SETTINGS,
            &item,
        )
        .await
        {
            Ok(_) => {
                info!("settings saved");
                self.dirty = false;
            }
            Err(e) => error!("flash write error: {:?}", defmt::Debug2Format(&e)),
        }
    }
}
