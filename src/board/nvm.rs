//! Configuration image kept in internal flash.
//!
//! The 128-byte image is mirrored in RAM. Reads come from the mirror; a
//! program between `unlock` and `lock` updates the mirror and `lock` writes
//! the whole image back as one `sequential-storage` map item.
//!
//! Storage range: pages [`STORAGE_FLASH_PAGE_START`], 4 KB each, for
//! [`STORAGE_FLASH_PAGE_COUNT`] pages.

use embassy_embedded_hal::adapter::BlockingAsync;
use embassy_futures::block_on;
use embassy_nrf::nvmc::Nvmc;
use sequential_storage::cache::NoCache;
use sequential_storage::map::{fetch_item, store_item};

use crate::config::{NVM_SIZE, STORAGE_FLASH_PAGE_COUNT, STORAGE_FLASH_PAGE_START};
use crate::error::StorageError;
use crate::storage::NvmBackend;

/// Flash page size for nRF52840 (4 KB).
const FLASH_PAGE_SIZE: u32 = 4096;

const STORAGE_START: u32 = STORAGE_FLASH_PAGE_START * FLASH_PAGE_SIZE;

const STORAGE_END: u32 = (STORAGE_FLASH_PAGE_START + STORAGE_FLASH_PAGE_COUNT) * FLASH_PAGE_SIZE;

/// Map key of the configuration image.
const KEY_CONFIG_IMAGE: u8 = 0x01;

/// Scratch space for one item plus `sequential-storage` framing.
const ITEM_BUFFER_SIZE: usize = NVM_SIZE + 32;

pub struct FlashNvm {
    flash: BlockingAsync<Nvmc<'static>>,
    image: [u8; NVM_SIZE],
    unlocked: bool,
    dirty: bool,
}

impl FlashNvm {
    /// Read the stored image. A missing or unreadable image leaves every
    /// byte at 0.
    pub fn load(nvmc: Nvmc<'static>) -> Self {
        let mut nvm = Self {
            flash: BlockingAsync::new(nvmc),
            image: [0; NVM_SIZE],
            unlocked: false,
            dirty: false,
        };

        let mut buf = [0u8; ITEM_BUFFER_SIZE];
        match block_on(fetch_item::<u8, &[u8], _>(
            &mut nvm.flash,
            STORAGE_START..STORAGE_END,
            &mut NoCache::new(),
            &mut buf,
            &KEY_CONFIG_IMAGE,
        )) {
            Ok(Some(data)) => {
                let len = data.len().min(NVM_SIZE);
                nvm.image[..len].copy_from_slice(&data[..len]);
                defmt::info!("NVM image loaded ({=usize} bytes)", len);
            }
            Ok(None) => defmt::info!("no NVM image in flash"),
            Err(e) => defmt::error!("NVM read error: {:?}", defmt::Debug2Format(&e)),
        }
        nvm
    }

    fn persist(&mut self) -> Result<(), StorageError> {
        let mut buf = [0u8; ITEM_BUFFER_SIZE];
        let image: &[u8] = &self.image;
        block_on(store_item::<u8, &[u8], _>(
            &mut self.flash,
            STORAGE_START..STORAGE_END,
            &mut NoCache::new(),
            &mut buf,
            &KEY_CONFIG_IMAGE,
            &image,
        ))
        .map_err(|e| {
            defmt::error!("NVM write error: {:?}", defmt::Debug2Format(&e));
            StorageError::Backend
        })
    }
}

impl NvmBackend for FlashNvm {
    fn read_byte(&mut self, address: u8) -> u8 {
        self.image.get(usize::from(address)).copied().unwrap_or(0)
    }

    fn unlock(&mut self) {
        self.unlocked = true;
    }

    fn program_byte(&mut self, address: u8, value: u8) {
        if !self.unlocked {
            return;
        }
        if let Some(cell) = self.image.get_mut(usize::from(address)) {
            if *cell != value {
                *cell = value;
                self.dirty = true;
            }
        }
    }

    fn lock(&mut self) {
        self.unlocked = false;
        if self.dirty && self.persist().is_ok() {
            self.dirty = false;
        }
    }
}
