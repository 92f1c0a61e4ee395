//! Persistent key bindings and indicator colors.
//!
//! The configuration lives in a flat 128-byte non-volatile area:
//!
//! ```text
//!   [ 0, 18)  six key binding triples  (modifier, kind, code)  in KeyId order
//!   [18, 27)  three indicator colors   (red, green, blue)      in indicator order
//! ```
//!
//! It is read once at boot. The write path exists for tooling and is not
//! used by the main loop.

use crate::config::{
    INDICATOR_COUNT, NVM_COLOR_FIELDS, NVM_COLOR_OFFSET, NVM_KEY_FIELDS, NVM_KEY_OFFSET, NVM_SIZE,
};
use crate::error::StorageError;
use crate::keymap::{Action, KeyId, Keymap};
use smart_leds::RGB8;

/// Byte-level access to the physical non-volatile memory.
///
/// `unlock` and `lock` bracket every `program_byte`; what they do on the
/// hardware (safe-mode sequences, write-enable bits) is up to the backend.
pub trait NvmBackend {
    fn read_byte(&mut self, address: u8) -> u8;
    fn unlock(&mut self);
    fn program_byte(&mut self, address: u8, value: u8);
    fn lock(&mut self);
}

/// Configuration store over an [`NvmBackend`].
pub struct ConfigStore<B> {
    backend: B,
}

impl<B: NvmBackend> ConfigStore<B> {
    pub const fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Read one byte. Addresses outside the area read as 0.
    pub fn read(&mut self, address: u8) -> u8 {
        if usize::from(address) >= NVM_SIZE {
            warn!("NVM read out of range: {=u8}", address);
            return 0;
        }
        self.backend.read_byte(address)
    }

    /// Program one byte.
    ///
    /// Addresses at or above 128 are rejected without touching the
    /// backend.
    pub fn write(&mut self, address: u8, value: u8) -> Result<(), StorageError> {
        if usize::from(address) >= NVM_SIZE {
            warn!("NVM write rejected: address {=u8} out of range", address);
            return Err(StorageError::OutOfRange(address));
        }
        self.backend.unlock();
        self.backend.program_byte(address, value);
        self.backend.lock();
        Ok(())
    }

    /// Decode the six key bindings.
    pub fn load_keymap(&mut self) -> Keymap {
        let actions = KeyId::ALL.map(|key| {
            let base = key_address(key);
            let modifier = self.read(base);
            let kind = self.read(base + 1);
            let code = self.read(base + 2);
            Action::from_nvm(modifier, kind, code)
        });
        Keymap::new(actions)
    }

    /// Decode the three indicator base colors.
    pub fn load_colors(&mut self) -> [RGB8; INDICATOR_COUNT] {
        core::array::from_fn(|indicator| {
            let base = color_address(indicator);
            RGB8::new(self.read(base), self.read(base + 1), self.read(base + 2))
        })
    }

    /// Persist the binding of `key`.
    pub fn store_binding(&mut self, key: KeyId, action: Action) -> Result<(), StorageError> {
        let base = key_address(key);
        for (offset, byte) in (0u8..).zip(action.to_nvm()) {
            self.write(base + offset, byte)?;
        }
        Ok(())
    }

    /// Persist the base color of `indicator`.
    pub fn store_color(&mut self, indicator: usize, color: RGB8) -> Result<(), StorageError> {
        if indicator >= INDICATOR_COUNT {
            return Err(StorageError::OutOfRange(color_address(indicator)));
        }
        let base = color_address(indicator);
        self.write(base, color.r)?;
        self.write(base + 1, color.g)?;
        self.write(base + 2, color.b)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

fn key_address(key: KeyId) -> u8 {
    (NVM_KEY_OFFSET + key.index() * NVM_KEY_FIELDS) as u8
}

fn color_address(indicator: usize) -> u8 {
    // Saturates so an out-of-range indicator still maps to an invalid address.
    indicator
        .checked_mul(NVM_COLOR_FIELDS)
        .and_then(|offset| offset.checked_add(NVM_COLOR_OFFSET))
        .and_then(|address| u8::try_from(address).ok())
        .unwrap_or(u8::MAX)
}

/// RAM-backed NVM image.
///
/// Models the write-enable latch: programming while locked is ignored, the
/// same way the flash controller ignores writes with write-enable cleared.
#[derive(Clone, Debug)]
pub struct MemoryNvm {
    cells: [u8; NVM_SIZE],
    unlocked: bool,
    programs: usize,
}

impl MemoryNvm {
    pub const fn new(cells: [u8; NVM_SIZE]) -> Self {
        Self {
            cells,
            unlocked: false,
            programs: 0,
        }
    }

    /// An erased image (all 0xFF).
    pub const fn erased() -> Self {
        Self::new([0xFF; NVM_SIZE])
    }

    pub fn cells(&self) -> &[u8; NVM_SIZE] {
        &self.cells
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Number of successful program operations.
    pub fn program_count(&self) -> usize {
        self.programs
    }
}

impl NvmBackend for MemoryNvm {
    fn read_byte(&mut self, address: u8) -> u8 {
        self.cells.get(usize::from(address)).copied().unwrap_or(0)
    }

    fn unlock(&mut self) {
        self.unlocked = true;
    }

    fn program_byte(&mut self, address: u8, value: u8) {
        if !self.unlocked {
            return;
        }
        if let Some(cell) = self.cells.get_mut(usize::from(address)) {
            *cell = value;
            self.programs += 1;
        }
    }

    fn lock(&mut self) {
        self.unlocked = false;
    }
}
