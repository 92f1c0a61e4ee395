//! USB HID keyboard report (report ID 1).
//!
//! Layout (8 bytes after the report ID):
//! ```text
//! Byte 0: Modifier keys (bitfield)
//!         Bit 0 = Left Ctrl,  Bit 1 = Left Shift,
//!         Bit 2 = Left Alt,   Bit 3 = Left GUI,
//!         Bit 4 = Right Ctrl, Bit 5 = Right Shift,
//!         Bit 6 = Right Alt,  Bit 7 = Right GUI
//! Byte 1: Reserved (0x00)
//! Byte 2-7: Up to 6 simultaneous key codes (USB HID usage codes)
//! ```

/// Keyboard report payload size in bytes (without report ID).
pub const KEYBOARD_REPORT_SIZE: usize = 8;

/// Number of simultaneous key codes a report can carry.
pub const KEYBOARD_ROLLOVER: usize = 6;

/// Usage code of the letter `A` on the Keyboard/Keypad page.
pub const KEY_A: u8 = 0x04;

/// Live keyboard report: modifiers plus up to six held key codes.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    /// Modifier key bitfield.
    pub modifier: u8,
    /// Reserved byte (always 0x00 per HID spec).
    pub reserved: u8,
    /// Up to 6 simultaneously pressed key codes, packed from slot 0.
    pub keycodes: [u8; KEYBOARD_ROLLOVER],
}

impl KeyboardReport {
    /// Create an empty (all-keys-released) report.
    pub const fn empty() -> Self {
        Self {
            modifier: 0,
            reserved: 0,
            keycodes: [0; KEYBOARD_ROLLOVER],
        }
    }

    /// Add `code` with `modifier` to the held set.
    ///
    /// Returns `false` if all six slots are taken; the modifier is applied
    /// regardless. A code already held is not duplicated.
    pub fn press(&mut self, modifier: u8, code: u8) -> bool {
        self.modifier |= modifier;
        if code == 0 || self.keycodes.contains(&code) {
            return true;
        }
        match self.keycodes.iter_mut().find(|slot| **slot == 0) {
            Some(slot) => {
                *slot = code;
                true
            }
            None => false,
        }
    }

    /// Remove `code` and clear the `modifier` bits.
    pub fn release(&mut self, modifier: u8, code: u8) {
        self.modifier &= !modifier;
        if code == 0 {
            return;
        }
        if let Some(pos) = self.keycodes.iter().position(|&k| k == code) {
            self.keycodes.copy_within(pos + 1.., pos);
            self.keycodes[KEYBOARD_ROLLOVER - 1] = 0;
        }
    }

    /// Serialise into a byte slice for USB HID transmission.
    /// Returns the number of bytes written (8), or 0 if `buf` is too small.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < KEYBOARD_REPORT_SIZE {
            return 0;
        }
        buf[0] = self.modifier;
        buf[1] = self.reserved;
        buf[2..8].copy_from_slice(&self.keycodes);
        KEYBOARD_REPORT_SIZE
    }

    /// Returns `true` if no keys are pressed (release event).
    pub fn is_empty(&self) -> bool {
        self.modifier == 0 && self.keycodes.iter().all(|&k| k == 0)
    }
}
