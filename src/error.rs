//! Unified error type for the keypad firmware.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` for efficient on-target logging.

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Storage
    /// Non-volatile configuration access failed.
    Storage(StorageError),

    // USB
    /// USB stack returned an error.
    Usb,

    // Indicators
    /// The LED driver rejected a frame.
    Led,

    // Watchdog
    /// The watchdog could not be configured (already running with other settings).
    Watchdog,
}

/// Non-volatile memory errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Address lies outside the 128-byte configuration area. Nothing was written.
    OutOfRange(u8),
    /// The backing flash refused the operation.
    Backend,
}

// Convenience conversions

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::Storage(e)
    }
}
