//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters, and protocol
//! constants live here so they can be tuned in one place.

use smart_leds::RGB8;

// Keys & indicators

/// Number of logical inputs (3 buttons, encoder switch, 2 encoder directions).
pub const KEY_COUNT: usize = 6;

/// Number of addressable RGB indicators.
pub const INDICATOR_COUNT: usize = 3;

/// Intensity an indicator jumps to when its key goes down.
pub const INTENSITY_MAX: u8 = 255;

/// Intensity lost per loop iteration.
pub const INTENSITY_DECAY_STEP: u8 = 5;

/// Once intensity drops to or below this level the indicator is switched off.
pub const INTENSITY_OFF_THRESHOLD: u8 = 10;

/// Bit of the host LED status byte that drives indicator 0 (Caps Lock).
pub const STATUS_LED_CAPS_LOCK: u8 = 1 << 1;

/// Indicator 0 color while Caps Lock is off.
pub const STATUS_COLOR_INACTIVE: RGB8 = RGB8::new(255, 0, 0);

/// Indicator 0 color while Caps Lock is on.
pub const STATUS_COLOR_ACTIVE: RGB8 = RGB8::new(0, 0, 0);

/// Color shown on every indicator while diverting into the bootloader.
pub const BOOTLOADER_COLOR: RGB8 = RGB8::new(255, 255, 255);

// Timing

/// Delay after an encoder detent is detected before waiting for line A to
/// deassert (ms).
pub const ENCODER_SETTLE_MS: u32 = 10;

/// Latch/debounce delay at the end of every loop iteration (ms).
pub const LOOP_LATCH_MS: u32 = 5;

/// Watchdog timeout (ms). One loop iteration must complete within this.
pub const WATCHDOG_TIMEOUT_MS: u32 = 2_000;

/// nRF52840 watchdog counter frequency (LFCLK).
pub const WATCHDOG_TICK_HZ: u32 = 32_768;

// USB

/// USB VID/PID of the keypad.
pub const USB_VID: u16 = 0x4249;
pub const USB_PID: u16 = 0x4287;

/// USB device strings.
pub const USB_MANUFACTURER: &str = "macropad";
pub const USB_PRODUCT: &str = "MacroPad Mini";
pub const USB_SERIAL_NUMBER: &str = "000001";

/// USB HID polling interval (ms).
pub const USB_HID_POLL_MS: u8 = 10;

/// Report ID of the keyboard input report.
pub const REPORT_ID_KEYBOARD: u8 = 1;

/// Report ID of the consumer-control input report.
pub const REPORT_ID_CONSUMER: u8 = 2;

/// Sub-ID of the host LED status output report.
pub const REPORT_ID_STATUS_LED: u8 = 1;

/// Size of one vendor raw HID packet.
pub const RAW_REPORT_SIZE: usize = 32;

/// Largest report written on the Report-IN endpoint (ID + keyboard payload).
pub const REPORT_IN_MAX_SIZE: usize = 9;

/// Pending interrupt events the endpoint controller can hold between ticks.
pub const USB_INBOX_CAPACITY: usize = 8;

// Non-volatile layout

/// Size of the byte-addressable configuration area.
pub const NVM_SIZE: usize = 128;

/// Bytes per key binding record (modifier, kind, code).
pub const NVM_KEY_FIELDS: usize = 3;

/// Bytes per indicator color record (red, green, blue).
pub const NVM_COLOR_FIELDS: usize = 3;

/// First byte of the key binding records.
pub const NVM_KEY_OFFSET: usize = 0;

/// First byte of the indicator color records.
pub const NVM_COLOR_OFFSET: usize = NVM_KEY_OFFSET + KEY_COUNT * NVM_KEY_FIELDS;

/// Flash page index where the NVM image starts (4 KB per page on nRF52840).
pub const STORAGE_FLASH_PAGE_START: u32 = 240;

/// Number of flash pages reserved for the NVM image.
pub const STORAGE_FLASH_PAGE_COUNT: u32 = 4;

// Bootloader

/// Value written to GPREGRET to make the bootloader stay in DFU mode.
pub const DFU_MAGIC: u32 = 0x57;

// GPIO pin assignments
//
// These are logical names; the concrete `embassy_nrf::peripherals::*` are
// picked in `main.rs`.  Adjust for your custom PCB.
//
//   Key 1          → P0.11  (active-low, also the bootloader key)
//   Key 2          → P0.12
//   Key 3          → P0.24
//   Encoder switch → P0.25
//   Encoder A      → P0.03
//   Encoder B      → P0.04
//   WS2812 data    → P0.26  (SPIM3 MOSI)
//   SPIM3 SCK      → P0.27  (not connected)
