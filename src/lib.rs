//! Input-to-report pipeline of a 3-key + rotary-knob USB macro keypad.
//!
//! Everything here is hardware-independent and runs on the host under
//! `cargo test`. The nRF52840 wiring lives in [`board`] and `main.rs`,
//! both behind the `embedded` feature.
//!
//! ```text
//!   InputPins ─► KeyInputEngine ─► ReportDispatcher ─► EndpointController ─► USB
//!                                       │                    ▲
//!                                       ▼                    │ interrupt
//!                                IndicatorEngine ─► WS2812   │
//! ```

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod config;
pub mod dispatch;
pub mod error;
pub mod hid;
pub mod indicator;
pub mod input;
pub mod keymap;
pub mod keypad;
pub mod storage;
pub mod usb;

#[cfg(feature = "embedded")]
pub mod board;

pub use dispatch::ReportDispatcher;
pub use error::{Error, StorageError};
pub use indicator::{IndicatorEngine, Intensity};
pub use input::{InputPins, KeyEvent, KeyInputEngine, Line};
pub use keymap::{Action, KeyBinding, KeyId, Keymap};
pub use keypad::{boot_mode, BootMode, Keypad};
pub use storage::{ConfigStore, MemoryNvm, NvmBackend};
pub use usb::{EndpointController, Handshake, HostLink, UsbHardware};
