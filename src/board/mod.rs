//! nRF52840 implementations of the pipeline's hardware traits.
//!
//! Only built with the `embedded` feature.

pub mod leds;
pub mod nvm;
pub mod pins;
pub mod usb;
