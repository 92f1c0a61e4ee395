//! One cooperative tick of the keypad.
//!
//! ```text
//!   sample inputs ─► dispatch reports ─► status LED override ─► render
//!        ─► decay ─► latch delay ─► drain raw packet
//! ```
//!
//! Everything runs in thread mode. The only blocking points are the
//! encoder settle-wait in [`KeyInputEngine::sample`] and Report-IN
//! sends in the dispatcher.

use crate::config::{INDICATOR_COUNT, LOOP_LATCH_MS};
use crate::dispatch::ReportDispatcher;
use crate::indicator::IndicatorEngine;
use crate::input::{InputPins, KeyInputEngine};
use crate::keymap::Keymap;
use crate::storage::{ConfigStore, NvmBackend};
use crate::usb::HostLink;
use embedded_hal::delay::DelayNs;
use smart_leds::{SmartLedsWrite, RGB8};

/// Power-up path, decided from key 1 before anything else runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootMode {
    Normal,
    /// Key 1 held at power-up: show white and jump into the USB bootloader.
    Bootloader,
}

pub fn boot_mode(key1_pressed: bool) -> BootMode {
    if key1_pressed {
        BootMode::Bootloader
    } else {
        BootMode::Normal
    }
}

pub struct Keypad<P, D> {
    keymap: Keymap,
    input: KeyInputEngine<P>,
    dispatcher: ReportDispatcher,
    indicators: IndicatorEngine,
    delay: D,
}

impl<P: InputPins, D: DelayNs> Keypad<P, D> {
    pub fn new(keymap: Keymap, colors: [RGB8; INDICATOR_COUNT], pins: P, delay: D) -> Self {
        Self {
            keymap,
            input: KeyInputEngine::new(pins),
            dispatcher: ReportDispatcher::new(),
            indicators: IndicatorEngine::new(colors),
            delay,
        }
    }

    /// Build from the persisted bindings and colors.
    pub fn load<B: NvmBackend>(store: &mut ConfigStore<B>, pins: P, delay: D) -> Self {
        let keymap = store.load_keymap();
        let colors = store.load_colors();
        info!("loaded keymap: {}", keymap);
        Self::new(keymap, colors, pins, delay)
    }

    /// Run one loop iteration.
    pub fn tick<L, W>(&mut self, link: &L, leds: &mut W)
    where
        L: HostLink + ?Sized,
        W: SmartLedsWrite<Color = RGB8>,
    {
        let events = self.input.sample(&mut self.keymap, &mut self.delay);
        for event in events {
            self.dispatcher
                .dispatch(event, &self.keymap, link, &mut self.indicators);
        }

        self.indicators.set_status_led(link.status_led());
        if self.indicators.render(leds).is_err() {
            warn!("indicator write failed");
        }
        self.indicators.decay();

        self.delay.delay_ms(LOOP_LATCH_MS);

        let pending = link.raw_available();
        if pending > 0 {
            debug!("raw OUT: acknowledging {=usize} bytes", pending);
            link.raw_acknowledge();
        }
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    pub fn indicators(&self) -> &IndicatorEngine {
        &self.indicators
    }

    pub fn dispatcher(&self) -> &ReportDispatcher {
        &self.dispatcher
    }

    pub fn pins_mut(&mut self) -> &mut P {
        self.input.pins_mut()
    }
}
