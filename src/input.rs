//! Physical input sampling and edge detection.
//!
//! Buttons and the encoder switch are edge-triggered against the `last`
//! flag kept in each [`KeyBinding`](crate::keymap::KeyBinding): one event
//! per transition, nothing while a level is steady.
//!
//! The quadrature encoder is debounced by waiting. When line A asserts, line
//! B gives the direction, a single tick is emitted, and sampling blocks for
//! [`ENCODER_SETTLE_MS`] and then until A deasserts again. Contact bounce and
//! dwell at the detent both fall inside that window.

use crate::config::ENCODER_SETTLE_MS;
use crate::keymap::{Edge, KeyId, Keymap};
use embedded_hal::delay::DelayNs;
use heapless::Vec;

/// Physical input lines of the keypad.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Line {
    Key1,
    Key2,
    Key3,
    EncoderSwitch,
    EncoderA,
    EncoderB,
}

/// Instantaneous pin sampling.
///
/// `true` means the line is asserted: a key is pressed, or an encoder phase
/// is active. Pull-up polarity is the implementor's concern.
pub trait InputPins {
    fn is_active(&mut self, line: Line) -> bool;
}

/// Logical input event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyEvent {
    Down(KeyId),
    Up(KeyId),
    /// One encoder detent. Encoder keys have no matching release.
    Tick(KeyId),
}

impl KeyEvent {
    pub fn key(&self) -> KeyId {
        match *self {
            KeyEvent::Down(key) | KeyEvent::Up(key) | KeyEvent::Tick(key) => key,
        }
    }
}

/// Upper bound of events one sample can produce (four edges plus one tick).
pub const MAX_EVENTS_PER_SAMPLE: usize = 5;

pub type KeyEvents = Vec<KeyEvent, MAX_EVENTS_PER_SAMPLE>;

/// Edge-triggered keys in sampling order.
const BUTTONS: [(KeyId, Line); 4] = [
    (KeyId::Key1, Line::Key1),
    (KeyId::Key2, Line::Key2),
    (KeyId::Key3, Line::Key3),
    (KeyId::EncoderSwitch, Line::EncoderSwitch),
];

pub struct KeyInputEngine<P> {
    pins: P,
}

impl<P: InputPins> KeyInputEngine<P> {
    pub const fn new(pins: P) -> Self {
        Self { pins }
    }

    /// Sample every line once and return the resulting events.
    ///
    /// Blocks for the duration of an encoder detent if the knob is turning.
    pub fn sample<D: DelayNs>(&mut self, keymap: &mut Keymap, delay: &mut D) -> KeyEvents {
        let mut events = KeyEvents::new();

        for (key, line) in BUTTONS {
            let pressed = self.pins.is_active(line);
            let event = match keymap.get_mut(key).observe(pressed) {
                Some(Edge::Pressed) => KeyEvent::Down(key),
                Some(Edge::Released) => KeyEvent::Up(key),
                None => continue,
            };
            debug!("key event: {}", event);
            // Capacity covers every line.
            let _ = events.push(event);
        }

        if let Some(event) = self.sample_encoder(delay) {
            debug!("key event: {}", event);
            let _ = events.push(event);
        }

        events
    }

    fn sample_encoder<D: DelayNs>(&mut self, delay: &mut D) -> Option<KeyEvent> {
        if !self.pins.is_active(Line::EncoderA) {
            return None;
        }
        let key = if self.pins.is_active(Line::EncoderB) {
            KeyId::EncoderClockwise
        } else {
            KeyId::EncoderCounterClockwise
        };

        delay.delay_ms(ENCODER_SETTLE_MS);
        while self.pins.is_active(Line::EncoderA) {
            core::hint::spin_loop();
        }

        Some(KeyEvent::Tick(key))
    }

    pub fn pins(&self) -> &P {
        &self.pins
    }

    pub fn pins_mut(&mut self) -> &mut P {
        &mut self.pins
    }
}
