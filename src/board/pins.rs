//! GPIO sampling for the three keys, the encoder switch and the encoder
//! phases.
//!
//! Keys, the encoder switch and encoder A are active-low with internal
//! pull-ups. Encoder B is read as-is: high means clockwise.

use embassy_nrf::gpio::{AnyPin, Input, Pull};

use crate::input::{InputPins, Line};

pub struct KeypadPins {
    key1: Input<'static>,
    key2: Input<'static>,
    key3: Input<'static>,
    encoder_switch: Input<'static>,
    encoder_a: Input<'static>,
    encoder_b: Input<'static>,
}

impl KeypadPins {
    pub fn new(
        key1: AnyPin,
        key2: AnyPin,
        key3: AnyPin,
        encoder_switch: AnyPin,
        encoder_a: AnyPin,
        encoder_b: AnyPin,
    ) -> Self {
        Self {
            key1: Input::new(key1, Pull::Up),
            key2: Input::new(key2, Pull::Up),
            key3: Input::new(key3, Pull::Up),
            encoder_switch: Input::new(encoder_switch, Pull::Up),
            encoder_a: Input::new(encoder_a, Pull::Up),
            encoder_b: Input::new(encoder_b, Pull::Up),
        }
    }
}

impl InputPins for KeypadPins {
    fn is_active(&mut self, line: Line) -> bool {
        match line {
            Line::Key1 => self.key1.is_low(),
            Line::Key2 => self.key2.is_low(),
            Line::Key3 => self.key3.is_low(),
            Line::EncoderSwitch => self.encoder_switch.is_low(),
            Line::EncoderA => self.encoder_a.is_low(),
            Line::EncoderB => self.encoder_b.is_high(),
        }
    }
}
