//! RGB indicator flash-and-decay.
//!
//! Each of the three indicators owns a base color and an intensity. A key
//! press sets intensity to [`INTENSITY_MAX`]; every tick then takes away
//! [`INTENSITY_DECAY_STEP`] until the level reaches
//! [`INTENSITY_OFF_THRESHOLD`], where the indicator turns [`Intensity::Off`].
//!
//! Indicator 0 doubles as the host Caps Lock lamp: its color is replaced
//! every tick by the status LED override, whatever its intensity.

use crate::config::{
    INDICATOR_COUNT, INTENSITY_DECAY_STEP, INTENSITY_MAX, INTENSITY_OFF_THRESHOLD,
    STATUS_COLOR_ACTIVE, STATUS_COLOR_INACTIVE, STATUS_LED_CAPS_LOCK,
};
use smart_leds::{SmartLedsWrite, RGB8};

/// Brightness of one indicator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Intensity {
    #[default]
    Off,
    Level(u8),
}

impl Intensity {
    /// One decay step. `Off` stays `Off`.
    pub fn decayed(self) -> Self {
        match self {
            Intensity::Off => Intensity::Off,
            Intensity::Level(level) => {
                let next = level.saturating_sub(INTENSITY_DECAY_STEP);
                if next <= INTENSITY_OFF_THRESHOLD {
                    Intensity::Off
                } else {
                    Intensity::Level(next)
                }
            }
        }
    }

    /// Scale `color` by this intensity.
    pub fn apply(self, color: RGB8) -> RGB8 {
        match self {
            Intensity::Off => RGB8::default(),
            Intensity::Level(level) => {
                let scale = |c: u8| (u16::from(c) * u16::from(level) / u16::from(INTENSITY_MAX)) as u8;
                RGB8::new(scale(color.r), scale(color.g), scale(color.b))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IndicatorState {
    /// Persisted base color.
    pub color: RGB8,
    pub intensity: Intensity,
}

// `RGB8` has no `defmt::Format`, so the channels are written out by hand.
#[cfg(feature = "defmt")]
impl defmt::Format for IndicatorState {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "IndicatorState {{ color: ({=u8}, {=u8}, {=u8}), intensity: {} }}",
            self.color.r,
            self.color.g,
            self.color.b,
            self.intensity
        )
    }
}

pub struct IndicatorEngine {
    states: [IndicatorState; INDICATOR_COUNT],
    status_override: Option<RGB8>,
}

impl IndicatorEngine {
    /// All indicators start off with their persisted base colors.
    pub fn new(colors: [RGB8; INDICATOR_COUNT]) -> Self {
        Self {
            states: colors.map(|color| IndicatorState {
                color,
                intensity: Intensity::Off,
            }),
            status_override: None,
        }
    }

    /// Jump `indicator` to full intensity, interrupting any decay.
    pub fn flash(&mut self, indicator: usize) {
        if let Some(state) = self.states.get_mut(indicator) {
            state.intensity = Intensity::Level(INTENSITY_MAX);
            trace!("indicator {=usize}: {}", indicator, *state);
        }
    }

    /// Advance every indicator by one decay step.
    pub fn decay(&mut self) {
        for state in &mut self.states {
            state.intensity = state.intensity.decayed();
        }
    }

    /// Apply the host LED status byte to indicator 0.
    ///
    /// Red while Caps Lock is off, dark while it is on.
    pub fn set_status_led(&mut self, status: u8) {
        self.status_override = Some(if status & STATUS_LED_CAPS_LOCK == 0 {
            STATUS_COLOR_INACTIVE
        } else {
            STATUS_COLOR_ACTIVE
        });
    }

    pub fn state(&self, indicator: usize) -> Option<&IndicatorState> {
        self.states.get(indicator)
    }

    pub fn intensity(&self, indicator: usize) -> Intensity {
        self.states
            .get(indicator)
            .map_or(Intensity::Off, |state| state.intensity)
    }

    /// Colors to show right now.
    pub fn frame(&self) -> [RGB8; INDICATOR_COUNT] {
        let mut frame = self.states.map(|state| state.intensity.apply(state.color));
        if let Some(color) = self.status_override {
            frame[0] = color;
        }
        frame
    }

    /// Push the current frame to the LED chain with interrupts masked, so
    /// the three writes land together.
    pub fn render<L>(&self, leds: &mut L) -> Result<(), L::Error>
    where
        L: SmartLedsWrite<Color = RGB8>,
    {
        let frame = self.frame();
        critical_section::with(|_| leds.write(frame.into_iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: RGB8 = RGB8::new(200, 0, 0);
    const GREEN: RGB8 = RGB8::new(0, 200, 0);
    const BLUE: RGB8 = RGB8::new(0, 0, 200);

    struct RecordingLeds {
        frames: std::vec::Vec<std::vec::Vec<RGB8>>,
    }

    impl SmartLedsWrite for RecordingLeds {
        type Error = ();
        type Color = RGB8;

        fn write<T, I>(&mut self, iterator: T) -> Result<(), ()>
        where
            T: IntoIterator<Item = I>,
            I: Into<RGB8>,
        {
            self.frames.push(iterator.into_iter().map(Into::into).collect());
            Ok(())
        }
    }

    #[test]
    fn intensity_never_increases_and_settles_off() {
        let mut engine = IndicatorEngine::new([RED, GREEN, BLUE]);
        engine.flash(1);
        let mut previous = engine.intensity(1);
        for _ in 0..200 {
            engine.decay();
            let now = engine.intensity(1);
            assert!(now <= previous);
            previous = now;
        }
        assert_eq!(previous, Intensity::Off);
    }

    #[test]
    fn decay_clamps_at_threshold() {
        assert_eq!(
            Intensity::Level(INTENSITY_OFF_THRESHOLD + INTENSITY_DECAY_STEP).decayed(),
            Intensity::Off
        );
        assert_eq!(
            Intensity::Level(INTENSITY_OFF_THRESHOLD + INTENSITY_DECAY_STEP + 1).decayed(),
            Intensity::Level(INTENSITY_OFF_THRESHOLD + 1)
        );
        assert_eq!(Intensity::Level(1).decayed(), Intensity::Off);
        assert_eq!(Intensity::Off.decayed(), Intensity::Off);
    }

    #[test]
    fn flash_resets_mid_decay() {
        let mut engine = IndicatorEngine::new([RED, GREEN, BLUE]);
        engine.flash(2);
        for _ in 0..10 {
            engine.decay();
        }
        assert!(engine.intensity(2) < Intensity::Level(INTENSITY_MAX));
        engine.flash(2);
        assert_eq!(engine.intensity(2), Intensity::Level(INTENSITY_MAX));
    }

    #[test]
    fn flash_out_of_range_is_ignored() {
        let mut engine = IndicatorEngine::new([RED, GREEN, BLUE]);
        engine.flash(INDICATOR_COUNT);
        assert_eq!(engine.frame(), [RGB8::default(); 3]);
    }

    #[test]
    fn frame_scales_base_color() {
        let mut engine = IndicatorEngine::new([RED, GREEN, BLUE]);
        engine.flash(1);
        assert_eq!(engine.frame()[1], GREEN);
        engine.decay();
        assert_eq!(engine.frame()[1], RGB8::new(0, 196, 0));
        assert_eq!(engine.frame()[2], RGB8::default());
    }

    #[test]
    fn status_led_overrides_indicator_zero() {
        let mut engine = IndicatorEngine::new([RED, GREEN, BLUE]);
        engine.flash(0);
        engine.set_status_led(0);
        assert_eq!(engine.frame()[0], STATUS_COLOR_INACTIVE);

        engine.set_status_led(STATUS_LED_CAPS_LOCK);
        assert_eq!(engine.frame()[0], STATUS_COLOR_ACTIVE);

        // Other lock bits do not count.
        engine.set_status_led(0x01 | 0x04);
        assert_eq!(engine.frame()[0], STATUS_COLOR_INACTIVE);

        // Decay still runs underneath the override.
        assert_eq!(engine.intensity(0), Intensity::Level(INTENSITY_MAX));
    }

    #[test]
    fn render_writes_three_colors() {
        let mut engine = IndicatorEngine::new([RED, GREEN, BLUE]);
        engine.flash(2);
        let mut leds = RecordingLeds { frames: std::vec::Vec::new() };
        engine.render(&mut leds).unwrap();
        assert_eq!(
            leds.frames,
            [std::vec![RGB8::default(), RGB8::default(), BLUE]]
        );
    }
}
