//! HID report types sent on the Report-IN endpoint.

pub mod consumer;
pub mod descriptor;
pub mod keyboard;


use crate::config::{REPORT_ID_CONSUMER, REPORT_ID_KEYBOARD};

pub use consumer::{usage, ConsumerReport};
pub use keyboard::KeyboardReport;

/// A report ready for the interrupt IN endpoint, tagged by report ID.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidReport {
    Keyboard(KeyboardReport),
    Consumer(ConsumerReport),
}

impl HidReport {
    /// Report ID that prefixes this report on the wire.
    pub fn report_id(&self) -> u8 {
        match self {
            HidReport::Keyboard(_) => REPORT_ID_KEYBOARD,
            HidReport::Consumer(_) => REPORT_ID_CONSUMER,
        }
    }

    /// Serialise as `[report ID, payload...]`.
    ///
    /// Returns the number of bytes written, or 0 if `buf` is too small.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        let Some((id, payload)) = buf.split_first_mut() else {
            return 0;
        };
        let n = match self {
            HidReport::Keyboard(k) => k.serialize(payload),
            HidReport::Consumer(c) => c.serialize(payload),
        };
        if n == 0 {
            return 0;
        }
        *id = self.report_id();
        n + 1
    }
}
