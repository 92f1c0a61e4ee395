//! Consumer Control report (usage page 0x0C): volume and media keys.
//!
//! It travels on the same interrupt IN endpoint as the keyboard report,
//! distinguished by report ID 2. Only one usage is active at a time.

/// Consumer control report size (one little-endian usage).
pub const CONSUMER_REPORT_SIZE: usize = 2;

/// Usage codes the keypad binds by default.
pub mod usage {
    pub const PLAY_PAUSE: u16 = 0x00CD;
    pub const MUTE: u16 = 0x00E2;
    pub const VOLUME_UP: u16 = 0x00E9;
    pub const VOLUME_DOWN: u16 = 0x00EA;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConsumerReport {
    /// Active usage, 0 when released.
    pub usage: u16,
}

impl ConsumerReport {
    pub const fn empty() -> Self {
        Self { usage: 0 }
    }

    pub const fn with_usage(usage: u16) -> Self {
        Self { usage }
    }

    /// Write the payload into `buf`. Returns 2, or 0 if `buf` is too small.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < CONSUMER_REPORT_SIZE {
            return 0;
        }
        buf[..CONSUMER_REPORT_SIZE].copy_from_slice(&self.usage.to_le_bytes());
        CONSUMER_REPORT_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.usage == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_report_is_empty() {
        let report = ConsumerReport::empty();
        assert!(report.is_empty());
        assert_eq!(report, ConsumerReport::default());
    }

    #[test]
    fn usage_is_little_endian() {
        let report = ConsumerReport::with_usage(usage::PLAY_PAUSE);
        assert!(!report.is_empty());
        let mut buf = [0u8; 2];
        assert_eq!(report.serialize(&mut buf), 2);
        assert_eq!(buf, [0xCD, 0x00]);
    }

    #[test]
    fn wide_usage_keeps_high_byte() {
        let mut buf = [0u8; 2];
        ConsumerReport::with_usage(0x0223).serialize(&mut buf);
        assert_eq!(buf, [0x23, 0x02]);
    }
}
