//! Translation of key events into HID reports.
//!
//! The dispatcher keeps the live keyboard and consumer reports, applies
//! each event's action to the right one and sends the result through the
//! [`HostLink`]. Sending blocks while Report-IN is busy.

use crate::config::REPORT_IN_MAX_SIZE;
use crate::hid::{ConsumerReport, HidReport, KeyboardReport};
use crate::indicator::IndicatorEngine;
use crate::input::KeyEvent;
use crate::keymap::{Action, Keymap};
use crate::usb::HostLink;

#[derive(Debug, Default)]
pub struct ReportDispatcher {
    keyboard: KeyboardReport,
    consumer: ConsumerReport,
}

impl ReportDispatcher {
    pub const fn new() -> Self {
        Self {
            keyboard: KeyboardReport::empty(),
            consumer: ConsumerReport::empty(),
        }
    }

    /// Act on one event.
    ///
    /// - `Down`: press the bound action and flash the key's indicator.
    /// - `Up`: release it.
    /// - `Tick`: press and release in one go.
    pub fn dispatch<L>(
        &mut self,
        event: KeyEvent,
        keymap: &Keymap,
        link: &L,
        indicators: &mut IndicatorEngine,
    ) where
        L: HostLink + ?Sized,
    {
        let action = keymap.action(event.key());
        match event {
            KeyEvent::Down(key) => {
                let report = self.press(action);
                send(link, &report);
                if let Some(indicator) = key.indicator() {
                    indicators.flash(indicator);
                }
            }
            KeyEvent::Up(_) => {
                let report = self.release(action);
                send(link, &report);
            }
            KeyEvent::Tick(_) => {
                let report = self.press(action);
                send(link, &report);
                let report = self.release(action);
                send(link, &report);
            }
        }
    }

    fn press(&mut self, action: Action) -> HidReport {
        match action {
            Action::Keyboard { modifier, code } => {
                if !self.keyboard.press(modifier, code) {
                    warn!("keyboard report full, dropping code {=u8:#x}", code);
                }
                HidReport::Keyboard(self.keyboard)
            }
            Action::Consumer { code } => {
                self.consumer = ConsumerReport::with_usage(code);
                HidReport::Consumer(self.consumer)
            }
        }
    }

    fn release(&mut self, action: Action) -> HidReport {
        match action {
            Action::Keyboard { modifier, code } => {
                self.keyboard.release(modifier, code);
                HidReport::Keyboard(self.keyboard)
            }
            Action::Consumer { .. } => {
                self.consumer = ConsumerReport::empty();
                HidReport::Consumer(self.consumer)
            }
        }
    }

    /// Keyboard state as last sent.
    pub fn keyboard(&self) -> &KeyboardReport {
        &self.keyboard
    }

    /// Consumer state as last sent.
    pub fn consumer(&self) -> &ConsumerReport {
        &self.consumer
    }
}

fn send<L: HostLink + ?Sized>(link: &L, report: &HidReport) {
    let mut buf = [0u8; REPORT_IN_MAX_SIZE];
    let n = report.serialize(&mut buf);
    link.send_report(&buf[..n]);
}
