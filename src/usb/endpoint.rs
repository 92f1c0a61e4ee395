//! Endpoint state shared between thread mode and the USB interrupt.
//!
//! Interrupt-side calls (`on_*`) never block. They gate Raw-OUT packets,
//! set the hardware handshake where it must change immediately, and record
//! what happened as a [`UsbEvent`] in a small inbox. The loop side drains
//! the inbox under the same lock before it looks at any state. A bus reset
//! is the one interrupt-side call that applies the inbox itself.
//!
//! Every armed report carries the controller's generation, which a bus
//! reset bumps. A completion from before the reset names an old generation
//! and is ignored, so it cannot release a report armed after the reset.
//!
//! ```text
//!   Report-IN   Idle --send--> Busy --ReportInComplete(current)--> Idle
//!   Raw-OUT     Idle --RawOut (NAK)--> Pending(n) --acknowledge / read n--> Idle (ACK)
//! ```

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Deque;

use super::{Handshake, HostLink, UsbHardware};
use crate::config::{RAW_REPORT_SIZE, REPORT_ID_STATUS_LED, USB_INBOX_CAPACITY};

/// One inbound raw packet, copied out of the endpoint buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawPacket {
    len: u8,
    data: [u8; RAW_REPORT_SIZE],
}

impl RawPacket {
    /// Copy up to [`RAW_REPORT_SIZE`] bytes of `bytes`.
    pub fn new(bytes: &[u8]) -> Self {
        let len = bytes.len().min(RAW_REPORT_SIZE);
        let mut data = [0; RAW_REPORT_SIZE];
        data[..len].copy_from_slice(&bytes[..len]);
        Self {
            len: len as u8,
            data,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..usize::from(self.len)]
    }
}

/// Something the interrupt observed, waiting for the loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbEvent {
    /// The Report-IN buffer armed in this generation went out.
    ReportInComplete(u32),
    /// An in-order raw packet arrived and the endpoint now NAKs.
    RawOut(RawPacket),
    /// Host LED status byte.
    StatusLed(u8),
    BusReset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum ReportIn {
    Idle,
    Busy,
}

struct Inner<H> {
    hw: H,
    report_in: ReportIn,
    /// Bumped by every bus reset.
    generation: u32,
    raw: [u8; RAW_REPORT_SIZE],
    raw_pos: usize,
    raw_remaining: usize,
    /// Set by the interrupt when it accepts a packet; cleared when the loop
    /// re-arms ACK. Packets arriving while set are not ours to take.
    raw_nak: bool,
    status: u8,
    inbox: Deque<UsbEvent, USB_INBOX_CAPACITY>,
    dropped: u32,
}

impl<H: UsbHardware> Inner<H> {
    /// Queue `event` for the loop. Returns `false` if the inbox was full.
    fn record(&mut self, event: UsbEvent) -> bool {
        // Only the latest LED state matters.
        if let UsbEvent::StatusLed(status) = event {
            if let Some(slot) = self
                .inbox
                .iter_mut()
                .find(|queued| matches!(queued, UsbEvent::StatusLed(_)))
            {
                *slot = UsbEvent::StatusLed(status);
                return true;
            }
        }
        if self.inbox.push_back(event).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
            warn!("USB inbox full, dropped {}", event);
            return false;
        }
        true
    }

    fn drain(&mut self) {
        while let Some(event) = self.inbox.pop_front() {
            match event {
                UsbEvent::ReportInComplete(generation) if generation == self.generation => {
                    self.report_in = ReportIn::Idle
                }
                UsbEvent::ReportInComplete(generation) => {
                    debug!("Report-IN: ignored completion from generation {=u32}", generation)
                }
                UsbEvent::RawOut(packet) => {
                    let bytes = packet.as_bytes();
                    self.raw[..bytes.len()].copy_from_slice(bytes);
                    self.raw_pos = 0;
                    self.raw_remaining = bytes.len();
                }
                UsbEvent::StatusLed(status) => self.status = status,
                UsbEvent::BusReset => {
                    self.report_in = ReportIn::Idle;
                    self.raw_pos = 0;
                    self.raw_remaining = 0;
                }
            }
        }
    }

    fn rearm_raw_out(&mut self) {
        self.raw_pos = 0;
        self.raw_remaining = 0;
        self.raw_nak = false;
        self.hw.respond_raw_out(Handshake::Ack);
    }
}

/// Owner of the Report-IN, Raw-OUT and status endpoint state.
///
/// Meant to live in a `static`; every method takes `&self`.
pub struct EndpointController<H> {
    inner: Mutex<RefCell<Inner<H>>>,
}

impl<H: UsbHardware> EndpointController<H> {
    pub const fn new(hw: H) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                hw,
                report_in: ReportIn::Idle,
                generation: 0,
                raw: [0; RAW_REPORT_SIZE],
                raw_pos: 0,
                raw_remaining: 0,
                raw_nak: false,
                status: 0,
                inbox: Deque::new(),
                dropped: 0,
            })),
        }
    }

    fn locked<R>(&self, f: impl FnOnce(&mut Inner<H>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    // ─── Interrupt side ────────────────────────────────────────────────

    /// Report-IN transfer of the report armed in `generation` finished.
    pub fn on_report_in_complete(&self, generation: u32) {
        self.locked(|inner| {
            inner.record(UsbEvent::ReportInComplete(generation));
        });
    }

    /// Raw-OUT packet arrived.
    ///
    /// Out-of-order frames (`toggle_ok == false`) and frames arriving while
    /// a packet is still pending are dropped without any state change.
    pub fn on_raw_out(&self, toggle_ok: bool, data: &[u8]) {
        self.locked(|inner| {
            if !toggle_ok {
                debug!("raw OUT: dropped unsynchronized frame");
                return;
            }
            if inner.raw_nak {
                debug!("raw OUT: dropped frame while packet pending");
                return;
            }
            if data.is_empty() {
                return;
            }
            if inner.record(UsbEvent::RawOut(RawPacket::new(data))) {
                inner.raw_nak = true;
                inner.hw.respond_raw_out(Handshake::Nak);
            } else {
                // Packet lost; stay open for the next one.
                inner.hw.respond_raw_out(Handshake::Ack);
            }
        });
    }

    /// Host LED output report, either from the interrupt OUT endpoint or a
    /// SET_REPORT. Expects `[sub-ID, status]`; other sub-IDs are ignored.
    pub fn on_status_out(&self, data: &[u8]) {
        if let [REPORT_ID_STATUS_LED, status, ..] = *data {
            self.locked(|inner| {
                inner.record(UsbEvent::StatusLed(status));
            });
        }
    }

    /// USB bus reset: Report-IN back to Idle, Raw-OUT back to ACK.
    ///
    /// Completions for reports armed before the reset are ignored from here
    /// on.
    pub fn on_bus_reset(&self) {
        self.locked(|inner| {
            // Settle what came before the reset; this also makes room for it.
            inner.drain();
            inner.generation = inner.generation.wrapping_add(1);
            inner.raw_nak = false;
            inner.hw.respond_raw_out(Handshake::Ack);
            inner.record(UsbEvent::BusReset);
        });
    }

    // ─── Loop side ────────────────────────────────────────────────────

    /// Apply every pending interrupt event.
    pub fn poll(&self) {
        self.locked(Inner::drain);
    }

    /// Arm `report` on Report-IN, spinning while the previous one is still
    /// in flight.
    pub fn send(&self, report: &[u8]) {
        loop {
            let armed = self.locked(|inner| {
                inner.drain();
                if inner.report_in == ReportIn::Busy {
                    return false;
                }
                inner.hw.arm_report_in(inner.generation, report);
                inner.report_in = ReportIn::Busy;
                true
            });
            if armed {
                return;
            }
            core::hint::spin_loop();
        }
    }

    /// `true` while a report is armed and not yet confirmed.
    pub fn is_busy(&self) -> bool {
        self.locked(|inner| {
            inner.drain();
            inner.report_in == ReportIn::Busy
        })
    }

    /// Bytes of the pending raw packet left to read.
    pub fn available(&self) -> usize {
        self.locked(|inner| {
            inner.drain();
            inner.raw_remaining
        })
    }

    /// Next byte of the pending raw packet. Taking the last byte re-arms ACK.
    pub fn read(&self) -> Option<u8> {
        self.locked(|inner| {
            inner.drain();
            if inner.raw_remaining == 0 {
                return None;
            }
            let byte = inner.raw[inner.raw_pos];
            inner.raw_pos += 1;
            inner.raw_remaining -= 1;
            if inner.raw_remaining == 0 {
                inner.rearm_raw_out();
            }
            Some(byte)
        })
    }

    /// Discard the pending raw packet and accept the next one.
    pub fn acknowledge(&self) {
        self.locked(|inner| {
            inner.drain();
            inner.rearm_raw_out();
        });
    }

    pub fn status_led(&self) -> u8 {
        self.locked(|inner| {
            inner.drain();
            inner.status
        })
    }

    /// Interrupt events lost to a full inbox since boot.
    pub fn dropped_events(&self) -> u32 {
        self.locked(|inner| inner.dropped)
    }
}

impl<H: UsbHardware> HostLink for EndpointController<H> {
    fn send_report(&self, report: &[u8]) {
        self.send(report);
    }

    fn status_led(&self) -> u8 {
        EndpointController::status_led(self)
    }

    fn raw_available(&self) -> usize {
        self.available()
    }

    fn raw_acknowledge(&self) {
        self.acknowledge();
    }
}
