//! USB endpoint hand-off between the cooperative loop and the interrupt.
//!
//! The keypad presents two HID interfaces:
//!
//! - Interface 0: keyboard (report ID 1) + consumer control (report ID 2)
//!   on the Report-IN endpoint; host LED status comes back on its OUT
//!   endpoint or through SET_REPORT.
//! - Interface 1: vendor raw channel. Only its OUT endpoint is used, with
//!   an acknowledge-before-next-packet handshake.
//!
//! [`EndpointController`] owns all endpoint state. The USB stack drives
//! its interrupt-side methods; the loop sees it through [`HostLink`].

pub mod endpoint;

pub use endpoint::{EndpointController, RawPacket, UsbEvent};

/// Response the Raw-OUT endpoint gives to the next host packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Handshake {
    /// Accept the next packet.
    Ack,
    /// Hold the host off until the pending packet is acknowledged.
    Nak,
}

/// Endpoint-level hardware operations.
///
/// Called with the controller lock held, so implementations must not block.
pub trait UsbHardware {
    /// Copy `report` into the Report-IN buffer and arm it for transmission.
    ///
    /// The transfer's completion must be reported back with the same
    /// `generation`.
    fn arm_report_in(&mut self, generation: u32, report: &[u8]);

    /// Set how the Raw-OUT endpoint answers the host.
    fn respond_raw_out(&mut self, handshake: Handshake);
}

/// What the cooperative loop needs from the USB side.
pub trait HostLink {
    /// Queue one framed report on Report-IN, waiting for the previous one
    /// to leave first.
    fn send_report(&self, report: &[u8]);

    /// Latest host LED status byte.
    fn status_led(&self) -> u8;

    /// Bytes of the pending raw packet not yet consumed.
    fn raw_available(&self) -> usize;

    /// Drop the pending raw packet and accept the next one.
    fn raw_acknowledge(&self);
}
