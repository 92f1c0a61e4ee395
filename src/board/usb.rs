//! USB composite HID device on the nRF52840 USBD peripheral.
//!
//! - Interface 0: keyboard + consumer control (IN), host LED status (OUT)
//! - Interface 1: vendor raw channel (OUT only; its IN endpoint is unused)
//!
//! The tasks here run on the high-priority interrupt executor and are the
//! only callers of the `on_*` side of [`CONTROLLER`]. The main loop talks
//! to the same controller through [`HostLink`](crate::usb::HostLink).

use embassy_executor::Spawner;
use embassy_nrf::usb::vbus_detect::HardwareVbusDetect;
use embassy_nrf::usb::Driver;
use embassy_nrf::{self, bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_usb::class::hid::{
    Config as HidConfig, HidReader, HidReaderWriter, HidWriter, ReadError, ReportId,
    RequestHandler, State,
};
use embassy_usb::control::OutResponse;
use embassy_usb::{Builder, Config, UsbDevice};
use heapless::Vec;
use static_cell::StaticCell;

use crate::config::{self, RAW_REPORT_SIZE, REPORT_IN_MAX_SIZE};
use crate::error::Error;
use crate::hid::descriptor::{KEYPAD_REPORT_DESCRIPTOR, RAW_REPORT_DESCRIPTOR};
use crate::usb::{EndpointController, Handshake, UsbHardware};

bind_interrupts!(struct Irqs {
    USBD => embassy_nrf::usb::InterruptHandler<peripherals::USBD>;
    CLOCK_POWER => embassy_nrf::usb::vbus_detect::InterruptHandler;
});

pub type UsbDriver = Driver<'static, peripherals::USBD, HardwareVbusDetect>;

/// Status OUT report: sub-ID + LED byte.
const STATUS_OUT_SIZE: usize = 2;

/// Endpoint state shared by the USB tasks and the main loop.
pub static CONTROLLER: EndpointController<EmbassyUsbPort> =
    EndpointController::new(EmbassyUsbPort);

/// Report armed by the controller, with its generation, waiting for the
/// Report-IN task.
static REPORT_IN: Channel<CriticalSectionRawMutex, (u32, Vec<u8, REPORT_IN_MAX_SIZE>), 1> =
    Channel::new();

/// Raised when Raw-OUT may accept the next packet.
static RAW_ACK: Signal<CriticalSectionRawMutex, ()> = Signal::new();

static KEYPAD_STATE: StaticCell<State> = StaticCell::new();
static RAW_STATE: StaticCell<State> = StaticCell::new();
static USB_CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_MSOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_CTRL_BUF: StaticCell<[u8; 128]> = StaticCell::new();
static USB_BUS_HANDLER: StaticCell<UsbBusHandler> = StaticCell::new();
static STATUS_REQUEST_HANDLER: StaticCell<StatusRequestHandler> = StaticCell::new();

/// Endpoint hardware as seen from [`EndpointController`].
///
/// Arming Report-IN hands the bytes to the Report-IN task; the Raw-OUT
/// handshake is the Raw-OUT task waiting on [`RAW_ACK`] before it reads
/// again.
pub struct EmbassyUsbPort;

impl UsbHardware for EmbassyUsbPort {
    fn arm_report_in(&mut self, generation: u32, report: &[u8]) {
        let Ok(report) = Vec::from_slice(report) else {
            defmt::warn!("report too long for Report-IN: {=usize} bytes", report.len());
            return;
        };
        if REPORT_IN.try_send((generation, report)).is_err() {
            defmt::warn!("Report-IN already armed");
        }
    }

    fn respond_raw_out(&mut self, handshake: Handshake) {
        match handshake {
            Handshake::Ack => RAW_ACK.signal(()),
            // The reader is parked on RAW_ACK until the loop acknowledges.
            Handshake::Nak => {}
        }
    }
}

struct UsbBusHandler;

impl embassy_usb::Handler for UsbBusHandler {
    fn reset(&mut self) {
        // A report queued before the reset is never sent.
        REPORT_IN.clear();
        CONTROLLER.on_bus_reset();
    }
}

/// SET_REPORT on endpoint 0 carrying the host LED byte.
struct StatusRequestHandler;

impl RequestHandler for StatusRequestHandler {
    fn set_report(&mut self, id: ReportId, data: &[u8]) -> OutResponse {
        if let (ReportId::Out(id), Some(&status)) = (id, data.last()) {
            CONTROLLER.on_status_out(&[id, status]);
        }
        OutResponse::Accepted
    }
}

/// Build result: the device runner plus the endpoint halves the tasks need.
struct UsbHidDevice {
    device: UsbDevice<'static, UsbDriver>,
    report_writer: HidWriter<'static, UsbDriver, REPORT_IN_MAX_SIZE>,
    status_reader: HidReader<'static, UsbDriver, STATUS_OUT_SIZE>,
    raw_reader: HidReader<'static, UsbDriver, RAW_REPORT_SIZE>,
}

/// Initialise the USB stack and create the composite HID device.
///
/// Must be called exactly once.  All static buffers are consumed here.
fn init(usbd: peripherals::USBD) -> UsbHidDevice {
    let driver = Driver::new(usbd, Irqs, HardwareVbusDetect::new(Irqs));

    let mut usb_config = Config::new(config::USB_VID, config::USB_PID);
    usb_config.manufacturer = Some(config::USB_MANUFACTURER);
    usb_config.product = Some(config::USB_PRODUCT);
    usb_config.serial_number = Some(config::USB_SERIAL_NUMBER);
    usb_config.max_power = 100; // mA
    usb_config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        driver,
        usb_config,
        USB_CONFIG_DESC.init([0u8; 256]),
        USB_BOS_DESC.init([0u8; 256]),
        USB_MSOS_DESC.init([0u8; 256]),
        USB_CTRL_BUF.init([0u8; 128]),
    );

    builder.handler(USB_BUS_HANDLER.init(UsbBusHandler));

    let keypad_config = HidConfig {
        report_descriptor: KEYPAD_REPORT_DESCRIPTOR,
        request_handler: Some(STATUS_REQUEST_HANDLER.init(StatusRequestHandler)),
        poll_ms: config::USB_HID_POLL_MS,
        max_packet_size: 64,
    };
    let keypad = HidReaderWriter::<_, STATUS_OUT_SIZE, REPORT_IN_MAX_SIZE>::new(
        &mut builder,
        KEYPAD_STATE.init(State::new()),
        keypad_config,
    );
    let (status_reader, report_writer) = keypad.split();

    let raw_config = HidConfig {
        report_descriptor: RAW_REPORT_DESCRIPTOR,
        request_handler: None,
        poll_ms: config::USB_HID_POLL_MS,
        max_packet_size: RAW_REPORT_SIZE as u16,
    };
    let raw = HidReaderWriter::<_, RAW_REPORT_SIZE, RAW_REPORT_SIZE>::new(
        &mut builder,
        RAW_STATE.init(State::new()),
        raw_config,
    );
    let (raw_reader, _raw_writer) = raw.split();

    let device = builder.build();

    defmt::info!("USB HID composite device initialised (keypad + raw)");

    UsbHidDevice {
        device,
        report_writer,
        status_reader,
        raw_reader,
    }
}

/// Bring up the USB device, spawn the endpoint tasks next to this one and
/// service the bus (enumeration, suspend/resume, control requests).
///
/// Spawned on the interrupt executor. The endpoint halves are not `Send`,
/// so they are created and spawned from inside that executor.
#[embassy_executor::task]
pub async fn usb_task(usbd: peripherals::USBD) -> ! {
    let UsbHidDevice {
        mut device,
        report_writer,
        status_reader,
        raw_reader,
    } = init(usbd);

    let spawner = Spawner::for_current_executor().await;
    defmt::unwrap!(spawner.spawn(report_in_task(report_writer)));
    defmt::unwrap!(spawner.spawn(status_out_task(status_reader)));
    defmt::unwrap!(spawner.spawn(raw_out_task(raw_reader)));

    defmt::info!("USB device task started");
    device.run().await
}

/// Transmit whatever the controller armed, then report completion.
#[embassy_executor::task]
async fn report_in_task(mut writer: HidWriter<'static, UsbDriver, REPORT_IN_MAX_SIZE>) -> ! {
    loop {
        let (generation, report) = REPORT_IN.receive().await;
        if let Err(e) = writer.write(&report).await {
            defmt::warn!("{}: report write failed: {:?}", Error::Usb, e);
        }
        // Completion is reported even on error, or the loop would spin forever.
        CONTROLLER.on_report_in_complete(generation);
    }
}

/// Host LED status on the keypad interface's OUT endpoint.
#[embassy_executor::task]
async fn status_out_task(mut reader: HidReader<'static, UsbDriver, STATUS_OUT_SIZE>) -> ! {
    let mut buf = [0u8; STATUS_OUT_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(n) => CONTROLLER.on_status_out(&buf[..n]),
            Err(e) => defmt::debug!("status OUT read error: {:?}", e),
        }
    }
}

/// Raw-OUT packets. After each accepted packet the task waits on
/// [`RAW_ACK`], which holds the host off until the loop acknowledges.
#[embassy_executor::task]
async fn raw_out_task(mut reader: HidReader<'static, UsbDriver, RAW_REPORT_SIZE>) -> ! {
    let mut buf = [0u8; RAW_REPORT_SIZE];
    loop {
        RAW_ACK.reset();
        match reader.read(&mut buf).await {
            Ok(n) if n > 0 => {
                CONTROLLER.on_raw_out(true, &buf[..n]);
                RAW_ACK.wait().await;
            }
            Ok(_) => {}
            Err(ReadError::Sync(_)) => CONTROLLER.on_raw_out(false, &[]),
            Err(e) => defmt::debug!("raw OUT read error: {:?}", e),
        }
    }
}
