//! End-to-end tests of the keypad tick: pins in, reports and LED frames out.

use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use embedded_hal::delay::DelayNs;
use macropad::config::{NVM_SIZE, STATUS_COLOR_ACTIVE, STATUS_COLOR_INACTIVE, STATUS_LED_CAPS_LOCK};
use macropad::hid::keyboard::KEY_A;
use macropad::hid::usage;
use macropad::{
    Action, ConfigStore, EndpointController, Handshake, HostLink, InputPins, Intensity, KeyId,
    Keymap, Keypad, Line, MemoryNvm, StorageError, UsbHardware,
};
use smart_leds::{SmartLedsWrite, RGB8};

// ═══════════════════════════════════════════════════════════════════════════
// Test doubles
// ═══════════════════════════════════════════════════════════════════════════

/// Button levels plus a one-shot encoder detent.
#[derive(Default)]
struct Pins {
    held: [bool; 4],
    /// Reads of line A left before the detent is passed.
    encoder_a_reads: u32,
    clockwise: bool,
}

impl Pins {
    fn set(&mut self, line: Line, pressed: bool) {
        let slot = match line {
            Line::Key1 => 0,
            Line::Key2 => 1,
            Line::Key3 => 2,
            Line::EncoderSwitch => 3,
            Line::EncoderA | Line::EncoderB => unreachable!("use turn()"),
        };
        self.held[slot] = pressed;
    }

    /// Start one detent; line A stays asserted for a few reads.
    fn turn(&mut self, clockwise: bool) {
        self.encoder_a_reads = 4;
        self.clockwise = clockwise;
    }
}

impl InputPins for Pins {
    fn is_active(&mut self, line: Line) -> bool {
        match line {
            Line::Key1 => self.held[0],
            Line::Key2 => self.held[1],
            Line::Key3 => self.held[2],
            Line::EncoderSwitch => self.held[3],
            Line::EncoderA => {
                let active = self.encoder_a_reads > 0;
                self.encoder_a_reads = self.encoder_a_reads.saturating_sub(1);
                active
            }
            Line::EncoderB => self.clockwise,
        }
    }
}

struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

#[derive(Default)]
struct Leds {
    frames: Vec<Vec<RGB8>>,
}

impl SmartLedsWrite for Leds {
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

/// Host side as seen by the loop; reports complete instantly.
#[derive(Default)]
struct Host {
    reports: RefCell<Vec<Vec<u8>>>,
    status: Cell<u8>,
    raw_pending: Cell<usize>,
}

impl HostLink for Host {
    fn send_report(&self, report: &[u8]) {
        self.reports.borrow_mut().push(report.to_vec());
    }

    fn status_led(&self) -> u8 {
        self.status.get()
    }

    fn raw_available(&self) -> usize {
        self.raw_pending.get()
    }

    fn raw_acknowledge(&self) {
        self.raw_pending.set(0);
    }
}

const RED: RGB8 = RGB8::new(200, 0, 0);
const GREEN: RGB8 = RGB8::new(0, 200, 0);
const BLUE: RGB8 = RGB8::new(0, 0, 200);

fn keymap() -> Keymap {
    Keymap::new([
        Action::Keyboard { modifier: 0, code: KEY_A },
        Action::Keyboard { modifier: 0x02, code: 0x05 },
        Action::Keyboard { modifier: 0, code: 0x06 },
        Action::Consumer { code: usage::MUTE },
        Action::Consumer { code: usage::VOLUME_UP },
        Action::Consumer { code: usage::VOLUME_DOWN },
    ])
}

fn keypad() -> Keypad<Pins, NoDelay> {
    Keypad::new(keymap(), [RED, GREEN, BLUE], Pins::default(), NoDelay)
}

// ═══════════════════════════════════════════════════════════════════════════
// Reports
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn key_press_and_release_send_keyboard_reports() {
    let mut keypad = keypad();
    let host = Host::default();
    let mut leds = Leds::default();

    keypad.pins_mut().set(Line::Key1, true);
    keypad.tick(&host, &mut leds);
    keypad.pins_mut().set(Line::Key1, false);
    keypad.tick(&host, &mut leds);

    assert_eq!(
        *host.reports.borrow(),
        [
            vec![1, 0, 0, KEY_A, 0, 0, 0, 0, 0],
            vec![1, 0, 0, 0, 0, 0, 0, 0, 0],
        ]
    );
}

#[test]
fn encoder_tick_sends_one_volume_up() {
    let mut keypad = keypad();
    let host = Host::default();
    let mut leds = Leds::default();

    keypad.pins_mut().turn(true);
    keypad.tick(&host, &mut leds);
    for _ in 0..20 {
        keypad.tick(&host, &mut leds);
    }

    let reports = host.reports.borrow();
    let volume_up: Vec<_> = reports
        .iter()
        .filter(|r| r.as_slice() == [2, 0xE9, 0])
        .collect();
    assert_eq!(volume_up.len(), 1);
    // The only other report clears the usage again.
    assert_eq!(*reports, [vec![2, 0xE9, 0], vec![2, 0, 0]]);
}

#[test]
fn encoder_counter_clockwise_uses_key_five() {
    let mut keypad = keypad();
    let host = Host::default();
    keypad.pins_mut().turn(false);
    keypad.tick(&host, &mut Leds::default());
    assert_eq!(host.reports.borrow()[0], [2, 0xEA, 0]);
}

#[test]
fn steady_inputs_produce_nothing_more() {
    let mut keypad = keypad();
    let host = Host::default();
    let mut leds = Leds::default();

    keypad.pins_mut().set(Line::Key2, true);
    keypad.pins_mut().set(Line::EncoderSwitch, true);
    for _ in 0..50 {
        keypad.tick(&host, &mut leds);
    }
    assert_eq!(host.reports.borrow().len(), 2);
    assert!(keypad.keymap().get(KeyId::Key2).is_held());
    assert!(keypad.keymap().get(KeyId::EncoderSwitch).is_held());
}

// ═══════════════════════════════════════════════════════════════════════════
// Indicators
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn press_flashes_then_decays_to_off() {
    let mut keypad = keypad();
    let host = Host::default();
    let mut leds = Leds::default();

    keypad.pins_mut().set(Line::Key3, true);
    keypad.tick(&host, &mut leds);
    assert_eq!(leds.frames[0][2], BLUE);

    for _ in 0..100 {
        keypad.tick(&host, &mut leds);
    }
    assert_eq!(keypad.indicators().intensity(2), Intensity::Off);
    assert_eq!(leds.frames.last().map(|f| f[2]), Some(RGB8::default()));

    // Levels shown never rise while the key is held.
    let blues: Vec<u8> = leds.frames.iter().map(|f| f[2].b).collect();
    assert!(blues.windows(2).all(|w| w[1] <= w[0]));
}

#[test]
fn repress_restores_full_intensity() {
    let mut keypad = keypad();
    let host = Host::default();
    let mut leds = Leds::default();

    keypad.pins_mut().set(Line::Key2, true);
    keypad.tick(&host, &mut leds);
    keypad.pins_mut().set(Line::Key2, false);
    for _ in 0..10 {
        keypad.tick(&host, &mut leds);
    }
    keypad.pins_mut().set(Line::Key2, true);
    keypad.tick(&host, &mut leds);
    assert_eq!(leds.frames.last().map(|f| f[1]), Some(GREEN));
}

#[test]
fn caps_lock_drives_indicator_zero() {
    let mut keypad = keypad();
    let host = Host::default();
    let mut leds = Leds::default();

    keypad.tick(&host, &mut leds);
    assert_eq!(leds.frames[0][0], STATUS_COLOR_INACTIVE);

    host.status.set(STATUS_LED_CAPS_LOCK);
    keypad.pins_mut().set(Line::Key1, true);
    keypad.tick(&host, &mut leds);
    assert_eq!(leds.frames[1][0], STATUS_COLOR_ACTIVE);
}

// ═══════════════════════════════════════════════════════════════════════════
// Raw channel
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn pending_raw_packet_is_acknowledged_each_tick() {
    let mut keypad = keypad();
    let host = Host::default();
    host.raw_pending.set(32);
    keypad.tick(&host, &mut Leds::default());
    assert_eq!(host.raw_available(), 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn keypad_loads_bindings_and_colors_from_nvm() {
    let mut cells = [0u8; NVM_SIZE];
    cells[0..3].copy_from_slice(&[0x00, 0, KEY_A]);
    cells[12..15].copy_from_slice(&[0x00, 1, 0xE9]);
    cells[18..21].copy_from_slice(&[10, 20, 30]);
    let mut store = ConfigStore::new(MemoryNvm::new(cells));

    let keypad = Keypad::load(&mut store, Pins::default(), NoDelay);
    assert_eq!(
        keypad.keymap().action(KeyId::Key1),
        Action::Keyboard { modifier: 0, code: KEY_A }
    );
    assert_eq!(
        keypad.keymap().action(KeyId::EncoderClockwise),
        Action::Consumer { code: 0xE9 }
    );
    assert_eq!(keypad.indicators().state(0).map(|s| s.color), Some(RGB8::new(10, 20, 30)));
}

#[test]
fn nvm_write_past_end_is_rejected() {
    let mut store = ConfigStore::new(MemoryNvm::new([0x11; NVM_SIZE]));
    assert_eq!(store.write(128, 0xAB), Err(StorageError::OutOfRange(128)));
    assert_eq!(store.read(128), 0);
    assert_eq!(store.backend().program_count(), 0);
    assert_eq!(store.write(0, 0xAB), Ok(()));
    assert_eq!(store.read(0), 0xAB);
}

// ═══════════════════════════════════════════════════════════════════════════
// Full stack: loop + endpoint controller + simulated interrupt
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Clone, Default)]
struct Wire(Arc<Mutex<(Vec<(u32, Vec<u8>)>, Vec<Handshake>)>>);

impl UsbHardware for Wire {
    fn arm_report_in(&mut self, generation: u32, report: &[u8]) {
        self.0.lock().unwrap().0.push((generation, report.to_vec()));
    }

    fn respond_raw_out(&mut self, handshake: Handshake) {
        self.0.lock().unwrap().1.push(handshake);
    }
}

impl Wire {
    fn armed(&self) -> Vec<Vec<u8>> {
        self.0.lock().unwrap().0.iter().map(|(_, report)| report.clone()).collect()
    }

    /// Generation of the `n`th armed report.
    fn generation(&self, n: usize) -> u32 {
        self.0.lock().unwrap().0[n].0
    }

    fn handshakes(&self) -> Vec<Handshake> {
        self.0.lock().unwrap().1.clone()
    }
}

#[test]
fn loop_and_interrupt_hand_off_reports() {
    let wire = Wire::default();
    let controller = EndpointController::new(wire.clone());
    let done = AtomicBool::new(false);

    std::thread::scope(|s| {
        // Transfer-complete interrupt: confirm every armed report.
        s.spawn(|| {
            let mut confirmed = 0;
            while !done.load(Ordering::SeqCst) {
                if wire.armed().len() > confirmed {
                    controller.on_report_in_complete(wire.generation(confirmed));
                    confirmed += 1;
                }
                std::thread::yield_now();
            }
        });

        let mut keypad = keypad();
        let mut leds = Leds::default();
        keypad.pins_mut().set(Line::Key1, true);
        keypad.tick(&controller, &mut leds);
        keypad.pins_mut().set(Line::Key1, false);
        keypad.pins_mut().turn(true);
        keypad.tick(&controller, &mut leds);
        done.store(true, Ordering::SeqCst);
    });

    assert_eq!(
        wire.armed(),
        [
            vec![1, 0, 0, KEY_A, 0, 0, 0, 0, 0],
            vec![1, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![2, 0xE9, 0],
            vec![2, 0, 0],
        ]
    );
}

#[test]
fn release_after_bus_reset_survives_late_completion() {
    let wire = Wire::default();
    let controller = EndpointController::new(wire.clone());
    let mut keypad = keypad();
    let mut leds = Leds::default();

    keypad.pins_mut().set(Line::Key1, true);
    keypad.tick(&controller, &mut leds);
    controller.on_bus_reset();

    keypad.pins_mut().set(Line::Key1, false);
    keypad.tick(&controller, &mut leds);
    assert_eq!(
        wire.armed(),
        [vec![1, 0, 0, KEY_A, 0, 0, 0, 0, 0], vec![1, 0, 0, 0, 0, 0, 0, 0, 0]]
    );

    // The press finishes writing only now; the release is still in flight.
    controller.on_report_in_complete(wire.generation(0));
    assert!(controller.is_busy());
    controller.on_report_in_complete(wire.generation(1));
    assert!(!controller.is_busy());
}

#[test]
fn raw_packet_flow_control_through_the_loop() {
    let wire = Wire::default();
    let controller = EndpointController::new(wire.clone());
    let mut keypad = keypad();
    let mut leds = Leds::default();

    controller.on_raw_out(true, &[0x42; 12]);
    assert_eq!(controller.available(), 12);
    assert_eq!(wire.handshakes(), [Handshake::Nak]);

    // Host retries while NAKed; nothing changes.
    controller.on_raw_out(true, &[0x43; 5]);
    controller.on_raw_out(false, &[0x44; 5]);
    assert_eq!(controller.available(), 12);

    keypad.tick(&controller, &mut leds);
    assert_eq!(controller.available(), 0);
    assert_eq!(wire.handshakes(), [Handshake::Nak, Handshake::Ack]);

    controller.on_raw_out(true, &[0x45; 3]);
    assert_eq!(controller.available(), 3);
}

#[test]
fn status_report_reaches_indicator_zero() {
    let controller = EndpointController::new(Wire::default());
    let mut keypad = keypad();
    let mut leds = Leds::default();

    controller.on_status_out(&[1, STATUS_LED_CAPS_LOCK]);
    keypad.tick(&controller, &mut leds);
    assert_eq!(leds.frames[0][0], STATUS_COLOR_ACTIVE);

    controller.on_status_out(&[1, 0]);
    keypad.tick(&controller, &mut leds);
    assert_eq!(leds.frames[1][0], STATUS_COLOR_INACTIVE);
}
