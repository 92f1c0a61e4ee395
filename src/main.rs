//! macropad firmware entry point (nRF52840).
//!
//! Thread mode runs the cooperative keypad loop. The USB stack runs on an
//! interrupt executor at a lower hardware priority than USBD but above
//! thread mode, so the loop's blocking Report-IN send is always drained.

#![no_std]
#![no_main]

use cortex_m::peripheral::SCB;
use cortex_m_rt::entry;
use defmt::{error, info, unwrap};
use embassy_executor::InterruptExecutor;
use embassy_nrf::config::{Config, HfclkSource};
use embassy_nrf::gpio::Pin;
use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use embassy_nrf::nvmc::Nvmc;
use embassy_nrf::wdt::{self, Watchdog};
use embassy_time::Delay;
use embedded_hal::delay::DelayNs;
use smart_leds::SmartLedsWrite;
use {defmt_rtt as _, panic_probe as _};

use macropad::board::leds::{self, IndicatorLeds};
use macropad::board::nvm::FlashNvm;
use macropad::board::pins::KeypadPins;
use macropad::board::usb::{self, CONTROLLER};
use macropad::config::{
    BOOTLOADER_COLOR, DFU_MAGIC, INDICATOR_COUNT, WATCHDOG_TICK_HZ, WATCHDOG_TIMEOUT_MS,
};
use macropad::{boot_mode, BootMode, ConfigStore, Error, InputPins, Keypad, Line};

/// POWER.GPREGRET, read by the bootloader after reset.
const GPREGRET: *mut u32 = 0x4000_051C as *mut u32;

static EXECUTOR_USB: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn EGU1_SWI1() {
    EXECUTOR_USB.on_interrupt()
}

#[entry]
fn main() -> ! {
    info!("macropad starting");

    let mut config = Config::default();
    config.hfclk_source = HfclkSource::ExternalXtal;
    let p = embassy_nrf::init(config);

    let mut pins = KeypadPins::new(
        p.P0_11.degrade(),
        p.P0_12.degrade(),
        p.P0_24.degrade(),
        p.P0_25.degrade(),
        p.P0_03.degrade(),
        p.P0_04.degrade(),
    );
    let mut indicator_leds = leds::init(p.SPI3, p.P0_27.degrade(), p.P0_26.degrade());
    let mut delay = Delay;

    // Let the pull-ups settle before looking at key 1.
    delay.delay_ms(1);
    if boot_mode(pins.is_active(Line::Key1)) == BootMode::Bootloader {
        enter_bootloader(&mut indicator_leds);
    }

    interrupt::EGU1_SWI1.set_priority(Priority::P6);
    let spawner = EXECUTOR_USB.start(interrupt::EGU1_SWI1);
    unwrap!(spawner.spawn(usb::usb_task(p.USBD)));

    let mut store = ConfigStore::new(FlashNvm::load(Nvmc::new(p.NVMC)));
    let mut keypad = Keypad::load(&mut store, pins, delay);

    let mut wdt_config = wdt::Config::default();
    wdt_config.timeout_ticks = WATCHDOG_TICK_HZ * WATCHDOG_TIMEOUT_MS / 1000;
    wdt_config.run_during_sleep = true;
    wdt_config.run_during_debug_halt = false;
    let (_wdt, [mut watchdog]) = match Watchdog::try_new(p.WDT, wdt_config) {
        Ok(x) => x,
        Err(_) => {
            // Left running by a previous boot with another config: it will
            // reset us shortly.
            error!("{}", Error::Watchdog);
            loop {
                cortex_m::asm::nop();
            }
        }
    };

    info!("entering main loop");
    loop {
        keypad.tick(&CONTROLLER, &mut indicator_leds);
        watchdog.pet();
    }
}

/// Light every indicator white and reset into the DFU bootloader.
fn enter_bootloader(indicator_leds: &mut IndicatorLeds) -> ! {
    info!("key 1 held at boot, entering bootloader");
    if indicator_leds
        .write([BOOTLOADER_COLOR; INDICATOR_COUNT].into_iter())
        .is_err()
    {
        error!("{}", Error::Led);
    }
    // SAFETY: GPREGRET is a plain retained register with no side effects
    // besides being read by the bootloader.
    unsafe { GPREGRET.write_volatile(DFU_MAGIC) };
    SCB::sys_reset()
}
