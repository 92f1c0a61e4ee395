//! WS2812 indicator chain driven from SPIM3.
//!
//! Only MOSI is wired to the LED data line. At 2 MHz each SPI byte encodes
//! two WS2812 bits, which `ws2812-spi` takes care of.

use embassy_nrf::peripherals::SPI3;
use embassy_nrf::spim::{self, Spim};
use embassy_nrf::{bind_interrupts, gpio::AnyPin};
use ws2812_spi::Ws2812;

bind_interrupts!(struct Irqs {
    SPIM3 => spim::InterruptHandler<SPI3>;
});

pub type IndicatorLeds = Ws2812<Spim<'static, SPI3>>;

/// Set up SPIM3 as a transmit-only bus and wrap it in the WS2812 driver.
pub fn init(spi: SPI3, sck: AnyPin, data: AnyPin) -> IndicatorLeds {
    let mut config = spim::Config::default();
    config.frequency = spim::Frequency::M2;
    config.mode = spim::MODE_0;
    let spi = Spim::new_txonly(spi, Irqs, sck, data, config);
    Ws2812::new(spi)
}
