// Console LED Trigger - WS2812 Strip over RMT
//
// Each color bit becomes one high/low pulse pair; bytes go out G, R, B,
// most significant bit first. The transmit blocks until the frame is out.

use std::time::Duration;

use esp_idf_hal::gpio::OutputPin;
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::rmt::config::TransmitConfig;
use esp_idf_hal::rmt::{PinState, Pulse, RmtChannel, TxRmtDriver, VariableLengthSignal};
use esp_idf_sys::EspError;
use smart_leds::{SmartLedsWrite, RGB8};

// Datasheet timings (ns)
const T0H_NS: u64 = 350;
const T0L_NS: u64 = 800;
const T1H_NS: u64 = 700;
const T1L_NS: u64 = 600;

pub struct Ws2812<'d> {
    tx: TxRmtDriver<'d>,
    zero: [Pulse; 2],
    one: [Pulse; 2],
}

impl<'d> Ws2812<'d> {
    pub fn new<C: RmtChannel>(
        channel: impl Peripheral<P = C> + 'd,
        pin: impl Peripheral<P = impl OutputPin> + 'd,
    ) -> anyhow::Result<Self> {
        let config = TransmitConfig::new().clock_divider(1);
        let tx = TxRmtDriver::new(channel, pin, &config)?;

        let hz = tx.counter_clock()?;
        let pulse = |state, ns| Pulse::new_with_duration(hz, state, &Duration::from_nanos(ns));
        let zero = [pulse(PinState::High, T0H_NS)?, pulse(PinState::Low, T0L_NS)?];
        let one = [pulse(PinState::High, T1H_NS)?, pulse(PinState::Low, T1L_NS)?];

        Ok(Self { tx, zero, one })
    }
}

impl SmartLedsWrite for Ws2812<'_> {
    type Error = EspError;
    type Color = RGB8;

    fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        let mut signal = VariableLengthSignal::new();
        for pixel in iterator {
            let rgb: RGB8 = pixel.into();
            for byte in [rgb.g, rgb.r, rgb.b] {
                for bit in (0..8).rev() {
                    let pair = if byte & (1 << bit) != 0 { &self.one } else { &self.zero };
                    signal.push(pair)?;
                }
            }
        }
        self.tx.start_blocking(&signal)
    }
}
