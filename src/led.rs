// Console LED Trigger - LED Strip Output
//
// Thin layer over any `SmartLedsWrite` strip: solid color, clear, and the blocking
// blink used for operator confirmation. Brightness is applied on write so the
// frame itself always holds full-scale colors.

use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use smart_leds::{SmartLedsWrite, RGB8};

use crate::config::NUM_PIXELS;

/// Convenience type so we speak the same language when dealing with frames.
pub type Frame = [RGB8; NUM_PIXELS];

const DARK: RGB8 = RGB8 { r: 0, g: 0, b: 0 };

pub struct LedOutput<W, D> {
    strip: W,
    delay: D,
    frame: Frame,
    brightness: u8,
    /// Frame and brightness last pushed to the strip.
    shown: Option<(Frame, u8)>,
}

impl<W, D> LedOutput<W, D>
where
    W: SmartLedsWrite<Color = RGB8>,
    W::Error: Debug,
    D: DelayNs,
{
    pub fn new(strip: W, delay: D, brightness: u8) -> Self {
        Self {
            strip,
            delay,
            frame: [DARK; NUM_PIXELS],
            brightness,
            shown: None,
        }
    }

    /// Fill every pixel with `color`. Repeating the same call writes nothing.
    pub fn set_all(&mut self, color: RGB8) {
        self.frame.fill(color);
        self.show();
    }

    pub fn clear(&mut self) {
        self.set_all(DARK);
    }

    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
        self.show();
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Color currently held in the frame, `None` when dark.
    pub fn color(&self) -> Option<RGB8> {
        let first = self.frame[0];
        (first != DARK).then_some(first)
    }

    /// Blocking lit/dark alternation, `times` times, `delay_ms` per phase.
    /// The previous frame is restored afterwards.
    pub fn blink(&mut self, color: RGB8, times: usize, delay_ms: u32) {
        let saved = self.frame;
        for _ in 0..times {
            self.write([color; NUM_PIXELS], self.brightness);
            self.delay.delay_ms(delay_ms);
            self.write([DARK; NUM_PIXELS], self.brightness);
            self.delay.delay_ms(delay_ms);
        }
        self.frame = saved;
        self.write(saved, self.brightness);
    }

    /// Show `color` at an explicit brightness `level` without touching the
    /// configured brightness; used for progress animations.
    pub fn pulse(&mut self, color: RGB8, level: u8) {
        let frame = [color; NUM_PIXELS];
        if self.shown != Some((frame, level)) {
            self.write(frame, level);
        }
    }

    fn show(&mut self) {
        if self.shown == Some((self.frame, self.brightness)) {
            return;
        }
        self.write(self.frame, self.brightness);
    }

    fn write(&mut self, frame: Frame, level: u8) {
        let pixels = smart_leds::brightness(frame.iter().copied(), level);
        if let Err(e) = self.strip.write(pixels) {
            log::warn!("LED strip write failed: {:?}", e);
            self.shown = None;
            return;
        }
        self.shown = Some((frame, level));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockDelay, MockStrip};

    const RED: RGB8 = RGB8 { r: 255, g: 0, b: 0 };

    fn output() -> (LedOutput<MockStrip, MockDelay>, MockStrip, MockDelay) {
        let strip = MockStrip::new();
        let delay = MockDelay::new();
        (LedOutput::new(strip.clone(), delay.clone(), 255), strip, delay)
    }

    #[test]
    fn set_all_fills_every_pixel() {
        let (mut leds, strip, _) = output();
        leds.set_all(RED);
        let frame = strip.last_frame().unwrap();
        assert_eq!(frame.len(), NUM_PIXELS);
        assert!(strip.shows(RED));
        assert_eq!(leds.color(), Some(RED));
    }

    #[test]
    fn repeated_set_all_is_a_no_op() {
        let (mut leds, strip, _) = output();
        leds.set_all(RED);
        leds.set_all(RED);
        assert_eq!(strip.write_count(), 1);
    }

    #[test]
    fn brightness_scales_output() {
        let (mut leds, strip, _) = output();
        leds.set_brightness(0);
        leds.set_all(RED);
        assert!(strip.is_dark());
        assert_eq!(leds.color(), Some(RED));
    }

    #[test]
    fn blink_alternates_and_restores() {
        let (mut leds, strip, delay) = output();
        leds.clear();
        strip.clear_log();

        leds.blink(RED, 2, 150);

        let frames = strip.frames();
        assert_eq!(frames.len(), 5);
        assert!(frames[0].iter().all(|&p| p == RED));
        assert!(frames[1].iter().all(|&p| p == DARK));
        assert!(frames[2].iter().all(|&p| p == RED));
        assert!(frames[4].iter().all(|&p| p == DARK));
        assert_eq!(delay.total_ms(), 600);
        assert_eq!(leds.color(), None);
    }

    #[test]
    fn blink_same_color_still_blinks() {
        let (mut leds, strip, _) = output();
        leds.set_all(RED);
        strip.clear_log();
        leds.blink(RED, 1, 100);
        assert_eq!(strip.write_count(), 3);
        assert!(strip.shows(RED));
    }
}
