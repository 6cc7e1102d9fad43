// Console LED Trigger - Power State Machine
//
// Owns the device state, the persisted preferences and the strip. Every input
// to the device (smoothed current, debounced button events, encoder detents and
// remote commands) is funnelled through here, so this is the single writer of
// `DeviceState`.
//
//   Running ──long press──▶ WaitingForOff ──off──▶ WaitingForOn ──on──▶ WaitingForConfirm
//      ▲                                                                     │
//      └────────────────────────────── press ────────────────────────────────┘

use core::fmt::Debug;
use core::f32::consts::PI;

use embedded_hal::delay::DelayNs;
use smart_leds::{SmartLedsWrite, RGB8};

use crate::config::*;
use crate::events::{InputEvent, InputKind, InputSource};
use crate::led::LedOutput;
use crate::remote::{Command, DeviceSnapshot};
use crate::state::{ColorChoice, DeviceState, PowerState, UiMode};
use crate::store::{DurableStore, Store, StoreError};
use crate::timing::elapsed;

/// Result of applying a remote command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// Valid command that does not apply in the current state.
    Ignored,
    /// The caller must restart the device.
    Reboot,
}

pub struct Controller<S, W, D> {
    state: DeviceState,
    store: Store<S>,
    leds: LedOutput<W, D>,
    tuning: Tuning,
}

impl<S, W, D> Controller<S, W, D>
where
    S: DurableStore,
    W: SmartLedsWrite<Color = RGB8>,
    W::Error: Debug,
    D: DelayNs,
{
    pub fn new(store: Store<S>, mut leds: LedOutput<W, D>, tuning: Tuning) -> Self {
        let state = DeviceState::new(
            store.color(),
            store.brightness(),
            store.device_name().to_owned(),
        );
        leds.set_brightness(state.brightness);
        leds.clear();
        Self {
            state,
            store,
            leds,
            tuning,
        }
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store<S> {
        &mut self.store
    }

    pub fn leds(&self) -> &LedOutput<W, D> {
        &self.leds
    }

    pub fn threshold_on(&self) -> f32 {
        self.store.threshold()
    }

    pub fn threshold_off(&self) -> f32 {
        self.store.threshold() - self.tuning.threshold_margin
    }

    pub fn set_boot_time(&mut self, unix_secs: u64) {
        if self.state.boot_time != unix_secs {
            self.state.boot_time = unix_secs;
            self.state.mark_dirty();
        }
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot::capture(
            &self.state,
            self.store.threshold(),
            self.tuning.threshold_margin,
        )
    }

    /// Snapshot if anything published changed since the last call.
    pub fn take_snapshot(&mut self) -> Option<DeviceSnapshot> {
        self.state.take_dirty().then(|| self.snapshot())
    }

    // -----------------------------------------------------------------------
    // Current
    // -----------------------------------------------------------------------

    /// Feed one smoothed sample. Returns the new power state when it changed.
    pub fn on_current(&mut self, now: u32, smoothed: f32) -> Option<PowerState> {
        self.state.smoothed = Some(smoothed);
        let off_level = self.threshold_off();

        let next = match self.state.power {
            PowerState::Running => {
                self.run_hysteresis(now, smoothed);
                return None;
            }
            PowerState::WaitingForOffPress if smoothed < off_level => {
                log::info!("Power OFF detected ({:.3} A), switch the host back on", smoothed);
                self.state.off_detected_at = Some(now);
                PowerState::WaitingForOnPress
            }
            PowerState::WaitingForOnPress if smoothed > off_level => {
                log::info!("Power ON detected ({:.3} A), press to confirm threshold", smoothed);
                PowerState::WaitingForConfirmPress
            }
            _ => return None,
        };

        self.set_power(next);
        Some(next)
    }

    fn run_hysteresis(&mut self, now: u32, smoothed: f32) {
        if !self.state.leds_on && smoothed > self.threshold_on() {
            log::info!("Host ON ({:.3} A)", smoothed);
            self.state.leds_on = true;
            self.state.led_on_since = Some(now);
        } else if self.state.leds_on && smoothed < self.threshold_off() {
            log::info!("Host OFF ({:.3} A)", smoothed);
            self.state.leds_on = false;
            self.state.led_on_since = None;
        } else {
            return;
        }
        self.state.mark_dirty();
        self.refresh();
    }

    /// Store the averaged OFF-level current captured after the host went dark.
    pub fn record_off_baseline(&mut self, amps: f32) {
        log::info!("OFF baseline {:.4} A", amps);
        self.state.off_baseline = Some(amps);
    }

    /// One frame of the baseline-capture animation.
    pub fn show_progress(&mut self, step: usize, total: usize) {
        let fraction = (step + 1) as f32 / total.max(1) as f32;
        let level = 10.0 + 118.0 * (fraction * PI).sin();
        self.leds.pulse(CALIBRATION_COLOR, level.clamp(0.0, 255.0) as u8);
    }

    /// Dark strip at the end of the baseline capture.
    pub fn end_progress(&mut self) {
        self.leds.pulse(CALIBRATION_COLOR, 0);
    }

    // -----------------------------------------------------------------------
    // Buttons & encoder
    // -----------------------------------------------------------------------

    pub fn on_input(&mut self, source: InputSource, event: InputEvent) {
        use InputKind::*;

        match (self.state.power, source) {
            (PowerState::WaitingForConfirmPress, InputSource::CalibrateButton)
                if event.is_press() =>
            {
                self.confirm_calibration(event.at_ms);
            }
            (PowerState::Running, InputSource::CalibrateButton) => match (self.state.ui, event.kind) {
                (UiMode::Normal, LongPressStart) => self.start_calibration(event.at_ms),
                (UiMode::Normal, DoubleClick) => {
                    let index = self.state.color.palette_index().unwrap_or(0);
                    self.enter_color_select(index);
                }
                (UiMode::ColorSelect { index }, ShortClick) => {
                    self.enter_color_select((index + 1) % PALETTE.len());
                }
                (UiMode::ColorSelect { index }, DoubleClick) => self.commit_color(index),
                _ => {}
            },
            (PowerState::Running, InputSource::EncoderSwitch) => match (self.state.ui, event.kind) {
                (UiMode::ColorSelect { index }, ShortClick) => self.commit_color(index),
                (UiMode::Normal, LongPressStart) => {
                    log::info!("Brightness mode");
                    self.state.ui = UiMode::Brightness;
                    self.refresh();
                }
                (UiMode::Brightness, ShortClick | LongPressStart) => self.commit_brightness(),
                _ => {}
            },
            _ => {}
        }
    }

    /// One encoder detent, positive clockwise.
    pub fn on_rotate(&mut self, delta: i8) {
        if self.state.power.is_calibrating() || delta == 0 {
            return;
        }
        match self.state.ui {
            UiMode::Normal => {
                let start = self.state.color.palette_index().unwrap_or(0);
                self.enter_color_select(step_index(start, delta));
            }
            UiMode::ColorSelect { index } => self.enter_color_select(step_index(index, delta)),
            UiMode::Brightness => {
                let step = i16::from(BRIGHTNESS_STEP) * i16::from(delta);
                let next = (i16::from(self.state.brightness) + step).clamp(0, 255) as u8;
                if next != self.state.brightness {
                    self.state.brightness = next;
                    self.leds.set_brightness(next);
                    self.state.mark_dirty();
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Remote commands
    // -----------------------------------------------------------------------

    pub fn apply(&mut self, command: Command, now: u32) -> Result<Outcome, StoreError> {
        match command {
            Command::Set { color, brightness } => {
                self.cancel_ui();
                let result = self.persist_set(color, brightness);
                // Show and publish whatever reached flash, even on a partial failure.
                self.state.color = self.store.color();
                self.state.brightness = self.store.brightness();
                self.leds.set_brightness(self.state.brightness);
                log::info!("Remote set: color={:?} brightness={}", self.state.color, self.state.brightness);
                self.state.mark_dirty();
                self.refresh();
                result.map(|()| Outcome::Applied)
            }
            Command::Identify => {
                if self.state.power.is_calibrating() {
                    return Ok(Outcome::Ignored);
                }
                self.leds.blink(IDENTIFY_COLOR, IDENTIFY_BLINKS, IDENTIFY_BLINK_MS);
                Ok(Outcome::Applied)
            }
            Command::Calibrate => {
                if self.state.power.is_calibrating() {
                    return Ok(Outcome::Ignored);
                }
                self.cancel_ui();
                self.start_calibration(now);
                Ok(Outcome::Applied)
            }
            Command::Rename(name) => {
                self.store.save_device_name(&name)?;
                log::info!("Renamed to {}", name);
                self.state.device_name = name;
                self.state.mark_dirty();
                Ok(Outcome::Applied)
            }
            Command::Reboot => Ok(Outcome::Reboot),
        }
    }

    fn persist_set(&mut self, color: Option<ColorChoice>, brightness: Option<u8>) -> Result<(), StoreError> {
        if let Some(color) = color {
            self.store.save_color(color)?;
        }
        if let Some(brightness) = brightness {
            self.store.save_brightness(brightness)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    fn set_power(&mut self, next: PowerState) {
        if self.state.power != next {
            self.state.power = next;
            self.state.mark_dirty();
        }
    }

    fn start_calibration(&mut self, now: u32) {
        log::info!("Calibration started, switch the host off");
        self.state.ui = UiMode::Normal;
        self.state.calibration_started_at = Some(now);
        self.state.off_detected_at = None;
        self.state.off_baseline = None;
        if self.state.leds_on {
            self.state.leds_on = false;
            self.state.led_on_since = None;
        }
        self.set_power(PowerState::WaitingForOffPress);
        self.leds.clear();
        self.leds.blink(CALIBRATION_COLOR, 3, CONFIRM_BLINK_MS);
    }

    fn confirm_calibration(&mut self, now: u32) {
        if let Some(started) = self.state.calibration_started_at {
            log::info!("Calibration confirmed after {} ms", elapsed(started, now));
        }
        let candidate = self.state.smoothed.unwrap_or(0.0);
        let saved = if candidate <= 0.0 {
            log::warn!("Refusing non-positive threshold {:.4} A", candidate);
            false
        } else {
            match self.store.save_threshold(candidate) {
                Ok(()) => {
                    log::info!(
                        "Saved ON threshold {:.3} A (OFF baseline {:?})",
                        candidate,
                        self.state.off_baseline
                    );
                    true
                }
                Err(e) => {
                    log::error!("Saving threshold failed: {}", e);
                    false
                }
            }
        };

        self.state.calibration_started_at = None;
        self.state.off_detected_at = None;
        self.set_power(PowerState::Running);
        self.leds.clear();

        let feedback = if saved { SUCCESS_COLOR } else { FAILURE_COLOR };
        self.leds.blink(feedback, CONFIRM_BLINKS, CONFIRM_BLINK_MS);
    }

    fn enter_color_select(&mut self, index: usize) {
        let Some(color) = ColorChoice::palette(index) else {
            return;
        };
        log::debug!("Previewing palette index {}", index);
        self.state.ui = UiMode::ColorSelect { index };
        self.state.color = color;
        self.state.mark_dirty();
        self.refresh();
    }

    fn commit_color(&mut self, index: usize) {
        self.state.ui = UiMode::Normal;
        let Some(color) = ColorChoice::palette(index) else {
            return;
        };
        match self.store.save_color(color) {
            Ok(()) => {
                log::info!("Color set to palette index {}", index);
                self.state.color = color;
                self.leds.blink(color.rgb(), CONFIRM_BLINKS, CONFIRM_BLINK_MS);
            }
            Err(e) => {
                log::error!("Saving color failed: {}", e);
                self.state.color = self.store.color();
                self.leds.blink(FAILURE_COLOR, CONFIRM_BLINKS, CONFIRM_BLINK_MS);
            }
        }
        self.state.mark_dirty();
        self.refresh();
    }

    fn commit_brightness(&mut self) {
        self.state.ui = UiMode::Normal;
        if let Err(e) = self.store.save_brightness(self.state.brightness) {
            log::error!("Saving brightness failed: {}", e);
            self.state.brightness = self.store.brightness();
            self.leds.set_brightness(self.state.brightness);
            self.leds.blink(FAILURE_COLOR, CONFIRM_BLINKS, CONFIRM_BLINK_MS);
        } else {
            log::info!("Brightness set to {}", self.state.brightness);
        }
        self.state.mark_dirty();
        self.refresh();
    }

    /// Drop an uncommitted preview and return to the saved preference.
    fn cancel_ui(&mut self) {
        if self.state.ui == UiMode::Normal {
            return;
        }
        self.state.ui = UiMode::Normal;
        self.state.color = self.store.color();
        self.state.brightness = self.store.brightness();
        self.leds.set_brightness(self.state.brightness);
        self.state.mark_dirty();
        self.refresh();
    }

    /// Render the strip for the current state outside of calibration.
    fn refresh(&mut self) {
        if self.state.power.is_calibrating() {
            return;
        }
        match self.state.ui {
            UiMode::Normal if !self.state.leds_on => self.leds.clear(),
            _ => self.leds.set_all(self.state.color.rgb()),
        }
    }
}

fn step_index(index: usize, delta: i8) -> usize {
    let len = PALETTE.len() as i32;
    (index as i32 + i32::from(delta)).rem_euclid(len) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MemoryStore, MockDelay, MockStrip};

    type TestController = Controller<MemoryStore, MockStrip, MockDelay>;

    /// Full brightness so frames carry the exact palette colors.
    fn controller_with(mut mem: MemoryStore) -> (TestController, MockStrip) {
        mem.poke(8, &[255, 0]);
        let strip = MockStrip::new();
        let store = Store::open(mem, DEFAULT_THRESHOLD_ON, "Console-TEST".into());
        let leds = LedOutput::new(strip.clone(), MockDelay::new(), DEFAULT_BRIGHTNESS);
        (Controller::new(store, leds, Tuning::default()), strip)
    }

    fn controller() -> (TestController, MockStrip) {
        controller_with(MemoryStore::erased())
    }

    fn ev(kind: InputKind, at_ms: u32) -> InputEvent {
        InputEvent::new(kind, at_ms)
    }

    fn calibrate(c: &mut TestController, kind: InputKind, at_ms: u32) {
        c.on_input(InputSource::CalibrateButton, ev(kind, at_ms));
    }

    #[test]
    fn hysteresis_turns_on_and_off() {
        let (mut c, strip) = controller();
        c.on_current(0, 0.05);
        assert!(c.state().leds_on);
        assert!(strip.shows(PALETTE[0]));
        assert_eq!(c.state().led_on_since, Some(0));

        c.on_current(10, 0.03);
        assert!(!c.state().leds_on);
        assert!(strip.is_dark());
    }

    #[test]
    fn values_inside_band_never_toggle() {
        let (mut c, _) = controller();
        let (on, off) = (c.threshold_on(), c.threshold_off());
        let band = [off, (on + off) / 2.0, on, off + 0.001, on - 0.001];

        for (t, &x) in band.iter().cycle().take(50).enumerate() {
            c.on_current(t as u32, x);
            assert!(!c.state().leds_on, "turned on at {}", x);
        }

        c.on_current(100, on + 0.001);
        assert!(c.state().leds_on);
        for (t, &x) in band.iter().cycle().take(50).enumerate() {
            c.on_current(200 + t as u32, x);
            assert!(c.state().leds_on, "turned off at {}", x);
        }
    }

    #[test]
    fn calibration_requires_off_then_on_then_press() {
        let (mut c, strip) = controller();
        c.on_current(0, 0.2);
        assert!(c.state().leds_on);

        calibrate(&mut c, InputKind::LongPressStart, 3000);
        assert_eq!(c.state().power, PowerState::WaitingForOffPress);
        assert_eq!(c.state().calibration_started_at, Some(3000));
        assert!(!c.state().leds_on);
        assert!(strip.is_dark());

        // Press is ignored until the host has been seen off and back on.
        calibrate(&mut c, InputKind::Press, 3100);
        assert_eq!(c.state().power, PowerState::WaitingForOffPress);

        // Still above the OFF level.
        assert_eq!(c.on_current(3200, 0.2), None);
        assert_eq!(c.on_current(3300, 0.01), Some(PowerState::WaitingForOnPress));
        assert_eq!(c.state().off_detected_at, Some(3300));

        calibrate(&mut c, InputKind::Press, 3400);
        assert_eq!(c.state().power, PowerState::WaitingForOnPress);

        assert_eq!(c.on_current(3500, 0.12), Some(PowerState::WaitingForConfirmPress));
        calibrate(&mut c, InputKind::Press, 3600);
        assert_eq!(c.state().power, PowerState::Running);
        assert_eq!(c.threshold_on(), 0.12);
        assert_eq!(c.state().calibration_started_at, None);
        assert!(strip.is_dark());
    }

    #[test]
    fn double_click_also_confirms() {
        let (mut c, _) = controller();
        calibrate(&mut c, InputKind::LongPressStart, 0);
        c.on_current(10, 0.0);
        c.on_current(20, 0.3);
        calibrate(&mut c, InputKind::DoubleClick, 30);
        assert_eq!(c.state().power, PowerState::Running);
        assert_eq!(c.threshold_on(), 0.3);
    }

    #[test]
    fn non_positive_confirm_is_refused() {
        let mut mem = MemoryStore::erased();
        mem.poke(0, &0.005f32.to_le_bytes());
        let (mut c, strip) = controller_with(mem);
        assert_eq!(c.threshold_on(), 0.005);

        calibrate(&mut c, InputKind::LongPressStart, 0);
        c.on_current(10, -0.01);
        c.on_current(20, -0.004);
        assert_eq!(c.state().power, PowerState::WaitingForConfirmPress);

        let writes = c.store().backend().writes();
        strip.clear_log();
        calibrate(&mut c, InputKind::Press, 30);
        assert_eq!(c.state().power, PowerState::Running);
        assert_eq!(c.threshold_on(), 0.005);
        assert_eq!(c.store().backend().writes(), writes);
        assert!(strip.frames().iter().any(|f| f.iter().all(|&p| p == FAILURE_COLOR)));
    }

    #[test]
    fn storage_failure_keeps_old_threshold() {
        let (mut c, _) = controller();
        calibrate(&mut c, InputKind::LongPressStart, 0);
        c.on_current(10, 0.0);
        c.on_current(20, 0.5);
        c.store_mut().backend_mut().fail_writes(true);
        calibrate(&mut c, InputKind::Press, 30);
        assert_eq!(c.state().power, PowerState::Running);
        assert_eq!(c.threshold_on(), DEFAULT_THRESHOLD_ON);
    }

    #[test]
    fn color_select_cycles_and_commits() {
        let (mut c, strip) = controller();
        calibrate(&mut c, InputKind::DoubleClick, 0);
        assert_eq!(c.state().ui, UiMode::ColorSelect { index: 0 });
        assert!(strip.shows(PALETTE[0]));

        calibrate(&mut c, InputKind::ShortClick, 500);
        calibrate(&mut c, InputKind::ShortClick, 1000);
        assert_eq!(c.state().ui, UiMode::ColorSelect { index: 2 });
        assert!(strip.shows(PALETTE[2]));
        assert_eq!(c.store().color(), ColorChoice::Palette(0));

        // Long press does not start calibration while selecting.
        calibrate(&mut c, InputKind::LongPressStart, 4000);
        assert_eq!(c.state().power, PowerState::Running);

        calibrate(&mut c, InputKind::DoubleClick, 5000);
        assert_eq!(c.state().ui, UiMode::Normal);
        assert_eq!(c.store().color(), ColorChoice::Palette(2));
        // Host is off, so the strip goes dark after the confirmation blink.
        assert!(strip.is_dark());
    }

    #[test]
    fn color_select_wraps_around() {
        let mut mem = MemoryStore::erased();
        mem.poke(4, &[0, 8, 0, 0]);
        let (mut c, _) = controller_with(mem);
        calibrate(&mut c, InputKind::DoubleClick, 0);
        assert_eq!(c.state().ui, UiMode::ColorSelect { index: 8 });
        calibrate(&mut c, InputKind::ShortClick, 500);
        assert_eq!(c.state().ui, UiMode::ColorSelect { index: 0 });
    }

    #[test]
    fn encoder_rotation_previews_and_click_commits() {
        let (mut c, _) = controller();
        c.on_rotate(-1);
        assert_eq!(c.state().ui, UiMode::ColorSelect { index: 8 });
        c.on_rotate(1);
        c.on_rotate(1);
        assert_eq!(c.state().color, ColorChoice::Palette(1));
        assert_eq!(c.store().color(), ColorChoice::Palette(0));

        c.on_input(InputSource::EncoderSwitch, ev(InputKind::ShortClick, 100));
        assert_eq!(c.state().ui, UiMode::Normal);
        assert_eq!(c.store().color(), ColorChoice::Palette(1));
    }

    #[test]
    fn brightness_mode_adjusts_and_commits() {
        let (mut c, _) = controller();
        c.on_input(InputSource::EncoderSwitch, ev(InputKind::LongPressStart, 2000));
        assert_eq!(c.state().ui, UiMode::Brightness);

        c.on_rotate(-1);
        c.on_rotate(-1);
        assert_eq!(c.state().brightness, 255 - 2 * BRIGHTNESS_STEP);
        assert_eq!(c.leds().brightness(), 255 - 2 * BRIGHTNESS_STEP);
        assert_eq!(c.store().brightness(), 255);

        c.on_input(InputSource::EncoderSwitch, ev(InputKind::ShortClick, 3000));
        assert_eq!(c.state().ui, UiMode::Normal);
        assert_eq!(c.store().brightness(), 255 - 2 * BRIGHTNESS_STEP);
    }

    #[test]
    fn brightness_clamps() {
        let (mut c, _) = controller();
        c.on_input(InputSource::EncoderSwitch, ev(InputKind::LongPressStart, 0));
        for _ in 0..100 {
            c.on_rotate(1);
        }
        assert_eq!(c.state().brightness, 255);
        for _ in 0..100 {
            c.on_rotate(-1);
        }
        assert_eq!(c.state().brightness, 0);
    }

    #[test]
    fn gestures_ignored_while_calibrating() {
        let (mut c, _) = controller();
        calibrate(&mut c, InputKind::LongPressStart, 0);
        calibrate(&mut c, InputKind::DoubleClick, 100);
        c.on_rotate(1);
        c.on_input(InputSource::EncoderSwitch, ev(InputKind::LongPressStart, 200));
        assert_eq!(c.state().ui, UiMode::Normal);
        assert_eq!(c.state().power, PowerState::WaitingForOffPress);
    }

    #[test]
    fn remote_set_persists_immediately() {
        let (mut c, strip) = controller();
        c.on_current(0, 1.0);
        let custom = ColorChoice::Custom(RGB8::new(10, 20, 30));
        let outcome = c
            .apply(
                Command::Set {
                    color: Some(custom),
                    brightness: Some(40),
                },
                0,
            )
            .unwrap();
        assert_eq!(outcome, Outcome::Applied);
        assert_eq!(c.store().color(), custom);
        assert_eq!(c.store().brightness(), 40);
        assert!(strip.shows(smart_leds::brightness([custom.rgb()].into_iter(), 40).next().unwrap()));
    }

    #[test]
    fn remote_set_partial_failure_shows_committed_color() {
        let (mut c, strip) = controller();
        c.on_current(0, 1.0);
        c.take_snapshot();
        c.store_mut().backend_mut().fail_field(Some(crate::store::Field::Brightness));

        let result = c.apply(
            Command::Set {
                color: Some(ColorChoice::Palette(2)),
                brightness: Some(10),
            },
            10,
        );
        assert!(matches!(
            result,
            Err(StoreError::Backend { field: crate::store::Field::Brightness, .. })
        ));

        // The color reached flash, so it is rendered and published.
        assert_eq!(c.store().color(), ColorChoice::Palette(2));
        assert_eq!(c.state().color, ColorChoice::Palette(2));
        assert_eq!(c.state().brightness, 255);
        assert_eq!(strip.last_frame().unwrap()[0], PALETTE[2]);
        let snap = c.take_snapshot().unwrap();
        assert_eq!(snap.color, crate::remote::ColorReport::Palette { index: 2 });
        assert_eq!(snap.brightness, 255);
    }

    #[test]
    fn remote_calibrate_cancels_preview() {
        let (mut c, _) = controller();
        c.on_rotate(1);
        assert_eq!(c.apply(Command::Calibrate, 50).unwrap(), Outcome::Applied);
        assert_eq!(c.state().ui, UiMode::Normal);
        assert_eq!(c.state().color, ColorChoice::Palette(0));
        assert_eq!(c.state().power, PowerState::WaitingForOffPress);
        assert_eq!(c.apply(Command::Calibrate, 60).unwrap(), Outcome::Ignored);
    }

    #[test]
    fn remote_rename_and_reboot() {
        let (mut c, _) = controller();
        c.take_snapshot();
        c.apply(Command::Rename("Desk".into()), 0).unwrap();
        assert_eq!(c.store().device_name(), "Desk");
        assert_eq!(c.take_snapshot().unwrap().name, "Desk");
        assert_eq!(c.apply(Command::Reboot, 0).unwrap(), Outcome::Reboot);
    }

    #[test]
    fn snapshot_only_when_dirty() {
        let (mut c, _) = controller();
        assert!(c.take_snapshot().is_some());
        assert!(c.take_snapshot().is_none());
        c.on_current(0, 0.04); // inside the band
        assert!(c.take_snapshot().is_none());
        c.on_current(10, 0.5);
        let snap = c.take_snapshot().unwrap();
        assert!(snap.enabled);
        assert_eq!(snap.calibration, "running");
    }

    #[test]
    fn progress_pulse_peaks_mid_capture() {
        let (mut c, strip) = controller();
        strip.clear_log();
        c.show_progress(15, 32);
        let mid = strip.last_frame().unwrap()[0];
        c.show_progress(31, 32);
        let end = strip.last_frame().unwrap()[0];
        assert!(mid.b > end.b);
        assert_eq!(mid.r, 0);
    }
}
