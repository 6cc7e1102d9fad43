// Console LED Trigger - Control Loop
//
// One call to `App::tick` is one pass of the 100 Hz loop: debounce the inputs,
// decode the encoder, sample the current sensor and let the state machine react.
// Commands from the network side are applied between ticks by the caller.

use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use smart_leds::{SmartLedsWrite, RGB8};

use crate::config::Tuning;
use crate::events::InputSource;
use crate::input::{Debouncer, QuadratureDecoder};
use crate::machine::{Controller, Outcome};
use crate::remote::{Command, DeviceSnapshot};
use crate::sensor::{AnalogSource, Sampler};
use crate::state::PowerState;
use crate::store::DurableStore;

/// Pin levels read at the start of a tick. Buttons are `true` when pressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawInputs {
    pub calibrate_pressed: bool,
    pub encoder_pressed: bool,
    pub encoder_a: bool,
    pub encoder_b: bool,
}

impl RawInputs {
    /// Encoder resting position (both channels pulled up), nothing pressed.
    pub const IDLE: Self = Self {
        calibrate_pressed: false,
        encoder_pressed: false,
        encoder_a: true,
        encoder_b: true,
    };
}

pub struct App<A, S, W, D> {
    sampler: Sampler<A>,
    controller: Controller<S, W, D>,
    calibrate_button: Debouncer,
    encoder_switch: Debouncer,
    encoder: QuadratureDecoder,
    delay: D,
    tuning: Tuning,
}

impl<A, S, W, D> App<A, S, W, D>
where
    A: AnalogSource,
    S: DurableStore,
    W: SmartLedsWrite<Color = RGB8>,
    W::Error: Debug,
    D: DelayNs,
{
    /// `delay` paces the calibration baseline capture; the strip keeps its own.
    pub fn new(sampler: Sampler<A>, controller: Controller<S, W, D>, delay: D, tuning: Tuning) -> Self {
        Self {
            sampler,
            controller,
            calibrate_button: Debouncer::calibrate_button(&tuning),
            encoder_switch: Debouncer::encoder_switch(&tuning),
            encoder: QuadratureDecoder::default(),
            delay,
            tuning,
        }
    }

    pub fn controller(&self) -> &Controller<S, W, D> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut Controller<S, W, D> {
        &mut self.controller
    }

    pub fn sampler(&self) -> &Sampler<A> {
        &self.sampler
    }

    /// Run one loop pass. Returns a snapshot when a published field changed.
    pub fn tick(&mut self, now: u32, raw: RawInputs) -> Option<DeviceSnapshot> {
        // ---- inputs ----
        if let Some(event) = self.calibrate_button.update(now, raw.calibrate_pressed) {
            log::debug!("calibrate button: {:?}", event.kind);
            self.controller.on_input(InputSource::CalibrateButton, event);
        }
        if let Some(event) = self.encoder_switch.update(now, raw.encoder_pressed) {
            log::debug!("encoder switch: {:?}", event.kind);
            self.controller.on_input(InputSource::EncoderSwitch, event);
        }
        if let Some(delta) = self.encoder.update(raw.encoder_a, raw.encoder_b) {
            self.controller.on_rotate(delta);
        }

        // ---- current ----
        match self.sampler.update() {
            Ok(smoothed) => {
                if self.controller.on_current(now, smoothed) == Some(PowerState::WaitingForOnPress) {
                    self.capture_off_baseline();
                }
            }
            Err(e) => log::warn!("Current sample skipped: {:#}", e),
        }

        self.controller.take_snapshot()
    }

    /// Apply one remote command. Storage failures are logged and reported as
    /// [`Outcome::Ignored`].
    pub fn handle_command(&mut self, command: Command, now: u32) -> Outcome {
        log::info!("Command: {:?}", command);
        match self.controller.apply(command, now) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Command failed: {}", e);
                Outcome::Ignored
            }
        }
    }

    /// Blocking average of the OFF-level current, animated on the strip.
    fn capture_off_baseline(&mut self) {
        let Self {
            sampler,
            controller,
            delay,
            tuning,
            ..
        } = self;

        let result = sampler.average(
            tuning.calibration_samples,
            tuning.calibration_sample_delay_ms,
            delay,
            |step, total| controller.show_progress(step, total),
        );
        controller.end_progress();

        match result {
            Ok(amps) => controller.record_off_baseline(amps),
            Err(e) => log::warn!("OFF baseline capture failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::*;
    use crate::led::LedOutput;
    use crate::mock::{MemoryStore, MockDelay, MockStrip, ScriptedAdc};
    use crate::sensor::SensorModel;
    use crate::store::Store;

    type TestApp = App<ScriptedAdc, MemoryStore, MockStrip, MockDelay>;

    fn app(adc: ScriptedAdc, delay: MockDelay) -> TestApp {
        let store = Store::open(MemoryStore::erased(), DEFAULT_THRESHOLD_ON, "Console-TEST".into());
        let leds = LedOutput::new(MockStrip::new(), MockDelay::new(), DEFAULT_BRIGHTNESS);
        let controller = Controller::new(store, leds, Tuning::default());
        let sampler = Sampler::new(adc, SensorModel::default());
        App::new(sampler, controller, delay, Tuning::default())
    }

    #[test]
    fn off_detection_captures_baseline() {
        let model = SensorModel::default();
        let adc = ScriptedAdc::constant(model.to_raw(0.5));
        let delay = MockDelay::new();
        let mut app = app(adc.clone(), delay.clone());

        app.tick(0, RawInputs::IDLE);
        app.handle_command(Command::Calibrate, 10);
        assert_eq!(app.controller().state().power, PowerState::WaitingForOffPress);

        adc.set(model.to_raw(0.0));
        let mut now = 20;
        while app.controller().state().power == PowerState::WaitingForOffPress {
            app.tick(now, RawInputs::IDLE);
            now += 10;
            assert!(now < 10_000, "OFF never detected");
        }

        let baseline = app.controller().state().off_baseline.unwrap();
        assert!(baseline.abs() < 0.01);
        assert_eq!(
            delay.total_ms(),
            (CALIBRATION_SAMPLES as u64) * u64::from(CALIBRATION_SAMPLE_DELAY_MS)
        );
    }

    #[test]
    fn snapshot_emitted_once_per_change() {
        let model = SensorModel::default();
        let adc = ScriptedAdc::constant(model.to_raw(0.0));
        let mut app = app(adc.clone(), MockDelay::new());

        assert!(app.tick(0, RawInputs::IDLE).is_some());
        assert!(app.tick(10, RawInputs::IDLE).is_none());

        adc.set(model.to_raw(1.0));
        let mut snapshots = 0;
        for t in 1..200 {
            if app.tick(t * 10, RawInputs::IDLE).is_some() {
                snapshots += 1;
            }
        }
        assert_eq!(snapshots, 1);
        assert!(app.controller().state().leds_on);
    }
}
