// Exhaustive / pseudo-random checks of the debouncer and the calibration order.

use console_led_trigger::config::*;
use console_led_trigger::events::{InputEvent, InputKind, InputSource};
use console_led_trigger::input::Debouncer;
use console_led_trigger::led::LedOutput;
use console_led_trigger::machine::{Controller, Outcome};
use console_led_trigger::mock::{MemoryStore, MockDelay, MockStrip};
use console_led_trigger::remote::Command;
use console_led_trigger::state::PowerState;
use console_led_trigger::store::Store;

/// Small deterministic generator so failures reproduce.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    fn below(&mut self, n: u32) -> u32 {
        self.next() % n
    }
}

fn events(b: &mut Debouncer, start: u32, levels: &[bool]) -> Vec<InputKind> {
    levels
        .iter()
        .enumerate()
        .filter_map(|(i, &level)| b.update(start + 10 * i as u32, level))
        .map(|e| e.kind)
        .collect()
}

#[test]
fn press_burst_counts_as_one_transition() {
    let _ = env_logger::builder().is_test(true).try_init();

    // Every 4-tick (40 ms) chatter pattern after the first contact, then held.
    for pattern in 0u8..16 {
        let mut levels = vec![false, false, true];
        levels.extend((0..4).map(|bit| pattern & (1 << bit) != 0));
        levels.extend([true; 20]);

        let mut b = Debouncer::new(DEBOUNCE_MS, DOUBLE_CLICK_WINDOW_MS, CALIBRATE_LONG_PRESS_MS);
        let got = events(&mut b, 1_000, &levels);
        assert_eq!(got, vec![InputKind::Press], "pattern {:04b}", pattern);
        assert!(b.is_pressed());
    }
}

#[test]
fn release_burst_counts_as_one_transition() {
    for pattern in 0u8..16 {
        let mut levels = vec![true; 10];
        levels.push(false);
        levels.extend((0..4).map(|bit| pattern & (1 << bit) != 0));
        levels.extend([false; 10]);

        let mut b = Debouncer::new(DEBOUNCE_MS, DOUBLE_CLICK_WINDOW_MS, CALIBRATE_LONG_PRESS_MS);
        let got = events(&mut b, 1_000, &levels);
        assert_eq!(
            got,
            vec![InputKind::Press, InputKind::Release],
            "pattern {:04b}",
            pattern
        );
        assert!(!b.is_pressed());
    }
}

#[test]
fn long_press_fires_exactly_once_per_hold() {
    for hold_ms in [3_000u32, 3_010, 5_000, 20_000] {
        let mut b = Debouncer::new(DEBOUNCE_MS, DOUBLE_CLICK_WINDOW_MS, CALIBRATE_LONG_PRESS_MS);
        let mut levels = vec![true; (hold_ms / 10 + 1) as usize];
        levels.extend([false; 60]);
        let got = events(&mut b, 0, &levels);
        let long = got.iter().filter(|&&k| k == InputKind::LongPressStart).count();
        assert_eq!(long, 1, "hold {} ms", hold_ms);
        assert!(!got.contains(&InputKind::ShortClick));
    }

    let mut b = Debouncer::new(DEBOUNCE_MS, DOUBLE_CLICK_WINDOW_MS, CALIBRATE_LONG_PRESS_MS);
    let got = events(&mut b, 0, &[true; 299]);
    assert!(!got.contains(&InputKind::LongPressStart));
}

#[test]
fn confirm_is_only_reachable_through_off_then_on() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut rng = Lcg(0x5eed);

    for _ in 0..200 {
        let store = Store::open(MemoryStore::erased(), DEFAULT_THRESHOLD_ON, "Console-TEST".into());
        let leds = LedOutput::new(MockStrip::new(), MockDelay::new(), DEFAULT_BRIGHTNESS);
        let mut c = Controller::new(store, leds, Tuning::default());
        let mut path = vec![c.state().power];
        let mut now = 0;

        for _ in 0..60 {
            now += 10;
            match rng.below(6) {
                0 | 1 => {
                    let amps = rng.below(200) as f32 / 1000.0 - 0.05;
                    c.on_current(now, amps);
                }
                2 => {
                    let kinds = [
                        InputKind::Press,
                        InputKind::Release,
                        InputKind::ShortClick,
                        InputKind::DoubleClick,
                        InputKind::LongPressStart,
                    ];
                    let kind = kinds[rng.below(5) as usize];
                    let source = if rng.below(2) == 0 {
                        InputSource::CalibrateButton
                    } else {
                        InputSource::EncoderSwitch
                    };
                    c.on_input(source, InputEvent::new(kind, now));
                }
                3 => c.on_rotate(if rng.below(2) == 0 { 1 } else { -1 }),
                4 => {
                    let outcome = c.apply(Command::Calibrate, now).unwrap();
                    assert_ne!(outcome, Outcome::Reboot);
                }
                _ => c.on_input(
                    InputSource::CalibrateButton,
                    InputEvent::new(InputKind::LongPressStart, now),
                ),
            }
            if path.last() != Some(&c.state().power) {
                path.push(c.state().power);
            }
        }

        for pair in path.windows(2) {
            let allowed = matches!(
                (pair[0], pair[1]),
                (PowerState::Running, PowerState::WaitingForOffPress)
                    | (PowerState::WaitingForOffPress, PowerState::WaitingForOnPress)
                    | (PowerState::WaitingForOnPress, PowerState::WaitingForConfirmPress)
                    | (PowerState::WaitingForConfirmPress, PowerState::Running)
            );
            assert!(allowed, "illegal transition {:?} -> {:?}", pair[0], pair[1]);
        }
    }
}
