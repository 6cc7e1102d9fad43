// Console LED Trigger - Button & Encoder Input
//
// Debounced push-button handler with press, double-click, short-click and
// long-press detection, plus a quadrature decoder for the rotary encoder.
// Both are polled once per control-loop tick and never block.

use crate::config::*;
use crate::events::{InputEvent, InputKind};
use crate::timing::has_elapsed;

/// Logical state of one debounced button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Released,
    /// Pressed, long press not reached yet.
    PressedUnconfirmed,
    /// Held past the long-press duration; `LongPressStart` already emitted.
    PressedConfirmed,
}

pub struct Debouncer {
    debounce_ms: u32,
    double_click_ms: u32,
    long_press_ms: u32,

    state: ButtonState,
    last_raw: bool,
    last_transition: Option<u32>,

    // Press tracking
    press_start: u32,
    second_press: bool,

    // Double-click state machine
    last_short_release: Option<u32>,
    pending_click: Option<u32>,
}

impl Debouncer {
    pub fn new(debounce_ms: u32, double_click_ms: u32, long_press_ms: u32) -> Self {
        Self {
            debounce_ms,
            double_click_ms,
            long_press_ms,
            state: ButtonState::Released,
            last_raw: false,
            last_transition: None,
            press_start: 0,
            second_press: false,
            last_short_release: None,
            pending_click: None,
        }
    }

    /// Debouncer for the calibration button.
    pub fn calibrate_button(tuning: &Tuning) -> Self {
        Self::new(
            tuning.debounce_ms,
            tuning.double_click_ms,
            tuning.calibrate_long_press_ms,
        )
    }

    /// Debouncer for the encoder push switch.
    pub fn encoder_switch(tuning: &Tuning) -> Self {
        Self::new(
            tuning.debounce_ms,
            tuning.double_click_ms,
            tuning.encoder_long_press_ms,
        )
    }

    pub fn state(&self) -> ButtonState {
        self.state
    }

    pub fn is_pressed(&self) -> bool {
        self.state != ButtonState::Released
    }

    /// Call once per tick with the raw level (`true` = pressed).
    pub fn update(&mut self, now: u32, raw_pressed: bool) -> Option<InputEvent> {
        let kind = self.step(now, raw_pressed);
        // Always remember the pin so the next tick sees the real level,
        // even when this change was rejected as bounce.
        self.last_raw = raw_pressed;
        kind.map(|kind| InputEvent::new(kind, now))
    }

    fn step(&mut self, now: u32, raw_pressed: bool) -> Option<InputKind> {
        // ---- long press (edge-triggered, latched per hold) ----
        if self.state == ButtonState::PressedUnconfirmed
            && raw_pressed
            && self.last_raw
            && has_elapsed(self.press_start, now, self.long_press_ms)
        {
            self.state = ButtonState::PressedConfirmed;
            self.pending_click = None;
            return Some(InputKind::LongPressStart);
        }

        // ---- debounced edges ----
        if raw_pressed != self.is_pressed() {
            let settled = self
                .last_transition
                .map_or(true, |t| has_elapsed(t, now, self.debounce_ms));
            if !settled {
                return None;
            }
            self.last_transition = Some(now);

            return Some(if raw_pressed {
                self.on_press(now)
            } else {
                self.on_release(now)
            });
        }

        // ---- double-click window expired: it was a single click ----
        if let Some(released_at) = self.pending_click {
            if has_elapsed(released_at, now, self.double_click_ms) {
                self.pending_click = None;
                return Some(InputKind::ShortClick);
            }
        }

        None
    }

    fn on_press(&mut self, now: u32) -> InputKind {
        self.state = ButtonState::PressedUnconfirmed;
        self.press_start = now;
        self.pending_click = None;

        let double = self
            .last_short_release
            .is_some_and(|t| !has_elapsed(t, now, self.double_click_ms));
        self.second_press = double;
        if double {
            InputKind::DoubleClick
        } else {
            InputKind::Press
        }
    }

    fn on_release(&mut self, now: u32) -> InputKind {
        let was_long = self.state == ButtonState::PressedConfirmed;
        self.state = ButtonState::Released;

        if was_long || self.second_press {
            self.last_short_release = None;
        } else {
            self.last_short_release = Some(now);
            self.pending_click = Some(now);
        }
        self.second_press = false;
        InputKind::Release
    }
}

// ---------------------------------------------------------------------------
// Rotary encoder
// ---------------------------------------------------------------------------

// Indexed by (previous AB << 2) | current AB. Invalid double-steps count 0.
const QUADRATURE_TABLE: [i8; 16] = [0, -1, 1, 0, 1, 0, 0, -1, -1, 0, 0, 1, 0, 1, -1, 0];

/// Full-step quadrature decoder. A leading B counts clockwise (+1).
pub struct QuadratureDecoder {
    last_ab: u8,
    accumulated: i8,
    steps_per_detent: i8,
}

impl QuadratureDecoder {
    pub fn new(steps_per_detent: i8) -> Self {
        Self {
            // Pull-ups: both channels idle high.
            last_ab: 0b11,
            accumulated: 0,
            steps_per_detent,
        }
    }

    /// Feed the current channel levels; returns ±1 once per detent.
    pub fn update(&mut self, a: bool, b: bool) -> Option<i8> {
        let ab = (u8::from(a) << 1) | u8::from(b);
        if ab == self.last_ab {
            return None;
        }
        let index = usize::from((self.last_ab << 2) | ab);
        self.last_ab = ab;
        self.accumulated += QUADRATURE_TABLE[index];

        if self.accumulated >= self.steps_per_detent {
            self.accumulated = 0;
            Some(1)
        } else if self.accumulated <= -self.steps_per_detent {
            self.accumulated = 0;
            Some(-1)
        } else {
            None
        }
    }
}

impl Default for QuadratureDecoder {
    fn default() -> Self {
        Self::new(ENCODER_STEPS_PER_DETENT)
    }
}
