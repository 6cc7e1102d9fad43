// Console LED Trigger - Device State

use smart_leds::RGB8;

use crate::config::PALETTE;

// ---------------------------------------------------------------------------
// Power / calibration state
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerState {
    #[default]
    Running,
    /// Calibration started; waiting for the host to be switched off.
    WaitingForOffPress,
    /// Host seen off; waiting for it to be switched back on.
    WaitingForOnPress,
    /// Host seen on again; waiting for the operator to confirm.
    WaitingForConfirmPress,
}

impl PowerState {
    pub fn is_calibrating(&self) -> bool {
        *self != Self::Running
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::WaitingForOffPress => "waiting_for_off",
            Self::WaitingForOnPress => "waiting_for_on",
            Self::WaitingForConfirmPress => "waiting_for_confirm",
        }
    }
}

// ---------------------------------------------------------------------------
// UI sub-modes (only entered while Running)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiMode {
    #[default]
    Normal,
    /// Cycling the palette with the calibration button.
    ColorSelect { index: usize },
    /// Encoder rotation adjusts brightness.
    Brightness,
}

// ---------------------------------------------------------------------------
// Color preference
// ---------------------------------------------------------------------------

/// The "on" color: a palette entry or an arbitrary RGB value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorChoice {
    Palette(usize),
    Custom(RGB8),
}

impl ColorChoice {
    /// Palette entry, `None` if the index is out of range.
    pub fn palette(index: usize) -> Option<Self> {
        (index < PALETTE.len()).then_some(Self::Palette(index))
    }

    pub fn rgb(&self) -> RGB8 {
        match *self {
            // Indices are validated where a ColorChoice is built from outside data.
            Self::Palette(index) => PALETTE.get(index).copied().unwrap_or(PALETTE[0]),
            Self::Custom(rgb) => rgb,
        }
    }

    pub fn palette_index(&self) -> Option<usize> {
        match *self {
            Self::Palette(index) => Some(index),
            Self::Custom(_) => None,
        }
    }
}

impl Default for ColorChoice {
    fn default() -> Self {
        Self::Palette(0)
    }
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

/// Everything the control loop mutates. Owned by the power state machine.
#[derive(Debug, Clone, Default)]
pub struct DeviceState {
    pub power: PowerState,
    pub ui: UiMode,
    pub leds_on: bool,
    /// Live color: the committed preference, or a preview while selecting.
    pub color: ColorChoice,
    /// Live brightness: the committed preference, or a preview in brightness mode.
    pub brightness: u8,
    pub smoothed: Option<f32>,
    pub led_on_since: Option<u32>,
    pub calibration_started_at: Option<u32>,
    pub off_detected_at: Option<u32>,
    /// Mean current captured when the host was seen off during calibration.
    pub off_baseline: Option<f32>,
    /// Unix time of boot, 0 when the clock never synced.
    pub boot_time: u64,
    pub device_name: String,
    /// Set whenever a published field changes; cleared by the loop after publishing.
    pub dirty: bool,
}

impl DeviceState {
    pub fn new(color: ColorChoice, brightness: u8, device_name: String) -> Self {
        Self {
            color,
            brightness,
            device_name,
            // Publish once after boot.
            dirty: true,
            ..Default::default()
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns and clears the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
