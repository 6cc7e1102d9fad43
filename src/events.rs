// Console LED Trigger - Input Events

// ---------------------------------------------------------------------------
// Semantic input events produced by the debouncer
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Accepted press edge.
    Press,
    /// Accepted release edge.
    Release,
    /// Short press whose double-click window expired without a second press.
    ShortClick,
    /// Press accepted within the double-click window of the previous release.
    DoubleClick,
    /// Held past the long-press duration; once per hold.
    LongPressStart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: InputKind,
    /// Tick timestamp (ms since boot) at which the event was recognised.
    pub at_ms: u32,
}

impl InputEvent {
    pub fn new(kind: InputKind, at_ms: u32) -> Self {
        Self { kind, at_ms }
    }

    pub fn is_press(&self) -> bool {
        matches!(self.kind, InputKind::Press | InputKind::DoubleClick)
    }
}

// ---------------------------------------------------------------------------
// Physical inputs
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    /// Dedicated calibration / color-select push button.
    CalibrateButton,
    /// Push switch of the rotary encoder.
    EncoderSwitch,
}
