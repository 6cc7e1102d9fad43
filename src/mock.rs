// Console LED Trigger - Test doubles
//
// In-memory stand-ins for the hardware collaborators so the control core can be
// exercised on the host. Handles are cheap clones sharing the same state, so a
// test can keep one while the component under test owns the other.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use smart_leds::{SmartLedsWrite, RGB8};

use crate::sensor::AnalogSource;
use crate::store::{BackendError, DurableStore, Field, REGION_SIZE};

// ---------------------------------------------------------------------------
// Flat byte region (EEPROM emulation)
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
#[error("simulated commit failure")]
pub struct CommitFailed;

/// Byte-addressed durable region. Every field reads back whatever bytes sit at
/// its range, like a real EEPROM, so corrupt/erased contents reach the decoder.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    bytes: [u8; REGION_SIZE],
    writes: usize,
    fail_writes: bool,
    failing_field: Option<Field>,
}

impl MemoryStore {
    /// Fresh flash: all bits set.
    pub fn erased() -> Self {
        Self::filled(0xFF)
    }

    pub fn zeroed() -> Self {
        Self::filled(0x00)
    }

    fn filled(byte: u8) -> Self {
        Self {
            bytes: [byte; REGION_SIZE],
            writes: 0,
            fail_writes: false,
            failing_field: None,
        }
    }

    /// Overwrite raw bytes, bypassing the field layout.
    pub fn poke(&mut self, addr: usize, bytes: &[u8]) {
        self.bytes[addr..addr + bytes.len()].copy_from_slice(bytes);
    }

    pub fn bytes(&self) -> &[u8; REGION_SIZE] {
        &self.bytes
    }

    /// Number of successful commits.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Fail commits to `field` only; other fields still write.
    pub fn fail_field(&mut self, field: Option<Field>) {
        self.failing_field = field;
    }
}

impl DurableStore for MemoryStore {
    fn read(&mut self, field: Field, buf: &mut [u8]) -> Result<Option<usize>, BackendError> {
        let n = field.len().min(buf.len());
        buf[..n].copy_from_slice(&self.bytes[field.addr()..field.addr() + n]);
        Ok(Some(n))
    }

    fn write(&mut self, field: Field, bytes: &[u8]) -> Result<(), BackendError> {
        if self.fail_writes || self.failing_field == Some(field) {
            return Err(Box::new(CommitFailed));
        }
        let n = bytes.len().min(field.len());
        self.bytes[field.addr()..field.addr() + n].copy_from_slice(&bytes[..n]);
        self.writes += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pixel strip
// ---------------------------------------------------------------------------

/// Records every frame written to it.
#[derive(Debug, Clone, Default)]
pub struct MockStrip {
    frames: Rc<RefCell<Vec<Vec<RGB8>>>>,
}

impl MockStrip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<Vec<RGB8>> {
        self.frames.borrow().clone()
    }

    pub fn last_frame(&self) -> Option<Vec<RGB8>> {
        self.frames.borrow().last().cloned()
    }

    pub fn write_count(&self) -> usize {
        self.frames.borrow().len()
    }

    /// `true` when the last frame shows `color` on every pixel.
    pub fn shows(&self, color: RGB8) -> bool {
        self.last_frame()
            .is_some_and(|f| !f.is_empty() && f.iter().all(|&p| p == color))
    }

    pub fn is_dark(&self) -> bool {
        self.shows(RGB8::default())
    }

    pub fn clear_log(&self) {
        self.frames.borrow_mut().clear();
    }
}

impl SmartLedsWrite for MockStrip {
    type Error = core::convert::Infallible;
    type Color = RGB8;

    fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        let frame = iterator.into_iter().map(Into::into).collect();
        self.frames.borrow_mut().push(frame);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Delay
// ---------------------------------------------------------------------------

/// Blocking delay that only accumulates the requested time.
#[derive(Debug, Clone, Default)]
pub struct MockDelay {
    total_ns: Rc<Cell<u64>>,
}

impl MockDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_ms(&self) -> u64 {
        self.total_ns.get() / 1_000_000
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns.set(self.total_ns.get() + u64::from(ns));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_ns
            .set(self.total_ns.get() + u64::from(ms) * 1_000_000);
    }
}

// ---------------------------------------------------------------------------
// ADC
// ---------------------------------------------------------------------------

/// Returns queued readings, then repeats the last one forever.
#[derive(Debug, Clone)]
pub struct ScriptedAdc {
    queue: Rc<RefCell<VecDeque<u16>>>,
    last: Rc<Cell<u16>>,
}

impl ScriptedAdc {
    pub fn new(readings: impl IntoIterator<Item = u16>) -> Self {
        let queue: VecDeque<u16> = readings.into_iter().collect();
        let last = queue.front().copied().unwrap_or(0);
        Self {
            queue: Rc::new(RefCell::new(queue)),
            last: Rc::new(Cell::new(last)),
        }
    }

    pub fn constant(raw: u16) -> Self {
        Self::new([raw])
    }

    /// Drop queued readings and hold `raw` from now on.
    pub fn set(&self, raw: u16) {
        self.queue.borrow_mut().clear();
        self.last.set(raw);
    }
}

impl AnalogSource for ScriptedAdc {
    fn read_raw(&mut self) -> anyhow::Result<u16> {
        if let Some(raw) = self.queue.borrow_mut().pop_front() {
            self.last.set(raw);
        }
        Ok(self.last.get())
    }
}
