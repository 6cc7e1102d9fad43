// Console LED Trigger - Persistent Configuration
//
// Threshold, color, brightness and device name live in fixed, non-overlapping
// slots of a small durable region. Backends either address that region by byte
// offset (EEPROM-style) or by the slot's key (NVS). Values are cached after a
// successful commit so the control loop never re-reads storage.

use std::error::Error as StdError;

use smart_leds::RGB8;

use crate::config::*;
use crate::state::ColorChoice;

pub type BackendError = Box<dyn StdError + Send + Sync>;

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

pub const REGION_SIZE: usize = 64;
pub const MAX_NAME_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ThresholdOn,
    Color,
    Brightness,
    DeviceName,
}

impl Field {
    pub const ALL: [Field; 4] = [
        Field::ThresholdOn,
        Field::Color,
        Field::Brightness,
        Field::DeviceName,
    ];

    /// Byte offset in the durable region.
    pub const fn addr(self) -> usize {
        match self {
            Field::ThresholdOn => 0,
            Field::Color => 4,
            Field::Brightness => 8,
            Field::DeviceName => 16,
        }
    }

    pub const fn len(self) -> usize {
        match self {
            Field::ThresholdOn => 4,               // f32 LE
            Field::Color => 4,                     // [tag, a, b, c]
            Field::Brightness => 2,                // [value, !value]
            Field::DeviceName => 1 + MAX_NAME_LEN, // [len, utf8...]
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            Field::ThresholdOn => "threshold_on",
            Field::Color => "color",
            Field::Brightness => "brightness",
            Field::DeviceName => "name",
        }
    }

    pub const fn range(self) -> std::ops::Range<usize> {
        self.addr()..self.addr() + self.len()
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

const fn layout_is_valid() -> bool {
    let mut i = 0;
    while i < Field::ALL.len() {
        let a = Field::ALL[i];
        if a.addr() + a.len() > REGION_SIZE {
            return false;
        }
        let mut j = i + 1;
        while j < Field::ALL.len() {
            let b = Field::ALL[j];
            if a.addr() < b.addr() + b.len() && b.addr() < a.addr() + a.len() {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const _: () = assert!(layout_is_valid(), "persisted fields overlap or exceed the region");

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Durable storage addressed by [`Field`].
pub trait DurableStore {
    /// Copy the field's bytes into `buf`; `Ok(None)` when nothing was ever stored.
    fn read(&mut self, field: Field, buf: &mut [u8]) -> Result<Option<usize>, BackendError>;

    /// Write and commit the field. Must not return before the bytes are durable.
    fn write(&mut self, field: Field, bytes: &[u8]) -> Result<(), BackendError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("threshold {0} is not a positive finite value")]
    InvalidThreshold(f32),
    #[error("device name must be 1 to {max} bytes, got {0}", max = MAX_NAME_LEN)]
    NameTooLong(usize),
    #[error("storage commit failed for {field}")]
    Backend {
        field: Field,
        #[source]
        source: BackendError,
    },
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

const COLOR_TAG_PALETTE: u8 = 0;
const COLOR_TAG_CUSTOM: u8 = 1;

fn decode_threshold(bytes: &[u8]) -> Option<f32> {
    let raw: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
    let value = f32::from_le_bytes(raw);
    (value.is_finite() && value > 0.0).then_some(value)
}

fn encode_color(color: ColorChoice) -> [u8; 4] {
    match color {
        ColorChoice::Palette(index) => [COLOR_TAG_PALETTE, index as u8, 0, 0],
        ColorChoice::Custom(rgb) => [COLOR_TAG_CUSTOM, rgb.r, rgb.g, rgb.b],
    }
}

fn decode_color(bytes: &[u8]) -> Option<ColorChoice> {
    match *bytes.get(..4)? {
        [COLOR_TAG_PALETTE, index, _, _] => ColorChoice::palette(usize::from(index)),
        [COLOR_TAG_CUSTOM, r, g, b] => Some(ColorChoice::Custom(RGB8::new(r, g, b))),
        _ => None,
    }
}

fn decode_brightness(bytes: &[u8]) -> Option<u8> {
    match *bytes.get(..2)? {
        [value, check] if check == !value => Some(value),
        _ => None,
    }
}

fn decode_name(bytes: &[u8]) -> Option<String> {
    let (&len, rest) = bytes.split_first()?;
    let len = usize::from(len);
    if len == 0 || len > MAX_NAME_LEN {
        return None;
    }
    let name = std::str::from_utf8(rest.get(..len)?).ok()?;
    Some(name.to_owned())
}

/// `Console-XXXXXX` from the last three MAC bytes.
pub fn default_device_name(mac: [u8; 6]) -> String {
    format!(
        "{}{:02X}{:02X}{:02X}",
        DEVICE_NAME_PREFIX, mac[3], mac[4], mac[5]
    )
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct Store<S> {
    backend: S,
    default_threshold: f32,
    default_name: String,

    threshold_on: f32,
    color: ColorChoice,
    brightness: u8,
    device_name: String,
}

impl<S: DurableStore> Store<S> {
    /// Load every field, falling back to defaults for absent or corrupt slots.
    pub fn open(backend: S, default_threshold: f32, default_name: String) -> Self {
        let mut store = Self {
            backend,
            default_threshold,
            threshold_on: default_threshold,
            color: ColorChoice::default(),
            brightness: DEFAULT_BRIGHTNESS,
            device_name: default_name.clone(),
            default_name,
        };
        store.threshold_on = store.load_threshold();
        store.color = store.load_color();
        store.brightness = store.load_brightness();
        store.device_name = store.load_device_name();
        log::info!(
            "Loaded config: threshold_on={:.3} color={:?} brightness={} name={}",
            store.threshold_on,
            store.color,
            store.brightness,
            store.device_name
        );
        store
    }

    fn read_field(&mut self, field: Field) -> Option<Vec<u8>> {
        let mut buf = vec![0u8; field.len()];
        match self.backend.read(field, &mut buf) {
            Ok(Some(n)) => {
                buf.truncate(n);
                Some(buf)
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("Reading {} failed, using default: {}", field, e);
                None
            }
        }
    }

    fn write_field(&mut self, field: Field, bytes: &[u8]) -> Result<(), StoreError> {
        self.backend
            .write(field, bytes)
            .map_err(|source| StoreError::Backend { field, source })
    }

    // ---- threshold ----

    pub fn load_threshold(&mut self) -> f32 {
        self.read_field(Field::ThresholdOn)
            .and_then(|b| decode_threshold(&b))
            .unwrap_or(self.default_threshold)
    }

    pub fn save_threshold(&mut self, value: f32) -> Result<(), StoreError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(StoreError::InvalidThreshold(value));
        }
        self.write_field(Field::ThresholdOn, &value.to_le_bytes())?;
        self.threshold_on = value;
        Ok(())
    }

    pub fn threshold(&self) -> f32 {
        self.threshold_on
    }

    // ---- color ----

    pub fn load_color(&mut self) -> ColorChoice {
        self.read_field(Field::Color)
            .and_then(|b| decode_color(&b))
            .unwrap_or_default()
    }

    pub fn save_color(&mut self, color: ColorChoice) -> Result<(), StoreError> {
        self.write_field(Field::Color, &encode_color(color))?;
        self.color = color;
        Ok(())
    }

    pub fn color(&self) -> ColorChoice {
        self.color
    }

    // ---- brightness ----

    pub fn load_brightness(&mut self) -> u8 {
        self.read_field(Field::Brightness)
            .and_then(|b| decode_brightness(&b))
            .unwrap_or(DEFAULT_BRIGHTNESS)
    }

    pub fn save_brightness(&mut self, value: u8) -> Result<(), StoreError> {
        self.write_field(Field::Brightness, &[value, !value])?;
        self.brightness = value;
        Ok(())
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    // ---- device name ----

    pub fn load_device_name(&mut self) -> String {
        self.read_field(Field::DeviceName)
            .and_then(|b| decode_name(&b))
            .unwrap_or_else(|| self.default_name.clone())
    }

    pub fn save_device_name(&mut self, name: &str) -> Result<(), StoreError> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes.len() > MAX_NAME_LEN {
            return Err(StoreError::NameTooLong(bytes.len()));
        }
        let mut slot = vec![0u8; Field::DeviceName.len()];
        slot[0] = bytes.len() as u8;
        slot[1..=bytes.len()].copy_from_slice(bytes);
        self.write_field(Field::DeviceName, &slot)?;
        self.device_name = name.to_owned();
        Ok(())
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut S {
        &mut self.backend
    }
}
