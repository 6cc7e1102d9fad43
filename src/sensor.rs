// Console LED Trigger - Analog Current Sampler
//
// Converts raw ADC counts from the ACS712 hall sensor into amps and keeps an
// exponential moving average for the per-tick ON/OFF decision. Calibration uses
// a separate blocking average so the baseline is not biased by the EMA.

use embedded_hal::delay::DelayNs;

use crate::config::*;

/// Source of raw ADC counts.
pub trait AnalogSource {
    fn read_raw(&mut self) -> anyhow::Result<u16>;
}

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("cannot average zero samples")]
    NoSamples,
    #[error("ADC read failed: {0}")]
    Read(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// Sensor model
// ---------------------------------------------------------------------------

/// Linear model from ADC counts to sensor current.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorModel {
    pub ref_voltage: f32,
    pub adc_max: f32,
    /// Fraction of the sensor output voltage that reaches the ADC pin.
    pub divider_ratio: f32,
    pub zero_current_voltage: f32,
    /// Volts per amp.
    pub sensitivity: f32,
}

impl SensorModel {
    /// ACS712-05B read through the 10k / 4.7k divider on the board.
    pub const ACS712_5A: Self = Self {
        ref_voltage: ADC_REF_VOLTAGE,
        adc_max: ADC_MAX_VALUE,
        divider_ratio: DIVIDER_R_TOP / (DIVIDER_R_BOTTOM + DIVIDER_R_TOP),
        zero_current_voltage: SENSOR_ZERO_CURRENT_VOLTAGE,
        sensitivity: SENSOR_SENSITIVITY,
    };

    pub fn to_current(&self, raw: u16) -> f32 {
        let voltage_at_pin = (f32::from(raw) / self.adc_max) * self.ref_voltage;
        let sensor_voltage = voltage_at_pin / self.divider_ratio;
        (sensor_voltage - self.zero_current_voltage) / self.sensitivity
    }

    /// Nearest ADC count for `amps`, saturating at the converter range.
    pub fn to_raw(&self, amps: f32) -> u16 {
        let sensor_voltage = amps * self.sensitivity + self.zero_current_voltage;
        let counts = sensor_voltage * self.divider_ratio / self.ref_voltage * self.adc_max;
        counts.round().clamp(0.0, self.adc_max) as u16
    }
}

impl Default for SensorModel {
    fn default() -> Self {
        Self::ACS712_5A
    }
}

/// One EMA step. A non-finite `raw` leaves `previous` untouched.
pub fn smooth(raw: f32, previous: f32) -> f32 {
    if !raw.is_finite() {
        return previous;
    }
    previous + SMOOTHING_ALPHA * (raw - previous)
}

// ---------------------------------------------------------------------------
// Sampler
// ---------------------------------------------------------------------------

pub struct Sampler<A> {
    source: A,
    model: SensorModel,
    smoothed: Option<f32>,
}

impl<A: AnalogSource> Sampler<A> {
    pub fn new(source: A, model: SensorModel) -> Self {
        Self {
            source,
            model,
            smoothed: None,
        }
    }

    /// Read one instantaneous raw value.
    pub fn sample(&mut self) -> anyhow::Result<u16> {
        self.source.read_raw()
    }

    /// Regular tick path: sample, convert, smooth. The first sample seeds the filter.
    pub fn update(&mut self) -> anyhow::Result<f32> {
        let raw = self.sample()?;
        let current = self.model.to_current(raw);
        let next = match self.smoothed {
            Some(previous) => smooth(current, previous),
            None => current,
        };
        log::debug!("raw={} current={:.4} smoothed={:.4}", raw, current, next);
        self.smoothed = Some(next);
        Ok(next)
    }

    /// Last smoothed value, `None` until the first successful [`update`](Self::update).
    pub fn smoothed(&self) -> Option<f32> {
        self.smoothed
    }

    /// Arithmetic mean of `samples` readings, blocking `inter_sample_delay_ms`
    /// between them. `progress(i, samples)` runs before each delay so the caller
    /// can animate the strip. The EMA is not touched.
    pub fn average<D, F>(
        &mut self,
        samples: usize,
        inter_sample_delay_ms: u32,
        delay: &mut D,
        mut progress: F,
    ) -> Result<f32, SensorError>
    where
        D: DelayNs,
        F: FnMut(usize, usize),
    {
        if samples == 0 {
            return Err(SensorError::NoSamples);
        }

        let mut sum = 0.0f32;
        for i in 0..samples {
            let raw = self.sample()?;
            sum += self.model.to_current(raw);
            progress(i, samples);
            delay.delay_ms(inter_sample_delay_ms);
        }
        Ok(sum / samples as f32)
    }
}
