// Console LED Trigger - Oneshot ADC
//
// Current-sense input on ADC1 through the raw ESP-IDF oneshot API:
// 12 dB attenuation (full 0 - 3.3 V range), 12-bit conversions.

use esp_idf_sys::{self as sys, esp};

use crate::sensor::AnalogSource;

pub struct OneshotAdc {
    handle: sys::adc_oneshot_unit_handle_t,
    channel: sys::adc_channel_t,
}

impl OneshotAdc {
    /// Claim ADC1 and configure `channel` (GPIO0 is channel 0 on the C3).
    pub fn new(channel: sys::adc_channel_t) -> anyhow::Result<Self> {
        let mut handle: sys::adc_oneshot_unit_handle_t = core::ptr::null_mut();
        let unit_cfg = sys::adc_oneshot_unit_init_cfg_t {
            unit_id: sys::adc_unit_t_ADC_UNIT_1,
            ulp_mode: sys::adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
            ..unsafe { core::mem::zeroed() }
        };
        esp!(unsafe { sys::adc_oneshot_new_unit(&unit_cfg, &mut handle) })?;

        let chan_cfg = sys::adc_oneshot_chan_cfg_t {
            atten: sys::adc_atten_t_ADC_ATTEN_DB_12,
            bitwidth: sys::adc_bitwidth_t_ADC_BITWIDTH_12,
        };
        if let Err(e) = esp!(unsafe { sys::adc_oneshot_config_channel(handle, channel, &chan_cfg) }) {
            unsafe { sys::adc_oneshot_del_unit(handle) };
            return Err(e.into());
        }

        log::info!("ADC1 channel {} ready", channel);
        Ok(Self { handle, channel })
    }
}

impl AnalogSource for OneshotAdc {
    fn read_raw(&mut self) -> anyhow::Result<u16> {
        let mut raw: i32 = 0;
        esp!(unsafe { sys::adc_oneshot_read(self.handle, self.channel, &mut raw) })?;
        Ok(raw.clamp(0, 4095) as u16)
    }
}

impl Drop for OneshotAdc {
    fn drop(&mut self) {
        unsafe { sys::adc_oneshot_del_unit(self.handle) };
    }
}
