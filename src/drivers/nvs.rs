// Console LED Trigger - NVS Backend
//
// Every persisted field is one blob in the `led-config` namespace, keyed by
// `Field::key`. `EspNvs::set_raw` commits before returning.

use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};

use crate::config::NVS_NAMESPACE;
use crate::store::{BackendError, DurableStore, Field};

pub struct NvsStore {
    nvs: EspNvs<NvsDefault>,
}

impl NvsStore {
    pub fn new(partition: EspDefaultNvsPartition) -> anyhow::Result<Self> {
        let nvs = EspNvs::new(partition, NVS_NAMESPACE, true)?;
        Ok(Self { nvs })
    }

    /// String setting outside the persisted layout (network credentials).
    pub fn get_string(&self, key: &str) -> Option<String> {
        let mut buf = [0u8; 128];
        match self.nvs.get_str(key, &mut buf) {
            Ok(value) => value.map(|s| s.trim_end_matches('\0').to_owned()),
            Err(e) => {
                log::warn!("NVS read of {} failed: {}", key, e);
                None
            }
        }
    }
}

impl DurableStore for NvsStore {
    fn read(&mut self, field: Field, buf: &mut [u8]) -> Result<Option<usize>, BackendError> {
        Ok(self.nvs.get_raw(field.key(), buf)?.map(|bytes| bytes.len()))
    }

    fn write(&mut self, field: Field, bytes: &[u8]) -> Result<(), BackendError> {
        self.nvs.set_raw(field.key(), bytes)?;
        Ok(())
    }
}
