// Console LED Trigger - Wi-Fi & Clock
//
// Station-mode bring-up from stored credentials and a one-shot SNTP sync used
// only to stamp the boot time in published snapshots.

use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::anyhow;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sntp::{EspSntp, SyncStatus};
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use crate::config::*;
use crate::drivers::nvs::NvsStore;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub ssid: String,
    pub password: String,
    pub mqtt_url: String,
    pub mqtt_user: Option<String>,
    pub mqtt_pass: Option<String>,
}

impl Credentials {
    /// NVS values first, then the ones baked in at build time.
    /// `None` when no SSID or broker is configured anywhere.
    pub fn load(nvs: &NvsStore) -> Option<Self> {
        let ssid = nvs
            .get_string("wifi_ssid")
            .or_else(|| WIFI_SSID.map(str::to_owned))?;
        let mqtt_url = nvs
            .get_string("mqtt_url")
            .or_else(|| MQTT_URL.map(str::to_owned))?;
        Some(Self {
            ssid,
            password: nvs
                .get_string("wifi_pass")
                .or_else(|| WIFI_PASS.map(str::to_owned))
                .unwrap_or_default(),
            mqtt_url,
            mqtt_user: nvs.get_string("mqtt_user"),
            mqtt_pass: nvs.get_string("mqtt_pass"),
        })
    }
}

/// Connect as a station and block until the interface has an address.
pub fn connect_wifi(
    modem: Modem,
    sysloop: EspSystemEventLoop,
    partition: EspDefaultNvsPartition,
    creds: &Credentials,
) -> anyhow::Result<BlockingWifi<EspWifi<'static>>> {
    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(modem, sysloop.clone(), Some(partition))?,
        sysloop,
    )?;

    let auth_method = if creds.password.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: creds
            .ssid
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("SSID too long"))?,
        password: creds
            .password
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("Wi-Fi password too long"))?,
        auth_method,
        ..Default::default()
    }))?;

    wifi.start()?;
    log::info!("Connecting to {}", creds.ssid);
    wifi.connect()?;
    wifi.wait_netif_up()?;

    let ip = wifi.wifi().sta_netif().get_ip_info()?;
    log::info!("Wi-Fi up, IP {}", ip.ip);
    Ok(wifi)
}

/// Unix time at which the device booted, or 0 if SNTP did not sync in time.
pub fn sync_boot_time(timeout_ms: u64) -> u64 {
    let sntp = match EspSntp::new_default() {
        Ok(sntp) => sntp,
        Err(e) => {
            log::warn!("SNTP unavailable: {}", e);
            return 0;
        }
    };

    let poll = Duration::from_millis(100);
    let mut waited = 0;
    while sntp.get_sync_status() != SyncStatus::Completed {
        if waited >= timeout_ms {
            log::warn!("SNTP sync timed out");
            return 0;
        }
        thread::sleep(poll);
        waited += 100;
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let uptime_secs = unsafe { esp_idf_sys::esp_timer_get_time() } as u64 / 1_000_000;
    let boot = now.saturating_sub(uptime_secs);
    log::info!("Clock synced, boot time {}", boot);
    boot
}
