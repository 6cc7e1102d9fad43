// Console LED Trigger - Firmware Entry Point
//
// Boot sequence:
//   1. Bring up the log fan-out (USB console + UART1 mirror).
//   2. Open NVS and load threshold, color, brightness and device name.
//   3. Claim the ADC, the LED strip and the input pins.
//   4. If the network strap is pulled low: join Wi-Fi, sync the clock and start
//      the MQTT bridge.
//   5. Run the 100 Hz control loop forever.
//
// The device restarts on the remote `reboot` command or the reset button.

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    firmware::run()
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("console-led-trigger runs on the ESP32-C3; build for the espidf target");
}

#[cfg(target_os = "espidf")]
mod firmware {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use esp_idf_hal::delay::FreeRtos;
    use esp_idf_hal::gpio::{AnyIOPin, Input, InputPin, OutputPin, PinDriver, Pull};
    use esp_idf_hal::peripheral::Peripheral;
    use esp_idf_hal::prelude::*;
    use esp_idf_hal::uart::{config::Config as UartConfig, UartTxDriver};
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_sys::esp;
    use log::LevelFilter;

    use console_led_trigger::app::{App, RawInputs};
    use console_led_trigger::config::*;
    use console_led_trigger::drivers::adc::OneshotAdc;
    use console_led_trigger::drivers::nvs::NvsStore;
    use console_led_trigger::drivers::uart::UartSink;
    use console_led_trigger::drivers::ws2812::Ws2812;
    use console_led_trigger::events::InputKind;
    use console_led_trigger::input::Debouncer;
    use console_led_trigger::led::LedOutput;
    use console_led_trigger::logger::{self, StdoutSink};
    use console_led_trigger::machine::{Controller, Outcome};
    use console_led_trigger::remote::Topics;
    use console_led_trigger::sensor::{Sampler, SensorModel};
    use console_led_trigger::store::{default_device_name, Store};
    use console_led_trigger::tasks::mqtt::MqttBridge;
    use console_led_trigger::tasks::network::{self, Credentials};

    // -----------------------------------------------------------------------
    // Utility: milliseconds since boot (wraps at ~49 days, see `timing`)
    // -----------------------------------------------------------------------
    fn now_ms() -> u32 {
        unsafe { (esp_idf_sys::esp_timer_get_time() / 1000) as u32 }
    }

    fn input_pullup<'d, P: InputPin + OutputPin>(
        pin: impl Peripheral<P = P> + 'd,
    ) -> anyhow::Result<PinDriver<'d, P, Input>> {
        let mut driver = PinDriver::input(pin)?;
        driver.set_pull(Pull::Up)?;
        Ok(driver)
    }

    fn factory_mac() -> anyhow::Result<[u8; 6]> {
        let mut mac = [0u8; 6];
        esp!(unsafe { esp_idf_sys::esp_efuse_mac_get_default(mac.as_mut_ptr()) })?;
        Ok(mac)
    }

    fn restart(reason: &str) -> ! {
        log::warn!("Restarting: {}", reason);
        // Let the UART drain.
        thread::sleep(Duration::from_millis(100));
        esp_idf_hal::reset::restart()
    }

    pub fn run() -> anyhow::Result<()> {
        esp_idf_svc::sys::link_patches();

        let peripherals = Peripherals::take()?;
        let sysloop = EspSystemEventLoop::take()?;
        let nvs_partition = EspDefaultNvsPartition::take()?;

        // ---- Logging ------------------------------------------------------
        let uart = UartTxDriver::new(
            peripherals.uart1,
            peripherals.pins.gpio21, // PIN_UART_TX
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &UartConfig::default().baudrate(Hertz(UART_BAUD)),
        )?;
        logger::init(
            vec![Box::new(StdoutSink), Box::new(UartSink::new(uart))],
            LevelFilter::Info,
        )
        .map_err(|e| anyhow::anyhow!("logger init failed: {}", e))?;
        log::info!("Console LED trigger starting");

        // ---- Persistent configuration --------------------------------------
        let tuning = Tuning::default();
        let mac = factory_mac()?;
        let store = Store::open(
            NvsStore::new(nvs_partition.clone())?,
            tuning.default_threshold_on,
            default_device_name(mac),
        );

        // ---- Peripherals ---------------------------------------------------
        let adc = OneshotAdc::new(esp_idf_sys::adc_channel_t_ADC_CHANNEL_0)?; // PIN_CURRENT_SENSE
        let strip = Ws2812::new(peripherals.rmt.channel0, peripherals.pins.gpio3)?; // PIN_LED_DATA

        let calibrate_pin = input_pullup(peripherals.pins.gpio1)?; // PIN_CALIBRATE_BUTTON
        let encoder_a = input_pullup(peripherals.pins.gpio4)?; // PIN_ENCODER_A
        let encoder_b = input_pullup(peripherals.pins.gpio5)?; // PIN_ENCODER_B
        let encoder_sw = input_pullup(peripherals.pins.gpio6)?; // PIN_ENCODER_SW
        let network_strap = input_pullup(peripherals.pins.gpio7)?; // PIN_NETWORK_ENABLE
        let reset_pin = input_pullup(peripherals.pins.gpio10)?; // PIN_RESET_BUTTON

        // ---- Network (optional) --------------------------------------------
        let (command_tx, command_rx) = mpsc::channel();
        let credentials = if network_strap.is_low() {
            Credentials::load(store.backend())
        } else {
            log::info!("Network strap open, running offline");
            None
        };

        let leds = LedOutput::new(strip, FreeRtos, store.brightness());
        let controller = Controller::new(store, leds, tuning);
        let sampler = Sampler::new(adc, SensorModel::ACS712_5A);
        let mut app = App::new(sampler, controller, FreeRtos, tuning);

        // Keep the Wi-Fi driver alive for the lifetime of the loop.
        let mut _wifi = None;
        let mut bridge = None;
        if let Some(creds) = credentials {
            match network::connect_wifi(peripherals.modem, sysloop, nvs_partition, &creds) {
                Ok(wifi) => {
                    _wifi = Some(wifi);
                    let boot_time = network::sync_boot_time(SNTP_TIMEOUT_MS);
                    app.controller_mut().set_boot_time(boot_time);
                    match MqttBridge::start(&creds, Topics::from_mac(mac), command_tx) {
                        Ok(b) => bridge = Some(b),
                        Err(e) => log::error!("MQTT start failed: {}", e),
                    }
                }
                Err(e) => log::error!("Wi-Fi failed, running offline: {}", e),
            }
        }

        // ---- Control loop ---------------------------------------------------
        let mut reset_button = Debouncer::calibrate_button(&tuning);
        let interval = Duration::from_millis(LOOP_INTERVAL_MS);
        log::info!(
            "Running: threshold on {:.3} A / off {:.3} A",
            app.controller().threshold_on(),
            app.controller().threshold_off()
        );

        loop {
            let now = now_ms();
            let raw = RawInputs {
                calibrate_pressed: calibrate_pin.is_low(),
                encoder_pressed: encoder_sw.is_low(),
                encoder_a: encoder_a.is_high(),
                encoder_b: encoder_b.is_high(),
            };

            let snapshot = app.tick(now, raw);
            if let Some(bridge) = &bridge {
                if bridge.take_connected() {
                    bridge.publish_state(&app.controller().snapshot());
                } else if let Some(snapshot) = &snapshot {
                    bridge.publish_state(snapshot);
                }
            }

            for command in command_rx.try_iter() {
                if app.handle_command(command, now) == Outcome::Reboot {
                    restart("remote reboot");
                }
            }

            if reset_button
                .update(now, reset_pin.is_low())
                .is_some_and(|e| e.kind == InputKind::Press)
            {
                restart("reset button");
            }

            thread::sleep(interval);
        }
    }
}
