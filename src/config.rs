// Console LED Trigger - Hardware & System Configuration
// Target: ESP32-C3 SuperMini (RISC-V)

use smart_leds::RGB8;

// ---------------------------------------------------------------------------
// GPIO Pin Definitions
// ---------------------------------------------------------------------------
pub const PIN_CURRENT_SENSE: i32 = 0; // ADC1 channel 0 - ACS712 output via divider
pub const PIN_CALIBRATE_BUTTON: i32 = 1; // INPUT_PULLUP, active LOW
pub const PIN_LED_DATA: i32 = 3; // WS2812 data (RMT channel 0)
pub const PIN_ENCODER_A: i32 = 4;
pub const PIN_ENCODER_B: i32 = 5;
pub const PIN_ENCODER_SW: i32 = 6; // INPUT_PULLUP, active LOW
pub const PIN_NETWORK_ENABLE: i32 = 7; // strap to GND to enable Wi-Fi/MQTT
pub const PIN_RESET_BUTTON: i32 = 10; // INPUT_PULLUP, active LOW
pub const PIN_UART_TX: i32 = 21; // diagnostic mirror (UART1)
pub const UART_BAUD: u32 = 115_200;

// ---------------------------------------------------------------------------
// Task Stack Sizes (bytes)
// ---------------------------------------------------------------------------
pub const STACK_MQTT: usize = 6144;

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const LOOP_INTERVAL_MS: u64 = 10; // 100 Hz control loop
pub const DEBOUNCE_MS: u32 = 50;
pub const DOUBLE_CLICK_WINDOW_MS: u32 = 400;
pub const CALIBRATE_LONG_PRESS_MS: u32 = 3000; // hold to start calibration
pub const ENCODER_LONG_PRESS_MS: u32 = 2000; // hold to toggle brightness mode
pub const CALIBRATION_SAMPLES: usize = 32;
pub const CALIBRATION_SAMPLE_DELAY_MS: u32 = 10;
pub const SNTP_TIMEOUT_MS: u64 = 5000;

// ---------------------------------------------------------------------------
// Current Sensor (ACS712-05B behind a 10k / 4.7k divider)
// ---------------------------------------------------------------------------
pub const ADC_REF_VOLTAGE: f32 = 3.3;
pub const ADC_MAX_VALUE: f32 = 4095.0;
pub const DIVIDER_R_TOP: f32 = 10.0;
pub const DIVIDER_R_BOTTOM: f32 = 4.7;
pub const SENSOR_ZERO_CURRENT_VOLTAGE: f32 = 2.5;
pub const SENSOR_SENSITIVITY: f32 = 0.185; // V/A
pub const SMOOTHING_ALPHA: f32 = 0.1;

// ---------------------------------------------------------------------------
// Power Thresholds (amps)
// ---------------------------------------------------------------------------
pub const DEFAULT_THRESHOLD_ON: f32 = 0.045;
pub const THRESHOLD_MARGIN: f32 = 0.010;

// ---------------------------------------------------------------------------
// LED Strip
// ---------------------------------------------------------------------------
pub const NUM_PIXELS: usize = 15;
pub const DEFAULT_BRIGHTNESS: u8 = 128;
pub const BRIGHTNESS_STEP: u8 = 5;
pub const CONFIRM_BLINKS: usize = 2;
pub const CONFIRM_BLINK_MS: u32 = 150;
pub const IDENTIFY_BLINKS: usize = 3;
pub const IDENTIFY_BLINK_MS: u32 = 100;

pub const CALIBRATION_COLOR: RGB8 = RGB8 { r: 0, g: 0, b: 255 };
pub const SUCCESS_COLOR: RGB8 = RGB8 { r: 0, g: 255, b: 0 };
pub const FAILURE_COLOR: RGB8 = RGB8 { r: 255, g: 0, b: 0 };
pub const IDENTIFY_COLOR: RGB8 = RGB8 { r: 255, g: 255, b: 255 };

/// Colors selectable from the button and encoder.
pub const PALETTE: [RGB8; 9] = [
    RGB8 { r: 255, g: 0, b: 0 },     // red
    RGB8 { r: 0, g: 255, b: 0 },     // green
    RGB8 { r: 0, g: 0, b: 255 },     // blue
    RGB8 { r: 255, g: 255, b: 0 },   // yellow
    RGB8 { r: 0, g: 255, b: 255 },   // cyan
    RGB8 { r: 255, g: 0, b: 255 },   // magenta
    RGB8 { r: 255, g: 128, b: 0 },   // orange
    RGB8 { r: 128, g: 0, b: 255 },   // purple
    RGB8 { r: 255, g: 255, b: 255 }, // white
];

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------
pub const ENCODER_STEPS_PER_DETENT: i8 = 4;

// ---------------------------------------------------------------------------
// Persistence & Network
// ---------------------------------------------------------------------------
pub const NVS_NAMESPACE: &str = "led-config";
pub const DEVICE_NAME_PREFIX: &str = "Console-";
pub const TOPIC_ROOT: &str = "console";

pub const WIFI_SSID: Option<&str> = option_env!("CONSOLE_WIFI_SSID");
pub const WIFI_PASS: Option<&str> = option_env!("CONSOLE_WIFI_PASS");
pub const MQTT_URL: Option<&str> = option_env!("CONSOLE_MQTT_URL");

// ---------------------------------------------------------------------------
// Runtime tuning
// ---------------------------------------------------------------------------

/// Parameters the control core reads at runtime.
///
/// Firmware always uses [`Tuning::default`]; tests construct variants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    pub debounce_ms: u32,
    pub double_click_ms: u32,
    pub calibrate_long_press_ms: u32,
    pub encoder_long_press_ms: u32,
    pub default_threshold_on: f32,
    pub threshold_margin: f32,
    pub calibration_samples: usize,
    pub calibration_sample_delay_ms: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            debounce_ms: DEBOUNCE_MS,
            double_click_ms: DOUBLE_CLICK_WINDOW_MS,
            calibrate_long_press_ms: CALIBRATE_LONG_PRESS_MS,
            encoder_long_press_ms: ENCODER_LONG_PRESS_MS,
            default_threshold_on: DEFAULT_THRESHOLD_ON,
            threshold_margin: THRESHOLD_MARGIN,
            calibration_samples: CALIBRATION_SAMPLES,
            calibration_sample_delay_ms: CALIBRATION_SAMPLE_DELAY_MS,
        }
    }
}
