// Console LED Trigger - ESP-IDF drivers

pub mod adc;
pub mod nvs;
pub mod uart;
pub mod ws2812;
