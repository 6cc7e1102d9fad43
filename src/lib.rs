// Console LED Trigger - Library Root
//
// Hardware-independent control core plus, on the device target, the ESP-IDF
// drivers and network tasks that feed it. The core builds and tests on the host.

pub mod app;
pub mod config;
pub mod events;
pub mod input;
pub mod led;
pub mod logger;
pub mod machine;
pub mod mock;
pub mod remote;
pub mod sensor;
pub mod state;
pub mod store;
pub mod timing;

#[cfg(target_os = "espidf")]
pub mod drivers;
#[cfg(target_os = "espidf")]
pub mod tasks;
