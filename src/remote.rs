// Console LED Trigger - Remote Surface
//
// JSON shapes exchanged with the MQTT bridge: the published device snapshot and
// the inbound commands. Transport lives in `tasks::mqtt`; everything here is
// plain data so the control loop stays the only writer of device state.

use serde::{Deserialize, Serialize};
use smart_leds::RGB8;

use crate::config::TOPIC_ROOT;
use crate::state::{ColorChoice, DeviceState};

// ---------------------------------------------------------------------------
// Published snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ColorReport {
    Palette { index: usize },
    Custom { hex: String },
}

impl From<ColorChoice> for ColorReport {
    fn from(color: ColorChoice) -> Self {
        match color {
            ColorChoice::Palette(index) => Self::Palette { index },
            ColorChoice::Custom(rgb) => Self::Custom {
                hex: format!("{:02X}{:02X}{:02X}", rgb.r, rgb.g, rgb.b),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    pub name: String,
    pub enabled: bool,
    pub color: ColorReport,
    pub brightness: u8,
    pub threshold_on: f32,
    pub threshold_off: f32,
    pub calibration: &'static str,
    pub boot_time: u64,
}

impl DeviceSnapshot {
    pub fn capture(state: &DeviceState, threshold_on: f32, margin: f32) -> Self {
        Self {
            name: state.device_name.clone(),
            enabled: state.leds_on,
            color: state.color.into(),
            brightness: state.brightness,
            threshold_on,
            threshold_off: threshold_on - margin,
            calibration: state.power.as_str(),
            boot_time: state.boot_time,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Inbound commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set {
        color: Option<ColorChoice>,
        brightness: Option<u8>,
    },
    Identify,
    Calibrate,
    Reboot,
    Rename(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command topic `{0}`")]
    UnknownTopic(String),
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("palette index {0} out of range")]
    PaletteIndex(u64),
    #[error("`{0}` is not a RRGGBB color")]
    Hex(String),
    #[error("`set` carries neither color nor brightness")]
    EmptySet,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorField {
    Index(u64),
    Hex(String),
}

#[derive(Deserialize)]
struct SetPayload {
    color: Option<ColorField>,
    brightness: Option<i64>,
}

#[derive(Deserialize)]
struct RenamePayload {
    name: String,
}

/// Parse `RRGGBB` or `#RRGGBB`.
pub fn parse_hex_color(text: &str) -> Option<RGB8> {
    let hex = text.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(RGB8::new(channel(0)?, channel(2)?, channel(4)?))
}

impl Command {
    /// Decode a command from the last topic segment and its payload.
    pub fn parse(action: &str, payload: &[u8]) -> Result<Self, CommandError> {
        match action {
            "set" => {
                let set: SetPayload = serde_json::from_slice(payload)?;
                let color = match set.color {
                    None => None,
                    Some(ColorField::Index(i)) => Some(
                        usize::try_from(i)
                            .ok()
                            .and_then(ColorChoice::palette)
                            .ok_or(CommandError::PaletteIndex(i))?,
                    ),
                    Some(ColorField::Hex(text)) => Some(ColorChoice::Custom(
                        parse_hex_color(&text).ok_or(CommandError::Hex(text))?,
                    )),
                };
                let brightness = set.brightness.map(|b| b.clamp(0, 255) as u8);
                if color.is_none() && brightness.is_none() {
                    return Err(CommandError::EmptySet);
                }
                Ok(Self::Set { color, brightness })
            }
            "identify" => Ok(Self::Identify),
            "calibrate" => Ok(Self::Calibrate),
            "reboot" => Ok(Self::Reboot),
            "name" => {
                let rename: RenamePayload = serde_json::from_slice(payload)?;
                Ok(Self::Rename(rename.name))
            }
            other => Err(CommandError::UnknownTopic(other.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Topics
// ---------------------------------------------------------------------------

/// Command topic suffixes the bridge subscribes to.
pub const COMMAND_ACTIONS: [&str; 5] = ["set", "identify", "calibrate", "reboot", "name"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    node_id: String,
}

impl Topics {
    /// `board-xxxxxx` from the last three MAC bytes.
    pub fn from_mac(mac: [u8; 6]) -> Self {
        Self {
            node_id: format!("board-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    fn topic(&self, leaf: &str) -> String {
        format!("{}/{}/{}", TOPIC_ROOT, self.node_id, leaf)
    }

    pub fn state(&self) -> String {
        self.topic("state")
    }

    pub fn status(&self) -> String {
        self.topic("status")
    }

    pub fn command(&self, action: &str) -> String {
        self.topic(action)
    }

    /// The command action if `topic` is one of ours.
    pub fn action<'t>(&self, topic: &'t str) -> Option<&'t str> {
        let prefix = format!("{}/{}/", TOPIC_ROOT, self.node_id);
        topic
            .strip_prefix(prefix.as_str())
            .filter(|action| COMMAND_ACTIONS.contains(action))
    }
}
