//! Network (`.network`) configuration file.

#![allow(missing_docs)]

use serde::Deserialize;
use serde_json::json;

use crate::error::SandbotError;

/// File system holding the network file.
pub const NETWORK_FS: &str = "sd";
/// Name of the network file on the device.
pub const NETWORK_FILE: &str = ".network";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WifiMode {
    /// Join an existing network (`"yes"`).
    #[default]
    Station,
    /// Run the robot's own access point (`"ap"`).
    AccessPoint,
}

impl WifiMode {
    pub fn parse(text: &str) -> Result<Self, SandbotError> {
        match text.trim().to_ascii_lowercase().as_str() {
            "yes" | "station" | "sta" => Ok(Self::Station),
            "ap" | "access-point" => Ok(Self::AccessPoint),
            _ => Err(SandbotError::InvalidConfig(
                format!("invalid wifi mode '{text}'").into(),
            )),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Station => "yes",
            Self::AccessPoint => "ap",
        }
    }
}

/// Contents of the `.network` file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NetworkConfig {
    pub mode: WifiMode,
    pub ssid: String,
    pub password: String,
    pub hostname: String,
}

#[derive(Debug, Deserialize)]
struct NetworkJson {
    wifi: Option<String>,
    #[serde(rename = "WiFiSSID")]
    ssid: Option<String>,
    #[serde(rename = "WiFiPW")]
    password: Option<String>,
    #[serde(rename = "WiFiHostname")]
    hostname: Option<String>,
}

impl NetworkConfig {
    /// Parse the stored file; an unknown wifi mode falls back to station.
    pub fn from_json(text: &str) -> Result<Self, SandbotError> {
        let raw: NetworkJson = serde_json::from_str(text)?;
        Ok(Self {
            mode: raw
                .wifi
                .as_deref()
                .and_then(|mode| WifiMode::parse(mode).ok())
                .unwrap_or_default(),
            ssid: raw.ssid.unwrap_or_default(),
            password: raw.password.unwrap_or_default(),
            hostname: raw.hostname.unwrap_or_default(),
        })
    }

    /// Serialize for upload. Access-point mode stores only the mode key.
    #[must_use]
    pub fn to_json(&self) -> String {
        let value = match self.mode {
            WifiMode::AccessPoint => json!({ "wifi": "ap" }),
            WifiMode::Station => json!({
                "wifi": "yes",
                "WiFiSSID": self.ssid,
                "WiFiPW": self.password,
                "WiFiHostname": self.hostname,
            }),
        };
        value.to_string()
    }
}
