//! Session configuration and URL query round-trips.
//!
//! The console keeps no durable state of its own. A session is described by
//! four values (robot address, poll cycle, control mode, secondary address)
//! that travel as URL query parameters, each omitted while it holds its
//! default. An optional `sandbot.toml` can seed the same values.

#![allow(missing_docs)]

use std::path::Path;

use serde::Deserialize;

use crate::error::SandbotError;

/// Seconds between status polls unless configured otherwise.
pub const DEFAULT_POLL_CYCLE_SECS: u64 = 10;
/// Conventional poll cycle bounds offered by the console.
pub const POLL_CYCLE_RANGE: std::ops::RangeInclusive<u64> = 1..=60;

const PARAM_HOST: &str = "hostIP";
const PARAM_POLL_CYCLE: &str = "pollCycle";
const PARAM_WLED_ENABLED: &str = "wledEnabled";
const PARAM_WLED_ADDRESS: &str = "wledAddress";
const PARAM_CONTROL_MODE: &str = "controlMode";

/// Embedded control interface shown next to the robot console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlMode {
    #[default]
    Disabled,
    Wled,
    Legacy,
    Cnc,
}

impl ControlMode {
    pub fn parse(text: &str) -> Result<Self, SandbotError> {
        match text.trim().to_ascii_lowercase().as_str() {
            "disabled" | "off" | "none" => Ok(Self::Disabled),
            "wled" => Ok(Self::Wled),
            "legacy" | "sand" => Ok(Self::Legacy),
            "cnc" => Ok(Self::Cnc),
            _ => Err(SandbotError::InvalidConfig(
                format!("invalid control mode '{text}'").into(),
            )),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Wled => "wled",
            Self::Legacy => "legacy",
            Self::Cnc => "cnc",
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Disabled => "Disabled",
            Self::Wled => "wLED Control",
            Self::Legacy => "Sand UI",
            Self::Cnc => "CNC Control",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub host: String,
    pub poll_cycle_secs: u64,
    pub mode: ControlMode,
    pub secondary_address: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            poll_cycle_secs: DEFAULT_POLL_CYCLE_SECS,
            mode: ControlMode::Disabled,
            secondary_address: String::new(),
        }
    }
}

impl SessionConfig {
    /// Build a config from a query string (`?a=b&c=d`) or a whole URL.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut config = Self::default();
        config.apply_query(query);
        config
    }

    /// Overwrite fields named in the query; unknown or invalid values are
    /// ignored.
    pub fn apply_query(&mut self, query: &str) {
        let query = query.split_once('?').map_or(query, |(_, rest)| rest);
        let query = query.split_once('#').map_or(query, |(head, _)| head);
        let mut explicit_mode = None;
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = decode_component(value);
            match key {
                PARAM_HOST => self.host = value,
                PARAM_POLL_CYCLE => {
                    if let Ok(cycle) = value.trim().parse::<u64>() {
                        if cycle > 0 {
                            self.poll_cycle_secs = cycle;
                        }
                    }
                }
                PARAM_WLED_ENABLED => {
                    self.mode = if value.eq_ignore_ascii_case("true") {
                        ControlMode::Wled
                    } else {
                        ControlMode::Disabled
                    };
                }
                PARAM_CONTROL_MODE => explicit_mode = ControlMode::parse(&value).ok(),
                PARAM_WLED_ADDRESS => self.secondary_address = value,
                _ => {}
            }
        }
        if let Some(mode) = explicit_mode {
            self.mode = mode;
        }
    }

    /// Query string holding only non-default values, without the `?`.
    #[must_use]
    pub fn to_query(&self) -> String {
        let mut params = Vec::new();
        if !self.host.is_empty() {
            params.push(format!("{PARAM_HOST}={}", urlencoding::encode(&self.host)));
        }
        if self.poll_cycle_secs != DEFAULT_POLL_CYCLE_SECS {
            params.push(format!("{PARAM_POLL_CYCLE}={}", self.poll_cycle_secs));
        }
        match self.mode {
            ControlMode::Disabled => {}
            ControlMode::Wled => params.push(format!("{PARAM_WLED_ENABLED}=true")),
            mode => params.push(format!("{PARAM_CONTROL_MODE}={}", mode.as_str())),
        }
        if !self.secondary_address.is_empty() && self.secondary_address != self.host {
            params.push(format!(
                "{PARAM_WLED_ADDRESS}={}",
                urlencoding::encode(&self.secondary_address)
            ));
        }
        params.join("&")
    }

    /// Secondary (wLED) address, defaulting to the robot address.
    #[must_use]
    pub fn secondary_or_host(&self) -> &str {
        if self.secondary_address.is_empty() {
            &self.host
        } else {
            &self.secondary_address
        }
    }

    /// URL of the embedded control interface for the current mode.
    #[must_use]
    pub fn interface_url(&self) -> Option<String> {
        let url = match self.mode {
            ControlMode::Disabled => return None,
            ControlMode::Wled => {
                let target = self.secondary_or_host();
                if target.is_empty() {
                    return None;
                }
                format!("http://{target}")
            }
            ControlMode::Legacy if !self.host.is_empty() => {
                format!("http://{}/sand.html", self.host)
            }
            ControlMode::Cnc if !self.host.is_empty() => format!("http://{}/cnc.html", self.host),
            ControlMode::Legacy | ControlMode::Cnc => return None,
        };
        Some(url)
    }

    /// Load the `[session]` table of a `sandbot.toml` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SandbotError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            SandbotError::InvalidConfig(format!("{}: {err}", path.display()).into())
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, SandbotError> {
        let raw: ConfigToml = toml::from_str(text)
            .map_err(|err| SandbotError::InvalidConfig(format!("sandbot.toml: {err}").into()))?;
        raw.session.unwrap_or_default().into_config()
    }
}

fn decode_component(value: &str) -> String {
    let spaced = value.replace('+', " ");
    urlencoding::decode(&spaced).map_or(spaced.clone(), |decoded| decoded.into_owned())
}

#[derive(Debug, Deserialize)]
struct ConfigToml {
    session: Option<SessionSection>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionSection {
    host: Option<String>,
    poll_cycle_secs: Option<u64>,
    mode: Option<String>,
    wled_address: Option<String>,
}

impl SessionSection {
    fn into_config(self) -> Result<SessionConfig, SandbotError> {
        let poll_cycle_secs = self.poll_cycle_secs.unwrap_or(DEFAULT_POLL_CYCLE_SECS);
        if poll_cycle_secs == 0 {
            return Err(SandbotError::InvalidConfig(
                "session.poll_cycle_secs must be greater than zero".into(),
            ));
        }
        let mode = match self.mode.as_deref() {
            Some(mode) => ControlMode::parse(mode)?,
            None => ControlMode::Disabled,
        };
        Ok(SessionConfig {
            host: self.host.unwrap_or_default().trim().to_string(),
            poll_cycle_secs,
            mode,
            secondary_address: self.wled_address.unwrap_or_default().trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_produce_an_empty_query() {
        assert_eq!(SessionConfig::default().to_query(), "");
        assert_eq!(SessionConfig::from_query(""), SessionConfig::default());
    }

    #[test]
    fn query_round_trips_non_default_values() {
        let config = SessionConfig {
            host: "192.168.1.40".into(),
            poll_cycle_secs: 3,
            mode: ControlMode::Wled,
            secondary_address: "lights.local".into(),
        };
        let query = config.to_query();
        assert_eq!(
            query,
            "hostIP=192.168.1.40&pollCycle=3&wledEnabled=true&wledAddress=lights.local"
        );
        assert_eq!(SessionConfig::from_query(&query), config);
        let url = format!("http://console.local/?{query}#status");
        assert_eq!(SessionConfig::from_query(&url), config);
    }

    #[test]
    fn secondary_equal_to_host_is_omitted() {
        let config = SessionConfig {
            host: "sandbot.local".into(),
            secondary_address: "sandbot.local".into(),
            mode: ControlMode::Cnc,
            ..SessionConfig::default()
        };
        assert_eq!(config.to_query(), "hostIP=sandbot.local&controlMode=cnc");
    }

    #[test]
    fn invalid_poll_cycle_is_ignored() {
        for bad in ["0", "-4", "ten", ""] {
            let config = SessionConfig::from_query(&format!("pollCycle={bad}"));
            assert_eq!(config.poll_cycle_secs, DEFAULT_POLL_CYCLE_SECS);
        }
    }

    #[test]
    fn interface_urls_follow_mode() {
        let mut config = SessionConfig {
            host: "sandbot.local".into(),
            ..SessionConfig::default()
        };
        assert_eq!(config.interface_url(), None);
        config.mode = ControlMode::Wled;
        assert_eq!(config.interface_url().as_deref(), Some("http://sandbot.local"));
        config.secondary_address = "lights.local".into();
        assert_eq!(config.interface_url().as_deref(), Some("http://lights.local"));
        config.mode = ControlMode::Legacy;
        assert_eq!(
            config.interface_url().as_deref(),
            Some("http://sandbot.local/sand.html")
        );
        config.mode = ControlMode::Cnc;
        assert_eq!(
            config.interface_url().as_deref(),
            Some("http://sandbot.local/cnc.html")
        );
    }

    #[test]
    fn toml_session_section() {
        let config = SessionConfig::from_toml(
            "[session]\nhost = \"sandbot.local\"\npoll_cycle_secs = 5\nmode = \"legacy\"\n",
        )
        .unwrap();
        assert_eq!(config.host, "sandbot.local");
        assert_eq!(config.poll_cycle_secs, 5);
        assert_eq!(config.mode, ControlMode::Legacy);
        assert_eq!(SessionConfig::from_toml("").unwrap(), SessionConfig::default());
        assert!(SessionConfig::from_toml("[session]\npoll_cycle_secs = 0\n").is_err());
        assert!(SessionConfig::from_toml("[session]\nmode = \"laser\"\n").is_err());
    }
}
