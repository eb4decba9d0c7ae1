//! Device status snapshot and derived connection state.

#![allow(missing_docs)]

use std::fmt;

use serde_json::Value;
use smol_str::SmolStr;
use time::OffsetDateTime;

use crate::error::SandbotError;

/// Network details reported alongside the status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkInfo {
    pub ip: Option<SmolStr>,
    pub ssid: Option<SmolStr>,
    pub mac: Option<SmolStr>,
}

/// Last successfully fetched `/status` snapshot.
///
/// Replaced wholesale on every successful poll, never merged.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceStatus {
    pub position: (f64, f64),
    pub queue_depth: u32,
    pub paused: bool,
    pub homed: bool,
    pub firmware: Option<SmolStr>,
    pub network: NetworkInfo,
    pub time_of_day: Option<SmolStr>,
    pub fetched_at: OffsetDateTime,
}

impl DeviceStatus {
    /// Snapshot of an idle robot at the origin, mostly useful for tests.
    #[must_use]
    pub fn idle() -> Self {
        Self {
            position: (0.0, 0.0),
            queue_depth: 0,
            paused: false,
            homed: false,
            firmware: None,
            network: NetworkInfo::default(),
            time_of_day: None,
            fetched_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[must_use]
    pub fn with_queue(mut self, queue_depth: u32, paused: bool) -> Self {
        self.queue_depth = queue_depth;
        self.paused = paused;
        self
    }

    /// Parse the JSON body of `GET /status`.
    ///
    /// Missing fields fall back to neutral values; a body that is not a JSON
    /// object is a parse error.
    pub fn from_json(value: &Value, fetched_at: OffsetDateTime) -> Result<Self, SandbotError> {
        let Some(object) = value.as_object() else {
            return Err(SandbotError::Parse("status is not a JSON object".into()));
        };
        let axis = |index: usize| {
            object
                .get("XYZ")
                .and_then(Value::as_array)
                .and_then(|xyz| xyz.get(index))
                .and_then(Value::as_f64)
                .unwrap_or(0.0)
        };
        let queue_depth = object
            .get("Qd")
            .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f.max(0.0) as u64)))
            .map_or(0, |depth| u32::try_from(depth).unwrap_or(u32::MAX));
        Ok(Self {
            position: (axis(0), axis(1)),
            queue_depth,
            paused: object.get("pause").is_some_and(flag),
            homed: object.get("Hmd").is_some_and(flag),
            firmware: object.get("espV").and_then(text),
            network: NetworkInfo {
                ip: object.get("wifiIP").and_then(text),
                ssid: object.get("ssid").and_then(text),
                mac: object.get("MAC").and_then(text),
            },
            time_of_day: object.get("tod").and_then(text),
            fetched_at,
        })
    }

    /// Label/value rows for display, in a fixed order.
    #[must_use]
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let yes_no = |flag: bool| if flag { "yes" } else { "no" };
        let unknown = |value: &Option<SmolStr>| {
            value
                .as_deref()
                .map_or_else(|| "unknown".to_string(), str::to_string)
        };
        vec![
            (
                "Position",
                format!("x={:.2} y={:.2}", self.position.0, self.position.1),
            ),
            ("Queue", self.queue_depth.to_string()),
            ("Paused", yes_no(self.paused).to_string()),
            ("Homed", yes_no(self.homed).to_string()),
            ("Firmware", unknown(&self.firmware)),
            ("IP", unknown(&self.network.ip)),
            ("SSID", unknown(&self.network.ssid)),
            ("MAC", unknown(&self.network.mac)),
            ("Time", unknown(&self.time_of_day)),
        ]
    }
}

fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n == 1.0),
        Value::String(text) => text.trim() == "1",
        _ => false,
    }
}

fn text(value: &Value) -> Option<SmolStr> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.as_str().into()),
        Value::Number(number) => Some(number.to_string().into()),
        _ => None,
    }
}

/// Coarse activity state shown in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Offline,
    Idle,
    Doodling,
    Paused,
}

impl ConnectionState {
    /// Classify the latest poll outcome.
    ///
    /// A failed last poll is offline regardless of the stale status it left
    /// behind.
    #[must_use]
    pub fn classify(
        has_ever_connected: bool,
        last_poll_succeeded: bool,
        status: Option<&DeviceStatus>,
    ) -> Self {
        let Some(status) = status else {
            return Self::Offline;
        };
        if !has_ever_connected || !last_poll_succeeded {
            return Self::Offline;
        }
        match (status.queue_depth, status.paused) {
            (0, _) => Self::Idle,
            (_, true) => Self::Paused,
            (_, false) => Self::Doodling,
        }
    }

    #[must_use]
    pub fn is_connected(self) -> bool {
        self != Self::Offline
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Idle => "idle",
            Self::Doodling => "doodling",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three-component dotted firmware version (`2.030.001`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FirmwareVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

/// First firmware that accepts `.network` edits.
pub const NETWORK_CONFIG_MIN_FIRMWARE: FirmwareVersion = FirmwareVersion {
    major: 2,
    minor: 30,
    patch: 0,
};

impl FirmwareVersion {
    /// Parse `major.minor.patch`; fewer than three components or a
    /// non-numeric component is unparsable.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.trim().split('.');
        let major = parts.next()?.trim().parse().ok()?;
        let minor = parts.next()?.trim().parse().ok()?;
        let patch = parts.next()?.trim().parse().ok()?;
        Some(Self {
            major,
            minor,
            patch,
        })
    }
}

/// Whether the reported firmware can edit the network configuration.
#[must_use]
pub fn supports_network_config(status: Option<&DeviceStatus>) -> bool {
    status
        .and_then(|status| status.firmware.as_deref())
        .and_then(FirmwareVersion::parse)
        .is_some_and(|version| version >= NETWORK_CONFIG_MIN_FIRMWARE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_maps_device_fields() {
        let body = json!({
            "XYZ": [12.5, -3.0, 0.0],
            "Qd": 4,
            "pause": 1,
            "Hmd": 0,
            "espV": "2.030.001",
            "wifiIP": "192.168.1.40",
            "ssid": "garden",
            "MAC": "aa:bb:cc:dd:ee:ff",
            "tod": "12:00:01"
        });
        let status = DeviceStatus::from_json(&body, OffsetDateTime::UNIX_EPOCH).unwrap();
        assert_eq!(status.position, (12.5, -3.0));
        assert_eq!(status.queue_depth, 4);
        assert!(status.paused);
        assert!(!status.homed);
        assert_eq!(status.firmware.as_deref(), Some("2.030.001"));
        assert_eq!(status.network.ssid.as_deref(), Some("garden"));
        assert_eq!(status.time_of_day.as_deref(), Some("12:00:01"));
    }

    #[test]
    fn status_rejects_non_object() {
        let err = DeviceStatus::from_json(&json!([1, 2]), OffsetDateTime::UNIX_EPOCH).unwrap_err();
        assert!(matches!(err, SandbotError::Parse(_)));
    }

    #[test]
    fn classify_covers_every_combination() {
        let idle = DeviceStatus::idle();
        let running = DeviceStatus::idle().with_queue(3, false);
        let paused = DeviceStatus::idle().with_queue(3, true);
        let paused_empty = DeviceStatus::idle().with_queue(0, true);

        for ever in [false, true] {
            for last in [false, true] {
                assert_eq!(
                    ConnectionState::classify(ever, last, None),
                    ConnectionState::Offline
                );
                for status in [&idle, &running, &paused, &paused_empty] {
                    let state = ConnectionState::classify(ever, last, Some(status));
                    if !(ever && last) {
                        assert_eq!(state, ConnectionState::Offline);
                    }
                }
            }
        }
        let classify = |status| ConnectionState::classify(true, true, Some(status));
        assert_eq!(classify(&idle), ConnectionState::Idle);
        assert_eq!(classify(&running), ConnectionState::Doodling);
        assert_eq!(classify(&paused), ConnectionState::Paused);
        assert_eq!(classify(&paused_empty), ConnectionState::Idle);
    }

    #[test]
    fn summary_rows() {
        let mut status = DeviceStatus::idle().with_queue(2, true);
        status.firmware = Some("2.030.001".into());
        let rows = status
            .summary()
            .into_iter()
            .map(|(label, value)| format!("{label}: {value}"))
            .collect::<Vec<_>>()
            .join("\n");
        insta::assert_snapshot!(rows, @r"
        Position: x=0.00 y=0.00
        Queue: 2
        Paused: yes
        Homed: no
        Firmware: 2.030.001
        IP: unknown
        SSID: unknown
        MAC: unknown
        Time: unknown
        ");
    }

    #[test]
    fn firmware_gate_requires_three_components() {
        let with_fw = |fw: &str| {
            let mut status = DeviceStatus::idle();
            status.firmware = Some(fw.into());
            supports_network_config(Some(&status))
        };
        assert!(with_fw("2.030.000"));
        assert!(with_fw("2.31.0"));
        assert!(with_fw("3.0.0"));
        assert!(!with_fw("2.029.999"));
        assert!(!with_fw("2.30"));
        assert!(!with_fw("v2.30.0"));
        assert!(!supports_network_config(Some(&DeviceStatus::idle())));
        assert!(!supports_network_config(None));
    }
}
