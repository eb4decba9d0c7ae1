//! Robot geometry settings.

#![allow(missing_docs)]

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Robot type whose geometry drives the draw-time estimate.
pub const SAND_TABLE_ROBOT_TYPE: &str = "SandTableScara";

const DEFAULT_MAX_SPEED: f64 = 10.0;
const DEFAULT_MAX_VAL: f64 = 100.0;

/// Speed and reach limits of one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisLimits {
    pub max_speed: f64,
    pub max_val: f64,
}

impl Default for AxisLimits {
    fn default() -> Self {
        Self {
            max_speed: DEFAULT_MAX_SPEED,
            max_val: DEFAULT_MAX_VAL,
        }
    }
}

/// Two-axis geometry used for time estimates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RobotGeometryConfig {
    pub axis0: AxisLimits,
    pub axis1: AxisLimits,
}

impl RobotGeometryConfig {
    #[must_use]
    pub fn max_radius(&self) -> f64 {
        self.axis0.max_val.max(self.axis1.max_val)
    }

    #[must_use]
    pub fn average_speed(&self) -> f64 {
        (self.axis0.max_speed + self.axis1.max_speed) / 2.0
    }

    /// Replace the geometry from a `/getsettings` body.
    ///
    /// Only a sand-table robot overwrites the config, and then wholesale;
    /// any other body leaves it untouched. Returns whether it changed hands.
    pub fn apply_settings(&mut self, settings: &Value) -> bool {
        let Ok(raw) = SettingsJson::deserialize(settings) else {
            debug!("settings body has no robotConfig; geometry unchanged");
            return false;
        };
        let Some(robot) = raw.robot_config else {
            return false;
        };
        if robot.robot_type.as_deref() != Some(SAND_TABLE_ROBOT_TYPE) {
            debug!(robot_type = ?robot.robot_type, "not a sand table; geometry unchanged");
            return false;
        }
        let geom = robot.robot_geom.unwrap_or_default();
        *self = Self {
            axis0: geom.axis0.unwrap_or_default().into_limits(),
            axis1: geom.axis1.unwrap_or_default().into_limits(),
        };
        true
    }
}

#[derive(Debug, Deserialize)]
struct SettingsJson {
    #[serde(rename = "robotConfig")]
    robot_config: Option<RobotConfigJson>,
}

#[derive(Debug, Deserialize)]
struct RobotConfigJson {
    #[serde(rename = "robotType")]
    robot_type: Option<String>,
    #[serde(rename = "robotGeom")]
    robot_geom: Option<RobotGeomJson>,
}

#[derive(Debug, Default, Deserialize)]
struct RobotGeomJson {
    axis0: Option<AxisJson>,
    axis1: Option<AxisJson>,
}

#[derive(Debug, Default, Deserialize)]
struct AxisJson {
    #[serde(rename = "maxSpeed")]
    max_speed: Option<f64>,
    #[serde(rename = "maxVal")]
    max_val: Option<f64>,
}

impl AxisJson {
    // Zero or missing values mean "not configured" on the device.
    fn into_limits(self) -> AxisLimits {
        let pick = |value: Option<f64>, default: f64| match value {
            Some(value) if value.is_finite() && value != 0.0 => value,
            _ => default,
        };
        AxisLimits {
            max_speed: pick(self.max_speed, DEFAULT_MAX_SPEED),
            max_val: pick(self.max_val, DEFAULT_MAX_VAL),
        }
    }
}
