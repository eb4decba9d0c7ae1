//! Pattern parsing and draw-time estimation.
//!
//! A pattern file holds one polar point per line, `"<theta> <rho>"`, with
//! theta in radians and rho as a fraction of the table radius. The draw-time
//! estimate walks straight segments between consecutive points at the mean
//! axis speed; it ignores acceleration, cornering and the robot's own path
//! planning, so treat it as an approximation rather than a simulation.

#![allow(missing_docs)]

use std::fmt::Write as _;

use crate::settings::RobotGeometryConfig;

/// Marker rendered for unknown or invalid durations.
pub const DURATION_UNAVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternPoint {
    pub theta: f64,
    pub rho: f64,
}

impl PatternPoint {
    #[must_use]
    pub fn new(theta: f64, rho: f64) -> Self {
        Self { theta, rho }
    }

    /// Cartesian position for a table of the given radius.
    #[must_use]
    pub fn to_cartesian(self, radius: f64) -> (f64, f64) {
        let r = self.rho * radius;
        (r * self.theta.cos(), r * self.theta.sin())
    }
}

/// Ordered sequence of polar points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pattern {
    points: Vec<PatternPoint>,
}

impl Pattern {
    #[must_use]
    pub fn new(points: Vec<PatternPoint>) -> Self {
        Self { points }
    }

    #[must_use]
    pub fn points(&self) -> &[PatternPoint] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl FromIterator<PatternPoint> for Pattern {
    fn from_iter<T: IntoIterator<Item = PatternPoint>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Parse pattern text, dropping lines that do not start with two finite
/// numbers. Order is preserved; extra tokens after rho are ignored.
#[must_use]
pub fn parse_pattern(text: &str) -> Pattern {
    text.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<PatternPoint> {
    let mut tokens = line.split_whitespace();
    let theta = tokens.next()?.parse::<f64>().ok()?;
    let rho = tokens.next()?.parse::<f64>().ok()?;
    (theta.is_finite() && rho.is_finite()).then_some(PatternPoint { theta, rho })
}

/// Encode a pattern back to the line-based file format.
#[must_use]
pub fn encode_pattern(pattern: &Pattern) -> String {
    let mut out = String::with_capacity(pattern.len() * 16);
    for (index, point) in pattern.points().iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        let _ = write!(out, "{} {}", point.theta, point.rho);
    }
    out
}

/// Total straight-segment path length in table units.
#[must_use]
pub fn path_length(pattern: &Pattern, geometry: &RobotGeometryConfig) -> f64 {
    let radius = geometry.max_radius();
    pattern
        .points()
        .windows(2)
        .map(|pair| {
            let (x0, y0) = pair[0].to_cartesian(radius);
            let (x1, y1) = pair[1].to_cartesian(radius);
            (x1 - x0).hypot(y1 - y0)
        })
        .sum()
}

/// Estimated draw time in seconds, or `None` when it cannot be known
/// (fewer than two points, or a geometry without a usable speed).
#[must_use]
pub fn estimate_draw_time(pattern: &Pattern, geometry: &RobotGeometryConfig) -> Option<f64> {
    if pattern.len() < 2 {
        return None;
    }
    let speed = geometry.average_speed();
    if !speed.is_finite() || speed <= 0.0 {
        return None;
    }
    let seconds = path_length(pattern, geometry) / speed;
    seconds.is_finite().then_some(seconds)
}

/// Render seconds as `1h 1m 1s`, `1m 5s` or `0s`.
#[must_use]
pub fn format_duration(seconds: Option<f64>) -> String {
    let Some(seconds) = seconds.filter(|s| s.is_finite() && *s >= 0.0) else {
        return DURATION_UNAVAILABLE.to_string();
    };
    let total = seconds.floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Points visible at `progress` percent (clamped to 0..=100).
#[must_use]
pub fn visible_prefix(pattern: &Pattern, progress: f64) -> &[PatternPoint] {
    let progress = if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 100.0)
    };
    let count = (pattern.len() as f64 * progress / 100.0).floor() as usize;
    &pattern.points()[..count.min(pattern.len())]
}
