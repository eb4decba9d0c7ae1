//! Progressive pattern preview geometry.
//!
//! A preview is recomputed from scratch for every (pattern, progress) pair;
//! there is no incremental redraw state.

#![allow(missing_docs)]

use std::fmt::Write as _;

use crate::pattern::{visible_prefix, Pattern};

/// Gap between the table boundary and the viewport edge.
pub const BOUNDARY_MARGIN: f64 = 10.0;

/// Drawing surface size in its own units (pixels, braille dots, ...).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Circular table boundary plus the visible part of the path.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewFrame {
    pub viewport: Viewport,
    pub center: (f64, f64),
    pub radius: f64,
    pub polyline: Vec<(f64, f64)>,
}

impl PreviewFrame {
    /// Consecutive polyline segments, in drawing order.
    pub fn segments(&self) -> impl Iterator<Item = ((f64, f64), (f64, f64))> + '_ {
        self.polyline.windows(2).map(|pair| (pair[0], pair[1]))
    }

    /// Standalone SVG document of the frame.
    #[must_use]
    pub fn to_svg(&self) -> String {
        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.viewport.width,
            h = self.viewport.height
        );
        let _ = writeln!(
            svg,
            r##"  <circle cx="{:.3}" cy="{:.3}" r="{:.3}" fill="none" stroke="#e2e8f0"/>"##,
            self.center.0, self.center.1, self.radius
        );
        if !self.polyline.is_empty() {
            svg.push_str(r##"  <polyline fill="none" stroke="#0F5F91" stroke-width="2" points=""##);
            for (index, (x, y)) in self.polyline.iter().enumerate() {
                if index > 0 {
                    svg.push(' ');
                }
                let _ = write!(svg, "{x:.3},{y:.3}");
            }
            svg.push_str("\"/>\n");
        }
        svg.push_str("</svg>\n");
        svg
    }
}

/// Lay out the visible prefix of `pattern` inside `viewport`.
///
/// The boundary circle is centred and inset by [`BOUNDARY_MARGIN`]; rho 1.0
/// lands on it. Y grows downwards, as on a canvas.
#[must_use]
pub fn render_preview(pattern: &Pattern, progress: f64, viewport: Viewport) -> PreviewFrame {
    let center = (viewport.width / 2.0, viewport.height / 2.0);
    let radius = (center.0.min(center.1) - BOUNDARY_MARGIN).max(0.0);
    let polyline = visible_prefix(pattern, progress)
        .iter()
        .map(|point| {
            let (x, y) = point.to_cartesian(radius);
            (center.0 + x, center.1 + y)
        })
        .collect();
    PreviewFrame {
        viewport,
        center,
        radius,
        polyline,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::PatternPoint;

    fn square_pattern() -> Pattern {
        Pattern::new(vec![
            PatternPoint::new(0.0, 1.0),
            PatternPoint::new(std::f64::consts::FRAC_PI_2, 1.0),
            PatternPoint::new(std::f64::consts::PI, 1.0),
            PatternPoint::new(0.0, 0.0),
        ])
    }

    #[test]
    fn boundary_is_inscribed_with_margin() {
        let frame = render_preview(&square_pattern(), 100.0, Viewport::new(400.0, 300.0));
        assert_eq!(frame.center, (200.0, 150.0));
        assert_eq!(frame.radius, 140.0);
        assert_eq!(frame.polyline.len(), 4);
        let (x, y) = frame.polyline[0];
        assert!((x - 340.0).abs() < 1e-9 && (y - 150.0).abs() < 1e-9);
        let (x, y) = frame.polyline[1];
        assert!((x - 200.0).abs() < 1e-9 && (y - 290.0).abs() < 1e-9);
    }

    #[test]
    fn progress_redraws_prefix_only() {
        let pattern = square_pattern();
        let viewport = Viewport::new(200.0, 200.0);
        let half = render_preview(&pattern, 50.0, viewport);
        assert_eq!(half.polyline.len(), 2);
        assert_eq!(half.segments().count(), 1);
        let full = render_preview(&pattern, 100.0, viewport);
        assert_eq!(&full.polyline[..2], half.polyline.as_slice());
        assert_eq!(render_preview(&pattern, 50.0, viewport), half);
    }

    #[test]
    fn empty_pattern_draws_boundary_only() {
        let frame = render_preview(&Pattern::default(), 100.0, Viewport::new(100.0, 100.0));
        assert!(frame.polyline.is_empty());
        let svg = frame.to_svg();
        assert!(svg.contains("<circle"));
        assert!(!svg.contains("<polyline"));
    }
}
