//! Marker styling by magnitude and depth.
//!
//! `DEPTH_BINS` is the one table both marker fills and the legend read from.

use serde::Serialize;

use crate::models::Feature;

/// Radius multiplier applied to magnitude so markers stay readable.
pub const MAGNITUDE_SCALE: f64 = 5.0;

/// Radius used when an event has no magnitude.
pub const FALLBACK_RADIUS: f64 = 0.5;

/// Fill used when an event has no depth.
pub const FALLBACK_COLOR: &str = "black";

/// Resting fill opacity of every marker.
pub const REST_FILL_OPACITY: f64 = 0.75;

/// Fill opacity while the pointer is over a marker.
pub const HIGHLIGHT_FILL_OPACITY: f64 = 0.9;

/// One depth range and its display color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DepthBin {
    /// Inclusive upper bound in km; `None` for the final open-ended bin.
    pub upper_bound: Option<f64>,
    pub color: &'static str,
    pub label: &'static str,
}

impl DepthBin {
    const fn bounded(upper: f64, color: &'static str, label: &'static str) -> Self {
        Self {
            upper_bound: Some(upper),
            color,
            label,
        }
    }

    /// Whether a depth falls in this bin, assuming all earlier bins missed.
    #[must_use]
    pub fn admits(&self, depth_km: f64) -> bool {
        self.upper_bound.is_none_or(|upper| depth_km <= upper)
    }
}

/// Depth bins in ascending order. The last bin is unbounded.
pub static DEPTH_BINS: [DepthBin; 7] = [
    DepthBin::bounded(0.0, "lawngreen", "0 or Lower"),
    DepthBin::bounded(1.0, "lime", "1 to 10"),
    DepthBin::bounded(3.0, "yellowgreen", "11 to 30"),
    DepthBin::bounded(5.0, "yellow", "31 to 50"),
    DepthBin::bounded(7.0, "orange", "51 to 70"),
    DepthBin::bounded(9.0, "darkorange", "71 to 90"),
    DepthBin {
        upper_bound: None,
        color: "darkred",
        label: "90 or Higher",
    },
];

/// Find the first bin, in ascending order, that admits a depth.
#[must_use]
pub fn depth_bin(depth_km: f64) -> &'static DepthBin {
    let last = &DEPTH_BINS[DEPTH_BINS.len() - 1];
    DEPTH_BINS
        .iter()
        .find(|bin| bin.admits(depth_km))
        .unwrap_or(last)
}

/// Select the fill color for a depth.
#[must_use]
pub fn depth_color(depth_km: f64) -> &'static str {
    depth_bin(depth_km).color
}

/// Circle marker path options, serialized with Leaflet's option names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerStyle {
    pub radius: f64,
    pub fill_color: &'static str,
    /// Stroke color
    pub color: &'static str,
    /// Stroke weight in pixels
    pub weight: f64,
    pub opacity: f64,
    pub fill_opacity: f64,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            radius: FALLBACK_RADIUS,
            fill_color: FALLBACK_COLOR,
            color: "transparent",
            weight: 1.5,
            opacity: 1.0,
            fill_opacity: REST_FILL_OPACITY,
        }
    }
}

/// Compute the marker style for a feature.
///
/// Missing magnitude or depth fall back to `FALLBACK_RADIUS` and
/// `FALLBACK_COLOR`; this never fails.
#[must_use]
pub fn marker_style(feature: &Feature) -> MarkerStyle {
    let mut style = MarkerStyle::default();

    if let Some(mag) = feature.properties.mag {
        style.radius = mag * MAGNITUDE_SCALE;
    }

    if let Some(depth) = feature.depth_km() {
        style.fill_color = depth_color(depth);
    }

    style
}

/// Fill opacities swapped on pointer enter and leave.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoverStyle {
    pub highlight_fill_opacity: f64,
    pub rest_fill_opacity: f64,
}

impl Default for HoverStyle {
    fn default() -> Self {
        Self {
            highlight_fill_opacity: HIGHLIGHT_FILL_OPACITY,
            rest_fill_opacity: REST_FILL_OPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Geometry;

    fn quake(mag: Option<f64>, depth: Option<f64>) -> Feature {
        let mut feature = Feature {
            geometry: depth.map(|d| Geometry::point(-100.0, 40.0, d)),
            ..Feature::default()
        };
        feature.properties.mag = mag;
        feature
    }

    #[test]
    fn test_depth_bin_boundaries() {
        let cases = [
            (-3.0, "lawngreen"),
            (0.0, "lawngreen"),
            (0.5, "lime"),
            (1.0, "lime"),
            (2.9, "yellowgreen"),
            (3.0, "yellowgreen"),
            (5.0, "yellow"),
            (6.0, "orange"),
            (7.0, "orange"),
            (9.0, "darkorange"),
            (9.01, "darkred"),
            (650.0, "darkred"),
        ];
        for (depth, expected) in cases {
            assert_eq!(depth_color(depth), expected, "depth {depth}");
        }
    }

    #[test]
    fn test_bins_ascend_and_end_unbounded() {
        let bounds: Vec<f64> = DEPTH_BINS.iter().filter_map(|b| b.upper_bound).collect();
        assert_eq!(bounds.len(), DEPTH_BINS.len() - 1);
        assert!(bounds.windows(2).all(|w| w[0] < w[1]));
        assert!(DEPTH_BINS[DEPTH_BINS.len() - 1].upper_bound.is_none());
    }

    #[test]
    fn test_radius_scales_with_magnitude() {
        for mag in [-0.4, 0.0, 1.3, 4.0, 7.8] {
            let style = marker_style(&quake(Some(mag), Some(10.0)));
            assert!((style.radius - mag * 5.0).abs() < 1e-9, "mag {mag}");
        }
    }

    #[test]
    fn test_missing_magnitude_uses_fallback_radius() {
        let style = marker_style(&quake(None, Some(2.0)));
        assert!((style.radius - 0.5).abs() < f64::EPSILON);
        assert_eq!(style.fill_color, "yellowgreen");
    }

    #[test]
    fn test_missing_geometry_is_black() {
        let style = marker_style(&quake(Some(6.1), None));
        assert_eq!(style.fill_color, "black");
        assert!((style.radius - 30.5).abs() < 1e-9);
    }

    #[test]
    fn test_fixed_stroke_and_opacity() {
        let style = marker_style(&quake(Some(3.0), Some(4.0)));
        assert_eq!(style.color, "transparent");
        assert!((style.weight - 1.5).abs() < f64::EPSILON);
        assert!((style.opacity - 1.0).abs() < f64::EPSILON);
        assert!((style.fill_opacity - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_style_serializes_with_leaflet_names() {
        let json = serde_json::to_value(MarkerStyle::default()).unwrap();
        assert_eq!(json["fillColor"], "black");
        assert_eq!(json["fillOpacity"], 0.75);
        assert_eq!(json["radius"], 0.5);
    }
}
