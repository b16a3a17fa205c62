//! The mapping widget seam.
//!
//! The renderer only ever talks to a [`MapWidget`]. The Leaflet page in
//! `leaflet.rs` is the production implementation; tests record the calls.

use serde::Serialize;

use crate::style::{HoverStyle, MarkerStyle};

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl std::str::FromStr for LatLng {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| format!("center requires lat,lon, got {s}"))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|e| format!("invalid latitude: {e}"))?;
        let lng: f64 = lng
            .trim()
            .parse()
            .map_err(|e| format!("invalid longitude: {e}"))?;

        if !(-90.0..=90.0).contains(&lat) {
            return Err(format!("latitude {lat} out of range [-90, 90]"));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(format!("longitude {lng} out of range [-180, 180]"));
        }
        Ok(Self { lat, lng })
    }
}

/// Geographic center of the contiguous United States.
pub const DEFAULT_CENTER: LatLng = LatLng::new(37.0902, -95.7129);

/// Initial zoom level.
pub const DEFAULT_ZOOM: u8 = 4;

/// Where the map is mounted and what it initially shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    /// Id of the container element the map mounts into
    pub container: String,
    pub center: LatLng,
    pub zoom: u8,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            container: "map".into(),
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
        }
    }
}

/// A base map served from a templated tile URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileLayer {
    /// Name shown in the layer switcher
    pub name: String,
    pub url_template: String,
    /// Attribution HTML required by the tile provider
    pub attribution: String,
}

/// A circle marker placed on an overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircleMarker {
    pub position: LatLng,
    pub style: MarkerStyle,
}

/// Handle to a marker previously added to a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerId(pub usize);

/// Corner a control is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlPosition {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

/// A legend row: a colored swatch followed by its label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub color: String,
    pub label: String,
}

/// A static legend panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub position: ControlPosition,
    pub title: String,
    pub entries: Vec<LegendEntry>,
}

/// A visible status message, used to surface a failed fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub position: ControlPosition,
    pub message: String,
}

/// Controls drawn over the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Control {
    /// Switcher between base layers, with toggles for overlays
    #[serde(rename_all = "camelCase")]
    Layers {
        base_layers: Vec<String>,
        overlays: Vec<String>,
    },
    Legend(Legend),
    Notice(Notice),
}

/// The minimal surface a map rendering library must offer.
pub trait MapWidget {
    /// Set the mount point, center and zoom.
    fn set_view(&mut self, view: MapView);

    /// Add a base layer. At most one base layer should be active.
    fn add_base_layer(&mut self, layer: TileLayer, active: bool);

    /// Register a named overlay that markers can be added to.
    fn add_overlay_layer(&mut self, name: &str, active: bool);

    /// Place a circle marker on the named overlay.
    fn add_circle_marker(&mut self, overlay: &str, marker: CircleMarker) -> MarkerId;

    /// Attach popup HTML shown when the marker is clicked.
    fn bind_popup(&mut self, marker: MarkerId, html: String);

    /// Swap the marker's fill opacity while the pointer is over it.
    fn bind_hover(&mut self, marker: MarkerId, hover: HoverStyle);

    fn add_control(&mut self, control: Control);
}
