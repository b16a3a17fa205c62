//! Map composition: base layers, earthquake overlay, popups, legend.
//!
//! Everything here is expressed against [`MapWidget`], so it runs the same
//! against the Leaflet page and against a recording double in tests.

use tracing::debug;

use crate::models::{Feature, FeatureCollection};
use crate::style::{DEPTH_BINS, HoverStyle, marker_style};
use crate::widget::{
    CircleMarker, Control, ControlPosition, LatLng, Legend, LegendEntry, MapView, MapWidget,
    Notice, TileLayer,
};

/// Legend heading.
pub const LEGEND_TITLE: &str = "Depth of Earthquake (km)";

/// OpenStreetMap standard tiles.
#[must_use]
pub fn street_layer() -> TileLayer {
    TileLayer {
        name: "Street".into(),
        url_template: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".into(),
        attribution: r#"&copy; <a href="https://www.openstreetmap.org/copyright">OpenStreetMap</a> contributors"#.into(),
    }
}

/// OpenTopoMap topographic tiles.
#[must_use]
pub fn topo_layer() -> TileLayer {
    TileLayer {
        name: "Topography".into(),
        url_template: "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png".into(),
        attribution: concat!(
            r#"Map data: &copy; <a href="https://www.openstreetmap.org/copyright">OpenStreetMap</a> contributors, "#,
            r#"<a href="http://viewfinderpanoramas.org">SRTM</a> | "#,
            r#"Map style: &copy; <a href="https://opentopomap.org">OpenTopoMap</a> "#,
            r#"(<a href="https://creativecommons.org/licenses/by-sa/3.0/">CC-BY-SA</a>)"#
        )
        .into(),
    }
}

/// Map layout configuration.
#[derive(Debug, Clone)]
pub struct MapConfig {
    pub view: MapView,
    /// Base layers in switcher order; the first one starts active.
    pub base_layers: Vec<TileLayer>,
    pub overlay_name: String,
    pub legend_position: ControlPosition,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            view: MapView::default(),
            base_layers: vec![street_layer(), topo_layer()],
            overlay_name: "Earthquakes".into(),
            legend_position: ControlPosition::BottomRight,
        }
    }
}

/// Counts from one render pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub markers: usize,
    pub popups: usize,
    /// Features with no position, left off the overlay
    pub unplaced: usize,
}

/// Build the full map from a feature collection.
pub fn render_map<W: MapWidget>(
    widget: &mut W,
    config: &MapConfig,
    collection: &FeatureCollection,
) -> RenderStats {
    add_base_map(widget, config);
    widget.add_overlay_layer(&config.overlay_name, true);

    let mut stats = RenderStats::default();
    for feature in &collection.features {
        let Some((lat, lng)) = feature.lat_lon() else {
            debug!(id = ?feature.id, "feature has no position, not placed");
            stats.unplaced += 1;
            continue;
        };

        let marker = CircleMarker {
            position: LatLng::new(lat, lng),
            style: marker_style(feature),
        };
        let id = widget.add_circle_marker(&config.overlay_name, marker);
        stats.markers += 1;

        if let Some(html) = popup_html(feature) {
            widget.bind_popup(id, html);
            stats.popups += 1;
        }
        widget.bind_hover(id, HoverStyle::default());
    }

    add_controls(widget, config);
    debug!(
        markers = stats.markers,
        popups = stats.popups,
        unplaced = stats.unplaced,
        "map rendered"
    );
    stats
}

/// Build the map without data and show why the data is missing.
pub fn render_failure<W: MapWidget>(widget: &mut W, config: &MapConfig, message: &str) {
    add_base_map(widget, config);
    widget.add_overlay_layer(&config.overlay_name, true);
    add_controls(widget, config);
    widget.add_control(Control::Notice(Notice {
        position: ControlPosition::TopLeft,
        message: format!("Earthquake data could not be loaded: {message}"),
    }));
}

fn add_base_map<W: MapWidget>(widget: &mut W, config: &MapConfig) {
    widget.set_view(config.view.clone());
    for (i, layer) in config.base_layers.iter().enumerate() {
        widget.add_base_layer(layer.clone(), i == 0);
    }
}

fn add_controls<W: MapWidget>(widget: &mut W, config: &MapConfig) {
    widget.add_control(Control::Layers {
        base_layers: config.base_layers.iter().map(|l| l.name.clone()).collect(),
        overlays: vec![config.overlay_name.clone()],
    });
    widget.add_control(Control::Legend(depth_legend(config.legend_position)));
}

/// Legend listing every depth bin, in table order.
#[must_use]
pub fn depth_legend(position: ControlPosition) -> Legend {
    Legend {
        position,
        title: LEGEND_TITLE.into(),
        entries: DEPTH_BINS
            .iter()
            .map(|bin| LegendEntry {
                color: bin.color.into(),
                label: bin.label.into(),
            })
            .collect(),
    }
}

/// Popup HTML for a feature, or `None` unless place, time and URL are all set.
#[must_use]
pub fn popup_html(feature: &Feature) -> Option<String> {
    let place = feature.place()?;
    feature.properties.time?;
    let url = feature.url()?;

    let mag = feature
        .properties
        .mag
        .map_or_else(|| "unknown".to_string(), |m| m.to_string());
    let depth = feature
        .depth_km()
        .map_or_else(|| "unknown".to_string(), |d| d.to_string());

    Some(format!(
        "<h3>Magnitude: {mag}</h3><hr><h3>Depth: {depth}</h3><hr><h3>{place}</h3><hr>\
         <a href=\"{url}\">Visit the site for more information!</a>",
        place = escape_html(place),
        url = escape_html(url),
    ))
}

/// Escape text for inclusion in HTML content or a quoted attribute.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
