//! Leaflet implementation of [`MapWidget`].
//!
//! `LeafletPage` records widget calls and emits a single HTML document.
//! The recorded state is embedded as JSON and replayed by a short script
//! against Leaflet loaded from unpkg.

use serde::Serialize;

use crate::errors::QuakeMapError;
use crate::models::FeatureCollection;
use crate::render::{MapConfig, RenderStats, escape_html, render_failure, render_map};
use crate::style::{HoverStyle, MarkerStyle};
use crate::widget::{CircleMarker, Control, LatLng, MapView, MapWidget, MarkerId, TileLayer};

const LEAFLET_VERSION: &str = "1.9.4";

/// Page title when the feed has none.
pub const DEFAULT_TITLE: &str = "Earthquake Map";

/// Build the page for one load attempt.
///
/// A failed load still yields a usable page: the base map plus a notice
/// naming the error. Stats are `None` in that case.
#[must_use]
pub fn map_page(
    config: &MapConfig,
    loaded: &Result<FeatureCollection, QuakeMapError>,
) -> (LeafletPage, Option<RenderStats>) {
    match loaded {
        Ok(feed) => {
            let mut page = LeafletPage::new(feed.title().unwrap_or(DEFAULT_TITLE));
            let stats = render_map(&mut page, config, feed);
            (page, Some(stats))
        }
        Err(e) => {
            let mut page = LeafletPage::new(DEFAULT_TITLE);
            render_failure(&mut page, config, &e.to_string());
            (page, None)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct BaseLayerState {
    #[serde(flatten)]
    layer: TileLayer,
    active: bool,
}

#[derive(Debug, Clone, Serialize)]
struct OverlayState {
    name: String,
    active: bool,
}

#[derive(Debug, Clone, Serialize)]
struct MarkerState {
    /// Index into `overlays`
    overlay: usize,
    position: LatLng,
    style: MarkerStyle,
    popup: Option<String>,
    hover: Option<HoverStyle>,
}

/// An HTML page hosting a Leaflet map.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafletPage {
    #[serde(skip)]
    title: String,
    view: MapView,
    base_layers: Vec<BaseLayerState>,
    overlays: Vec<OverlayState>,
    markers: Vec<MarkerState>,
    controls: Vec<Control>,
}

impl LeafletPage {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            view: MapView::default(),
            base_layers: Vec::new(),
            overlays: Vec::new(),
            markers: Vec::new(),
            controls: Vec::new(),
        }
    }

    fn overlay_index(&mut self, name: &str) -> usize {
        if let Some(i) = self.overlays.iter().position(|o| o.name == name) {
            return i;
        }
        self.overlays.push(OverlayState {
            name: name.to_string(),
            active: false,
        });
        self.overlays.len() - 1
    }

    /// Page state as JSON that is safe to inline in a `<script>` element.
    ///
    /// Every `<`, `>` and `&` is written as a `\uXXXX` escape, so no text
    /// from the feed can close the element or open a comment inside it.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized.
    pub fn state_json(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        let mut out = String::with_capacity(json.len());
        for c in json.chars() {
            match c {
                '<' => out.push_str("\\u003c"),
                '>' => out.push_str("\\u003e"),
                '&' => out.push_str("\\u0026"),
                _ => out.push(c),
            }
        }
        Ok(out)
    }

    /// Render the complete HTML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized.
    pub fn to_html(&self) -> Result<String, serde_json::Error> {
        let state = self.state_json()?;
        let title = escape_html(&self.title);
        let container = escape_html(&self.view.container);

        Ok(format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="https://unpkg.com/leaflet@{LEAFLET_VERSION}/dist/leaflet.css" />
    <script src="https://unpkg.com/leaflet@{LEAFLET_VERSION}/dist/leaflet.js"></script>
    <style>{PAGE_CSS}</style>
</head>
<body>
    <div id="{container}"></div>
    <script>
const state = {state};
{PAGE_SCRIPT}
    </script>
</body>
</html>
"#
        ))
    }
}

impl MapWidget for LeafletPage {
    fn set_view(&mut self, view: MapView) {
        self.view = view;
    }

    fn add_base_layer(&mut self, layer: TileLayer, active: bool) {
        if active {
            for existing in &mut self.base_layers {
                existing.active = false;
            }
        }
        self.base_layers.push(BaseLayerState { layer, active });
    }

    fn add_overlay_layer(&mut self, name: &str, active: bool) {
        let i = self.overlay_index(name);
        self.overlays[i].active = active;
    }

    fn add_circle_marker(&mut self, overlay: &str, marker: CircleMarker) -> MarkerId {
        let overlay = self.overlay_index(overlay);
        self.markers.push(MarkerState {
            overlay,
            position: marker.position,
            style: marker.style,
            popup: None,
            hover: None,
        });
        MarkerId(self.markers.len() - 1)
    }

    fn bind_popup(&mut self, marker: MarkerId, html: String) {
        if let Some(m) = self.markers.get_mut(marker.0) {
            m.popup = Some(html);
        }
    }

    fn bind_hover(&mut self, marker: MarkerId, hover: HoverStyle) {
        if let Some(m) = self.markers.get_mut(marker.0) {
            m.hover = Some(hover);
        }
    }

    fn add_control(&mut self, control: Control) {
        self.controls.push(control);
    }
}

const PAGE_CSS: &str = r"
html, body { height: 100%; margin: 0; padding: 0; }
#map { height: 100%; width: 100%; }
.legend, .notice {
    padding: 6px 8px;
    font: 14px/18px Arial, Helvetica, sans-serif;
    background: rgba(255, 255, 255, 0.85);
    box-shadow: 0 0 15px rgba(0, 0, 0, 0.2);
    border-radius: 5px;
}
.legend .legend-title { font-weight: bold; margin-bottom: 4px; }
.legend i { width: 18px; height: 18px; float: left; margin-right: 8px; opacity: 0.8; }
.notice { color: #7f1d1d; background: #fee2e2; max-width: 320px; }
";

const PAGE_SCRIPT: &str = r#"
(function () {
  const bases = {};
  const overlays = {};
  const initial = [];

  for (const b of state.baseLayers) {
    const layer = L.tileLayer(b.urlTemplate, { attribution: b.attribution });
    bases[b.name] = layer;
    if (b.active) initial.push(layer);
  }

  const groups = state.overlays.map(function (o) {
    const group = L.layerGroup();
    overlays[o.name] = group;
    if (o.active) initial.push(group);
    return group;
  });

  for (const m of state.markers) {
    const marker = L.circleMarker([m.position.lat, m.position.lng], m.style);
    if (m.popup) marker.bindPopup(m.popup);
    if (m.hover) {
      marker.on({
        mouseover: function (e) { e.target.setStyle({ fillOpacity: m.hover.highlightFillOpacity }); },
        mouseout: function (e) { e.target.setStyle({ fillOpacity: m.hover.restFillOpacity }); }
      });
    }
    marker.addTo(groups[m.overlay]);
  }

  const map = L.map(state.view.container, {
    center: [state.view.center.lat, state.view.center.lng],
    zoom: state.view.zoom,
    layers: initial
  });

  function pick(table, names) {
    const out = {};
    for (const n of names) if (table[n]) out[n] = table[n];
    return out;
  }

  function panel(position, className, build) {
    const control = L.control({ position: position });
    control.onAdd = function () {
      const div = L.DomUtil.create("div", className);
      build(div);
      return div;
    };
    control.addTo(map);
  }

  for (const c of state.controls) {
    if (c.kind === "layers") {
      L.control.layers(pick(bases, c.baseLayers), pick(overlays, c.overlays)).addTo(map);
    } else if (c.kind === "legend") {
      panel(c.position, "info legend", function (div) {
        const title = L.DomUtil.create("div", "legend-title", div);
        title.textContent = c.title;
        for (const e of c.entries) {
          const swatch = L.DomUtil.create("i", "", div);
          swatch.style.background = e.color;
          div.appendChild(document.createTextNode(e.label));
          L.DomUtil.create("br", "", div);
        }
      });
    } else if (c.kind === "notice") {
      panel(c.position, "notice", function (div) {
        div.textContent = c.message;
      });
    }
  }
})();
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Feature, Geometry};
    use crate::render::popup_html;

    fn sample_page() -> LeafletPage {
        let json = include_str!("../tests/fixtures/sample_feed.geojson");
        let feed: FeatureCollection = serde_json::from_str(json).unwrap();
        let mut page = LeafletPage::new("Earthquakes");
        render_map(&mut page, &MapConfig::default(), &feed);
        page
    }

    #[test]
    fn test_page_embeds_layers_and_markers() {
        let page = sample_page();
        assert_eq!(page.markers.len(), 3);

        let html = page.to_html().unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"<div id="map"></div>"#));
        assert!(html.contains("leaflet@1.9.4/dist/leaflet.js"));
        assert!(html.contains("tile.openstreetmap.org"));
        assert!(html.contains("tile.opentopomap.org"));
        assert!(html.contains(r#""fillColor":"darkred""#));
        assert!(html.contains(r#""highlightFillOpacity":0.9"#));
        assert!(html.contains(r#""kind":"legend""#));
        assert!(html.contains("90 or Higher"));
    }

    #[test]
    fn test_state_json_escapes_closing_tags() {
        let mut feature = Feature {
            geometry: Some(Geometry::point(0.0, 0.0, 1.0)),
            ..Feature::default()
        };
        feature.properties.place = Some("x".into());
        feature.properties.time = Some(1);
        feature.properties.url = Some("http://x".into());
        let popup = popup_html(&feature).unwrap();
        assert!(popup.contains("</a>"));

        let mut page = LeafletPage::new("t");
        let id = page.add_circle_marker(
            "Earthquakes",
            CircleMarker {
                position: LatLng::new(0.0, 0.0),
                style: MarkerStyle::default(),
            },
        );
        page.bind_popup(id, popup);

        let state = page.state_json().unwrap();
        assert!(!state.contains('<'));
        assert!(state.contains(r"\u003c/a\u003e"));

        let parsed: serde_json::Value = serde_json::from_str(&state).unwrap();
        assert!(parsed["markers"][0]["popup"].as_str().unwrap().ends_with("</a>"));
    }

    #[test]
    fn test_html_error_body_cannot_escape_script() {
        let loaded = Err(QuakeMapError::Api {
            status: 503,
            message: "<html><!-- cdn --><script>var x=1;</script></html>".into(),
        });
        let (page, _) = map_page(&MapConfig::default(), &loaded);
        let html = page.to_html().unwrap();

        let start = html.find("<script>\nconst state").unwrap() + "<script>".len();
        let end = start + html[start..].find("</script>").unwrap();
        let inline = &html[start..end];
        assert!(!inline.contains("<!--"));
        assert!(!inline.contains("<script"));
        assert!(inline.contains("HTTP 503"));
        assert_eq!(html.matches("</script>").count(), 2);
    }

    #[test]
    fn test_only_one_active_base_layer() {
        let mut page = LeafletPage::new("t");
        page.add_base_layer(crate::render::street_layer(), true);
        page.add_base_layer(crate::render::topo_layer(), true);
        let active: Vec<bool> = page.base_layers.iter().map(|b| b.active).collect();
        assert_eq!(active, vec![false, true]);
    }

    #[test]
    fn test_marker_on_unregistered_overlay_creates_it() {
        let mut page = LeafletPage::new("t");
        page.add_circle_marker(
            "Other",
            CircleMarker {
                position: LatLng::new(1.0, 2.0),
                style: MarkerStyle::default(),
            },
        );
        assert_eq!(page.overlays.len(), 1);
        assert!(!page.overlays[0].active);
    }

    #[test]
    fn test_failure_page_carries_notice() {
        let mut page = LeafletPage::new("t");
        render_failure(&mut page, &MapConfig::default(), "HTTP 503");
        let html = page.to_html().unwrap();
        assert!(html.contains(r#""kind":"notice""#));
        assert!(html.contains("HTTP 503"));
        assert_eq!(page.markers.len(), 0);
    }

    #[test]
    fn test_map_page_uses_feed_title() {
        let json = include_str!("../tests/fixtures/sample_feed.geojson");
        let feed: FeatureCollection = serde_json::from_str(json).unwrap();
        let (page, stats) = map_page(&MapConfig::default(), &Ok(feed));
        assert_eq!(stats.map(|s| s.markers), Some(3));
        let html = page.to_html().unwrap();
        assert!(html.contains("<title>USGS All Earthquakes, Past Month</title>"));
    }

    #[test]
    fn test_map_page_after_failed_load() {
        let loaded = Err(QuakeMapError::Api {
            status: 503,
            message: "unavailable".into(),
        });
        let (page, stats) = map_page(&MapConfig::default(), &loaded);
        assert!(stats.is_none());
        let html = page.to_html().unwrap();
        assert!(html.contains("HTTP 503"));
        assert!(html.contains(&format!("<title>{DEFAULT_TITLE}</title>")));
    }

    #[test]
    fn test_title_is_escaped() {
        let html = LeafletPage::new("A & B").to_html().unwrap();
        assert!(html.contains("<title>A &amp; B</title>"));
    }
}
