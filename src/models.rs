//! Data models for USGS earthquake GeoJSON feeds.
//!
//! Every per-event field is optional: sparse features must still parse,
//! and downstream styling degrades to fallbacks instead of failing.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::errors::QuakeMapError;

/// Top-level GeoJSON response from USGS feeds.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureCollection {
    /// Always "FeatureCollection"
    #[serde(rename = "type")]
    pub type_: String,

    /// Feed metadata
    #[serde(default)]
    pub metadata: Option<Metadata>,

    /// Earthquake events
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Validate the response structure.
    ///
    /// # Errors
    ///
    /// Returns an error if the top-level type is not a feature collection.
    pub fn validate(&self) -> Result<(), QuakeMapError> {
        if self.type_ != "FeatureCollection" {
            return Err(QuakeMapError::InvalidResponse(format!(
                "expected type 'FeatureCollection', got '{}'",
                self.type_
            )));
        }
        Ok(())
    }

    /// When the feed was generated, from the metadata block.
    #[must_use]
    pub fn generated(&self) -> Option<DateTime<Utc>> {
        self.metadata
            .as_ref()?
            .generated
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    /// Feed title from the metadata block, if any.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.title.as_deref())
    }
}

/// Metadata about the feed response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    /// When this feed was generated (ms since epoch)
    pub generated: Option<i64>,

    /// Human-readable title
    pub title: Option<String>,
}

/// A single earthquake event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Feature {
    /// Unique event ID
    #[serde(default)]
    pub id: Option<String>,

    /// Geographic location, absent for some events
    #[serde(default)]
    pub geometry: Option<Geometry>,

    /// Event properties
    #[serde(default)]
    pub properties: Properties,
}

impl Feature {
    /// Get the event time as a `DateTime<Utc>`.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.properties
            .time
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    /// Get `(latitude, longitude)` in degrees, if the event has a position.
    #[must_use]
    pub fn lat_lon(&self) -> Option<(f64, f64)> {
        let coords = &self.geometry.as_ref()?.coordinates;
        match (coords.first(), coords.get(1)) {
            (Some(&lon), Some(&lat)) => Some((lat, lon)),
            _ => None,
        }
    }

    /// Get depth in kilometers (positive down, may be negative).
    #[must_use]
    pub fn depth_km(&self) -> Option<f64> {
        self.geometry.as_ref()?.coordinates.get(2).copied()
    }

    /// Place description, treating an empty string as absent.
    #[must_use]
    pub fn place(&self) -> Option<&str> {
        non_empty(self.properties.place.as_deref())
    }

    /// Event page URL, treating an empty string as absent.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        non_empty(self.properties.url.as_deref())
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

/// Point geometry for an event.
#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    /// Coordinates: [longitude, latitude, depth_km]
    #[serde(default)]
    pub coordinates: Vec<f64>,
}

impl Geometry {
    /// Build a point geometry from `[lon, lat, depth]`.
    #[cfg(test)]
    pub fn point(lon: f64, lat: f64, depth_km: f64) -> Self {
        Self {
            coordinates: vec![lon, lat, depth_km],
        }
    }
}

/// Event properties from the USGS feed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Properties {
    /// Magnitude value
    pub mag: Option<f64>,

    /// Magnitude type (mb, Ml, Mw, etc.)
    #[serde(rename = "magType")]
    pub mag_type: Option<String>,

    /// Human-readable place description
    pub place: Option<String>,

    /// Event time (ms since epoch)
    pub time: Option<i64>,

    /// Event status: "automatic" or "reviewed"
    pub status: Option<String>,

    /// Event page URL
    pub url: Option<String>,

    /// Event type (earthquake, quarry blast, etc.)
    #[serde(rename = "type")]
    pub event_type: Option<String>,
}
