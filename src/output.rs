//! Output formatters for styled markers.
//!
//! Supports human-readable (with colors), JSON, and NDJSON formats.

use std::io::{self, Write};

use serde::Serialize;

use crate::models::Feature;
use crate::render::popup_html;
use crate::style::{MarkerStyle, depth_bin, marker_style};

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON array
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

/// A feature with the style the map gives it.
#[derive(Debug, Clone, Serialize)]
pub struct MarkerRecord {
    pub id: Option<String>,
    pub time: Option<String>,
    pub magnitude: Option<f64>,
    pub magnitude_type: Option<String>,
    pub depth_km: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub place: Option<String>,
    pub status: Option<String>,
    pub event_type: Option<String>,
    /// Legend label of the depth bin
    pub depth_bin: Option<&'static str>,
    pub style: MarkerStyle,
    /// Placed on the map with a popup bound
    pub has_popup: bool,
}

impl From<&Feature> for MarkerRecord {
    fn from(f: &Feature) -> Self {
        let depth = f.depth_km();
        let position = f.lat_lon();
        Self {
            id: f.id.clone(),
            time: f.time().map(|t| t.to_rfc3339()),
            magnitude: f.properties.mag,
            magnitude_type: f.properties.mag_type.clone(),
            depth_km: depth,
            latitude: position.map(|(lat, _)| lat),
            longitude: position.map(|(_, lon)| lon),
            place: f.properties.place.clone(),
            status: f.properties.status.clone(),
            event_type: f.properties.event_type.clone(),
            depth_bin: depth.map(|d| depth_bin(d).label),
            style: marker_style(f),
            has_popup: position.is_some() && popup_html(f).is_some(),
        }
    }
}

/// Closest terminal color for a CSS named fill.
fn ansi_color(css: &str) -> &'static str {
    match css {
        "lawngreen" | "lime" => "\x1b[92m",
        "yellowgreen" => "\x1b[32m",
        "yellow" => "\x1b[93m",
        "orange" | "darkorange" => "\x1b[38;5;208m",
        "darkred" => "\x1b[31m",
        _ => DIM,
    }
}

/// Write markers in human-readable format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human<W: Write>(writer: &mut W, features: &[Feature]) -> io::Result<()> {
    for feature in features {
        let record = MarkerRecord::from(feature);
        let color = ansi_color(record.style.fill_color);

        let mag = record
            .magnitude
            .map_or_else(|| "?".into(), |m| format!("{m:.1}"));
        let mag_type = record.magnitude_type.as_deref().unwrap_or("?");
        let depth = record
            .depth_km
            .map_or_else(|| "?".into(), |d| format!("{d:.1}km"));
        let time = feature
            .time()
            .map_or_else(|| "unknown".into(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string());
        let place = record.place.as_deref().unwrap_or("Unknown location");
        let note = if record.latitude.is_none() {
            " (not placed)"
        } else if record.has_popup {
            ""
        } else {
            " (no popup)"
        };

        writeln!(
            writer,
            "{color}●{RESET} {BOLD}M{mag}{RESET} {DIM}{mag_type:<3}{RESET} │ \
             r={radius:<5.1} │ \
             {color}{fill:<11}{RESET} {DIM}{depth:>8}{RESET} │ \
             {time} UTC │ {place}{DIM}{note}{RESET}",
            radius = record.style.radius,
            fill = record.style.fill_color,
        )?;
    }
    Ok(())
}

/// Write markers as a JSON array.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(writer: &mut W, features: &[Feature]) -> io::Result<()> {
    let output: Vec<MarkerRecord> = features.iter().map(MarkerRecord::from).collect();
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write markers as newline-delimited JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<W: Write>(writer: &mut W, features: &[Feature]) -> io::Result<()> {
    for feature in features {
        let json = serde_json::to_string(&MarkerRecord::from(feature))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// Write markers in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_markers<W: Write>(
    writer: &mut W,
    features: &[Feature],
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => write_human(writer, features),
        Format::Json => write_json(writer, features),
        Format::Ndjson => write_ndjson(writer, features),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureCollection;

    fn sample() -> Vec<Feature> {
        let json = include_str!("../tests/fixtures/sample_feed.geojson");
        let feed: FeatureCollection = serde_json::from_str(json).unwrap();
        feed.features
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("human".parse::<Format>().unwrap(), Format::Human);
        assert_eq!("JSON".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("ndjson".parse::<Format>().unwrap(), Format::Ndjson);
        assert!("invalid".parse::<Format>().is_err());
    }

    #[test]
    fn test_record_from_sample() {
        let features = sample();
        let first = MarkerRecord::from(&features[0]);
        assert_eq!(first.depth_bin, Some("90 or Higher"));
        assert!((first.style.radius - 21.0).abs() < 1e-9);
        assert!(first.has_popup);

        let unplaced = MarkerRecord::from(&features[3]);
        assert!(unplaced.latitude.is_none());
        assert!(unplaced.depth_bin.is_none());
        assert_eq!(unplaced.style.fill_color, "black");
        assert!(!unplaced.has_popup);
    }

    #[test]
    fn test_ndjson_one_line_per_feature() {
        let mut buf = Vec::new();
        write_markers(&mut buf, &sample(), Format::Ndjson).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["style"]["fillColor"], "lawngreen");
        assert_eq!(second["depth_bin"], "0 or Lower");
        assert_eq!(second["status"], "automatic");
    }

    #[test]
    fn test_human_marks_missing_popup() {
        let mut buf = Vec::new();
        write_markers(&mut buf, &sample(), Format::Human).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert_eq!(text.matches("(no popup)").count(), 1);
        assert_eq!(text.matches("(not placed)").count(), 1);
        assert!(text.contains("Southern Alaska"));
    }
}
