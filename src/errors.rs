//! Error types for quakemap.
//!
//! Uses `thiserror` for library-style error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading a feed.
#[derive(Error, Debug)]
pub enum QuakeMapError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse GeoJSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// API returned an error status
    #[error("USGS API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid response structure
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Reading a local feed file failed
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
