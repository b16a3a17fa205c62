//! USGS earthquake feed client.
//!
//! Provides blocking HTTP access to the USGS GeoJSON summary feeds,
//! plus loading the same format from a local file.
//! Uses reqwest with rustls for TLS.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, instrument};

use crate::errors::QuakeMapError;
use crate::models::FeatureCollection;

/// Default request timeout in seconds. The month feed runs to several MB.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent string for API requests.
const USER_AGENT: &str = concat!("quakemap/", env!("CARGO_PKG_VERSION"));

/// USGS base URL for earthquake feeds.
const USGS_BASE_URL: &str = "https://earthquake.usgs.gov";

/// Longest error body excerpt kept in an API error.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Magnitude threshold of a summary feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threshold {
    All,
    M1,
    M2_5,
    M4_5,
    Significant,
}

impl Threshold {
    const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::M1 => "1.0",
            Self::M2_5 => "2.5",
            Self::M4_5 => "4.5",
            Self::Significant => "significant",
        }
    }
}

/// Time window of a summary feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Hour,
    Day,
    Week,
    Month,
}

impl Period {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

/// One of the USGS summary feeds, e.g. `all_month` or `4.5_day`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedType {
    pub threshold: Threshold,
    pub period: Period,
}

impl FeedType {
    /// Every earthquake in the past 30 days.
    pub const ALL_MONTH: Self = Self {
        threshold: Threshold::All,
        period: Period::Month,
    };
}

impl Default for FeedType {
    fn default() -> Self {
        Self::ALL_MONTH
    }
}

impl fmt::Display for FeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.threshold.as_str(), self.period.as_str())
    }
}

impl std::str::FromStr for FeedType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        let (threshold, period) = lower
            .rsplit_once('_')
            .ok_or_else(|| format!("unknown feed type: {s} (expected e.g. all_month, 4.5_day)"))?;

        let threshold = match threshold {
            "all" => Threshold::All,
            "1.0" => Threshold::M1,
            "2.5" => Threshold::M2_5,
            "4.5" => Threshold::M4_5,
            "significant" => Threshold::Significant,
            _ => return Err(format!("unknown feed threshold: {threshold}")),
        };
        let period = match period {
            "hour" => Period::Hour,
            "day" => Period::Day,
            "week" => Period::Week,
            "month" => Period::Month,
            _ => return Err(format!("unknown feed period: {period}")),
        };

        Ok(Self { threshold, period })
    }
}

/// Client for the USGS feed API.
pub struct UsgsClient {
    client: Client,
    base_url: String,
}

impl UsgsClient {
    /// Create a new USGS client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(timeout: Duration) -> Result<Self, QuakeMapError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: USGS_BASE_URL.to_string(),
        })
    }

    /// URL of a summary GeoJSON feed.
    #[must_use]
    pub fn feed_url(&self, feed: FeedType) -> String {
        format!("{}/earthquakes/feed/v1.0/summary/{feed}.geojson", self.base_url)
    }

    /// Fetch a summary GeoJSON feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or response cannot be parsed.
    #[instrument(skip(self), fields(feed = %feed))]
    pub fn fetch_feed(&self, feed: FeedType) -> Result<FeatureCollection, QuakeMapError> {
        let url = self.feed_url(feed);
        debug!("fetching feed from {}", url);

        let response = self.client.get(&url).send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(QuakeMapError::Api {
                status: status.as_u16(),
                message: summarize_body(&body),
            });
        }

        let feed: FeatureCollection = response.json()?;
        feed.validate()?;

        debug!("fetched {} events", feed.features.len());
        Ok(feed)
    }
}

/// Reduce an error response body to a short plain-text excerpt.
///
/// Markup is dropped and whitespace collapsed; the result is capped at
/// `MAX_ERROR_BODY_CHARS`.
fn summarize_body(body: &str) -> String {
    let mut text = String::with_capacity(body.len().min(MAX_ERROR_BODY_CHARS * 4));
    let mut in_tag = false;
    for c in body.chars() {
        match c {
            '<' => {
                in_tag = true;
                text.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            _ => text.push(c),
        }
    }

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return collapsed;
    }
    let mut short: String = collapsed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    short.push('…');
    short
}

/// Parse and validate a GeoJSON feed saved on disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a feature collection.
pub fn load_file(path: &Path) -> Result<FeatureCollection, QuakeMapError> {
    let content = std::fs::read_to_string(path).map_err(|source| QuakeMapError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let feed: FeatureCollection = serde_json::from_str(&content)?;
    feed.validate()?;

    debug!("loaded {} events from {}", feed.features.len(), path.display());
    Ok(feed)
}

/// Where the feature collection comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Remote { feed: FeedType, timeout: Duration },
    File(PathBuf),
}

impl FeedSource {
    /// Pick a local file when given, otherwise the remote feed.
    #[must_use]
    pub fn new(feed: FeedType, input: Option<PathBuf>, timeout_secs: u64) -> Self {
        match input {
            Some(path) => Self::File(path),
            None => Self::Remote {
                feed,
                timeout: Duration::from_secs(timeout_secs),
            },
        }
    }

    /// Load the collection once.
    ///
    /// # Errors
    ///
    /// Returns an error if the feed cannot be fetched, read or parsed.
    pub fn load(&self) -> Result<FeatureCollection, QuakeMapError> {
        match self {
            Self::Remote { feed, timeout } => UsgsClient::new(*timeout)?.fetch_feed(*feed),
            Self::File(path) => load_file(path),
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote { feed, .. } => write!(f, "USGS {feed} feed"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_type_parse() {
        let feed: FeedType = "4.5_day".parse().unwrap();
        assert_eq!(feed.threshold, Threshold::M4_5);
        assert_eq!(feed.period, Period::Day);

        let feed: FeedType = "Significant_Week".parse().unwrap();
        assert_eq!(feed.to_string(), "significant_week");

        assert!("all".parse::<FeedType>().is_err());
        assert!("3.0_day".parse::<FeedType>().is_err());
        assert!("all_year".parse::<FeedType>().is_err());
    }

    #[test]
    fn test_default_feed_url() {
        let client = UsgsClient::new(Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.feed_url(FeedType::default()),
            "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_month.geojson"
        );
    }

    #[test]
    fn test_load_fixture_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sample_feed.geojson");
        let source = FeedSource::new(FeedType::default(), Some(path.clone()), 5);
        assert_eq!(source, FeedSource::File(path));

        let feed = source.load().unwrap();
        assert_eq!(feed.features.len(), 4);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_file(Path::new("/nonexistent/feed.geojson")).unwrap_err();
        assert!(matches!(err, QuakeMapError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/feed.geojson"));
    }

    #[test]
    fn test_error_body_summary_drops_markup() {
        let body = "<html><!-- cdn --><head><script>var x=1;</script></head>\
                    <body><h1>503   Service\nUnavailable</h1></body></html>";
        let summary = summarize_body(body);
        assert!(!summary.contains('<'));
        assert!(!summary.contains('>'));
        assert!(summary.contains("503 Service Unavailable"));
    }

    #[test]
    fn test_error_body_summary_is_truncated() {
        let body = "x".repeat(5000);
        let summary = summarize_body(&body);
        assert_eq!(summary.chars().count(), MAX_ERROR_BODY_CHARS + 1);
        assert!(summary.ends_with('…'));
        assert_eq!(summarize_body("  not found \n"), "not found");
    }

    #[test]
    fn test_source_display() {
        let remote = FeedSource::new(FeedType::default(), None, 30);
        assert_eq!(remote.to_string(), "USGS all_month feed");
    }
}
