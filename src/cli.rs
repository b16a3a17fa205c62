//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::client::{DEFAULT_TIMEOUT_SECS, FeedSource, FeedType};
use crate::output::Format;
use crate::render::MapConfig;
use crate::widget::LatLng;

/// Interactive map of recent earthquakes, styled by magnitude and depth.
#[derive(Parser, Debug)]
#[command(name = "quakemap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch the feed once and write the map as an HTML page
    Render(RenderArgs),

    /// Print each event with the marker style it gets on the map
    Markers(MarkersArgs),

    /// Serve the map over HTTP, fetching the feed on every page load
    Serve(ServeArgs),
}

/// Where to read earthquakes from.
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// USGS summary feed, e.g. all_month, 4.5_week, significant_day
    #[arg(long, default_value = "all_month", value_parser = parse_feed_type)]
    pub feed: FeedType,

    /// Read a saved GeoJSON feed instead of fetching
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,
}

impl SourceArgs {
    #[must_use]
    pub fn source(&self) -> FeedSource {
        FeedSource::new(self.feed, self.input.clone(), self.timeout)
    }
}

/// Initial map view.
#[derive(Args, Debug)]
pub struct ViewArgs {
    /// Map center: lat,lon
    #[arg(long, value_parser = parse_center)]
    pub center: Option<LatLng>,

    /// Initial zoom level
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=19))]
    pub zoom: Option<u8>,
}

impl ViewArgs {
    /// Default map layout with any overrides applied.
    #[must_use]
    pub fn map_config(&self) -> MapConfig {
        let mut config = MapConfig::default();
        if let Some(center) = self.center {
            config.view.center = center;
        }
        if let Some(zoom) = self.zoom {
            config.view.zoom = zoom;
        }
        config
    }
}

/// Arguments for the `render` command.
#[derive(Parser, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub view: ViewArgs,

    /// Output file (defaults to stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Arguments for the `markers` command.
#[derive(Parser, Debug)]
pub struct MarkersArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `serve` command.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub view: ViewArgs,

    /// Port to listen on
    #[arg(long, short = 'p', default_value = "8080")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,
}

/// Parse a feed type from string.
fn parse_feed_type(s: &str) -> Result<FeedType, String> {
    s.parse()
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}

/// Parse a map center from string.
fn parse_center(s: &str) -> Result<LatLng, String> {
    s.parse()
}
