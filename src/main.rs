//! quakemap - an interactive map of recent earthquakes.
//!
//! Fetches the USGS GeoJSON feed once, styles every event by magnitude
//! and depth, and renders a Leaflet map with popups and a depth legend.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

mod cli;
mod client;
mod errors;
mod leaflet;
mod models;
mod output;
mod render;
mod server;
mod style;
mod widget;

use cli::{Cli, Command};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Render(args) => cmd_render(&args),
        Command::Markers(args) => cmd_markers(&args),
        Command::Serve(args) => cmd_serve(args),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the `render` command - one fetch, one HTML page.
///
/// A failed fetch still writes the page, showing the base map and an error
/// notice, and then reports the failure through the exit code.
fn cmd_render(args: &cli::RenderArgs) -> Result<()> {
    let source = args.source.source();
    info!("loading earthquakes from {}", source);

    let loaded = source.load();
    if let Ok(feed) = &loaded {
        info!(
            "loaded {} events (feed generated {})",
            feed.features.len(),
            feed.generated()
                .map_or_else(|| "at unknown time".into(), |t| t.to_rfc3339())
        );
    }
    let (page, stats) = leaflet::map_page(&args.view.map_config(), &loaded);
    let html = page.to_html().context("failed to serialize map page")?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &html)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("wrote map to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(html.as_bytes())?;
            handle.flush()?;
        }
    }

    if let Some(stats) = stats {
        info!(
            "rendered {} markers ({} with popups, {} without a position)",
            stats.markers, stats.popups, stats.unplaced
        );
    }

    if let Err(e) = loaded {
        warn!("map was written without earthquake data");
        let context = format!("failed to load earthquakes from {source}");
        return Err(anyhow::Error::new(e).context(context));
    }
    Ok(())
}

/// Execute the `markers` command - print computed styles.
fn cmd_markers(args: &cli::MarkersArgs) -> Result<()> {
    let source = args.source.source();
    let feed = source
        .load()
        .with_context(|| format!("failed to load earthquakes from {source}"))?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_markers(&mut handle, &feed.features, args.format)?;

    Ok(())
}

/// Execute the `serve` command - start web server.
fn cmd_serve(args: cli::ServeArgs) -> Result<()> {
    let config = server::ServerConfig {
        port: args.port,
        host: args.host.clone(),
        source: args.source.source(),
        map: args.view.map_config(),
    };

    // Print startup message
    let url = format!("http://{}:{}", args.host, args.port);
    println!("\x1b[1m🌍 quakemap\x1b[0m");
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("  Local:   \x1b[96m{url}\x1b[0m");
    println!("  Source:  {}", config.source);
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("\x1b[2mPress Ctrl+C to stop\x1b[0m\n");

    // Open browser if requested (using xdg-open/open command)
    if args.open {
        #[cfg(target_os = "linux")]
        let _ = std::process::Command::new("xdg-open").arg(&url).spawn();
        #[cfg(target_os = "macos")]
        let _ = std::process::Command::new("open").arg(&url).spawn();
        #[cfg(target_os = "windows")]
        let _ = std::process::Command::new("cmd").args(["/c", "start", &url]).spawn();
    }

    // Run the async server on tokio runtime
    tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(server::run_server(config))
}
