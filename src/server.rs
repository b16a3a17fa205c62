//! Web server for the earthquake map.
//!
//! Every page load fetches the feed once and renders a fresh map:
//! - `GET /` serves the Leaflet page (502 with an error notice if the feed fails)
//! - `GET /markers` serves the styled markers as JSON
//! - `GET /health` for liveness checks

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde_json::json;

use crate::client::{FeedSource, FeedType};
use crate::errors::QuakeMapError;
use crate::leaflet::map_page;
use crate::models::FeatureCollection;
use crate::output::MarkerRecord;
use crate::render::MapConfig;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub source: FeedSource,
    pub map: MapConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            source: FeedSource::new(FeedType::default(), None, crate::client::DEFAULT_TIMEOUT_SECS),
            map: MapConfig::default(),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ServerConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/markers", get(markers_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Start the web server.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let app = create_router(AppState::new(config));

    tracing::info!("🌍 quakemap starting at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Load the feed on the blocking pool; the HTTP client is synchronous.
async fn load_feed(state: &AppState) -> Result<Result<FeatureCollection, QuakeMapError>, Response> {
    let source = state.config.source.clone();
    tokio::task::spawn_blocking(move || source.load())
        .await
        .map_err(|e| {
            tracing::error!("feed loader task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "feed loader failed").into_response()
        })
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Main page handler - fetches the feed and serves the rendered map.
async fn index_handler(State(state): State<AppState>) -> Response {
    let loaded = match load_feed(&state).await {
        Ok(loaded) => loaded,
        Err(response) => return response,
    };

    let status = match &loaded {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!("feed load failed, serving map without data: {}", e);
            StatusCode::BAD_GATEWAY
        }
    };

    let (page, stats) = map_page(&state.config.map, &loaded);
    if let Some(stats) = stats {
        tracing::info!(
            markers = stats.markers,
            popups = stats.popups,
            unplaced = stats.unplaced,
            "served map"
        );
    }

    match page.to_html() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("failed to serialize page: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to render map").into_response()
        }
    }
}

/// Styled markers as a JSON array.
async fn markers_handler(State(state): State<AppState>) -> Response {
    match load_feed(&state).await {
        Ok(Ok(feed)) => {
            let records: Vec<MarkerRecord> = feed.features.iter().map(MarkerRecord::from).collect();
            Json(records).into_response()
        }
        Ok(Err(e)) => {
            tracing::warn!("feed load failed: {}", e);
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": e.to_string() }))).into_response()
        }
        Err(response) => response,
    }
}

/// Health check endpoint.
async fn health_handler() -> &'static str {
    "OK"
}
