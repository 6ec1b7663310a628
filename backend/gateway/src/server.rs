//! Main HTTP Gateway Server.

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, patch, post, put},
};
use kkscan_config::KkScanConfig;
use kkscan_core::Extractor;
use kkscan_media::ImageIntake;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::session_registry::{SessionRegistry, SharedSession};
use crate::{health_api, sessions_api, ws_server};

/// Extra room above the upload ceiling for base64 inflation and JSON framing.
const BODY_SLACK: usize = 64 * 1024;

/// Application state shared across routes.
pub struct AppState {
    pub registry: SessionRegistry,
    pub extractor: Arc<dyn Extractor>,
    pub intake: ImageIntake,
    pub started_at: Instant,
    /// Idle sessions are evicted after this long; zero disables eviction.
    pub session_ttl: Duration,
}

impl AppState {
    pub fn new(extractor: Arc<dyn Extractor>, intake: ImageIntake, copied_window: Duration) -> Self {
        Self {
            registry: SessionRegistry::new(copied_window),
            extractor,
            intake,
            started_at: Instant::now(),
            session_ttl: Duration::ZERO,
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn from_config(config: &KkScanConfig, extractor: Arc<dyn Extractor>) -> Self {
        Self::new(
            extractor,
            ImageIntake::new(config.max_upload_bytes()),
            Duration::from_millis(config.copied_indicator_ms()),
        )
        .with_session_ttl(Duration::from_secs(config.session_ttl_secs()))
    }

    pub async fn session(&self, id: &Uuid) -> ApiResult<SharedSession> {
        self.registry
            .get(id)
            .await
            .ok_or(ApiError::UnknownSession(*id))
    }
}

/// Request body ceiling: a data URI of the largest accepted image still fits.
pub fn body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes + max_upload_bytes / 3 + BODY_SLACK
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any);
    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Build the Axum router with all API routes.
pub fn build_router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    let limit = body_limit(state.intake.max_bytes());
    Router::new()
        .route("/api/health", get(health_api::get_health))
        .route("/api/sessions", post(sessions_api::create_session))
        .route(
            "/api/sessions/:id",
            get(sessions_api::get_session).delete(sessions_api::reset_session),
        )
        .route("/api/sessions/:id/scan", post(sessions_api::scan_upload))
        .route("/api/sessions/:id/scan/data-uri", post(sessions_api::scan_data_uri))
        .route("/api/sessions/:id/image", get(sessions_api::get_image))
        .route("/api/sessions/:id/members/:index", patch(sessions_api::edit_member))
        .route("/api/sessions/:id/household", patch(sessions_api::edit_household))
        .route("/api/sessions/:id/selection", put(sessions_api::select_member))
        .route("/api/sessions/:id/revert", post(sessions_api::revert_edits))
        .route("/api/sessions/:id/export/row", get(sessions_api::export_row))
        .route("/api/sessions/:id/export/table", get(sessions_api::export_table))
        .route("/api/sessions/:id/export/csv", get(sessions_api::export_csv))
        .route("/api/sessions/:id/export/json", get(sessions_api::export_json))
        .route("/api/sessions/:id/viewer", post(sessions_api::apply_viewer))
        .route("/api/sessions/:id/events", get(ws_server::ws_handler))
        .layer(DefaultBodyLimit::max(limit))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Starts the HTTP server and runs until Ctrl-C.
#[instrument(skip(state, allowed_origins))]
pub async fn start_server(
    addr: SocketAddr,
    state: Arc<AppState>,
    allowed_origins: &[String],
) -> Result<()> {
    let registry = state.registry.clone();
    let session_ttl = state.session_ttl;
    let app = build_router(state, allowed_origins);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Gateway HTTP server listening on {}", addr);
    let sweeper = registry.spawn_sweeper(session_ttl);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Gateway server error")?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    Ok(())
}
