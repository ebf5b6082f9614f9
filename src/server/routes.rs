//! Router configuration and route definitions.

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::server::handlers::{
    health_handler, photos_handler, signed_url_handler, upload_cloud_handler, AppState,
};
use crate::storage::{ObjectStore, DIRECT_UPLOAD_THRESHOLD};

/// Slack added on top of the upload ceiling for multipart framing.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for creating the router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins. `None` allows any origin.
    pub cors_origins: Option<Vec<String>>,

    /// Whether to add HTTP request tracing.
    pub enable_tracing: bool,

    /// Upload size ceiling for the server-side upload route.
    pub max_upload_bytes: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
            max_upload_bytes: DIRECT_UPLOAD_THRESHOLD,
        }
    }
}

impl RouterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set specific allowed CORS origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Enable or disable HTTP request tracing.
    pub fn with_tracing(mut self, enable: bool) -> Self {
        self.enable_tracing = enable;
        self
    }

    /// Set the upload size ceiling for the server-side upload route.
    pub fn with_max_upload_bytes(mut self, max: u64) -> Self {
        self.max_upload_bytes = max;
        self
    }
}

// =============================================================================
// Router Creation
// =============================================================================

/// Create the application router with all routes and middleware.
pub fn create_router<S: ObjectStore + 'static>(
    store: S,
    bucket: impl Into<String>,
    config: RouterConfig,
) -> Router {
    let state = AppState::new(store, bucket, config.max_upload_bytes);

    // Axum's default body limit is far below a phone video; raise it to
    // the configured ceiling so the handler gets to return 413 itself.
    let body_limit =
        DefaultBodyLimit::max((config.max_upload_bytes as usize).saturating_add(MULTIPART_OVERHEAD));

    let router = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/photos",
            get(photos_handler::<S>).post(photos_handler::<S>),
        )
        .route("/api/upload-cloud", post(upload_cloud_handler::<S>))
        .route("/api/upload-signed-url", post(signed_url_handler::<S>))
        .layer(body_limit)
        .with_state(state)
        .layer(build_cors_layer(&config.cors_origins));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

fn build_cors_layer(origins: &Option<Vec<String>>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match origins {
        Some(list) => {
            let parsed: Vec<HeaderValue> = list.iter().filter_map(|o| o.parse().ok()).collect();
            layer.allow_origin(parsed)
        }
        None => layer.allow_origin(Any),
    }
}

// =============================================================================
// Tests
// =============================================================================
