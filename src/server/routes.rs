//! Router configuration for PenguinBlur.
//!
//! This module defines the HTTP routes and applies CORS, the upload body
//! limit, panic catching and request tracing.
//!
//! # Route Structure
//!
//! ```text
//! /                                  - Frontend entry page
//! /static/*                          - Frontend assets
//! /health                            - Health check
//! /api/upload                        - Upload a clip (POST)
//! /api/video/process                 - Process a clip (POST)
//! /api/video/download/{filename}     - Download a processed clip (GET)
//! /api/video/list                    - List processed clips (GET)
//! /api/cleanup                       - Delete expired clips (DELETE)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use penguinblur::server::{create_router, RouterConfig};
//! use penguinblur::storage::StoragePaths;
//! use penguinblur::video::{PassthroughTransform, VideoService};
//!
//! let paths = StoragePaths::under_root("/srv/penguinblur");
//! let service = Arc::new(VideoService::new(paths, PassthroughTransform));
//! let config = RouterConfig::new(8080)
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(service, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use http::Method;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers::{
    cleanup_handler, download_handler, health_handler, index_handler, list_handler,
    panic_response, process_handler, upload_handler, AppState,
};
use crate::video::{Transform, VideoService};

/// Default upload body limit: 512 MiB.
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 512 * 1024 * 1024;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Port reported by the health endpoint
    pub port: u16,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Maximum upload body size in bytes
    pub max_upload_size: usize,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a router configuration reporting `port`.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Uploads are limited to 512 MiB
    /// - Tracing is enabled
    pub fn new(port: u16) -> Self {
        Self {
            port,
            cors_origins: None,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Set the upload body limit in bytes.
    pub fn with_max_upload_size(mut self, bytes: usize) -> Self {
        self.max_upload_size = bytes;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new(8080)
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// # Arguments
///
/// * `service` - The video service, possibly shared with a background sweeper
/// * `config` - Router configuration
pub fn create_router<T>(service: Arc<VideoService<T>>, config: RouterConfig) -> Router
where
    T: Transform + 'static,
{
    let static_dir = service.paths().static_dir().to_path_buf();
    let app_state = AppState::new(service, config.port, config.max_upload_size);

    let cors = build_cors_layer(&config);

    let api_routes = Router::new()
        .route(
            "/upload",
            post(upload_handler::<T>).layer(DefaultBodyLimit::max(config.max_upload_size)),
        )
        .route("/video/process", post(process_handler::<T>))
        .route("/video/download/{filename}", get(download_handler::<T>))
        .route("/video/list", get(list_handler::<T>))
        .route("/cleanup", delete(cleanup_handler::<T>));

    let router = Router::new()
        .route("/", get(index_handler::<T>))
        .route("/health", get(health_handler::<T>))
        .nest("/api", api_routes)
        .with_state(app_state)
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .expose_headers([CONTENT_DISPOSITION, CONTENT_LENGTH])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
