//! Router configuration for the Mariner print server.
//!
//! # Route Structure
//!
//! ```text
//! /health                                 - Health check
//! /api/print_status                       - Printer state and progress
//! /api/list_files?path=                   - Directory listing
//! /api/file_details?filename=             - Slice-file metadata
//! /api/file_preview?filename=             - Slice-file preview (PNG)
//! /api/upload_file                        - Upload (POST, multipart)
//! /api/delete_file?filename=              - Delete (POST)
//! /api/printer/command/start_print?filename=
//! /api/printer/command/pause_print
//! /api/printer/command/resume_print
//! /api/printer/command/cancel_print
//! /api/printer/command/reboot
//! ```
//!
//! # Example
//!
//! ```ignore
//! use mariner::printer::{SerialConfig, SerialConnector};
//! use mariner::server::{create_router, AppState, RouterConfig};
//!
//! let state = AppState::new("/mnt/usb_share", SerialConnector::new(SerialConfig::default()));
//! let router = create_router(state, RouterConfig::new());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5050").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    cancel_print_handler, delete_file_handler, file_details_handler, file_preview_handler,
    health_handler, list_files_handler, pause_print_handler, print_status_handler, reboot_handler,
    resume_print_handler, start_print_handler, upload_file_handler, AppState,
};
use crate::printer::PrinterConnector;

/// Default upload size limit: 512MB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Largest accepted upload body in bytes
    pub max_upload_bytes: usize,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a router configuration with defaults.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Uploads up to 512MB are accepted
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
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

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
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
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
pub fn create_router<C>(state: AppState<C>, config: RouterConfig) -> Router
where
    C: PrinterConnector + 'static,
{
    let cors = build_cors_layer(&config);

    let printer_routes = Router::new()
        .route("/start_print", post(start_print_handler::<C>))
        .route("/pause_print", post(pause_print_handler::<C>))
        .route("/resume_print", post(resume_print_handler::<C>))
        .route("/cancel_print", post(cancel_print_handler::<C>))
        .route("/reboot", post(reboot_handler::<C>));

    let api_routes = Router::new()
        .route("/print_status", get(print_status_handler::<C>))
        .route("/list_files", get(list_files_handler::<C>))
        .route("/file_details", get(file_details_handler::<C>))
        .route("/file_preview", get(file_preview_handler::<C>))
        .route(
            "/upload_file",
            post(upload_file_handler::<C>).layer(DefaultBodyLimit::max(config.max_upload_bytes)),
        )
        .route("/delete_file", post(delete_file_handler::<C>))
        .nest("/printer/command", printer_routes);

    let router = Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api_routes)
        .with_state(state)
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
        .allow_methods([Method::GET, Method::POST, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
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
