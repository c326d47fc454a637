//! HTTP server layer for Mariner.
//!
//! Thin glue between the web frontend and the core: handlers decode files
//! through the shared cache, talk to the printer through a
//! [`PrinterConnector`](crate::printer::PrinterConnector) and feed both into
//! the progress calculator.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │   /api/print_status  /api/list_files  /api/printer/command/...  │
//! │                                                                 │
//! │  ┌─────────────────────────┐  ┌──────────────────────────────┐  │
//! │  │        handlers         │  │           routes             │  │
//! │  │ (requests, error JSON)  │  │  (router config, CORS)       │  │
//! │  └─────────────────────────┘  └──────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//!          │                    │                     │
//!       files/              printer/              progress
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    health_handler, ApiError, AppState, ErrorResponse, FileDetailsResponse, HealthResponse,
    PrintStatusResponse, SuccessResponse,
};
pub use routes::{create_router, RouterConfig, DEFAULT_MAX_UPLOAD_BYTES};
