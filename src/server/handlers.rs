//! HTTP request handlers for the Mariner print server API.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /api/print_status` - Printer state and progress of the current print
//! - `GET /api/list_files` - Contents of a directory under the files directory
//! - `GET /api/file_details` - Metadata of one slice file
//! - `GET /api/file_preview` - Embedded preview of a slice file as PNG
//! - `POST /api/upload_file` - Store a slice file
//! - `POST /api/delete_file` - Delete a file
//! - `POST /api/printer/command/{command}` - Start, pause, resume, cancel, reboot

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{FileError, FormatError, PreviewError, PrinterError};
use crate::files::{
    delete_file, list_directory, normalize_relative, resolve_path, save_upload, DirectoryListing,
    SliceCache,
};
use crate::format::decode_preview;
use crate::preview::{preview_etag, PngPreviewEncoder};
use crate::printer::protocol::validate_filename;
use crate::printer::{
    with_printer, PrinterConnector, PrinterControl, PrinterFuture, PrinterRawStatus, PrinterState,
};
use crate::progress::compute;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<C: PrinterConnector> {
    /// Root of the directory served to clients
    pub files_directory: Arc<PathBuf>,

    /// Decoded slice files, keyed by path and modification time
    pub slice_cache: Arc<SliceCache>,

    /// Opens sessions to the printer
    pub connector: Arc<C>,

    /// Held for the lifetime of each printer session; the device accepts one
    /// command at a time
    pub printer_lock: Arc<Mutex<()>>,

    pub preview_encoder: PngPreviewEncoder,
}

impl<C: PrinterConnector> AppState<C> {
    pub fn new(files_directory: impl Into<PathBuf>, connector: C) -> Self {
        Self::with_cache(files_directory, connector, SliceCache::new())
    }

    pub fn with_cache(files_directory: impl Into<PathBuf>, connector: C, cache: SliceCache) -> Self {
        Self {
            files_directory: Arc::new(files_directory.into()),
            slice_cache: Arc::new(cache),
            connector: Arc::new(connector),
            printer_lock: Arc::new(Mutex::new(())),
            preview_encoder: PngPreviewEncoder::new(),
        }
    }

    /// Run one printer operation with exclusive access to the device.
    async fn run_printer<F, R>(&self, op: F) -> Result<R, PrinterError>
    where
        F: for<'a> FnOnce(&'a mut C::Printer) -> PrinterFuture<'a, R>,
    {
        let _guard = self.printer_lock.lock().await;
        with_printer(self.connector.as_ref(), op).await
    }
}

impl<C: PrinterConnector> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            files_directory: Arc::clone(&self.files_directory),
            slice_cache: Arc::clone(&self.slice_cache),
            connector: Arc::clone(&self.connector),
            printer_lock: Arc::clone(&self.printer_lock),
            preview_encoder: self.preview_encoder.clone(),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListFilesQuery {
    /// Directory relative to the files directory (default: the root)
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct FilenameQuery {
    /// File path relative to the files directory
    pub filename: String,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "unexpected_printer_response")
    pub error: String,

    /// Short human-readable summary
    pub title: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn with_status(
        error: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            title: title.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Response for state-changing requests.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

/// Printer state plus, during a print, where it is.
#[derive(Debug, Serialize)]
pub struct PrintStatusResponse {
    pub state: PrinterState,
    pub selected_file: Option<String>,

    /// Percentage of layers completed; 0 when idle
    pub progress: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_count: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_layer: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_time_secs: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_left_secs: Option<u64>,
}

/// Metadata of one slice file.
#[derive(Debug, Serialize)]
pub struct FileDetailsResponse {
    pub filename: String,
    pub path: String,
    pub bed_size_mm: [f32; 3],
    pub height_mm: f32,
    pub layer_count: u32,
    pub layer_height_mm: f32,
    pub resolution: [u32; 2],
    pub print_time_secs: u32,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Any error a handler can return.
#[derive(Debug)]
pub enum ApiError {
    Printer(PrinterError),
    File(FileError),
    Preview(PreviewError),
    BadRequest(String),
}

impl From<PrinterError> for ApiError {
    fn from(err: PrinterError) -> Self {
        ApiError::Printer(err)
    }
}

impl From<FileError> for ApiError {
    fn from(err: FileError) -> Self {
        ApiError::File(err)
    }
}

impl From<PreviewError> for ApiError {
    fn from(err: PreviewError) -> Self {
        ApiError::Preview(err)
    }
}

impl From<FormatError> for ApiError {
    fn from(err: FormatError) -> Self {
        ApiError::Preview(PreviewError::Format(err))
    }
}

impl ApiError {
    fn classify(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            ApiError::Printer(err) => match err {
                PrinterError::UnexpectedPrinterResponse { .. } => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "unexpected_printer_response",
                    "Unexpected Printer Response",
                ),
                PrinterError::InvalidFilename { .. } => (
                    StatusCode::BAD_REQUEST,
                    "invalid_filename",
                    "Invalid Filename",
                ),
                PrinterError::Timeout { .. } => (
                    StatusCode::GATEWAY_TIMEOUT,
                    "printer_timeout",
                    "Printer Timeout",
                ),
                PrinterError::Connection(_) => (
                    StatusCode::BAD_GATEWAY,
                    "printer_connection_error",
                    "Printer Connection Error",
                ),
                PrinterError::SessionPoisoned => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "printer_session_error",
                    "Printer Session Error",
                ),
            },

            ApiError::File(err) => match err {
                FileError::InvalidPath(_) => {
                    (StatusCode::BAD_REQUEST, "invalid_path", "Invalid Path")
                }
                FileError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", "Not Found"),
                FileError::NotAFile(_) => (StatusCode::BAD_REQUEST, "not_a_file", "Not A File"),
                FileError::UnsupportedExtension(_) => (
                    StatusCode::BAD_REQUEST,
                    "unsupported_file_type",
                    "Unsupported File Type",
                ),
                FileError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error", "I/O Error"),
                FileError::Format(_) => (
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    "unsupported_format",
                    "Unsupported Format",
                ),
            },

            ApiError::Preview(err) => match err {
                PreviewError::Format(FormatError::MissingPreview(_)) => {
                    (StatusCode::NOT_FOUND, "no_preview", "No Preview")
                }
                PreviewError::Format(_) => (
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    "unsupported_format",
                    "Unsupported Format",
                ),
                PreviewError::EncodeError { .. } => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "encode_error",
                    "Preview Encoding Error",
                ),
            },

            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request", "Bad Request"),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Printer(err) => err.to_string(),
            ApiError::File(err) => err.to_string(),
            ApiError::Preview(err) => err.to_string(),
            ApiError::BadRequest(message) => message.clone(),
        }
    }
}

/// Convert ApiError to HTTP response.
///
/// Errors are logged by severity:
/// - 5xx errors at ERROR level
/// - 404s at DEBUG level
/// - other 4xx errors at WARN level
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, title) = self.classify();
        let message = self.message();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, title, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Report printer state and print progress.
///
/// # Endpoint
///
/// `GET /api/print_status`
///
/// # Response
///
/// Always carries `state`, `selected_file` and `progress`. While a print is
/// active and the selected file can be decoded from the files directory, the
/// layer fields are added as well.
pub async fn print_status_handler<C: PrinterConnector + 'static>(
    State(state): State<AppState<C>>,
) -> Result<Json<PrintStatusResponse>, ApiError> {
    let (status, selected_file): (PrinterRawStatus, Option<String>) = state
        .run_printer(|printer| {
            Box::pin(async move {
                let status = printer.query_status().await?;
                let selected_file = printer.query_selected_file().await?;
                Ok::<_, PrinterError>((status, selected_file))
            })
        })
        .await?;

    let mut response = PrintStatusResponse {
        state: status.state,
        selected_file,
        progress: 0.0,
        layer_count: None,
        current_layer: None,
        print_time_secs: None,
        time_left_secs: None,
    };

    if !status.state.is_active() {
        return Ok(Json(response));
    }

    let Some(filename) = response.selected_file.as_deref() else {
        return Ok(Json(response));
    };

    let document = match resolve_path(&state.files_directory, filename) {
        Ok(path) => state.slice_cache.load(&path, filename).await,
        Err(e) => Err(e),
    };

    match document {
        Ok(document) => {
            if let Some(report) = compute(&document, &status) {
                response.progress = report.progress_pct;
                response.layer_count = Some(document.layer_count);
                response.current_layer = Some(report.current_layer);
                response.print_time_secs = Some(document.print_time_secs);
                response.time_left_secs = Some(report.time_left_secs);
            }
        }
        Err(e) => {
            warn!(file = %filename, error = %e, "Cannot compute progress for selected file");
        }
    }

    Ok(Json(response))
}

/// List a directory.
///
/// # Endpoint
///
/// `GET /api/list_files?path=<dir>`
pub async fn list_files_handler<C: PrinterConnector + 'static>(
    State(state): State<AppState<C>>,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<DirectoryListing>, ApiError> {
    let listing = list_directory(&state.files_directory, &query.path, &state.slice_cache).await?;
    Ok(Json(listing))
}

/// Return the metadata of one slice file.
///
/// # Endpoint
///
/// `GET /api/file_details?filename=<path>`
pub async fn file_details_handler<C: PrinterConnector + 'static>(
    State(state): State<AppState<C>>,
    Query(query): Query<FilenameQuery>,
) -> Result<Json<FileDetailsResponse>, ApiError> {
    let relative = normalize_relative(&query.filename)?;
    let path = state.files_directory.join(&relative);
    let document = state.slice_cache.load(&path, &query.filename).await?;

    let filename = relative
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| FileError::NotAFile(query.filename.clone()))?;
    let display = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    let (x, y, z) = document.bed_size_mm;
    Ok(Json(FileDetailsResponse {
        filename,
        path: display,
        bed_size_mm: [x, y, z],
        height_mm: document.height_mm,
        layer_count: document.layer_count,
        layer_height_mm: document.layer_height_mm,
        resolution: [document.resolution.0, document.resolution.1],
        print_time_secs: document.print_time_secs,
    }))
}

/// Serve the large embedded preview of a slice file as PNG.
///
/// # Endpoint
///
/// `GET /api/file_preview?filename=<path>`
///
/// # Headers
///
/// - `Content-Type: image/png`
/// - `ETag`: digest of the PNG bytes; a matching `If-None-Match` yields 304
pub async fn file_preview_handler<C: PrinterConnector + 'static>(
    State(state): State<AppState<C>>,
    Query(query): Query<FilenameQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let path = resolve_path(&state.files_directory, &query.filename)?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| FileError::from_io(e, &query.filename))?;

    let bitmap = decode_preview(&bytes)?;
    let png = state.preview_encoder.encode(&bitmap)?;
    let etag = preview_etag(&png);

    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .map(|value| value == etag)
        .unwrap_or(false);

    if not_modified {
        return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
    }

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::ETAG, etag),
        ],
        png,
    )
        .into_response())
}

/// Store an uploaded slice file in the files directory.
///
/// # Endpoint
///
/// `POST /api/upload_file` (multipart, field `file`)
///
/// The file name is sanitized and the file is always stored at the top level.
pub async fn upload_file_handler<C: PrinterConnector + 'static>(
    State(state): State<AppState<C>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        if original_name.is_empty() {
            return Err(ApiError::BadRequest("No file selected".to_string()));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        save_upload(&state.files_directory, &original_name, &data).await?;
        return Ok(SuccessResponse::ok());
    }

    Err(ApiError::BadRequest("No file part in the request".to_string()))
}

/// Delete a file.
///
/// # Endpoint
///
/// `POST /api/delete_file?filename=<path>`
pub async fn delete_file_handler<C: PrinterConnector + 'static>(
    State(state): State<AppState<C>>,
    Query(query): Query<FilenameQuery>,
) -> Result<Json<SuccessResponse>, ApiError> {
    delete_file(&state.files_directory, &query.filename).await?;
    Ok(SuccessResponse::ok())
}

/// `POST /api/printer/command/start_print?filename=<name>`
pub async fn start_print_handler<C: PrinterConnector + 'static>(
    State(state): State<AppState<C>>,
    Query(query): Query<FilenameQuery>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let filename = query.filename;
    validate_filename(&filename)?;
    info!(file = %filename, "Starting print");
    state
        .run_printer(move |printer| Box::pin(async move { printer.start_print(&filename).await }))
        .await?;
    Ok(SuccessResponse::ok())
}

/// `POST /api/printer/command/pause_print`
pub async fn pause_print_handler<C: PrinterConnector + 'static>(
    State(state): State<AppState<C>>,
) -> Result<Json<SuccessResponse>, ApiError> {
    info!("Pausing print");
    state
        .run_printer(|printer| Box::pin(async move { printer.pause().await }))
        .await?;
    Ok(SuccessResponse::ok())
}

/// `POST /api/printer/command/resume_print`
pub async fn resume_print_handler<C: PrinterConnector + 'static>(
    State(state): State<AppState<C>>,
) -> Result<Json<SuccessResponse>, ApiError> {
    info!("Resuming print");
    state
        .run_printer(|printer| Box::pin(async move { printer.resume().await }))
        .await?;
    Ok(SuccessResponse::ok())
}

/// `POST /api/printer/command/cancel_print`
pub async fn cancel_print_handler<C: PrinterConnector + 'static>(
    State(state): State<AppState<C>>,
) -> Result<Json<SuccessResponse>, ApiError> {
    info!("Cancelling print");
    state
        .run_printer(|printer| Box::pin(async move { printer.stop().await }))
        .await?;
    Ok(SuccessResponse::ok())
}

/// `POST /api/printer/command/reboot`
pub async fn reboot_handler<C: PrinterConnector + 'static>(
    State(state): State<AppState<C>>,
) -> Result<Json<SuccessResponse>, ApiError> {
    info!("Rebooting printer");
    state
        .run_printer(|printer| Box::pin(async move { printer.reboot().await }))
        .await?;
    Ok(SuccessResponse::ok())
}
