//! HTTP request handlers for the PenguinBlur API.
//!
//! # Endpoints
//!
//! - `POST /api/upload` - Upload a clip (multipart, part `file`)
//! - `POST /api/video/process` - Produce a processed clip
//! - `GET /api/video/download/{filename}` - Download a processed clip
//! - `GET /api/video/list` - List processed clips
//! - `DELETE /api/cleanup` - Delete expired processed clips
//! - `GET /health` - Health check endpoint
//! - `GET /` - Frontend entry page

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
        Multipart, Path, Query, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tracing::{debug, error, warn};

use crate::error::{ErrorKind, StorageError, VideoError};
use crate::video::{
    ProcessedFileInfo, Transform, VideoService, DEFAULT_BLUR_INTENSITY, DOWNLOAD_MEDIA_TYPE,
};

/// Name of the multipart part carrying the upload.
pub const UPLOAD_FIELD: &str = "file";

/// Name reported by the health endpoint.
pub const SERVICE_NAME: &str = "penguinblur";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the video service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<T: Transform> {
    pub service: Arc<VideoService<T>>,

    /// Port reported by the health endpoint
    pub port: u16,

    /// Upload body limit in bytes, reported back on 413
    pub max_upload_size: usize,
}

impl<T: Transform> AppState<T> {
    pub fn new(service: Arc<VideoService<T>>, port: u16, max_upload_size: usize) -> Self {
        Self {
            service,
            port,
            max_upload_size,
        }
    }

    fn static_file(&self, name: &str) -> PathBuf {
        self.service.paths().static_dir().join(name)
    }
}

impl<T: Transform> Clone for AppState<T> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            port: self.port,
            max_upload_size: self.max_upload_size,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Query parameters for process requests.
#[derive(Debug, Deserialize)]
pub struct ProcessQueryParams {
    /// Name of a file in the upload area
    pub filename: String,

    /// Blur intensity (defaults to 2)
    #[serde(default = "default_blur_intensity")]
    pub blur_intensity: i64,
}

fn default_blur_intensity() -> i64 {
    DEFAULT_BLUR_INTENSITY
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,

    /// Error type identifier (e.g., "not_found", "invalid_media_type")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            status: Some(status.as_u16()),
            ..Self::new(error, message)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    pub size: u64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub output_filename: String,
    pub blur_intensity: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub success: bool,
    pub files: Vec<ProcessedFileInfo>,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub success: bool,
    pub deleted_files: usize,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub port: u16,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// The operation a request was performing, used to pick the message of a 500.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Upload,
    Process,
    Download,
    List,
    Cleanup,
}

impl Operation {
    /// Message returned to clients when the operation fails server-side.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Operation::Upload => "Upload failed",
            Operation::Process => "Video processing failed",
            Operation::Download => "Download failed",
            Operation::List => "Failed to list files",
            Operation::Cleanup => "Cleanup failed",
        }
    }

    /// Attach this operation to an error.
    pub fn fail(self, error: impl Into<VideoError>) -> ApiError {
        ApiError {
            operation: self,
            error: error.into(),
        }
    }
}

/// A [`VideoError`] tagged with the operation that raised it.
#[derive(Debug)]
pub struct ApiError {
    pub operation: Operation,
    pub error: VideoError,
}

impl ApiError {
    /// Status code, error type and client-facing message.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match &self.error {
            VideoError::PayloadTooLarge { .. } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                self.error.to_string(),
            ),
            VideoError::InvalidMediaType { .. } => (
                StatusCode::BAD_REQUEST,
                "invalid_media_type",
                "File must be a video".to_string(),
            ),
            VideoError::Storage(StorageError::InvalidName(_)) => (
                StatusCode::BAD_REQUEST,
                "invalid_filename",
                self.error.to_string(),
            ),
            err => match err.kind() {
                ErrorKind::InvalidInput => (
                    StatusCode::BAD_REQUEST,
                    "invalid_request",
                    err.to_string(),
                ),
                ErrorKind::NotFound => (StatusCode::NOT_FOUND, "not_found", err.to_string()),
                ErrorKind::IoFailure => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    self.operation.failure_message().to_string(),
                ),
            },
        }
    }
}

/// Convert ApiError to HTTP response.
///
/// Server errors are logged with the full error at ERROR level and answered
/// with the operation's generic message. Client errors log at WARN, except
/// 404s which log at DEBUG.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = self.parts();

        if status.is_server_error() {
            error!(
                operation = ?self.operation,
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                self.error
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                operation = ?self.operation,
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                operation = ?self.operation,
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);

        (status, Json(error_response)).into_response()
    }
}

fn multipart_error(limit: usize, err: MultipartError) -> VideoError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        VideoError::PayloadTooLarge { limit }
    } else {
        VideoError::UploadStream(err.body_text())
    }
}

/// Response for a panic caught by the top-level layer.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    error!(panic = detail, "Handler panicked");

    let body = serde_json::json!({
        "success": false,
        "error": "Internal server error",
    });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle clip uploads.
///
/// # Endpoint
///
/// `POST /api/upload`
///
/// # Request
///
/// `multipart/form-data` with a part named `file` carrying a filename and a
/// `video/*` content type. Other parts are ignored.
///
/// # Response
///
/// - `200 OK`: `{"success": true, "filename": ..., "size": ..., "message": ...}`
/// - `400 Bad Request`: Not a video, bad filename, or malformed body
/// - `413 Payload Too Large`: Body exceeds the configured limit
/// - `500 Internal Server Error`: Write failed
pub async fn upload_handler<T: Transform>(
    State(state): State<AppState<T>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let op = Operation::Upload;
    let limit = state.max_upload_size;
    let mut multipart =
        multipart.map_err(|r| op.fail(VideoError::InvalidRequest(r.body_text())))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| op.fail(multipart_error(limit, e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_owned)
            .ok_or_else(|| op.fail(VideoError::InvalidRequest("Missing filename".to_string())))?;
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_owned();

        let body = field.map_err(move |e| multipart_error(limit, e));
        let uploaded = state
            .service
            .upload(&filename, &content_type, body)
            .await
            .map_err(|e| op.fail(e))?;

        return Ok(Json(UploadResponse {
            success: true,
            filename: uploaded.filename,
            size: uploaded.size,
            message: "File uploaded successfully".to_string(),
        }));
    }

    Err(op.fail(VideoError::InvalidRequest(format!(
        "Missing '{}' part",
        UPLOAD_FIELD
    ))))
}

/// Handle process requests.
///
/// # Endpoint
///
/// `POST /api/video/process?filename={name}&blur_intensity={n}`
///
/// # Query Parameters
///
/// - `filename`: Name of an uploaded clip
/// - `blur_intensity`: Integer, negative values included (default: 2)
///
/// # Response
///
/// - `200 OK`: `{"success": true, "output_filename": "blurred_2_clip.mp4", ...}`
/// - `400 Bad Request`: Missing filename or invalid intensity
/// - `404 Not Found`: No such uploaded clip
/// - `500 Internal Server Error`: Transform or write failed
pub async fn process_handler<T: Transform>(
    State(state): State<AppState<T>>,
    query: Result<Query<ProcessQueryParams>, QueryRejection>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let op = Operation::Process;
    let Query(query) = query.map_err(|r| op.fail(VideoError::InvalidRequest(r.body_text())))?;

    let outcome = state
        .service
        .process(&query.filename, query.blur_intensity)
        .await
        .map_err(|e| op.fail(e))?;

    Ok(Json(ProcessResponse {
        success: true,
        output_filename: outcome.output_filename,
        blur_intensity: outcome.blur_intensity,
        message: "Video processed with penguin blur".to_string(),
    }))
}

/// Handle download requests.
///
/// # Endpoint
///
/// `GET /api/video/download/{filename}`
///
/// # Response
///
/// - `200 OK`: File bytes, streamed from disk
/// - `400 Bad Request`: Invalid filename
/// - `404 Not Found`: No such processed clip
///
/// # Headers
///
/// - `Content-Type: video/mp4`
/// - `Content-Length: {size}`
/// - `Content-Disposition: attachment; filename="{filename}"`
pub async fn download_handler<T: Transform>(
    State(state): State<AppState<T>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let op = Operation::Download;
    let download = state
        .service
        .open_processed(&filename)
        .await
        .map_err(|e| op.fail(e))?;

    debug!(filename = %download.filename, size = download.size, "Streaming download");

    let body = Body::from_stream(ReaderStream::new(download.file));
    let mut response = body.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(DOWNLOAD_MEDIA_TYPE),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(download.size));
    if let Ok(value) = HeaderValue::from_str(&content_disposition(&download.filename)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok(response)
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 name.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if fallback == filename {
        format!("attachment; filename=\"{}\"", filename)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(filename)
        )
    }
}

/// Handle list requests.
///
/// # Endpoint
///
/// `GET /api/video/list`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "success": true,
///   "files": [{"filename": "blurred_2_clip.mp4", "size": 1024, "created": 1718000000.5}]
/// }
/// ```
pub async fn list_handler<T: Transform>(
    State(state): State<AppState<T>>,
) -> Result<Json<ListResponse>, ApiError> {
    let files = state
        .service
        .list_processed()
        .await
        .map_err(|e| Operation::List.fail(e))?;

    Ok(Json(ListResponse {
        success: true,
        files,
    }))
}

/// Handle cleanup requests.
///
/// # Endpoint
///
/// `DELETE /api/cleanup`
///
/// # Response
///
/// `200 OK` with `{"success": true, "deleted_files": N}`
pub async fn cleanup_handler<T: Transform>(
    State(state): State<AppState<T>>,
) -> Result<Json<CleanupResponse>, ApiError> {
    let report = state
        .service
        .cleanup()
        .await
        .map_err(|e| Operation::Cleanup.fail(e))?;

    Ok(Json(CleanupResponse {
        success: true,
        deleted_files: report.deleted,
    }))
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "service": "penguinblur",
///   "version": "0.1.0",
///   "port": 8080
/// }
/// ```
pub async fn health_handler<T: Transform>(State(state): State<AppState<T>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        port: state.port,
    })
}

/// Serve the frontend entry page.
///
/// # Endpoint
///
/// `GET /`
///
/// # Response
///
/// - `200 OK`: `index.html` from the static directory
/// - `404 Not Found`: `{"error": "Frontend not built"}`
pub async fn index_handler<T: Transform>(State(state): State<AppState<T>>) -> Response {
    match tokio::fs::read_to_string(state.static_file("index.html")).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            debug!(error = %e, "No frontend index page");
            (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": "Frontend not built" })),
            )
                .into_response()
        }
    }
}
