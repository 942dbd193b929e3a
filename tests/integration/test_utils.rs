//! Test utilities for integration tests.
//!
//! Every test gets its own temporary storage root with `uploads/`, `temp/`
//! and `static/` created inside it.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use tempfile::TempDir;

use penguinblur::error::TransformError;
use penguinblur::{create_router, PassthroughTransform, RouterConfig, StoragePaths, Transform, VideoService};

/// Boundary used by [`multipart_body`].
pub const BOUNDARY: &str = "penguinblur-test-boundary";

// =============================================================================
// Test Context
// =============================================================================

/// A service over a fresh temporary storage root.
pub struct TestContext<T: Transform = PassthroughTransform> {
    pub root: TempDir,
    pub service: Arc<VideoService<T>>,
}

impl TestContext<PassthroughTransform> {
    pub async fn new() -> Self {
        Self::with_transform(PassthroughTransform).await
    }
}

impl<T: Transform + 'static> TestContext<T> {
    pub async fn with_transform(transform: T) -> Self {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        let paths = StoragePaths::under_root(root.path());
        paths
            .ensure_dirs()
            .await
            .expect("Failed to create storage dirs");

        Self {
            root,
            service: Arc::new(VideoService::new(paths, transform)),
        }
    }

    /// Router with tracing off and default limits.
    pub fn router(&self) -> Router {
        self.router_with(RouterConfig::new(8080).with_tracing(false))
    }

    pub fn router_with(&self, config: RouterConfig) -> Router {
        create_router(Arc::clone(&self.service), config)
    }

    pub fn upload_dir(&self) -> &Path {
        self.service.paths().upload_dir()
    }

    pub fn temp_dir(&self) -> &Path {
        self.service.paths().temp_dir()
    }

    pub fn static_dir(&self) -> &Path {
        self.service.paths().static_dir()
    }
}

// =============================================================================
// Transforms
// =============================================================================

/// Panics on every call.
pub struct PanickingTransform;

#[async_trait]
impl Transform for PanickingTransform {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn apply(&self, _source: Bytes, _intensity: i64) -> Result<Bytes, TransformError> {
        panic!("transform exploded");
    }
}

/// Fails on every call.
pub struct FailingTransform;

#[async_trait]
impl Transform for FailingTransform {
    fn name(&self) -> &str {
        "failing"
    }

    async fn apply(&self, _source: Bytes, _intensity: i64) -> Result<Bytes, TransformError> {
        Err(TransformError::UnsupportedInput("not an mp4 container".to_string()))
    }
}

// =============================================================================
// Request Builders
// =============================================================================

/// Deterministic payload of `len` bytes.
pub fn sample_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 256) as u8).collect()
}

/// Encode a single-part `multipart/form-data` body.
pub fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// `POST /api/upload` with a raw multipart body.
pub fn multipart_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// `POST /api/upload` with the file in the `file` part.
pub fn upload_request(filename: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    multipart_request(multipart_body("file", filename, content_type, data))
}

pub fn process_request(filename: &str, intensity: Option<&str>) -> Request<Body> {
    let uri = match intensity {
        Some(i) => format!(
            "/api/video/process?filename={}&blur_intensity={}",
            urlencoding::encode(filename),
            i
        ),
        None => format!("/api/video/process?filename={}", urlencoding::encode(filename)),
    };
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn cleanup_request() -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri("/api/cleanup")
        .body(Body::empty())
        .unwrap()
}

// =============================================================================
// Response Helpers
// =============================================================================

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        panic!(
            "Response is not JSON ({}): {}",
            e,
            String::from_utf8_lossy(&bytes)
        )
    })
}

// =============================================================================
// Filesystem Helpers
// =============================================================================

/// Push a file's mtime `by` into the past.
pub fn age_file(path: &Path, by: Duration) {
    let file = std::fs::File::options()
        .write(true)
        .open(path)
        .expect("Failed to open file for aging");
    file.set_modified(SystemTime::now() - by)
        .expect("Failed to set mtime");
}
