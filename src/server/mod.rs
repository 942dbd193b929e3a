//! HTTP server layer for PenguinBlur.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │       /api/upload   /api/video/*   /api/cleanup   /health       │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │           routes            │  │
//! │  │ (requests, error → JSON) │  │ (CORS, limits, tracing)     │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    cleanup_handler, download_handler, health_handler, index_handler, list_handler,
    process_handler, upload_handler, ApiError, AppState, CleanupResponse, ErrorResponse,
    HealthResponse, ListResponse, Operation, ProcessQueryParams, ProcessResponse, UploadResponse,
};
pub use routes::{create_router, RouterConfig, DEFAULT_MAX_UPLOAD_SIZE};
