//! # PenguinBlur
//!
//! A video relay service: clips are uploaded, run through a pluggable blur
//! transform, listed and downloaded, and reaped once they are older than the
//! retention window.
//!
//! ## Lifecycle
//!
//! ```text
//! upload ──► uploads/clip.mp4 ──process──► temp/blurred_2_clip.mp4 ──15 min──► deleted
//! ```
//!
//! There is no database: the storage directories are the source of truth.
//!
//! ## Architecture
//!
//! - [`storage`] - Directory layout, name validation, per-file locks and atomic writes
//! - [`video`] - The lifecycle service, the transform seam and the retention sweep
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use penguinblur::{create_router, PassthroughTransform, RouterConfig, StoragePaths, VideoService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let paths = StoragePaths::under_root("/var/lib/penguinblur");
//!     paths.ensure_dirs().await?;
//!
//!     let service = Arc::new(VideoService::new(paths, PassthroughTransform));
//!     let router = create_router(service, RouterConfig::new(8080));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod server;
pub mod storage;
pub mod video;

// Re-export commonly used types
pub use config::{CheckConfig, CleanupConfig, Cli, Command, LogFormat, ServeConfig, StorageArgs};
pub use error::{ErrorKind, StorageError, TransformError, VideoError};
pub use server::{create_router, AppState, ErrorResponse, RouterConfig};
pub use storage::{processed_file_name, Area, FileLocks, StoragePaths};
pub use video::{
    spawn_sweeper, CleanupReport, PassthroughTransform, ProcessOutcome, ProcessedFileInfo,
    Transform, UploadedFile, VideoService, RETENTION_WINDOW,
};
