//! Video lifecycle: upload, process, list, download and cleanup.
//!
//! [`VideoService`] implements every operation on top of the storage layer.
//! The processing step is pluggable through [`Transform`].

mod cleanup;
mod service;
mod transform;

pub use cleanup::{spawn_sweeper, sweep_expired, CleanupReport};
pub use service::{
    is_video_media_type, ProcessOutcome, ProcessedDownload, ProcessedFileInfo, UploadedFile,
    VideoService, DEFAULT_BLUR_INTENSITY, DOWNLOAD_MEDIA_TYPE, RETENTION_WINDOW,
};
pub use transform::{PassthroughTransform, Transform};
