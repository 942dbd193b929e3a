//! Video lifecycle service.
//!
//! The VideoService is the main entry point for every operation. It owns the
//! storage layout, the per-file locks and the transform:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         VideoService                            │
//! │                                                                 │
//! │   upload ──► upload area ──► process ──► temp area              │
//! │                                 │            │                  │
//! │                             Transform        ├──► list          │
//! │                                              ├──► download      │
//! │                                              └──► cleanup       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A file moves `uploaded → processed → deleted`. Nothing records that state:
//! it is read back from directory presence and mtime on every call.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use futures::Stream;
use serde::Serialize;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{StorageError, VideoError};
use crate::storage::{
    is_processed_name, processed_file_name, write_atomic, write_stream_atomic, Area, FileLocks,
    StoragePaths, StreamWriteError, MAX_SOURCE_NAME_LEN,
};

use super::cleanup::{sweep_expired, CleanupReport};
use super::transform::Transform;

/// Age after which a file in the temp area is eligible for deletion.
pub const RETENTION_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Intensity used when the caller does not pass one.
pub const DEFAULT_BLUR_INTENSITY: i64 = 2;

/// Media type every download is served as.
pub const DOWNLOAD_MEDIA_TYPE: &str = "video/mp4";

/// Whether a declared media type names a video.
pub fn is_video_media_type(content_type: &str) -> bool {
    content_type
        .trim()
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("video/"))
}

// =============================================================================
// Results
// =============================================================================

/// A source clip stored in the upload area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub size: u64,
    pub content_type: String,
}

/// Result of a process call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub output_filename: String,
    pub blur_intensity: i64,
}

/// A processed file as reported by listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedFileInfo {
    pub filename: String,

    /// Size in bytes
    pub size: u64,

    /// Seconds since the Unix epoch
    pub created: f64,
}

/// An opened processed file, ready to stream.
///
/// The handle stays readable even if the name is reaped while streaming.
#[derive(Debug)]
pub struct ProcessedDownload {
    pub filename: String,
    pub size: u64,
    pub file: fs::File,
}

// =============================================================================
// Video Service
// =============================================================================

/// Upload, process, list, download and clean up video files.
///
/// # Type Parameters
///
/// * `T` - The transform applied by [`VideoService::process`]
///
/// # Example
///
/// ```ignore
/// use penguinblur::storage::StoragePaths;
/// use penguinblur::video::{PassthroughTransform, VideoService};
///
/// let paths = StoragePaths::under_root("/var/lib/penguinblur");
/// paths.ensure_dirs().await?;
/// let service = VideoService::new(paths, PassthroughTransform);
///
/// service.upload_bytes("clip.mp4", "video/mp4", data).await?;
/// let outcome = service.process("clip.mp4", 2).await?;
/// assert_eq!(outcome.output_filename, "blurred_2_clip.mp4");
/// ```
pub struct VideoService<T: Transform> {
    paths: StoragePaths,
    transform: T,
    locks: FileLocks,
}

impl<T: Transform> VideoService<T> {
    pub fn new(paths: StoragePaths, transform: T) -> Self {
        Self {
            paths,
            transform,
            locks: FileLocks::new(),
        }
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    pub fn transform(&self) -> &T {
        &self.transform
    }

    pub fn locks(&self) -> &FileLocks {
        &self.locks
    }

    /// Store a clip in the upload area under `filename`.
    ///
    /// The body is streamed to disk and renamed into place when complete; an
    /// existing file of the same name is replaced. Errors yielded by `body`
    /// are returned as-is.
    ///
    /// # Errors
    ///
    /// - [`VideoError::InvalidMediaType`] when `content_type` is not `video/*`
    /// - [`StorageError::InvalidName`] when `filename` is not a plain name or
    ///   is too long to name a processed output
    /// - [`StorageError::Io`] when the write fails
    pub async fn upload<S>(
        &self,
        filename: &str,
        content_type: &str,
        body: S,
    ) -> Result<UploadedFile, VideoError>
    where
        S: Stream<Item = Result<Bytes, VideoError>>,
    {
        if !is_video_media_type(content_type) {
            return Err(VideoError::InvalidMediaType {
                content_type: content_type.to_string(),
            });
        }
        let path = self.paths.resolve(Area::Upload, filename)?;
        if filename.len() > MAX_SOURCE_NAME_LEN {
            return Err(StorageError::InvalidName(filename.to_string()).into());
        }

        let _guard = self.locks.lock(Area::Upload, filename).await;
        let size = write_stream_atomic(&path, body)
            .await
            .map_err(|e| match e {
                StreamWriteError::Source(e) => e,
                StreamWriteError::Storage(e) => VideoError::Storage(e),
            })?;

        info!(
            filename = filename,
            size = size,
            content_type = content_type,
            "File uploaded successfully"
        );

        Ok(UploadedFile {
            filename: filename.to_string(),
            size,
            content_type: content_type.to_string(),
        })
    }

    /// Store an in-memory clip. See [`VideoService::upload`].
    pub async fn upload_bytes(
        &self,
        filename: &str,
        content_type: &str,
        data: impl Into<Bytes>,
    ) -> Result<UploadedFile, VideoError> {
        let body = futures::stream::once(futures::future::ready(Ok(data.into())));
        self.upload(filename, content_type, body).await
    }

    /// Run the transform over an uploaded clip and store the output in the
    /// temp area as `blurred_{intensity}_{filename}`.
    ///
    /// The source is left in place. An existing output of the same name is
    /// replaced.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotFound`] when `filename` is not in the upload area
    /// - [`StorageError::InvalidName`] when `filename` is not a plain name
    /// - [`VideoError::Transform`] when the transform fails
    pub async fn process(
        &self,
        filename: &str,
        intensity: i64,
    ) -> Result<ProcessOutcome, VideoError> {
        let source_path = self.paths.resolve(Area::Upload, filename)?;
        let output_filename = processed_file_name(filename, intensity);
        // Only length can fail here, and the caller chose the source name
        let output_path = self
            .paths
            .resolve(Area::Temp, &output_filename)
            .map_err(|_| StorageError::InvalidName(filename.to_string()))?;

        let source = {
            let _guard = self.locks.lock(Area::Upload, filename).await;
            read_regular_file(filename, &source_path).await?
        };
        let source_size = source.len();

        let output = self
            .transform
            .apply(Bytes::from(source), intensity)
            .await?;

        {
            let _guard = self.locks.lock(Area::Temp, &output_filename).await;
            write_atomic(&output_path, &output).await?;
        }

        info!(
            input_file = %source_path.display(),
            output_file = %output_path.display(),
            blur_intensity = intensity,
            transform = self.transform.name(),
            input_size = source_size,
            output_size = output.len(),
            "Video processed successfully"
        );

        Ok(ProcessOutcome {
            output_filename,
            blur_intensity: intensity,
        })
    }

    /// List processed files in the temp area.
    ///
    /// Only regular files carrying the processed prefix are reported. A
    /// missing temp area yields an empty list. Order follows directory
    /// enumeration and is unspecified.
    pub async fn list_processed(&self) -> Result<Vec<ProcessedFileInfo>, VideoError> {
        let dir = self.paths.temp_dir();
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(dir, e).into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(dir, e))?
        {
            let Ok(filename) = entry.file_name().into_string() else {
                continue;
            };
            if !is_processed_name(&filename) {
                continue;
            }
            // Entries can vanish between enumeration and stat
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }

            let created = metadata
                .created()
                .or_else(|_| metadata.modified())
                .map(unix_seconds)
                .unwrap_or(0.0);

            files.push(ProcessedFileInfo {
                filename,
                size: metadata.len(),
                created,
            });
        }

        debug!(count = files.len(), "Listed processed files");
        Ok(files)
    }

    /// Open a file from the temp area for download.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotFound`] when `filename` is not in the temp area
    /// - [`StorageError::InvalidName`] when `filename` is not a plain name
    pub async fn open_processed(&self, filename: &str) -> Result<ProcessedDownload, VideoError> {
        let path = self.paths.resolve(Area::Temp, filename)?;

        let _guard = self.locks.lock(Area::Temp, filename).await;
        let file = fs::File::open(&path)
            .await
            .map_err(|e| StorageError::on_read(filename, &path, e))?;
        let metadata = file
            .metadata()
            .await
            .map_err(|e| StorageError::io(&path, e))?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound(filename.to_string()).into());
        }

        Ok(ProcessedDownload {
            filename: filename.to_string(),
            size: metadata.len(),
            file,
        })
    }

    /// Delete every temp-area entry older than [`RETENTION_WINDOW`].
    pub async fn cleanup(&self) -> Result<CleanupReport, VideoError> {
        let cutoff = SystemTime::now()
            .checked_sub(RETENTION_WINDOW)
            .unwrap_or(UNIX_EPOCH);
        self.cleanup_older_than(cutoff).await
    }

    /// Delete every temp-area entry last modified before `cutoff`.
    pub async fn cleanup_older_than(&self, cutoff: SystemTime) -> Result<CleanupReport, VideoError> {
        let report = sweep_expired(self.paths.temp_dir(), cutoff, &self.locks).await?;

        info!(
            deleted_files = report.deleted,
            failed = report.failed,
            "Cleanup completed"
        );
        Ok(report)
    }
}

async fn read_regular_file(name: &str, path: &Path) -> Result<Vec<u8>, StorageError> {
    let metadata = fs::metadata(path)
        .await
        .map_err(|e| StorageError::on_read(name, path, e))?;
    if !metadata.is_file() {
        return Err(StorageError::NotFound(name.to_string()));
    }
    fs::read(path)
        .await
        .map_err(|e| StorageError::on_read(name, path, e))
}

fn unix_seconds(time: SystemTime) -> f64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
