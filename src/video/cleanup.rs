//! Time-based eviction of the temp area.
//!
//! An entry is expired when its mtime is older than the cutoff. The age is
//! checked once while enumerating and again under the entry's lock, so a file
//! rewritten by a concurrent process call between the two is kept.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::fs;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{StorageError, VideoError};
use crate::storage::{Area, FileLocks};

use super::service::VideoService;
use super::transform::Transform;

/// Outcome of a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Entries removed
    pub deleted: usize,

    /// Expired entries that could not be removed
    pub failed: usize,
}

/// Remove every regular file in `dir` last modified before `cutoff`.
///
/// A missing directory is an empty sweep. Failures on single entries are
/// logged and counted; only failing to enumerate `dir` is an error.
pub async fn sweep_expired(
    dir: &Path,
    cutoff: SystemTime,
    locks: &FileLocks,
) -> Result<CleanupReport, VideoError> {
    sweep_expired_with(dir, cutoff, locks, |path| fs::remove_file(path)).await
}

/// [`sweep_expired`] with the unlink step supplied by the caller.
async fn sweep_expired_with<F, Fut>(
    dir: &Path,
    cutoff: SystemTime,
    locks: &FileLocks,
    remove: F,
) -> Result<CleanupReport, VideoError>
where
    F: Fn(PathBuf) -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    let mut report = CleanupReport::default();

    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(report),
        Err(e) => return Err(StorageError::io(dir, e).into()),
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| StorageError::io(dir, e))?
    {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        match entry.metadata().await {
            Ok(metadata) if !metadata.is_dir() && is_expired(&metadata, cutoff) => {}
            _ => continue,
        }

        let _guard = locks.lock(Area::Temp, &name).await;

        // Re-check under the lock
        let metadata = match fs::symlink_metadata(&path).await {
            Ok(metadata) => metadata,
            Err(_) => continue,
        };
        if metadata.is_dir() || !is_expired(&metadata, cutoff) {
            continue;
        }

        match remove(path).await {
            Ok(()) => {
                debug!(filename = %name, "Deleted expired file");
                report.deleted += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(filename = %name, error = %e, "Failed to delete expired file");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

fn is_expired(metadata: &std::fs::Metadata, cutoff: SystemTime) -> bool {
    metadata
        .modified()
        .map(|modified| modified < cutoff)
        .unwrap_or(false)
}

/// Run [`VideoService::cleanup`] every `period` until the task is aborted.
///
/// The first sweep runs immediately.
pub fn spawn_sweeper<T>(service: Arc<VideoService<T>>, period: Duration) -> JoinHandle<()>
where
    T: Transform + 'static,
{
    info!(interval_secs = period.as_secs(), "Starting background cleanup");

    tokio::spawn(async move {
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            if let Err(e) = service.cleanup().await {
                warn!(error = %e, "Background cleanup failed");
            }
        }
    })
}
