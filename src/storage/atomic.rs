//! Atomic file writes.
//!
//! Data is written to a hidden `.{name}.partial` sibling and renamed over the
//! destination once complete. Readers see either the previous file or the
//! full new one. A failed write removes its partial file.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::StorageError;

/// Suffix of in-progress writes.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Hidden sibling used while writing `path`.
pub fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}{PARTIAL_SUFFIX}"))
}

/// Write `data` to `path` atomically.
pub async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let partial = partial_path(path);
    let result = async {
        let mut file = fs::File::create(&partial)
            .await
            .map_err(|e| StorageError::io(&partial, e))?;
        file.write_all(data)
            .await
            .map_err(|e| StorageError::io(&partial, e))?;
        file.sync_all()
            .await
            .map_err(|e| StorageError::io(&partial, e))?;
        Ok::<(), StorageError>(())
    }
    .await;

    finish(&partial, path, result).await
}

/// Error from a chunk stream, kept apart from storage errors so callers can
/// tell a broken client upload from a broken disk.
#[derive(Debug)]
pub enum StreamWriteError<E> {
    Source(E),
    Storage(StorageError),
}

/// Stream chunks into `path` atomically, returning the byte count.
pub async fn write_stream_atomic<S, E>(path: &Path, body: S) -> Result<u64, StreamWriteError<E>>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    let partial = partial_path(path);
    let mut body = std::pin::pin!(body);

    let mut file = match fs::File::create(&partial).await {
        Ok(file) => file,
        Err(e) => return Err(StreamWriteError::Storage(StorageError::io(&partial, e))),
    };

    let mut written: u64 = 0;
    let mut failure = None;
    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                failure = Some(StreamWriteError::Source(e));
                break;
            }
        };
        if let Err(e) = file.write_all(&chunk).await {
            failure = Some(StreamWriteError::Storage(StorageError::io(&partial, e)));
            break;
        }
        written += chunk.len() as u64;
    }

    if failure.is_none() {
        if let Err(e) = file.sync_all().await {
            failure = Some(StreamWriteError::Storage(StorageError::io(&partial, e)));
        }
    }
    drop(file);

    match failure {
        Some(err) => {
            let _ = fs::remove_file(&partial).await;
            Err(err)
        }
        None => finish(&partial, path, Ok(()))
            .await
            .map(|_| written)
            .map_err(StreamWriteError::Storage),
    }
}

async fn finish(
    partial: &Path,
    path: &Path,
    result: Result<(), StorageError>,
) -> Result<(), StorageError> {
    if let Err(e) = result {
        let _ = fs::remove_file(partial).await;
        return Err(e);
    }
    if let Err(e) = fs::rename(partial, path).await {
        let _ = fs::remove_file(partial).await;
        return Err(StorageError::io(path, e));
    }
    Ok(())
}
