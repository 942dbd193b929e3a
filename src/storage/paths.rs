//! Storage area configuration.
//!
//! The service owns two working directories:
//!
//! - the **upload area**, holding caller-submitted source files
//! - the **temp area**, holding processed outputs subject to time-based eviction
//!
//! plus a static directory for the frontend. All of them are configured once
//! and injected into the service; file names are resolved against them only
//! after validation, so a caller-supplied name can never escape its area.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::StorageError;

/// One of the two lifecycle areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    Upload,
    Temp,
}

/// Directory layout for the service.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    upload_dir: PathBuf,
    temp_dir: PathBuf,
    static_dir: PathBuf,
}

impl StoragePaths {
    /// Create a layout from explicit directories.
    pub fn new(
        upload_dir: impl Into<PathBuf>,
        temp_dir: impl Into<PathBuf>,
        static_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            temp_dir: temp_dir.into(),
            static_dir: static_dir.into(),
        }
    }

    /// Create a layout with `uploads/`, `temp/` and `static/` under one root.
    pub fn under_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::new(root.join("uploads"), root.join("temp"), root.join("static"))
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn static_dir(&self) -> &Path {
        &self.static_dir
    }

    /// Directory backing an area.
    pub fn dir(&self, area: Area) -> &Path {
        match area {
            Area::Upload => &self.upload_dir,
            Area::Temp => &self.temp_dir,
        }
    }

    /// Resolve a caller-supplied name to a path inside `area`.
    pub fn resolve(&self, area: Area, name: &str) -> Result<PathBuf, StorageError> {
        validate_file_name(name)?;
        Ok(self.dir(area).join(name))
    }

    /// Create every directory that does not exist yet.
    pub async fn ensure_dirs(&self) -> Result<(), StorageError> {
        for dir in [&self.upload_dir, &self.temp_dir, &self.static_dir] {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| StorageError::io(dir.clone(), e))?;
        }
        Ok(())
    }
}

/// Longest name, in bytes, most filesystems accept for one path component.
pub const MAX_FILE_NAME_LEN: usize = 255;

/// Check that a name is a single plain path component.
///
/// Names are used verbatim as storage keys, so this is the only guard
/// between a request and the filesystem. Hidden names are reserved for
/// in-progress partial writes.
pub fn validate_file_name(name: &str) -> Result<(), StorageError> {
    let invalid = name.is_empty()
        || name.len() > MAX_FILE_NAME_LEN
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
        || name.contains("..");

    if invalid {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}
