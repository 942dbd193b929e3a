use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the on-disk storage areas
#[derive(Debug, Error)]
pub enum StorageError {
    /// File name is empty, contains a path separator, `..`, a NUL byte,
    /// or starts with `.`
    #[error("Invalid file name: {0:?}")]
    InvalidName(String),

    /// No such file in the area
    #[error("File not found: {0}")]
    NotFound(String),

    /// Filesystem error on a specific path
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap an I/O error raised while reading `name`.
    ///
    /// `ErrorKind::NotFound` becomes [`StorageError::NotFound`] so callers can
    /// report it as a 404; anything else stays an I/O failure.
    pub fn on_read(name: &str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(name.to_string())
        } else {
            StorageError::io(path, source)
        }
    }
}

/// Errors raised by a [`Transform`](crate::video::Transform) implementation
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    /// The input could not be understood by the transform
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    /// The transform ran but failed
    #[error("Transform failed: {0}")]
    Failed(String),
}

/// Errors returned by the video lifecycle operations
#[derive(Debug, Error)]
pub enum VideoError {
    /// Declared media type is not `video/*` (maps to HTTP 400)
    #[error("File must be a video (got media type {content_type:?})")]
    InvalidMediaType { content_type: String },

    /// Request was malformed in a way the caller can fix (maps to HTTP 400)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Payload stream broke off mid-upload
    #[error("Upload stream error: {0}")]
    UploadStream(String),

    /// Upload body exceeded the configured limit (maps to HTTP 413)
    #[error("Upload exceeds the maximum allowed size of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Coarse classification used at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    IoFailure,
}

impl VideoError {
    /// Classify this error for status code mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VideoError::InvalidMediaType { .. }
            | VideoError::InvalidRequest(_)
            | VideoError::UploadStream(_)
            | VideoError::PayloadTooLarge { .. }
            | VideoError::Storage(StorageError::InvalidName(_)) => ErrorKind::InvalidInput,
            VideoError::Storage(StorageError::NotFound(_)) => ErrorKind::NotFound,
            VideoError::Storage(StorageError::Io { .. }) | VideoError::Transform(_) => {
                ErrorKind::IoFailure
            }
        }
    }
}
