//! On-disk storage layer.
//!
//! There is no database: the directory listing of each area is the source of
//! truth for which files exist, and a file's mtime is the source of truth for
//! its age.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              VideoService               │
//! └────────────────────┬────────────────────┘
//!                      │
//!          ┌───────────┼───────────┐
//!          ▼           ▼           ▼
//! ┌──────────────┐ ┌────────┐ ┌────────────┐
//! │ StoragePaths │ │ naming │ │ FileLocks  │
//! │ (areas, name │ │        │ │ (per name) │
//! │  validation) │ │        │ │            │
//! └──────────────┘ └────────┘ └────────────┘
//!          │
//!          ▼
//! ┌─────────────────────────────────────────┐
//! │   atomic writes (.partial → rename)     │
//! └─────────────────────────────────────────┘
//! ```

mod atomic;
mod lock;
mod naming;
mod paths;

pub use atomic::{
    partial_path, write_atomic, write_stream_atomic, StreamWriteError, PARTIAL_SUFFIX,
};
pub use lock::{FileGuard, FileLocks};
pub use naming::{
    is_processed_name, parse_processed_name, processed_file_name, MAX_SOURCE_NAME_LEN,
    PROCESSED_PREFIX,
};
pub use paths::{validate_file_name, Area, StoragePaths, MAX_FILE_NAME_LEN};
