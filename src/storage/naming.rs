//! Processed file naming.
//!
//! A processed file is named `blurred_{intensity}_{source}`. Intensity is
//! rendered as a plain decimal with an optional `-`, so the first `_` after
//! the prefix always terminates it and the name decodes back to exactly one
//! `(intensity, source)` pair. Listing relies on the prefix alone.

use super::paths::MAX_FILE_NAME_LEN;

/// Prefix tagging every processed output.
pub const PROCESSED_PREFIX: &str = "blurred_";

/// Longest source name whose output name fits in [`MAX_FILE_NAME_LEN`] at
/// any intensity.
pub const MAX_SOURCE_NAME_LEN: usize =
    MAX_FILE_NAME_LEN - PROCESSED_PREFIX.len() - "-9223372036854775808_".len();

/// Derive the output name for a source file processed at `intensity`.
pub fn processed_file_name(source: &str, intensity: i64) -> String {
    format!("{PROCESSED_PREFIX}{intensity}_{source}")
}

/// Whether `name` carries the processed prefix.
pub fn is_processed_name(name: &str) -> bool {
    name.starts_with(PROCESSED_PREFIX)
}

/// Decode a processed name into `(intensity, source)`.
///
/// Returns `None` for names not produced by [`processed_file_name`].
pub fn parse_processed_name(name: &str) -> Option<(i64, &str)> {
    let rest = name.strip_prefix(PROCESSED_PREFIX)?;
    let (number, source) = rest.split_once('_')?;
    if source.is_empty() {
        return None;
    }
    let intensity: i64 = number.parse().ok()?;
    // Reject `+2`, `02` and `-0`, which no output is ever named with
    if intensity.to_string() != number {
        return None;
    }
    Some((intensity, source))
}
