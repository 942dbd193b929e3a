//! The processing step between an uploaded clip and its processed output.
//!
//! A [`Transform`] takes the source bytes and the requested intensity and
//! returns the output bytes. Face detection and blurring plug in here;
//! [`PassthroughTransform`] ships as the default and returns its input
//! unchanged.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransformError;

/// A processing step applied to a source clip.
#[async_trait]
pub trait Transform: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Produce the output for `source` at `intensity`.
    async fn apply(&self, source: Bytes, intensity: i64) -> Result<Bytes, TransformError>;
}

/// Returns the source unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTransform;

impl PassthroughTransform {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transform for PassthroughTransform {
    fn name(&self) -> &str {
        "passthrough"
    }

    async fn apply(&self, source: Bytes, _intensity: i64) -> Result<Bytes, TransformError> {
        Ok(source)
    }
}
