/// Error types for the media cache
///
/// Foreground loads surface `MediaCacheError` to the caller. Background
/// continuations and thumbnail warming only log; they never return these.
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures raised by an asset provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("album not found: {0}")]
    AlbumNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode media: {0}")]
    Decode(String),

    #[error("background task failed: {0}")]
    Task(String),
}

impl From<image::ImageError> for ProviderError {
    fn from(err: image::ImageError) -> Self {
        ProviderError::Decode(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ProviderError {
    fn from(err: tokio::task::JoinError) -> Self {
        ProviderError::Task(err.to_string())
    }
}

/// Machine-readable failure kind reported by the native channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NativeErrorKind {
    QueryError,
    ThumbnailError,
    CountError,
    InvalidArgument,
}

impl NativeErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NativeErrorKind::QueryError => "QUERY_ERROR",
            NativeErrorKind::ThumbnailError => "THUMBNAIL_ERROR",
            NativeErrorKind::CountError => "COUNT_ERROR",
            NativeErrorKind::InvalidArgument => "INVALID_ARGUMENT",
        }
    }
}

impl fmt::Display for NativeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged failure returned over the native channel
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct NativeError {
    pub kind: NativeErrorKind,
    pub message: String,
}

impl NativeError {
    pub fn new(kind: NativeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::new(NativeErrorKind::QueryError, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(NativeErrorKind::InvalidArgument, message)
    }
}

/// Errors surfaced to the UI by foreground loads
#[derive(Debug, Error)]
pub enum MediaCacheError {
    #[error("provider query failed: {0}")]
    Provider(#[from] ProviderError),
}

pub type ProviderResult<T> = Result<T, ProviderError>;
pub type NativeResult<T> = Result<T, NativeError>;
pub type MediaCacheResult<T> = Result<T, MediaCacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_error_display_uses_wire_kind() {
        let err = NativeError::new(NativeErrorKind::CountError, "cursor was null");
        assert_eq!(err.to_string(), "COUNT_ERROR: cursor was null");
    }

    #[test]
    fn test_native_error_kind_serializes_as_wire_string() {
        let json = serde_json::to_string(&NativeErrorKind::InvalidArgument).unwrap();
        assert_eq!(json, "\"INVALID_ARGUMENT\"");
    }
}
