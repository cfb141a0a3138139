/// Shared data structures for the media cache
///
/// These structs represent the data model that flows between
/// the asset providers and the UI layer.
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider-defined asset identifier
///
/// The generic provider hands out opaque strings, the native channel
/// hands out integer row ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssetId {
    Numeric(i64),
    Text(String),
}

impl AssetId {
    /// Integer id if this asset came from the native channel
    pub fn as_numeric(&self) -> Option<i64> {
        match self {
            AssetId::Numeric(id) => Some(*id),
            AssetId::Text(_) => None,
        }
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetId::Numeric(id) => write!(f, "{}", id),
            AssetId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for AssetId {
    fn from(id: i64) -> Self {
        AssetId::Numeric(id)
    }
}

impl From<String> for AssetId {
    fn from(id: String) -> Self {
        AssetId::Text(id)
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        AssetId::Text(id.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Video,
}

impl AssetKind {
    /// Guess the kind from a MIME type, defaulting to image
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("video/") {
            AssetKind::Video
        } else {
            AssetKind::Image
        }
    }
}

/// Which assets an album listing should cover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Image,
    Video,
    /// Images and videos together
    Common,
}

impl RequestType {
    pub fn accepts(&self, kind: AssetKind) -> bool {
        match self {
            RequestType::Image => kind == AssetKind::Image,
            RequestType::Video => kind == AssetKind::Video,
            RequestType::Common => true,
        }
    }
}

/// Represents a single photo or video
///
/// Immutable once obtained from a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub id: AssetId,
    pub kind: AssetKind,
    /// Filename only (e.g., "IMG_0001.JPG")
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    /// File size in bytes
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub mime_type: String,
    /// Backing file, when the provider exposes one
    pub path: Option<PathBuf>,
}

impl MediaAsset {
    /// Key used by the generic thumbnail cache
    pub fn cache_key(&self) -> String {
        self.id.to_string()
    }
}

/// Snapshot of a device album
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumHandle {
    pub id: String,
    pub name: String,
    /// Asset kinds this album was listed for
    pub request_type: RequestType,
    /// Item count, filled in lazily by the background album pass
    pub asset_count: Option<usize>,
}

impl AlbumHandle {
    pub fn new(id: impl Into<String>, name: impl Into<String>, request_type: RequestType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            request_type,
            asset_count: None,
        }
    }
}
