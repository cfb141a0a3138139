/// Native fast-path channel
///
/// An optional request/response channel that lists photo metadata and
/// serves thumbnails faster than the generic provider. The wire types here
/// mirror the platform side of the channel; `adapter` wraps them with the
/// probe-and-fallback policy the media cache relies on.
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{NativeError, NativeResult};
use crate::state::data::{AssetId, AssetKind, MediaAsset};

pub mod adapter;
pub mod local;

pub use adapter::NativeFastPath;
pub use local::LocalNativeTransport;

/// One photo as described by the native channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoMetadata {
    pub id: i64,
    pub name: String,
    pub path: String,
    /// Epoch seconds
    pub date_added: i64,
    /// Epoch seconds
    pub date_modified: i64,
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub mime_type: String,
}

impl PhotoMetadata {
    pub fn into_asset(self) -> MediaAsset {
        MediaAsset {
            id: AssetId::Numeric(self.id),
            kind: AssetKind::from_mime(&self.mime_type),
            created_at: epoch(self.date_added),
            modified_at: epoch(self.date_modified),
            size: self.size,
            width: self.width,
            height: self.height,
            path: (!self.path.is_empty()).then(|| self.path.into()),
            name: self.name,
            mime_type: self.mime_type,
        }
    }
}

fn epoch(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .unwrap_or_else(|| DateTime::<Utc>::from(std::time::UNIX_EPOCH))
}

/// One page of metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoPage {
    pub photos: Vec<PhotoMetadata>,
    pub count: usize,
    /// `true` whenever the page came back full, even if nothing follows
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "arguments", rename_all = "camelCase")]
pub enum NativeRequest {
    #[serde(rename_all = "camelCase")]
    GetPhotosMetadata { limit: usize, offset: usize },
    #[serde(rename_all = "camelCase")]
    GetPhotoThumbnail { photo_id: i64, size: u32 },
    GetPhotosCount,
}

impl NativeRequest {
    pub fn method(&self) -> &'static str {
        match self {
            NativeRequest::GetPhotosMetadata { .. } => "getPhotosMetadata",
            NativeRequest::GetPhotoThumbnail { .. } => "getPhotoThumbnail",
            NativeRequest::GetPhotosCount => "getPhotosCount",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NativeResponse {
    Metadata(PhotoPage),
    Thumbnail(Option<Vec<u8>>),
    Count(u64),
}

impl NativeResponse {
    fn kind(&self) -> &'static str {
        match self {
            NativeResponse::Metadata(_) => "metadata",
            NativeResponse::Thumbnail(_) => "thumbnail",
            NativeResponse::Count(_) => "count",
        }
    }
}

/// Transport for the native channel
#[async_trait]
pub trait NativeTransport: Send + Sync {
    async fn call(&self, request: NativeRequest) -> NativeResult<NativeResponse>;
}

/// Error for a response that does not match its request
pub(crate) fn unexpected_response(request: &str, response: &NativeResponse) -> NativeError {
    NativeError::query(format!(
        "unexpected {} response to {}",
        response.kind(),
        request
    ))
}
