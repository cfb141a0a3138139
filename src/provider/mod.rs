/// Generic asset provider seam
///
/// Wraps the device's paginated media enumeration and per-asset thumbnail
/// generation. Implementations are plain passthroughs; all caching lives in
/// `cache::media`.
use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::ProviderResult;
use crate::state::data::{AlbumHandle, MediaAsset, RequestType};

pub mod fs;

pub use fs::FsAssetProvider;

#[async_trait]
pub trait AssetProvider: Send + Sync {
    /// Ask the platform for media access
    async fn request_permission(&self) -> ProviderResult<bool>;

    /// List albums holding assets of `kind`
    ///
    /// With `include_aggregate` the first entry is the "all assets" album.
    async fn list_albums(
        &self,
        kind: RequestType,
        include_aggregate: bool,
    ) -> ProviderResult<Vec<AlbumHandle>>;

    /// Number of assets in `album`
    async fn album_count(&self, album: &AlbumHandle) -> ProviderResult<usize>;

    /// One page of `album`, newest first
    async fn album_page(
        &self,
        album: &AlbumHandle,
        offset: usize,
        size: usize,
    ) -> ProviderResult<Vec<MediaAsset>>;

    /// Thumbnail bytes for `asset`, or `None` if it cannot be rendered
    async fn thumbnail(
        &self,
        asset: &MediaAsset,
        width: u32,
        height: u32,
    ) -> ProviderResult<Option<Vec<u8>>>;

    /// Backing file of `asset`, if it still exists
    async fn file(&self, asset: &MediaAsset) -> ProviderResult<Option<PathBuf>>;
}
