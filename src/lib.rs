/// Media library cache
///
/// Lists a device's photos, videos and albums through a slow, paginated
/// provider, serves a small first page immediately while the full
/// collection loads in the background, and keeps a bounded, expiring
/// thumbnail cache warm. An optional native channel can stand in for the
/// provider when listing photos and rendering thumbnails.

pub mod cache;
pub mod config;
pub mod error;
pub mod imaging;
pub mod native;
pub mod provider;
pub mod scan;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheStats, MediaCache, ThumbnailCache};
pub use config::CacheConfig;
pub use error::{MediaCacheError, NativeError, NativeErrorKind, ProviderError};
pub use native::{LocalNativeTransport, NativeFastPath, NativeTransport};
pub use provider::{AssetProvider, FsAssetProvider};
pub use state::data::{AlbumHandle, AssetId, AssetKind, MediaAsset, RequestType};
