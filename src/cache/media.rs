/// The media cache
///
/// One shared instance per process, constructed explicitly and handed to
/// every screen. It owns the collection snapshots, both thumbnail caches and
/// the permission answer.
///
/// Collections load in two phases: `load_*` returns a small first page right
/// away and spawns a continuation that fetches everything and replaces the
/// snapshot. Each continuation carries the cache generation it started in;
/// `clear_cache` bumps the generation so late results from before the clear
/// are dropped instead of overwriting fresh state.
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::thumbnail::ThumbnailCache;
use super::warmer::ThumbnailWarmer;
use crate::config::CacheConfig;
use crate::error::{MediaCacheResult, ProviderResult};
use crate::native::{NativeFastPath, PhotoMetadata};
use crate::provider::AssetProvider;
use crate::state::data::{AlbumHandle, AssetId, MediaAsset, RequestType};
use crate::state::permission::{PermissionGate, PermissionState};
use crate::state::snapshot::{CollectionSnapshot, LoadPhase};

/// Which asset snapshot an operation targets
#[derive(Debug, Clone, PartialEq, Eq)]
enum Collection {
    Photos,
    Videos,
    AlbumAssets(String),
}

impl Collection {
    fn snapshot<'a>(&self, state: &'a mut CacheState) -> &'a mut CollectionSnapshot<MediaAsset> {
        match self {
            Collection::Photos => &mut state.photos,
            Collection::Videos => &mut state.videos,
            Collection::AlbumAssets(id) => state.album_assets.entry(id.clone()).or_default(),
        }
    }

    fn peek<'a>(&self, state: &'a CacheState) -> Option<&'a CollectionSnapshot<MediaAsset>> {
        match self {
            Collection::Photos => Some(&state.photos),
            Collection::Videos => Some(&state.videos),
            Collection::AlbumAssets(id) => state.album_assets.get(id),
        }
    }
}

/// Which thumbnail cache an asset list warms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThumbnailRoute {
    Generic,
    Native,
}

#[derive(Debug, Default)]
struct CacheState {
    photos: CollectionSnapshot<MediaAsset>,
    videos: CollectionSnapshot<MediaAsset>,
    albums: CollectionSnapshot<AlbumHandle>,
    album_assets: HashMap<String, CollectionSnapshot<MediaAsset>>,
    generation: u64,
}

/// Length and phase of one collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    pub len: usize,
    pub phase: LoadPhase,
}

impl CollectionStats {
    fn of<T: Clone>(snapshot: &CollectionSnapshot<T>) -> Self {
        Self {
            len: snapshot.len(),
            phase: snapshot.phase(),
        }
    }
}

/// Point-in-time view of everything the cache holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub photos: CollectionStats,
    pub videos: CollectionStats,
    pub albums: CollectionStats,
    pub album_asset_collections: usize,
    pub album_assets: usize,
    pub thumbnails: usize,
    pub thumbnail_capacity: usize,
    pub native_thumbnails: usize,
    pub native_thumbnail_capacity: usize,
    pub permission: PermissionState,
    /// `None` until the native probe has run
    pub native_available: Option<bool>,
    pub generation: u64,
}

struct Inner {
    provider: Arc<dyn AssetProvider>,
    native: Option<NativeFastPath>,
    config: CacheConfig,
    permission: PermissionGate,
    state: Mutex<CacheState>,
    thumbnails: ThumbnailCache<String>,
    native_thumbnails: ThumbnailCache<i64>,
    warmer: ThumbnailWarmer,
    native_warmer: ThumbnailWarmer,
    background: Mutex<Vec<JoinHandle<()>>>,
}

#[derive(Clone)]
pub struct MediaCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MediaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaCache")
            .field("native", &self.inner.native)
            .field("generation", &self.inner.state.lock().generation)
            .finish()
    }
}

impl MediaCache {
    pub fn new(
        provider: Arc<dyn AssetProvider>,
        native: Option<NativeFastPath>,
        config: CacheConfig,
    ) -> Self {
        let ttl = config.thumbnail_ttl();
        let inner = Inner {
            provider,
            native,
            permission: PermissionGate::new(),
            state: Mutex::new(CacheState::default()),
            thumbnails: ThumbnailCache::new(config.generic_thumbnail_capacity, ttl),
            native_thumbnails: ThumbnailCache::new(config.native_thumbnail_capacity, ttl),
            warmer: ThumbnailWarmer::new(config.warm_batch_size, config.warm_batch_delay()),
            native_warmer: ThumbnailWarmer::new(config.warm_batch_size, config.warm_batch_delay()),
            background: Mutex::new(Vec::new()),
            config,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    // ========== Permission ==========

    /// Cached media permission, asking the provider only the first time
    pub async fn check_permission(&self) -> bool {
        self.inner
            .permission
            .check(self.inner.provider.as_ref())
            .await
    }

    // ========== Photos ==========

    /// Photos, newest first
    ///
    /// Uses the native fast path when its probe succeeded, falling back to
    /// the generic provider if a native listing fails.
    pub async fn load_photos(&self, force_reload: bool) -> MediaCacheResult<Vec<MediaAsset>> {
        if !self.check_permission().await {
            return Ok(Vec::new());
        }
        if !force_reload {
            if let Some(items) = self.cached(&Collection::Photos) {
                return Ok(items);
            }
        }

        if let Some(native) = self.native().await {
            match self.load_native_photos(native).await {
                Ok(items) => return Ok(items),
                Err(err) => warn!(error = %err, "Native photo listing failed, using generic provider"),
            }
        }

        let page_size = self.inner.config.photo_page_size;
        self.load_aggregate(Collection::Photos, RequestType::Image, page_size)
            .await
    }

    /// Every photo in one pass, skipping the two-phase strategy
    pub async fn load_all_photos(&self) -> MediaCacheResult<Vec<MediaAsset>> {
        if !self.check_permission().await {
            return Ok(Vec::new());
        }
        let generation = self.generation();

        if let Some(native) = self.native().await {
            match native
                .list_all_metadata(self.inner.config.native_page_size)
                .await
            {
                Ok(photos) => {
                    let items = into_assets(photos);
                    self.store_full(&Collection::Photos, generation, items.clone(), ThumbnailRoute::Native);
                    return Ok(items);
                }
                Err(err) => warn!(error = %err, "Native photo listing failed, using generic provider"),
            }
        }

        let result = self.fetch_aggregate(RequestType::Image).await;
        self.settle_load_all(&Collection::Photos, generation, result)
    }

    // ========== Videos ==========

    pub async fn load_videos(&self, force_reload: bool) -> MediaCacheResult<Vec<MediaAsset>> {
        if !self.check_permission().await {
            return Ok(Vec::new());
        }
        if !force_reload {
            if let Some(items) = self.cached(&Collection::Videos) {
                return Ok(items);
            }
        }
        let page_size = self.inner.config.video_page_size;
        self.load_aggregate(Collection::Videos, RequestType::Video, page_size)
            .await
    }

    pub async fn load_all_videos(&self) -> MediaCacheResult<Vec<MediaAsset>> {
        if !self.check_permission().await {
            return Ok(Vec::new());
        }
        let generation = self.generation();
        let result = self.fetch_aggregate(RequestType::Video).await;
        self.settle_load_all(&Collection::Videos, generation, result)
    }

    // ========== Albums ==========

    /// Albums holding photos or videos
    ///
    /// The first call keeps the first page of albums; the continuation lists
    /// them all and fills in each album's item count.
    pub async fn load_albums(&self, force_reload: bool) -> MediaCacheResult<Vec<AlbumHandle>> {
        if !self.check_permission().await {
            return Ok(Vec::new());
        }
        if !force_reload {
            if let Some(albums) = self.inner.state.lock().albums.cached() {
                return Ok(albums);
            }
        }

        let generation = self.generation();
        let albums = self
            .inner
            .provider
            .list_albums(RequestType::Common, false)
            .await?;

        if albums.is_empty() {
            self.apply(generation, |state| state.albums.set_full(Vec::new()));
            return Ok(albums);
        }

        let first: Vec<AlbumHandle> = albums
            .into_iter()
            .take(self.inner.config.album_page_size)
            .collect();
        if !self.apply(generation, |state| state.albums.set_initial(first.clone())) {
            return Ok(first);
        }

        let cache = self.clone();
        self.spawn(async move {
            match cache.fetch_albums_with_counts().await {
                Ok(albums) => {
                    debug!(count = albums.len(), "Background album load finished");
                    cache.apply(generation, |state| state.albums.set_full(albums));
                }
                Err(err) => {
                    warn!(error = %err, "Background album load failed");
                    cache.apply(generation, |state| state.albums.mark_settled());
                }
            }
        });

        Ok(first)
    }

    /// Every album with its item count, in one pass
    pub async fn load_all_albums(&self) -> MediaCacheResult<Vec<AlbumHandle>> {
        if !self.check_permission().await {
            return Ok(Vec::new());
        }
        let generation = self.generation();
        match self.fetch_albums_with_counts().await {
            Ok(albums) => {
                self.apply(generation, |state| state.albums.set_full(albums.clone()));
                Ok(albums)
            }
            Err(err) => {
                self.apply(generation, |state| state.albums.mark_settled());
                Err(err.into())
            }
        }
    }

    // ========== Album assets ==========

    /// Assets of one album, cached by album id
    pub async fn load_album_assets(
        &self,
        album: &AlbumHandle,
        force_reload: bool,
    ) -> MediaCacheResult<Vec<MediaAsset>> {
        if !self.check_permission().await {
            return Ok(Vec::new());
        }
        let collection = Collection::AlbumAssets(album.id.clone());
        if !force_reload {
            if let Some(items) = self.cached(&collection) {
                return Ok(items);
            }
        }
        let page_size = self.inner.config.album_asset_page_size;
        self.load_progressive(collection, album.clone(), page_size)
            .await
    }

    pub async fn load_all_album_assets(
        &self,
        album: &AlbumHandle,
    ) -> MediaCacheResult<Vec<MediaAsset>> {
        if !self.check_permission().await {
            return Ok(Vec::new());
        }
        let collection = Collection::AlbumAssets(album.id.clone());
        let generation = self.generation();
        let result = fetch_all(self.inner.provider.as_ref(), album).await;
        self.settle_load_all(&collection, generation, result)
    }

    // ========== Thumbnails ==========

    /// Cached thumbnail for `id`, without any I/O
    pub fn get_cached_thumbnail(&self, id: &AssetId) -> Option<Bytes> {
        match id {
            AssetId::Numeric(photo_id) => self
                .inner
                .native_thumbnails
                .get(photo_id)
                .or_else(|| self.inner.thumbnails.get(&id.to_string())),
            AssetId::Text(key) => self.inner.thumbnails.get(key),
        }
    }

    /// Cached thumbnail for `asset`, fetching and caching it on a miss
    pub async fn thumbnail(&self, asset: &MediaAsset) -> Option<Bytes> {
        if let Some(bytes) = self.get_cached_thumbnail(&asset.id) {
            return Some(bytes);
        }

        match asset.id.as_numeric() {
            Some(photo_id) if self.native().await.is_some() => {
                let bytes = self.fetch_native_thumbnail(asset).await?;
                self.inner.native_thumbnails.put(photo_id, bytes.clone());
                Some(bytes)
            }
            _ => {
                let bytes = self.fetch_generic_thumbnail(asset).await?;
                self.inner.thumbnails.put(asset.cache_key(), bytes.clone());
                Some(bytes)
            }
        }
    }

    /// Backing file of `asset`
    pub async fn asset_file(&self, asset: &MediaAsset) -> MediaCacheResult<Option<PathBuf>> {
        Ok(self.inner.provider.file(asset).await?)
    }

    // ========== Whole-cache operations ==========

    /// Start photo, video and album loads together, ignoring failures
    pub async fn preload_all_data(&self) {
        let (photos, videos, albums) = tokio::join!(
            self.load_photos(false),
            self.load_videos(false),
            self.load_albums(false)
        );
        if let Err(err) = photos {
            warn!(error = %err, "Photo preload failed");
        }
        if let Err(err) = videos {
            warn!(error = %err, "Video preload failed");
        }
        if let Err(err) = albums {
            warn!(error = %err, "Album preload failed");
        }
    }

    /// Drop every snapshot, both thumbnail caches and the permission answer
    ///
    /// Continuations still in flight finish but their results are discarded.
    pub fn clear_cache(&self) {
        {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            state.photos.reset();
            state.videos.reset();
            state.albums.reset();
            state.album_assets.clear();
        }
        self.inner.permission.clear();
        self.inner.thumbnails.clear();
        self.inner.native_thumbnails.clear();
        info!(generation = self.generation(), "Media cache cleared");
    }

    /// Clear everything, then preload again
    pub async fn refresh_all_data(&self) {
        self.clear_cache();
        self.preload_all_data().await;
    }

    pub fn get_cache_stats(&self) -> CacheStats {
        let state = self.inner.state.lock();
        CacheStats {
            photos: CollectionStats::of(&state.photos),
            videos: CollectionStats::of(&state.videos),
            albums: CollectionStats::of(&state.albums),
            album_asset_collections: state.album_assets.len(),
            album_assets: state.album_assets.values().map(|s| s.len()).sum(),
            thumbnails: self.inner.thumbnails.len(),
            thumbnail_capacity: self.inner.thumbnails.capacity(),
            native_thumbnails: self.inner.native_thumbnails.len(),
            native_thumbnail_capacity: self.inner.native_thumbnails.capacity(),
            permission: self.inner.permission.state(),
            native_available: self
                .inner
                .native
                .as_ref()
                .and_then(NativeFastPath::cached_availability),
            generation: state.generation,
        }
    }

    /// Phase of the photo, video or album-asset collection
    pub fn photos_phase(&self) -> LoadPhase {
        self.inner.state.lock().photos.phase()
    }

    pub fn videos_phase(&self) -> LoadPhase {
        self.inner.state.lock().videos.phase()
    }

    pub fn albums_phase(&self) -> LoadPhase {
        self.inner.state.lock().albums.phase()
    }

    pub fn album_assets_phase(&self, album: &AlbumHandle) -> LoadPhase {
        let state = self.inner.state.lock();
        Collection::AlbumAssets(album.id.clone())
            .peek(&state)
            .map(CollectionSnapshot::phase)
            .unwrap_or(LoadPhase::Empty)
    }

    /// Wait until every spawned continuation and warming pass has finished
    pub async fn wait_for_background(&self) {
        loop {
            let handles = std::mem::take(&mut *self.inner.background.lock());
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                if let Err(err) = handle.await {
                    warn!(error = %err, "Background task panicked");
                }
            }
        }
    }

    // ========== Internals ==========

    fn generation(&self) -> u64 {
        self.inner.state.lock().generation
    }

    fn cached(&self, collection: &Collection) -> Option<Vec<MediaAsset>> {
        let state = self.inner.state.lock();
        collection.peek(&state).and_then(CollectionSnapshot::cached)
    }

    /// Run `update` only if no clear happened since `generation`
    fn apply(&self, generation: u64, update: impl FnOnce(&mut CacheState)) -> bool {
        let mut state = self.inner.state.lock();
        if state.generation != generation {
            debug!(
                started = generation,
                current = state.generation,
                "Discarding result from before cache clear"
            );
            return false;
        }
        update(&mut state);
        true
    }

    /// Native adapter, if configured and its probe succeeded
    async fn native(&self) -> Option<&NativeFastPath> {
        let native = self.inner.native.as_ref()?;
        native.is_available().await.then_some(native)
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        let mut background = self.inner.background.lock();
        background.retain(|h| !h.is_finished());
        background.push(handle);
    }

    /// Two-phase load of the aggregate album for `kind`
    async fn load_aggregate(
        &self,
        collection: Collection,
        kind: RequestType,
        page_size: usize,
    ) -> MediaCacheResult<Vec<MediaAsset>> {
        let generation = self.generation();
        let albums = self.inner.provider.list_albums(kind, true).await?;
        match albums.into_iter().next() {
            Some(album) => self.load_progressive(collection, album, page_size).await,
            None => {
                debug!(collection = ?collection, "Provider has no assets");
                self.apply(generation, |state| collection.snapshot(state).set_full(Vec::new()));
                Ok(Vec::new())
            }
        }
    }

    /// First page now, everything else in a continuation
    async fn load_progressive(
        &self,
        collection: Collection,
        album: AlbumHandle,
        page_size: usize,
    ) -> MediaCacheResult<Vec<MediaAsset>> {
        let generation = self.generation();
        let first = self
            .inner
            .provider
            .album_page(&album, 0, page_size)
            .await?;

        // A short first page is already the whole collection
        let complete = first.len() < page_size;
        let stored = self.apply(generation, |state| {
            let snapshot = collection.snapshot(state);
            if complete {
                snapshot.set_full(first.clone());
            } else {
                snapshot.set_initial(first.clone());
            }
        });
        debug!(
            collection = ?collection,
            count = first.len(),
            complete,
            "Initial page loaded"
        );
        if !stored {
            return Ok(first);
        }

        self.spawn_warm(first.clone(), ThumbnailRoute::Generic);
        if !complete {
            self.spawn_full_load(collection, album, generation);
        }
        Ok(first)
    }

    fn spawn_full_load(&self, collection: Collection, album: AlbumHandle, generation: u64) {
        let cache = self.clone();
        self.spawn(async move {
            match fetch_all(cache.inner.provider.as_ref(), &album).await {
                Ok(items) => {
                    debug!(collection = ?collection, count = items.len(), "Background load finished");
                    cache.store_full(&collection, generation, items, ThumbnailRoute::Generic);
                }
                Err(err) => {
                    warn!(collection = ?collection, error = %err, "Background load failed");
                    cache.apply(generation, |state| collection.snapshot(state).mark_settled());
                }
            }
        });
    }

    async fn load_native_photos(
        &self,
        native: &NativeFastPath,
    ) -> crate::error::NativeResult<Vec<MediaAsset>> {
        let generation = self.generation();
        let (first, has_more) = native
            .list_metadata(self.inner.config.photo_page_size, 0)
            .await?;
        let items = into_assets(first);

        let stored = self.apply(generation, |state| {
            if has_more {
                state.photos.set_initial(items.clone());
            } else {
                state.photos.set_full(items.clone());
            }
        });
        if !stored {
            return Ok(items);
        }

        self.spawn_warm(items.clone(), ThumbnailRoute::Native);
        if has_more {
            let cache = self.clone();
            self.spawn(async move {
                let Some(native) = cache.inner.native.as_ref() else {
                    return;
                };
                match native
                    .list_all_metadata(cache.inner.config.native_page_size)
                    .await
                {
                    Ok(photos) => {
                        let items = into_assets(photos);
                        debug!(count = items.len(), "Background native photo load finished");
                        cache.store_full(&Collection::Photos, generation, items, ThumbnailRoute::Native);
                    }
                    Err(err) => {
                        warn!(error = %err, "Background native photo load failed");
                        cache.apply(generation, |state| state.photos.mark_settled());
                    }
                }
            });
        }
        Ok(items)
    }

    fn store_full(
        &self,
        collection: &Collection,
        generation: u64,
        items: Vec<MediaAsset>,
        route: ThumbnailRoute,
    ) {
        let stored = self.apply(generation, |state| {
            collection.snapshot(state).set_full(items.clone())
        });
        if stored {
            self.spawn_warm(items, route);
        }
    }

    fn settle_load_all(
        &self,
        collection: &Collection,
        generation: u64,
        result: ProviderResult<Vec<MediaAsset>>,
    ) -> MediaCacheResult<Vec<MediaAsset>> {
        match result {
            Ok(items) => {
                self.store_full(collection, generation, items.clone(), ThumbnailRoute::Generic);
                Ok(items)
            }
            Err(err) => {
                warn!(collection = ?collection, error = %err, "Full load failed");
                self.apply(generation, |state| collection.snapshot(state).mark_settled());
                Err(err.into())
            }
        }
    }

    async fn fetch_aggregate(&self, kind: RequestType) -> ProviderResult<Vec<MediaAsset>> {
        let albums = self.inner.provider.list_albums(kind, true).await?;
        match albums.first() {
            Some(album) => fetch_all(self.inner.provider.as_ref(), album).await,
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_albums_with_counts(&self) -> ProviderResult<Vec<AlbumHandle>> {
        let provider = self.inner.provider.as_ref();
        let mut albums = provider.list_albums(RequestType::Common, false).await?;
        for album in &mut albums {
            match provider.album_count(album).await {
                Ok(count) => album.asset_count = Some(count),
                Err(err) => debug!(album = %album.id, error = %err, "Album count failed"),
            }
        }
        Ok(albums)
    }

    fn spawn_warm(&self, assets: Vec<MediaAsset>, route: ThumbnailRoute) {
        if assets.is_empty() {
            return;
        }
        let cache = self.clone();
        self.spawn(async move {
            let this = &cache;
            match route {
                ThumbnailRoute::Generic => {
                    this.inner
                        .warmer
                        .warm(&assets, &this.inner.thumbnails, MediaAsset::cache_key, |asset| {
                            let asset = asset.clone();
                            async move { this.fetch_generic_thumbnail(&asset).await }
                        })
                        .await;
                }
                ThumbnailRoute::Native => {
                    let numeric: Vec<(i64, MediaAsset)> = assets
                        .into_iter()
                        .filter_map(|asset| asset.id.as_numeric().map(|id| (id, asset)))
                        .collect();
                    this.inner
                        .native_warmer
                        .warm(&numeric, &this.inner.native_thumbnails, |(id, _)| *id, |(_, asset)| {
                            let asset = asset.clone();
                            async move { this.fetch_native_thumbnail(&asset).await }
                        })
                        .await;
                }
            }
        });
    }

    async fn fetch_generic_thumbnail(&self, asset: &MediaAsset) -> Option<Bytes> {
        let size = self.inner.config.thumbnail_size;
        match self.inner.provider.thumbnail(asset, size, size).await {
            Ok(bytes) => bytes.map(Bytes::from),
            Err(err) => {
                debug!(asset = %asset.id, error = %err, "Thumbnail fetch failed");
                None
            }
        }
    }

    /// Native thumbnail, falling back to the generic provider
    async fn fetch_native_thumbnail(&self, asset: &MediaAsset) -> Option<Bytes> {
        if let (Some(native), Some(photo_id)) = (self.inner.native.as_ref(), asset.id.as_numeric()) {
            let size = self.inner.config.thumbnail_size;
            if let Some(bytes) = native.thumbnail(photo_id, size).await {
                return Some(bytes);
            }
        }
        self.fetch_generic_thumbnail(asset).await
    }
}

fn into_assets(photos: Vec<PhotoMetadata>) -> Vec<MediaAsset> {
    photos.into_iter().map(PhotoMetadata::into_asset).collect()
}

/// Count the album, then fetch it in one page
async fn fetch_all(
    provider: &dyn AssetProvider,
    album: &AlbumHandle,
) -> ProviderResult<Vec<MediaAsset>> {
    let count = provider.album_count(album).await?;
    if count == 0 {
        return Ok(Vec::new());
    }
    provider.album_page(album, 0, count).await
}
