/// Scripted provider and native transport for unit tests
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::error::{NativeError, NativeErrorKind, NativeResult, ProviderError, ProviderResult};
use crate::native::{NativeRequest, NativeResponse, NativeTransport, PhotoMetadata, PhotoPage};
use crate::provider::AssetProvider;
use crate::state::data::{AlbumHandle, AssetId, AssetKind, MediaAsset, RequestType};

pub const RECENT_ID: &str = "recent";

/// Route `tracing` output through the test harness; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn asset(id: &str, kind: AssetKind, age: i64) -> MediaAsset {
    let created = Utc
        .timestamp_opt(1_700_000_000 - age, 0)
        .single()
        .unwrap();
    MediaAsset {
        id: AssetId::from(id),
        kind,
        name: format!("{id}.bin"),
        created_at: created,
        modified_at: created,
        size: 1024,
        width: 100,
        height: 100,
        mime_type: match kind {
            AssetKind::Image => "image/jpeg".to_string(),
            AssetKind::Video => "video/mp4".to_string(),
        },
        path: None,
    }
}

pub fn assets(prefix: &str, kind: AssetKind, count: usize) -> Vec<MediaAsset> {
    (0..count)
        .map(|i| asset(&format!("{prefix}-{i}"), kind, i as i64))
        .collect()
}

/// In-memory `AssetProvider` with switchable failures
///
/// `hold_counts` makes every `album_count` wait for permits, which keeps a
/// background continuation parked until the test releases it.
#[derive(Default)]
pub struct ScriptedProvider {
    photos: Mutex<Vec<MediaAsset>>,
    videos: Mutex<Vec<MediaAsset>>,
    albums: Mutex<Vec<(AlbumHandle, Vec<MediaAsset>)>>,
    denied: AtomicBool,
    fail_permission: AtomicBool,
    fail_pages: AtomicBool,
    fail_counts: AtomicBool,
    failing_thumbnails: Mutex<HashSet<String>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    permission_calls: AtomicUsize,
    page_calls: AtomicUsize,
    thumbnail_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_photos(self, count: usize) -> Self {
        *self.photos.lock() = assets("photo", AssetKind::Image, count);
        self
    }

    pub fn with_videos(self, count: usize) -> Self {
        *self.videos.lock() = assets("video", AssetKind::Video, count);
        self
    }

    pub fn with_album(self, id: &str, count: usize) -> Self {
        let album = AlbumHandle::new(id, id.to_uppercase(), RequestType::Common);
        self.albums
            .lock()
            .push((album, assets(id, AssetKind::Image, count)));
        self
    }

    pub fn set_photos(&self, count: usize) {
        *self.photos.lock() = assets("photo", AssetKind::Image, count);
    }

    pub fn set_permission(&self, granted: bool) {
        self.denied.store(!granted, Ordering::SeqCst);
    }

    pub fn fail_permission(&self, fail: bool) {
        self.fail_permission.store(fail, Ordering::SeqCst);
    }

    pub fn fail_pages(&self, fail: bool) {
        self.fail_pages.store(fail, Ordering::SeqCst);
    }

    pub fn fail_counts(&self, fail: bool) {
        self.fail_counts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_thumbnail(&self, id: &str) {
        self.failing_thumbnails.lock().insert(id.to_string());
    }

    /// Park `album_count` until permits are added to the returned gate
    pub fn hold_counts(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn album(&self, id: &str) -> AlbumHandle {
        self.albums
            .lock()
            .iter()
            .find(|(album, _)| album.id == id)
            .map(|(album, _)| album.clone())
            .unwrap()
    }

    pub fn permission_calls(&self) -> usize {
        self.permission_calls.load(Ordering::SeqCst)
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    pub fn thumbnail_calls(&self) -> usize {
        self.thumbnail_calls.load(Ordering::SeqCst)
    }

    fn album_assets(&self, album: &AlbumHandle) -> ProviderResult<Vec<MediaAsset>> {
        if album.id == RECENT_ID {
            return Ok(match album.request_type {
                RequestType::Image => self.photos.lock().clone(),
                RequestType::Video => self.videos.lock().clone(),
                RequestType::Common => {
                    let mut all = self.photos.lock().clone();
                    all.extend(self.videos.lock().iter().cloned());
                    all
                }
            });
        }
        self.albums
            .lock()
            .iter()
            .find(|(handle, _)| handle.id == album.id)
            .map(|(_, assets)| assets.clone())
            .ok_or_else(|| ProviderError::AlbumNotFound(album.id.clone()))
    }
}

#[async_trait]
impl AssetProvider for ScriptedProvider {
    async fn request_permission(&self) -> ProviderResult<bool> {
        self.permission_calls.fetch_add(1, Ordering::SeqCst);
        // Suspend like a real permission prompt so concurrent callers overlap
        tokio::task::yield_now().await;
        if self.fail_permission.load(Ordering::SeqCst) {
            return Err(ProviderError::Task("permission prompt dismissed".to_string()));
        }
        Ok(!self.denied.load(Ordering::SeqCst))
    }

    async fn list_albums(
        &self,
        kind: RequestType,
        include_aggregate: bool,
    ) -> ProviderResult<Vec<AlbumHandle>> {
        if self.fail_pages.load(Ordering::SeqCst) {
            return Err(ProviderError::Decode("scripted list failure".to_string()));
        }
        if include_aggregate {
            let aggregate = AlbumHandle::new(RECENT_ID, "Recent", kind);
            if self.album_assets(&aggregate)?.is_empty() {
                return Ok(Vec::new());
            }
            return Ok(vec![aggregate]);
        }
        Ok(self
            .albums
            .lock()
            .iter()
            .map(|(album, _)| album.clone())
            .collect())
    }

    async fn album_count(&self, album: &AlbumHandle) -> ProviderResult<usize> {
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|e| ProviderError::Task(e.to_string()))?
                .forget();
        }
        if self.fail_counts.load(Ordering::SeqCst) {
            return Err(ProviderError::Decode("scripted count failure".to_string()));
        }
        Ok(self.album_assets(album)?.len())
    }

    async fn album_page(
        &self,
        album: &AlbumHandle,
        offset: usize,
        size: usize,
    ) -> ProviderResult<Vec<MediaAsset>> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_pages.load(Ordering::SeqCst) {
            return Err(ProviderError::Decode("scripted page failure".to_string()));
        }
        Ok(self
            .album_assets(album)?
            .into_iter()
            .skip(offset)
            .take(size)
            .collect())
    }

    async fn thumbnail(
        &self,
        asset: &MediaAsset,
        _width: u32,
        _height: u32,
    ) -> ProviderResult<Option<Vec<u8>>> {
        self.thumbnail_calls.fetch_add(1, Ordering::SeqCst);
        let id = asset.id.to_string();
        if self.failing_thumbnails.lock().contains(&id) {
            return Err(ProviderError::Decode(format!("cannot render {id}")));
        }
        Ok(Some(id.into_bytes()))
    }

    async fn file(&self, asset: &MediaAsset) -> ProviderResult<Option<PathBuf>> {
        Ok(Some(PathBuf::from(format!("/scripted/{}", asset.name))))
    }
}

/// In-memory `NativeTransport` that tracks concurrency
pub struct ScriptedTransport {
    photos: Vec<PhotoMetadata>,
    broken: bool,
    fail_metadata: AtomicBool,
    failing_thumbnails: Mutex<HashSet<i64>>,
    count_calls: AtomicUsize,
    metadata_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    /// `count` photos with ids 1..=count, newest (highest id) first
    pub fn with_photos(count: usize) -> Self {
        let photos = (1..=count as i64)
            .rev()
            .map(|id| PhotoMetadata {
                id,
                name: format!("IMG_{id:04}.jpg"),
                path: String::new(),
                date_added: 1_700_000_000 + id,
                date_modified: 1_700_000_000 + id,
                size: 2048,
                width: 4000,
                height: 3000,
                mime_type: "image/jpeg".to_string(),
            })
            .collect();
        Self {
            photos,
            broken: false,
            fail_metadata: AtomicBool::new(false),
            failing_thumbnails: Mutex::new(HashSet::new()),
            count_calls: AtomicUsize::new(0),
            metadata_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Every call fails, so the probe reports unavailable
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::with_photos(0)
        }
    }

    /// Metadata queries fail while the count probe keeps succeeding
    pub fn fail_metadata(&self, fail: bool) {
        self.fail_metadata.store(fail, Ordering::SeqCst);
    }

    pub fn fail_thumbnail(&self, photo_id: i64) {
        self.failing_thumbnails.lock().insert(photo_id);
    }

    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NativeTransport for ScriptedTransport {
    async fn call(&self, request: NativeRequest) -> NativeResult<NativeResponse> {
        match request {
            NativeRequest::GetPhotosCount => {
                self.count_calls.fetch_add(1, Ordering::SeqCst);
                if self.broken {
                    return Err(NativeError::new(
                        NativeErrorKind::CountError,
                        "channel not registered",
                    ));
                }
                Ok(NativeResponse::Count(self.photos.len() as u64))
            }
            NativeRequest::GetPhotosMetadata { limit, offset } => {
                self.metadata_calls.fetch_add(1, Ordering::SeqCst);
                if self.broken {
                    return Err(NativeError::query("channel not registered"));
                }
                if self.fail_metadata.load(Ordering::SeqCst) {
                    return Err(NativeError::query("cursor closed"));
                }
                let photos: Vec<_> = self
                    .photos
                    .iter()
                    .skip(offset)
                    .take(limit)
                    .cloned()
                    .collect();
                let count = photos.len();
                Ok(NativeResponse::Metadata(PhotoPage {
                    photos,
                    count,
                    has_more: count == limit,
                }))
            }
            NativeRequest::GetPhotoThumbnail { photo_id, .. } => {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);

                if self.broken
                    || self.failing_thumbnails.lock().contains(&photo_id)
                    || !self.photos.iter().any(|p| p.id == photo_id)
                {
                    return Err(NativeError::new(
                        NativeErrorKind::ThumbnailError,
                        format!("no photo {photo_id}"),
                    ));
                }
                Ok(NativeResponse::Thumbnail(Some(
                    format!("native-{photo_id}").into_bytes(),
                )))
            }
        }
    }
}
