/// Probe-once wrapper around a native transport
///
/// Availability is probed with a count query on first use and cached for
/// the life of the adapter. Thumbnail failures come back as `None` so the
/// caller can fall back to the generic provider.
use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use tokio::sync::{OnceCell, Semaphore};
use tracing::{debug, info, warn};

use super::{unexpected_response, NativeRequest, NativeResponse, NativeTransport, PhotoMetadata};
use crate::error::NativeResult;

pub struct NativeFastPath {
    transport: Arc<dyn NativeTransport>,
    available: OnceCell<bool>,
    permits: Arc<Semaphore>,
}

impl std::fmt::Debug for NativeFastPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeFastPath")
            .field("available", &self.available.get())
            .field("permits", &self.permits.available_permits())
            .finish()
    }
}

impl NativeFastPath {
    /// `max_concurrent` caps in-flight requests from `preload_thumbnails`
    pub fn new(transport: Arc<dyn NativeTransport>, max_concurrent: usize) -> Self {
        Self {
            transport,
            available: OnceCell::new(),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Whether the channel answered its probe
    ///
    /// The first call issues a count query; every later call returns the
    /// cached answer.
    pub async fn is_available(&self) -> bool {
        *self
            .available
            .get_or_init(|| async {
                match self.photos_count().await {
                    Ok(count) => {
                        info!(count, "Native fast path available");
                        true
                    }
                    Err(err) => {
                        warn!(error = %err, "Native fast path unavailable, using generic provider");
                        false
                    }
                }
            })
            .await
    }

    /// Probe result, if the probe has run
    pub fn cached_availability(&self) -> Option<bool> {
        self.available.get().copied()
    }

    pub async fn photos_count(&self) -> NativeResult<u64> {
        let request = NativeRequest::GetPhotosCount;
        let method = request.method();
        match self.transport.call(request).await? {
            NativeResponse::Count(count) => Ok(count),
            other => Err(unexpected_response(method, &other)),
        }
    }

    /// One page of metadata, newest first, plus the `has_more` hint
    ///
    /// `has_more` is `true` whenever the page came back full, whatever the
    /// transport reported, so an exact final page costs one empty follow-up.
    pub async fn list_metadata(
        &self,
        limit: usize,
        offset: usize,
    ) -> NativeResult<(Vec<PhotoMetadata>, bool)> {
        let request = NativeRequest::GetPhotosMetadata { limit, offset };
        let method = request.method();
        match self.transport.call(request).await? {
            NativeResponse::Metadata(page) => {
                let has_more = page.photos.len() == limit;
                Ok((page.photos, has_more))
            }
            other => Err(unexpected_response(method, &other)),
        }
    }

    /// Every photo, paging with `page_size` until `has_more` is false
    pub async fn list_all_metadata(&self, page_size: usize) -> NativeResult<Vec<PhotoMetadata>> {
        let mut photos = Vec::new();
        let mut offset = 0;
        loop {
            let (page, has_more) = self.list_metadata(page_size, offset).await?;
            let fetched = page.len();
            offset += fetched;
            photos.extend(page);
            if !has_more || fetched == 0 {
                break;
            }
        }
        debug!(count = photos.len(), "Listed all native photo metadata");
        Ok(photos)
    }

    /// Square thumbnail for `photo_id`, or `None` on any failure
    pub async fn thumbnail(&self, photo_id: i64, size: u32) -> Option<Bytes> {
        let request = NativeRequest::GetPhotoThumbnail { photo_id, size };
        let method = request.method();
        match self.transport.call(request).await {
            Ok(NativeResponse::Thumbnail(bytes)) => bytes.map(Bytes::from),
            Ok(other) => {
                debug!(photo_id, error = %unexpected_response(method, &other), "Native thumbnail failed");
                None
            }
            Err(err) => {
                debug!(photo_id, error = %err, "Native thumbnail failed");
                None
            }
        }
    }

    /// Fetch many thumbnails with at most `max_concurrent` in flight
    ///
    /// Only successful fetches appear in the result.
    pub async fn preload_thumbnails(&self, photo_ids: &[i64], size: u32) -> HashMap<i64, Bytes> {
        let fetches = photo_ids.iter().map(|&photo_id| {
            let permits = Arc::clone(&self.permits);
            async move {
                let _permit = permits.acquire_owned().await.ok()?;
                self.thumbnail(photo_id, size)
                    .await
                    .map(|bytes| (photo_id, bytes))
            }
        });

        join_all(fetches).await.into_iter().flatten().collect()
    }
}
