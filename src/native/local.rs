/// In-process native channel over a photo folder
///
/// Indexes the folder once, hands out integer photo ids, and synthesizes
/// square JPEG thumbnails on request.
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{NativeRequest, NativeResponse, NativeTransport, PhotoMetadata, PhotoPage};
use crate::error::{NativeError, NativeErrorKind, NativeResult};
use crate::imaging;
use crate::scan::scan_media;
use crate::state::data::AssetKind;

#[derive(Debug, Clone)]
struct IndexedPhoto {
    metadata: PhotoMetadata,
    path: PathBuf,
}

#[derive(Debug)]
pub struct LocalNativeTransport {
    root: Arc<PathBuf>,
    index: OnceCell<Arc<Vec<IndexedPhoto>>>,
}

impl LocalNativeTransport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
            index: OnceCell::new(),
        }
    }

    async fn index(&self, kind: NativeErrorKind) -> NativeResult<Arc<Vec<IndexedPhoto>>> {
        let index = self
            .index
            .get_or_try_init(|| async {
                if !tokio::fs::metadata(self.root.as_path())
                    .await
                    .map(|m| m.is_dir())
                    .unwrap_or(false)
                {
                    return Err(NativeError::new(
                        kind,
                        format!("photo library not found: {}", self.root.display()),
                    ));
                }

                let root = Arc::clone(&self.root);
                let files = tokio::task::spawn_blocking(move || scan_media(&root))
                    .await
                    .map_err(|e| NativeError::new(kind, format!("index task failed: {}", e)))?;

                Ok(Arc::new(build_index(files)))
            })
            .await?;
        Ok(Arc::clone(index))
    }

    async fn metadata_page(&self, limit: usize, offset: usize) -> NativeResult<PhotoPage> {
        require_positive("limit", limit)?;
        let index = self.index(NativeErrorKind::QueryError).await?;

        let photos: Vec<PhotoMetadata> = index
            .iter()
            .skip(offset)
            .take(limit)
            .map(|photo| photo.metadata.clone())
            .collect();
        let count = photos.len();

        Ok(PhotoPage {
            photos,
            count,
            has_more: count == limit,
        })
    }

    async fn photo_thumbnail(&self, photo_id: i64, size: u32) -> NativeResult<Option<Vec<u8>>> {
        if size == 0 {
            return Err(NativeError::invalid_argument("size must be greater than zero"));
        }
        let index = self.index(NativeErrorKind::ThumbnailError).await?;
        let path = index
            .iter()
            .find(|photo| photo.metadata.id == photo_id)
            .map(|photo| photo.path.clone())
            .ok_or_else(|| {
                NativeError::new(
                    NativeErrorKind::ThumbnailError,
                    format!("photo {} not found", photo_id),
                )
            })?;

        let bytes = tokio::task::spawn_blocking(move || imaging::square_thumbnail(&path, size))
            .await
            .map_err(|e| NativeError::new(NativeErrorKind::ThumbnailError, e.to_string()))?
            .map_err(|e| NativeError::new(NativeErrorKind::ThumbnailError, e.to_string()))?;

        debug!(photo_id, size, bytes = bytes.len(), "Synthesized native thumbnail");
        Ok(Some(bytes))
    }
}

/// Reject a zero count before touching the index
fn require_positive(name: &str, value: usize) -> NativeResult<()> {
    if value == 0 {
        return Err(NativeError::invalid_argument(format!(
            "{} must be greater than zero",
            name
        )));
    }
    Ok(())
}

/// Assign stable ids by path, then order newest first
fn build_index(files: Vec<crate::scan::ScannedFile>) -> Vec<IndexedPhoto> {
    let mut photos: Vec<_> = files
        .into_iter()
        .filter(|f| f.kind == AssetKind::Image)
        .collect();
    photos.sort_by(|a, b| a.relative.cmp(&b.relative));

    let mut index: Vec<IndexedPhoto> = photos
        .into_iter()
        .enumerate()
        .map(|(i, file)| IndexedPhoto {
            metadata: PhotoMetadata {
                id: i as i64 + 1,
                name: file.name,
                path: file.path.to_string_lossy().to_string(),
                date_added: file.created_at.timestamp(),
                date_modified: file.modified_at.timestamp(),
                size: file.size,
                width: file.width,
                height: file.height,
                mime_type: file.mime_type.to_string(),
            },
            path: file.path,
        })
        .collect();

    index.sort_by(|a, b| {
        b.metadata
            .date_added
            .cmp(&a.metadata.date_added)
            .then_with(|| a.metadata.id.cmp(&b.metadata.id))
    });

    info!(photos = index.len(), "Indexed native photo library");
    index
}

#[async_trait]
impl NativeTransport for LocalNativeTransport {
    async fn call(&self, request: NativeRequest) -> NativeResult<NativeResponse> {
        match request {
            NativeRequest::GetPhotosCount => {
                let index = self.index(NativeErrorKind::CountError).await?;
                Ok(NativeResponse::Count(index.len() as u64))
            }
            NativeRequest::GetPhotosMetadata { limit, offset } => self
                .metadata_page(limit, offset)
                .await
                .map(NativeResponse::Metadata),
            NativeRequest::GetPhotoThumbnail { photo_id, size } => self
                .photo_thumbnail(photo_id, size)
                .await
                .map(NativeResponse::Thumbnail),
        }
    }
}
