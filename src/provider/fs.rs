/// Folder-backed asset provider
///
/// Treats a directory tree as the device library: every sub-folder with
/// media becomes an album, and the root is the aggregate "Recent" album.
/// Each call rescans the tree; caching is the media cache's job.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::AssetProvider;
use crate::error::{ProviderError, ProviderResult};
use crate::imaging;
use crate::scan::{scan_media, ScannedFile};
use crate::state::data::{AlbumHandle, AssetId, AssetKind, MediaAsset, RequestType};

/// Album id of the aggregate album
pub const AGGREGATE_ALBUM_ID: &str = "__recent__";

#[derive(Debug, Clone)]
pub struct FsAssetProvider {
    root: Arc<PathBuf>,
}

impl FsAssetProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn scan(&self, kind: RequestType) -> ProviderResult<Vec<ScannedFile>> {
        let root = Arc::clone(&self.root);
        let files = tokio::task::spawn_blocking(move || scan_media(&root)).await?;
        Ok(files.into_iter().filter(|f| kind.accepts(f.kind)).collect())
    }

    async fn album_files(&self, album: &AlbumHandle) -> ProviderResult<Vec<ScannedFile>> {
        let files = self.scan(album.request_type).await?;
        if album.id == AGGREGATE_ALBUM_ID {
            return Ok(files);
        }
        let files: Vec<_> = files.into_iter().filter(|f| f.folder == album.id).collect();
        if files.is_empty() {
            return Err(ProviderError::AlbumNotFound(album.id.clone()));
        }
        Ok(files)
    }

    fn folder_name(&self, folder: &str) -> String {
        if folder.is_empty() {
            self.root
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "Library".to_string())
        } else {
            folder.rsplit('/').next().unwrap_or(folder).to_string()
        }
    }
}

fn to_asset(file: ScannedFile) -> MediaAsset {
    MediaAsset {
        id: AssetId::Text(file.relative),
        kind: file.kind,
        name: file.name,
        created_at: file.created_at,
        modified_at: file.modified_at,
        size: file.size,
        width: file.width,
        height: file.height,
        mime_type: file.mime_type.to_string(),
        path: Some(file.path),
    }
}

#[async_trait]
impl AssetProvider for FsAssetProvider {
    async fn request_permission(&self) -> ProviderResult<bool> {
        match tokio::fs::metadata(self.root.as_path()).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn list_albums(
        &self,
        kind: RequestType,
        include_aggregate: bool,
    ) -> ProviderResult<Vec<AlbumHandle>> {
        let files = self.scan(kind).await?;
        if files.is_empty() {
            return Ok(Vec::new());
        }

        if include_aggregate {
            return Ok(vec![AlbumHandle::new(AGGREGATE_ALBUM_ID, "Recent", kind)]);
        }

        let mut folders: BTreeMap<String, usize> = BTreeMap::new();
        for file in &files {
            *folders.entry(file.folder.clone()).or_default() += 1;
        }

        debug!(kind = ?kind, albums = folders.len(), "Listed folder albums");
        Ok(folders
            .into_keys()
            .map(|folder| {
                let name = self.folder_name(&folder);
                AlbumHandle::new(folder, name, kind)
            })
            .collect())
    }

    async fn album_count(&self, album: &AlbumHandle) -> ProviderResult<usize> {
        Ok(self.album_files(album).await?.len())
    }

    async fn album_page(
        &self,
        album: &AlbumHandle,
        offset: usize,
        size: usize,
    ) -> ProviderResult<Vec<MediaAsset>> {
        let files = self.album_files(album).await?;
        Ok(files
            .into_iter()
            .skip(offset)
            .take(size)
            .map(to_asset)
            .collect())
    }

    async fn thumbnail(
        &self,
        asset: &MediaAsset,
        width: u32,
        height: u32,
    ) -> ProviderResult<Option<Vec<u8>>> {
        // No video decoder available; the UI shows a placeholder
        if asset.kind == AssetKind::Video {
            return Ok(None);
        }
        let Some(path) = asset.path.clone() else {
            return Ok(None);
        };

        let bytes =
            tokio::task::spawn_blocking(move || imaging::fill_thumbnail(&path, width, height))
                .await??;
        Ok(Some(bytes))
    }

    async fn file(&self, asset: &MediaAsset) -> ProviderResult<Option<PathBuf>> {
        let Some(path) = asset.path.as_ref() else {
            return Ok(None);
        };
        Ok(tokio::fs::try_exists(path)
            .await?
            .then(|| path.clone()))
    }
}
