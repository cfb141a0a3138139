/// Directory scanning for media files
///
/// Walks a folder tree and collects every photo or video it recognizes by
/// extension. Blocking; run it under `spawn_blocking`.
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::state::data::AssetKind;

/// A media file found on disk
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedFile {
    pub path: PathBuf,
    /// Path relative to the scan root, with `/` separators
    pub relative: String,
    /// Parent directory relative to the scan root ("" for the root itself)
    pub folder: String,
    pub name: String,
    pub kind: AssetKind,
    pub mime_type: &'static str,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub width: u32,
    pub height: u32,
}

/// Map a file extension to its MIME type and asset kind
pub fn media_type(extension: &str) -> Option<(&'static str, AssetKind)> {
    let media = match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" => ("image/jpeg", AssetKind::Image),
        "png" => ("image/png", AssetKind::Image),
        "gif" => ("image/gif", AssetKind::Image),
        "webp" => ("image/webp", AssetKind::Image),
        "bmp" => ("image/bmp", AssetKind::Image),
        "tif" | "tiff" => ("image/tiff", AssetKind::Image),
        "heic" => ("image/heic", AssetKind::Image),
        "mp4" => ("video/mp4", AssetKind::Video),
        "m4v" => ("video/x-m4v", AssetKind::Video),
        "mov" => ("video/quicktime", AssetKind::Video),
        "mkv" => ("video/x-matroska", AssetKind::Video),
        "webm" => ("video/webm", AssetKind::Video),
        "avi" => ("video/x-msvideo", AssetKind::Video),
        "3gp" => ("video/3gpp", AssetKind::Video),
        _ => return None,
    };
    Some(media)
}

/// Collect all media under `root`, newest first
///
/// Ties on creation time are broken by relative path so the order is
/// stable between scans.
pub fn scan_media(root: &Path) -> Vec<ScannedFile> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some((mime_type, kind)) = path
            .extension()
            .and_then(|ext| media_type(&ext.to_string_lossy()))
        else {
            continue;
        };

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Skipping unreadable media file");
                continue;
            }
        };

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let created = metadata.created().unwrap_or(modified);

        let (width, height) = match kind {
            AssetKind::Image => image::image_dimensions(path).unwrap_or((0, 0)),
            AssetKind::Video => (0, 0),
        };

        let relative_path = path.strip_prefix(root).unwrap_or(path);
        let folder = relative_path
            .parent()
            .map(to_slash)
            .unwrap_or_default();

        files.push(ScannedFile {
            path: path.to_path_buf(),
            relative: to_slash(relative_path),
            folder,
            name: path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
            kind,
            mime_type,
            size: metadata.len(),
            created_at: DateTime::<Utc>::from(created),
            modified_at: DateTime::<Utc>::from(modified),
            width,
            height,
        });
    }

    files.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.relative.cmp(&b.relative))
    });

    debug!(root = %root.display(), count = files.len(), "Scanned media folder");
    files
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
