/// Tunables for the media cache
///
/// Every field has a default, so a config file only needs the values it
/// overrides.
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// First page size for the photo collection
    pub photo_page_size: usize,
    /// First page size for videos (fewer but heavier than photos)
    pub video_page_size: usize,
    /// First page size for the album list
    pub album_page_size: usize,
    /// First page size for a single album's assets
    pub album_asset_page_size: usize,
    /// Page size used while paginating the native channel in the background
    pub native_page_size: usize,
    /// Edge length of square thumbnails, in pixels
    pub thumbnail_size: u32,
    /// Seconds before a cached thumbnail is treated as absent
    pub thumbnail_ttl_secs: u64,
    /// Capacity of the generic-provider thumbnail cache
    pub generic_thumbnail_capacity: usize,
    /// Capacity of the native-path thumbnail cache
    pub native_thumbnail_capacity: usize,
    /// Assets per warming batch
    pub warm_batch_size: usize,
    /// Pause between warming batches, in milliseconds
    pub warm_batch_delay_ms: u64,
    /// In-flight cap for native thumbnail preloads
    pub native_max_concurrent: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            photo_page_size: 200,
            video_page_size: 50,
            album_page_size: 100,
            album_asset_page_size: 200,
            native_page_size: 500,
            thumbnail_size: 200,
            thumbnail_ttl_secs: 24 * 60 * 60,
            generic_thumbnail_capacity: 1000,
            native_thumbnail_capacity: 2000,
            warm_batch_size: 10,
            warm_batch_delay_ms: 50,
            native_max_concurrent: 4,
        }
    }
}

impl CacheConfig {
    pub fn thumbnail_ttl(&self) -> Duration {
        Duration::from_secs(self.thumbnail_ttl_secs)
    }

    pub fn warm_batch_delay(&self) -> Duration {
        Duration::from_millis(self.warm_batch_delay_ms)
    }

    /// Parse a JSON config, falling back to defaults for missing fields
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a JSON config file from disk
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&contents)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
