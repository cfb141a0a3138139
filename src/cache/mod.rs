/// Media cache module
///
/// This module handles:
/// - The bounded, expiring thumbnail store (thumbnail.rs)
/// - Batched background thumbnail warming (warmer.rs)
/// - The orchestrator that owns every cached collection (media.rs)

pub mod media;
pub mod thumbnail;
pub mod warmer;

pub use media::{CacheStats, CollectionStats, MediaCache};
pub use thumbnail::ThumbnailCache;
pub use warmer::{ThumbnailWarmer, WarmReport};
