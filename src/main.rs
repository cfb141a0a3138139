use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use media_gallery::{
    CacheConfig, FsAssetProvider, LocalNativeTransport, MediaCache, NativeFastPath,
};

/// Browse a photo folder through the media cache
#[derive(Debug, Parser)]
#[command(name = "media-gallery", version)]
struct Args {
    /// Library folder (defaults to the user's Pictures directory)
    library: Option<PathBuf>,

    /// JSON cache config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serve photos and thumbnails through the in-process native channel
    #[arg(long)]
    native: bool,

    /// Print this many of the newest photos
    #[arg(long, default_value_t = 10)]
    show: usize,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Err(err) = run(args).await {
        error!("{err}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => CacheConfig::from_file(path)?,
        None => CacheConfig::default(),
    };

    let library = args
        .library
        .or_else(dirs::picture_dir)
        .ok_or("could not determine a library folder; pass one explicitly")?;
    info!(library = %library.display(), native = args.native, "Opening media library");

    let provider = Arc::new(FsAssetProvider::new(&library));
    let native = args.native.then(|| {
        NativeFastPath::new(
            Arc::new(LocalNativeTransport::new(&library)),
            config.native_max_concurrent,
        )
    });
    let cache = MediaCache::new(provider, native, config);

    if !cache.check_permission().await {
        return Err(format!("cannot read {}", library.display()).into());
    }

    let first = cache.load_photos(false).await?;
    info!(count = first.len(), "First photo page ready");

    cache.preload_all_data().await;
    cache.wait_for_background().await;

    let photos = cache.load_photos(false).await?;
    for photo in photos.iter().take(args.show) {
        let thumb = cache
            .get_cached_thumbnail(&photo.id)
            .map(|bytes| bytes.len())
            .unwrap_or(0);
        println!(
            "{}  {}  {}x{}  thumbnail {} bytes",
            photo.created_at.format("%Y-%m-%d %H:%M"),
            photo.name,
            photo.width,
            photo.height,
            thumb
        );
    }

    println!("{}", serde_json::to_string_pretty(&cache.get_cache_stats())?);
    Ok(())
}
