/// Thumbnail synthesis helpers
///
/// Shared by the filesystem provider and the in-process native channel.
/// Everything here is CPU-bound; callers run it under `spawn_blocking`.
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageResult};

/// JPEG quality used for every generated thumbnail
pub const THUMBNAIL_QUALITY: u8 = 85;

/// Power-of-two shrink factor for a source image
///
/// Starts at 1 and doubles while halving the source by the current factor
/// still exceeds the requested box, so the shrunk image stays at least as
/// large as `req_width` x `req_height`.
pub fn downsample_factor(src_width: u32, src_height: u32, req_width: u32, req_height: u32) -> u32 {
    let mut factor = 1;
    if src_width > req_width || src_height > req_height {
        let half_width = src_width / 2;
        let half_height = src_height / 2;
        while half_width / factor > req_width && half_height / factor > req_height {
            factor *= 2;
        }
    }
    factor
}

/// Encode an image as baseline JPEG
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> ImageResult<Vec<u8>> {
    let rgb = img.to_rgb8();
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality).encode_image(&rgb)?;
    Ok(buffer)
}

/// Decode `path` and scale it to exactly `size` x `size`
///
/// The image is first shrunk by `downsample_factor` to bound the working
/// set, then resized to the exact square.
pub fn square_thumbnail(path: &Path, size: u32) -> ImageResult<Vec<u8>> {
    let img = image::open(path)?;
    let factor = downsample_factor(img.width(), img.height(), size, size);
    let reduced = if factor > 1 {
        img.resize_exact(
            (img.width() / factor).max(1),
            (img.height() / factor).max(1),
            FilterType::Triangle,
        )
    } else {
        img
    };
    let thumbnail = reduced.resize_exact(size, size, FilterType::Lanczos3);
    encode_jpeg(&thumbnail, THUMBNAIL_QUALITY)
}

/// Decode `path` and center-crop it to fill `width` x `height`
pub fn fill_thumbnail(path: &Path, width: u32, height: u32) -> ImageResult<Vec<u8>> {
    let img = image::open(path)?;
    let thumbnail = img.resize_to_fill(width, height, FilterType::Triangle);
    encode_jpeg(&thumbnail, THUMBNAIL_QUALITY)
}

#[cfg(test)]
pub(crate) fn write_test_image(path: &Path, width: u32, height: u32) {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    img.save(path).unwrap();
}
