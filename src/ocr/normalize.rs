use anyhow::{Context, Result};
use image::GenericImageView;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use tracing::info;

/// JPEG-encoded RGB image bounded by the configured maximum dimension.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

pub fn normalize(image_bytes: &[u8], max_dimension: u32, quality: u8) -> Result<NormalizedImage> {
    let image = image::load_from_memory(image_bytes).with_context(|| "failed to decode image")?;
    let (width, height) = image.dimensions();
    info!(width, height, "original image size");

    let rgb = image.into_rgb8();

    let (target_width, target_height) = target_dimensions(width, height, max_dimension);
    let rgb = if (target_width, target_height) == (width, height) {
        rgb
    } else {
        info!(
            max_dimension,
            target_width, target_height, "downscaling image to fit maximum dimension"
        );
        image::imageops::resize(&rgb, target_width, target_height, FilterType::Lanczos3)
    };

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .encode_image(&rgb)
        .with_context(|| "failed to encode normalized image")?;

    Ok(NormalizedImage {
        bytes,
        width: rgb.width(),
        height: rgb.height(),
    })
}

/// Size after fitting `width` x `height` into a `max_dimension` square. Never upscales.
pub fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }
    let max_dimension = max_dimension.max(1);
    let max = max_dimension as f64;
    let ratio = (max / width as f64).min(max / height as f64);
    let scale = |value: u32| ((value as f64 * ratio).round() as u32).clamp(1, max_dimension);
    (scale(width), scale(height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, format).expect("encode test image");
        out.into_inner()
    }

    fn png_rgb(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        encode(DynamicImage::ImageRgb8(image), ImageFormat::Png)
    }

    fn decoded_dimensions(bytes: &[u8]) -> (u32, u32) {
        let image = image::load_from_memory(bytes).expect("decode normalized");
        assert!(matches!(image, DynamicImage::ImageRgb8(_)));
        image.dimensions()
    }

    #[test]
    fn small_image_keeps_its_size() {
        let normalized = normalize(&png_rgb(640, 480), 1024, 95).expect("normalize");
        assert_eq!((normalized.width, normalized.height), (640, 480));
        assert_eq!(decoded_dimensions(&normalized.bytes), (640, 480));
    }

    #[test]
    fn boundary_size_is_not_resized() {
        let normalized = normalize(&png_rgb(1024, 1024), 1024, 95).expect("normalize");
        assert_eq!((normalized.width, normalized.height), (1024, 1024));
    }

    #[test]
    fn wide_image_is_downscaled_preserving_aspect() {
        let normalized = normalize(&png_rgb(2000, 1000), 1024, 95).expect("normalize");
        assert_eq!((normalized.width, normalized.height), (1024, 512));
        assert_eq!(decoded_dimensions(&normalized.bytes), (1024, 512));
    }

    #[test]
    fn tall_image_is_bounded_by_height() {
        assert_eq!(target_dimensions(500, 3000, 1024), (171, 1024));
    }

    #[test]
    fn extreme_aspect_ratio_never_collapses_to_zero() {
        assert_eq!(target_dimensions(5000, 1, 1024), (1024, 1));
    }

    #[test]
    fn transparent_image_becomes_rgb() {
        let image = RgbaImage::from_pixel(32, 16, Rgba([10, 20, 30, 0]));
        let bytes = encode(DynamicImage::ImageRgba8(image), ImageFormat::Png);
        let normalized = normalize(&bytes, 1024, 95).expect("normalize");
        assert_eq!(decoded_dimensions(&normalized.bytes), (32, 16));
    }

    #[test]
    fn grayscale_image_becomes_rgb() {
        let image = image::GrayImage::from_pixel(20, 10, image::Luma([200]));
        let bytes = encode(DynamicImage::ImageLuma8(image), ImageFormat::Png);
        let normalized = normalize(&bytes, 1024, 95).expect("normalize");
        assert_eq!(decoded_dimensions(&normalized.bytes), (20, 10));
    }

    #[test]
    fn normalizing_twice_keeps_dimensions() {
        let first = normalize(&png_rgb(1500, 900), 1024, 95).expect("first pass");
        let second = normalize(&first.bytes, 1024, 95).expect("second pass");
        assert_eq!((first.width, first.height), (second.width, second.height));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = normalize(b"definitely not an image", 1024, 95).unwrap_err();
        assert!(format!("{:#}", err).starts_with("failed to decode image"));
    }

    #[test]
    fn input_is_left_untouched() {
        let input = png_rgb(8, 8);
        let copy = input.clone();
        normalize(&input, 4, 95).expect("normalize");
        assert_eq!(input, copy);
    }
}
