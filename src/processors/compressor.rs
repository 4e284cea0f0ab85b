// pixbatch/src/processors/compressor.rs
use crate::core::{ImageToolError, OutputFormat, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use oxipng::{optimize_from_memory, Options};
use std::path::Path;

/// Encodes documents for an output format. JPEG and WebP honour `quality`; PNG ignores it.
#[derive(Debug, Clone)]
pub struct Compressor {
    quality: u8,
    optimize_png: bool,
    background: Rgb<u8>,
}

impl Compressor {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            optimize_png: true,
            background: Rgb([255, 255, 255]),
        }
    }

    pub fn with_png_optimization(mut self, optimize: bool) -> Self {
        self.optimize_png = optimize;
        self
    }

    pub fn with_background(mut self, background: Rgb<u8>) -> Self {
        self.background = background;
        self
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Converts the pixel layout to one the target encoder accepts.
    ///
    /// JPEG gets opaque 8-bit RGB, with any alpha flattened onto the background
    /// color. PNG and WebP keep the channel count; PNG keeps 16-bit depth and
    /// WebP is reduced to 8 bits per channel.
    pub fn normalize_for_format(&self, image: DynamicImage, format: OutputFormat) -> DynamicImage {
        match format {
            OutputFormat::Jpeg => match image {
                DynamicImage::ImageRgb8(_) => image,
                image if image.color().has_alpha() => {
                    DynamicImage::ImageRgb8(composite_onto(&image, self.background))
                }
                image => DynamicImage::ImageRgb8(image.to_rgb8()),
            },
            OutputFormat::Png => match image {
                DynamicImage::ImageRgb32F(_) => DynamicImage::ImageRgb16(image.to_rgb16()),
                DynamicImage::ImageRgba32F(_) => DynamicImage::ImageRgba16(image.to_rgba16()),
                image => image,
            },
            OutputFormat::WebP => to_eight_bit(image),
        }
    }

    pub fn encode(&self, image: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ImageToolError::ProcessingError(format!(
                "Cannot encode a {}x{} image",
                width, height
            )));
        }

        if format.is_lossy() {
            log::debug!(
                "Encoding {}x{} {:?} image as {} (quality {})",
                width,
                height,
                image.color(),
                format,
                self.quality
            );
        } else {
            log::debug!(
                "Encoding {}x{} {:?} image as {} (quality ignored)",
                width,
                height,
                image.color(),
                format
            );
        }

        let mut buffer = Vec::new();
        match format {
            OutputFormat::Jpeg => {
                image.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, self.quality))?;
            }
            OutputFormat::Png => {
                image.write_with_encoder(PngEncoder::new(&mut buffer))?;
                if self.optimize_png {
                    return self.optimize_png_bytes(&buffer);
                }
            }
            OutputFormat::WebP => {
                // The encoder is lossless; quality below 100 coarsens color first.
                if self.quality < 100 {
                    let mut quantized = image.clone();
                    quantize_for_webp(&mut quantized, self.quality);
                    quantized.write_with_encoder(WebPEncoder::new_lossless(&mut buffer))?;
                } else {
                    image.write_with_encoder(WebPEncoder::new_lossless(&mut buffer))?;
                }
            }
        }

        Ok(buffer)
    }

    pub fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        std::fs::write(path, bytes)?;
        log::info!("Saved image: {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    fn optimize_png_bytes(&self, data: &[u8]) -> Result<Vec<u8>> {
        let options = Options {
            bit_depth_reduction: false,
            color_type_reduction: false,
            palette_reduction: false,
            grayscale_reduction: false,
            ..Options::default()
        };

        optimize_from_memory(data, &options)
            .map_err(|e| ImageToolError::ProcessingError(format!("PNG optimization failed: {}", e)))
    }
}

/// Flattens alpha with the "over" operator onto an opaque background.
pub fn composite_onto(image: &DynamicImage, background: Rgb<u8>) -> RgbImage {
    let rgba = image.to_rgba8();

    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let pixel = rgba.get_pixel(x, y);
        let alpha = pixel[3] as u16;
        let blend = |src: u8, dst: u8| -> u8 {
            ((src as u16 * alpha + dst as u16 * (255 - alpha) + 127) / 255) as u8
        };

        Rgb([
            blend(pixel[0], background[0]),
            blend(pixel[1], background[1]),
            blend(pixel[2], background[2]),
        ])
    })
}

fn to_eight_bit(image: DynamicImage) -> DynamicImage {
    let color = image.color();
    if color.bytes_per_pixel() == color.channel_count() {
        return image;
    }

    match (color.has_color(), color.has_alpha()) {
        (false, false) => DynamicImage::ImageLuma8(image.to_luma8()),
        (false, true) => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
        (true, false) => DynamicImage::ImageRgb8(image.to_rgb8()),
        (true, true) => DynamicImage::ImageRgba8(image.to_rgba8()),
    }
}

fn quantize_for_webp(image: &mut DynamicImage, quality: u8) {
    match image {
        DynamicImage::ImageLuma8(buffer) => quantize_channels(buffer, 1, 1, quality),
        DynamicImage::ImageLumaA8(buffer) => quantize_channels(buffer, 2, 1, quality),
        DynamicImage::ImageRgb8(buffer) => quantize_channels(buffer, 3, 3, quality),
        DynamicImage::ImageRgba8(buffer) => quantize_channels(buffer, 4, 3, quality),
        _ => {}
    }
}

/// Snaps the first `color_channels` of every pixel to a palette whose size grows
/// with quality. Alpha is never touched.
fn quantize_channels(data: &mut [u8], channels: usize, color_channels: usize, quality: u8) {
    if quality >= 100 {
        return;
    }

    let levels = levels_from_quality(quality);
    let step = 255.0 / (levels as f32 - 1.0);
    for pixel in data.chunks_exact_mut(channels) {
        for channel in pixel.iter_mut().take(color_channels) {
            let bucket = (f32::from(*channel) / step).round();
            *channel = (bucket * step).round().clamp(0.0, 255.0) as u8;
        }
    }
}

fn levels_from_quality(quality: u8) -> u16 {
    if quality >= 100 {
        return 256;
    }

    let normalized = (quality as f32).clamp(1.0, 100.0) / 100.0;
    let levels = 2.0 + normalized * normalized * 254.0;
    levels.round().clamp(2.0, 256.0) as u16
}
