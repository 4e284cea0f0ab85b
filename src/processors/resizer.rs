// pixbatch/src/processors/resizer.rs
use crate::core::{ImageToolError, ResizeAlgorithm, Result};
use image::{imageops::FilterType, DynamicImage, GenericImageView};

pub const MAX_DIMENSION: u32 = 100_000;
pub const MAX_PIXELS: u64 = 100_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeTarget {
    pub width: u32,
    pub height: u32,
}

impl ResizeTarget {
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Output size for an image of `native_width` x `native_height`.
///
/// Both requested dimensions stretch to exactly that size. A single requested
/// dimension scales the other one by the same ratio, rounded to the nearest
/// pixel. Neither keeps the native size. A rounded dimension of zero is
/// returned as-is and left for the encoder to reject.
pub fn resolve(
    native_width: u32,
    native_height: u32,
    requested_width: Option<u32>,
    requested_height: Option<u32>,
) -> Result<ResizeTarget> {
    if native_width == 0 || native_height == 0 {
        return Err(ImageToolError::InvalidImage(format!(
            "Native dimensions {}x{} are degenerate",
            native_width, native_height
        )));
    }

    let (width, height) = match (requested_width, requested_height) {
        (Some(width), Some(height)) => (width, height),
        (Some(width), None) => {
            let ratio = width as f64 / native_width as f64;
            (width, (native_height as f64 * ratio).round() as u32)
        }
        (None, Some(height)) => {
            let ratio = height as f64 / native_height as f64;
            ((native_width as f64 * ratio).round() as u32, height)
        }
        (None, None) => (native_width, native_height),
    };

    Ok(ResizeTarget { width, height })
}

#[derive(Debug, Clone)]
pub struct Resizer {
    algorithm: ResizeAlgorithm,
    max_dimension: u32,
    max_pixels: u64,
}

impl Resizer {
    pub fn new(algorithm: ResizeAlgorithm) -> Self {
        Self {
            algorithm,
            max_dimension: MAX_DIMENSION,
            max_pixels: MAX_PIXELS,
        }
    }

    pub fn with_limits(mut self, max_dimension: u32, max_pixels: u64) -> Self {
        self.max_dimension = max_dimension;
        self.max_pixels = max_pixels;
        self
    }

    /// Rejects targets too large to resample. Must run before `resample`, which
    /// allocates the whole output up front.
    pub fn check_limits(&self, target: ResizeTarget) -> Result<()> {
        if target.width > self.max_dimension || target.height > self.max_dimension {
            return Err(ImageToolError::InvalidImage(format!(
                "Resize target {}x{} exceeds the {} pixel side limit",
                target.width, target.height, self.max_dimension
            )));
        }

        if target.pixel_count() > self.max_pixels {
            return Err(ImageToolError::InvalidImage(format!(
                "Resize target {}x{} exceeds the {} pixel budget",
                target.width, target.height, self.max_pixels
            )));
        }

        Ok(())
    }

    pub fn resolve_for(
        &self,
        image: &DynamicImage,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<ResizeTarget> {
        let (native_width, native_height) = image.dimensions();
        resolve(native_width, native_height, width, height)
    }

    /// Resamples to `target` without preserving aspect ratio.
    pub fn resample(&self, image: DynamicImage, target: ResizeTarget) -> DynamicImage {
        if image.dimensions() == (target.width, target.height) {
            log::debug!("Image dimensions unchanged, skipping resize");
            return image;
        }

        if target.is_degenerate() {
            log::debug!(
                "Resize target {}x{} is degenerate, producing an empty image",
                target.width,
                target.height
            );
            return DynamicImage::new(target.width, target.height, image.color());
        }

        log::debug!(
            "Resizing image from {}x{} to {}x{}",
            image.width(),
            image.height(),
            target.width,
            target.height
        );

        image.resize_exact(target.width, target.height, self.get_filter_type())
    }

    fn get_filter_type(&self) -> FilterType {
        match self.algorithm {
            ResizeAlgorithm::Nearest => FilterType::Nearest,
            ResizeAlgorithm::Bilinear => FilterType::Triangle,
            ResizeAlgorithm::Bicubic => FilterType::CatmullRom,
            ResizeAlgorithm::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl Default for Resizer {
    fn default() -> Self {
        Self::new(ResizeAlgorithm::default())
    }
}
