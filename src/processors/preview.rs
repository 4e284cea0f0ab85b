// pixbatch/src/processors/preview.rs
use crate::core::Result;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::path::Path;

pub const PREVIEW_MAX_SIDE: u32 = 250;

/// Bounded thumbnails for display. Decodes on its own and never touches a batch.
#[derive(Debug, Clone)]
pub struct Previewer {
    max_side: u32,
}

impl Previewer {
    pub fn new() -> Self {
        Self {
            max_side: PREVIEW_MAX_SIDE,
        }
    }

    pub fn with_max_side(mut self, max_side: u32) -> Self {
        self.max_side = max_side.max(1);
        self
    }

    /// Shrinks so the longest side is at most `max_side`. Smaller images are returned unchanged.
    pub fn thumbnail(&self, path: &Path) -> Result<DynamicImage> {
        let image = ImageReader::open(path)?.decode()?;
        let (width, height) = image.dimensions();

        if width.max(height) <= self.max_side {
            return Ok(image);
        }

        log::debug!(
            "Building {}px preview of {} ({}x{})",
            self.max_side,
            path.display(),
            width,
            height
        );
        Ok(image.thumbnail(self.max_side, self.max_side))
    }

    pub fn save_thumbnail(&self, input: &Path, output: &Path) -> Result<(u32, u32)> {
        let thumbnail = self.thumbnail(input)?;
        thumbnail.save_with_format(output, ImageFormat::Png)?;
        Ok(thumbnail.dimensions())
    }
}

impl Default for Previewer {
    fn default() -> Self {
        Self::new()
    }
}
