// pixbatch/src/processors/loader.rs
use super::MAX_DIMENSION;
use crate::core::{ImageToolError, Result};
use crate::utils::{get_file_extension, is_supported_format};
use image::{DynamicImage, GenericImageView, ImageError, ImageFormat, ImageReader, Limits};
use std::path::Path;

/// A decoded source image. Owned by exactly one conversion job.
#[derive(Debug)]
pub struct ImageDocument {
    pub image: DynamicImage,
    pub source_format: ImageFormat,
}

impl ImageDocument {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn into_image(self) -> DynamicImage {
        self.image
    }
}

#[derive(Debug, Clone)]
pub struct Loader {
    max_dimensions: Option<(u32, u32)>,
}

impl Loader {
    pub fn new() -> Self {
        Self {
            max_dimensions: Some((MAX_DIMENSION, MAX_DIMENSION)),
        }
    }

    pub fn with_max_dimensions(mut self, width: u32, height: u32) -> Self {
        self.max_dimensions = Some((width, height));
        self
    }

    /// Decodes `path` using the format named by its extension. Content is never sniffed.
    pub fn load(&self, path: &Path) -> Result<ImageDocument> {
        log::debug!("Loading image from: {}", path.display());

        self.validate_path(path)?;

        let source_format = self.detect_format(path)?;
        let mut reader = ImageReader::open(path)?;
        reader.set_format(source_format);

        // The decoder checks these against the header, before any pixel buffer exists
        if let Some((max_w, max_h)) = self.max_dimensions {
            let mut limits = Limits::default();
            limits.max_image_width = Some(max_w);
            limits.max_image_height = Some(max_h);
            reader.limits(limits);
        }

        let image = reader.decode().map_err(|e| match e {
            ImageError::Limits(limit) => ImageToolError::InvalidImage(format!(
                "{} exceeds the decode limits: {}",
                path.display(),
                limit
            )),
            other => ImageToolError::Image(other),
        })?;

        let (width, height) = image.dimensions();
        log::debug!(
            "Loaded image: {}x{} pixels, color: {:?}, format: {:?}",
            width,
            height,
            image.color(),
            source_format
        );

        Ok(ImageDocument {
            image,
            source_format,
        })
    }

    pub fn detect_format(&self, path: &Path) -> Result<ImageFormat> {
        ImageFormat::from_path(path).map_err(|_| {
            ImageToolError::UnsupportedFormat(format!(
                "Cannot determine format of {}",
                path.display()
            ))
        })
    }

    fn validate_path(&self, path: &Path) -> Result<()> {
        if !is_supported_format(path) {
            return Err(ImageToolError::UnsupportedFormat(format!(
                "Unsupported source extension {:?} for {}",
                get_file_extension(path).unwrap_or_default(),
                path.display()
            )));
        }

        if !path.is_file() {
            return Err(ImageToolError::InvalidParameter(format!(
                "File does not exist: {}",
                path.display()
            )));
        }

        let metadata = path.metadata()?;
        if metadata.len() == 0 {
            return Err(ImageToolError::InvalidParameter(format!(
                "File is empty: {}",
                path.display()
            )));
        }

        Ok(())
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::fs;

    #[test]
    fn test_load_reports_native_dimensions_and_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.png");
        RgbaImage::from_pixel(7, 3, Rgba([1, 2, 3, 4])).save(&path).unwrap();

        let document = Loader::new().load(&path).unwrap();

        assert_eq!(document.dimensions(), (7, 3));
        assert_eq!(document.source_format, ImageFormat::Png);
        assert!(document.image.color().has_alpha());
    }

    #[test]
    fn test_load_rejects_unsupported_extension_without_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.gif");
        fs::write(&path, b"GIF89a").unwrap();

        assert!(matches!(
            Loader::new().load(&path),
            Err(ImageToolError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_load_fails_on_corrupt_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        fs::write(&path, b"definitely not a jpeg").unwrap();

        assert!(Loader::new().load(&path).is_err());
    }

    #[test]
    fn test_load_fails_on_missing_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.png");
        let empty = dir.path().join("empty.png");
        fs::write(&empty, b"").unwrap();

        assert!(Loader::new().load(&missing).is_err());
        assert!(Loader::new().load(&empty).is_err());
    }

    #[test]
    fn test_load_enforces_max_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        RgbaImage::new(20, 2).save(&path).unwrap();

        let loader = Loader::new().with_max_dimensions(10, 10);
        assert!(matches!(loader.load(&path), Err(ImageToolError::InvalidImage(_))));
    }
}
