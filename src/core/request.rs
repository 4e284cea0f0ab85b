// pixbatch/src/core/request.rs
use super::{OutputFormat, ValidationError};
use crate::processors::MAX_DIMENSION;
use crate::utils::{parse_dimension, quality_from_slider};
use std::path::{Path, PathBuf};

pub const DEFAULT_QUALITY: u8 = 85;

/// Everything one batch converts. Built once and never edited while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    files: Vec<PathBuf>,
    output_dir: PathBuf,
    format: OutputFormat,
    width: Option<u32>,
    height: Option<u32>,
    quality: u8,
}

impl ConversionRequest {
    pub fn new(files: Vec<PathBuf>, output_dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            files,
            output_dir: output_dir.into(),
            format,
            width: None,
            height: None,
            quality: DEFAULT_QUALITY,
        }
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn width(&self) -> Option<u32> {
        self.width
    }

    pub fn height(&self) -> Option<u32> {
        self.height
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Checks the invariants that need no filesystem access.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.files.is_empty() {
            return Err(ValidationError::EmptyFileList);
        }

        if self.quality == 0 || self.quality > 100 {
            return Err(ValidationError::QualityOutOfRange(self.quality.to_string()));
        }

        if self.width == Some(0) {
            return Err(ValidationError::InvalidDimension(
                "width must be greater than zero".to_string(),
            ));
        }

        if self.height == Some(0) {
            return Err(ValidationError::InvalidDimension(
                "height must be greater than zero".to_string(),
            ));
        }

        for (name, value) in [("width", self.width), ("height", self.height)] {
            if value.map_or(false, |v| v > MAX_DIMENSION) {
                return Err(ValidationError::InvalidDimension(format!(
                    "{} must be at most {}",
                    name, MAX_DIMENSION
                )));
            }
        }

        Ok(())
    }
}

/// Raw option values as typed into a form or passed on the command line.
#[derive(Debug, Clone, Default)]
pub struct RequestForm {
    pub format: String,
    pub width: String,
    pub height: String,
    /// Slider position; `None` means the default quality.
    pub quality: Option<f64>,
}

impl RequestForm {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            ..Default::default()
        }
    }

    pub fn into_request(
        self,
        files: Vec<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Result<ConversionRequest, ValidationError> {
        if files.is_empty() {
            return Err(ValidationError::EmptyFileList);
        }

        let format: OutputFormat = self.format.parse()?;
        let quality = match self.quality {
            Some(value) => quality_from_slider(value)?,
            None => DEFAULT_QUALITY,
        };
        let width = parse_dimension(&self.width, "width")?;
        let height = parse_dimension(&self.height, "height")?;

        let mut request = ConversionRequest::new(files, output_dir, format).with_quality(quality);
        if let Some(width) = width {
            request = request.with_width(width);
        }
        if let Some(height) = height {
            request = request.with_height(height);
        }

        request.validate()?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files() -> Vec<PathBuf> {
        vec![PathBuf::from("a.png"), PathBuf::from("b.jpg")]
    }

    #[test]
    fn test_form_defaults_quality_and_leaves_dimensions_absent() {
        let request = RequestForm::new("webp").into_request(files(), "out").unwrap();

        assert_eq!(request.format(), OutputFormat::WebP);
        assert_eq!(request.quality(), DEFAULT_QUALITY);
        assert_eq!(request.width(), None);
        assert_eq!(request.height(), None);
        assert_eq!(request.files().len(), 2);
    }

    #[test]
    fn test_form_parses_dimensions_and_rounds_quality() {
        let form = RequestForm {
            format: "JPEG".to_string(),
            width: " 640 ".to_string(),
            height: String::new(),
            quality: Some(84.6),
        };
        let request = form.into_request(files(), "out").unwrap();

        assert_eq!(request.format(), OutputFormat::Jpeg);
        assert_eq!(request.width(), Some(640));
        assert_eq!(request.height(), None);
        assert_eq!(request.quality(), 85);
    }

    #[test]
    fn test_form_rejects_non_numeric_dimension() {
        let form = RequestForm {
            width: "wide".to_string(),
            ..RequestForm::new("png")
        };

        assert!(matches!(
            form.into_request(files(), "out"),
            Err(ValidationError::InvalidDimension(_))
        ));
    }

    #[test]
    fn test_form_rejects_unknown_format() {
        assert_eq!(
            RequestForm::new("gif").into_request(files(), "out"),
            Err(ValidationError::UnsupportedFormat("gif".to_string()))
        );
    }

    #[test]
    fn test_form_rejects_empty_file_list() {
        assert_eq!(
            RequestForm::new("png").into_request(Vec::new(), "out"),
            Err(ValidationError::EmptyFileList)
        );
    }

    #[test]
    fn test_validate_rejects_quality_bounds() {
        for quality in [0, 101] {
            let request = ConversionRequest::new(files(), "out", OutputFormat::Jpeg).with_quality(quality);
            assert!(matches!(
                request.validate(),
                Err(ValidationError::QualityOutOfRange(_))
            ));
        }

        let request = ConversionRequest::new(files(), "out", OutputFormat::Jpeg).with_quality(100);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_dimension() {
        let request = ConversionRequest::new(files(), "out", OutputFormat::Png).with_height(0);
        assert!(matches!(
            request.validate(),
            Err(ValidationError::InvalidDimension(_))
        ));
    }

    #[test]
    fn test_validate_rejects_dimension_above_limit() {
        let request = ConversionRequest::new(files(), "out", OutputFormat::Png)
            .with_width(MAX_DIMENSION + 1);
        assert!(matches!(
            request.validate(),
            Err(ValidationError::InvalidDimension(_))
        ));

        let form = RequestForm {
            height: "250000".to_string(),
            ..RequestForm::new("png")
        };
        assert!(matches!(
            form.into_request(files(), "out"),
            Err(ValidationError::InvalidDimension(_))
        ));

        let request = ConversionRequest::new(files(), "out", OutputFormat::Png)
            .with_width(MAX_DIMENSION)
            .with_height(MAX_DIMENSION);
        assert!(request.validate().is_ok());
    }
}
