// pixbatch/src/core/processor.rs
use super::{
    BatchOptions, ConversionOutcome, ConversionRequest, FailureReason, ImageToolError,
    OutputFormat,
};
use crate::processors::{Compressor, Loader, Resizer};
use crate::utils::generate_output_path;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

/// Converts one source file: decode, resize, normalize, encode, write.
///
/// A job is built once per batch and shared by every worker. `run` never
/// returns an error; every failure, including a panic inside a codec, comes
/// back as a failed [`ConversionOutcome`].
#[derive(Debug, Clone)]
pub struct ConversionJob {
    output_dir: PathBuf,
    format: OutputFormat,
    width: Option<u32>,
    height: Option<u32>,
    loader: Loader,
    resizer: Resizer,
    compressor: Compressor,
}

impl ConversionJob {
    pub fn new(request: &ConversionRequest, options: &BatchOptions) -> Self {
        let compressor = Compressor::new(request.quality())
            .with_background(options.background)
            .with_png_optimization(options.optimize_png);

        Self {
            output_dir: request.output_dir().to_path_buf(),
            format: request.format(),
            width: request.width(),
            height: request.height(),
            loader: Loader::new(),
            resizer: Resizer::new(options.algorithm),
            compressor,
        }
    }

    pub fn run(&self, source: &Path) -> ConversionOutcome {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.execute(source)))
            .unwrap_or_else(|payload| Err(FailureReason::Unknown(panic_message(payload.as_ref()))));

        match result {
            Ok((output_path, bytes_written)) => {
                ConversionOutcome::success(source, output_path, bytes_written)
            }
            Err(reason) => {
                log::warn!("Failed to convert {}: {}", source.display(), reason);
                ConversionOutcome::failed(source, reason)
            }
        }
    }

    fn execute(&self, source: &Path) -> Result<(PathBuf, u64), FailureReason> {
        let document = self
            .loader
            .load(source)
            .map_err(|e| match e {
                ImageToolError::InvalidImage(message) => FailureReason::InvalidImage(message),
                other => FailureReason::DecodeError(other.to_string()),
            })?;

        let target = self
            .resizer
            .resolve_for(&document.image, self.width, self.height)
            .and_then(|target| self.resizer.check_limits(target).map(|_| target))
            .map_err(|e| FailureReason::InvalidImage(e.to_string()))?;

        let image = self.resizer.resample(document.into_image(), target);
        let image = self.compressor.normalize_for_format(image, self.format);

        let output_path = generate_output_path(source, &self.output_dir, self.format);
        let bytes = self
            .compressor
            .encode(&image, self.format)
            .map_err(|e| FailureReason::Unknown(e.to_string()))?;

        self.compressor
            .write(&output_path, &bytes)
            .map_err(|e| FailureReason::WriteError(e.to_string()))?;

        Ok((output_path, bytes.len() as u64))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {}", message)
    } else {
        "panic with no message".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, RgbImage};
    use std::fs;

    fn job(dir: &Path, format: OutputFormat) -> ConversionJob {
        let request = ConversionRequest::new(vec![PathBuf::from("unused.png")], dir, format);
        ConversionJob::new(&request, &BatchOptions::default())
    }

    #[test]
    fn test_run_writes_derived_output() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("photo.png");
        RgbImage::new(12, 8).save(&source).unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();

        let outcome = job(&out, OutputFormat::Jpeg).run(&source);

        assert_eq!(outcome.output_path(), Some(out.join("photo.jpg").as_path()));
        let written = image::open(out.join("photo.jpg")).unwrap();
        assert_eq!(written.dimensions(), (12, 8));
    }

    #[test]
    fn test_run_classifies_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.png");
        fs::write(&source, b"not a png").unwrap();

        let outcome = job(dir.path(), OutputFormat::Png).run(&source);

        assert!(matches!(outcome.failure(), Some(FailureReason::DecodeError(_))));
        assert_eq!(fs::read(&source).unwrap(), b"not a png");
    }

    #[test]
    fn test_run_classifies_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("photo.png");
        RgbImage::new(4, 4).save(&source).unwrap();

        let outcome = job(&dir.path().join("missing"), OutputFormat::Png).run(&source);

        assert!(matches!(outcome.failure(), Some(FailureReason::WriteError(_))));
    }

    #[test]
    fn test_run_reports_degenerate_resize_as_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("strip.png");
        RgbImage::new(1000, 1).save(&source).unwrap();
        let request = ConversionRequest::new(vec![source.clone()], dir.path(), OutputFormat::Png)
            .with_width(10);

        let outcome = ConversionJob::new(&request, &BatchOptions::default()).run(&source);

        assert!(matches!(outcome.failure(), Some(FailureReason::Unknown(_))));
    }

    #[test]
    fn test_run_rejects_oversized_target_before_resampling() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("needle.png");
        RgbImage::new(1, 20_000).save(&source).unwrap();
        let request = ConversionRequest::new(vec![source.clone()], dir.path(), OutputFormat::Png)
            .with_width(100_000);

        let outcome = ConversionJob::new(&request, &BatchOptions::default()).run(&source);

        assert!(matches!(outcome.failure(), Some(FailureReason::InvalidImage(_))));
        // output path equals the source here, so it must be left untouched
        assert_eq!(image::image_dimensions(&source).unwrap(), (1, 20_000));
    }

    #[test]
    fn test_run_reports_source_over_decode_limit_as_invalid_image() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("endless.png");
        RgbImage::new(1, crate::processors::MAX_DIMENSION + 1).save(&source).unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();

        let outcome = job(&out, OutputFormat::Png).run(&source);

        assert!(matches!(outcome.failure(), Some(FailureReason::InvalidImage(_))));
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn test_panic_message_extracts_payload() {
        let payload = panic::catch_unwind(|| panic!("codec exploded")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "panic: codec exploded");
    }
}
