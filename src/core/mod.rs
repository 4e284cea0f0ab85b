// pixbatch/src/core/mod.rs
pub mod processor;
pub mod request;

use image::Rgb;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub use processor::ConversionJob;
pub use request::{ConversionRequest, RequestForm, DEFAULT_QUALITY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeAlgorithm {
    Nearest,
    Bilinear,
    #[default]
    Bicubic,
    Lanczos3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Jpeg, OutputFormat::Png, OutputFormat::WebP];

    /// Extension used for derived output file names.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
        }
    }

    pub fn image_format(self) -> image::ImageFormat {
        match self {
            OutputFormat::Jpeg => image::ImageFormat::Jpeg,
            OutputFormat::Png => image::ImageFormat::Png,
            OutputFormat::WebP => image::ImageFormat::WebP,
        }
    }

    /// Whether the quality setting changes the encoded pixels.
    pub fn is_lossy(self) -> bool {
        matches!(self, OutputFormat::Jpeg | OutputFormat::WebP)
    }

    pub fn supports_alpha(self) -> bool {
        !matches!(self, OutputFormat::Jpeg)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            _ => Err(ValidationError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// How a batch is executed, as opposed to what it converts.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Worker threads; 0 uses the global rayon pool.
    pub threads: usize,
    pub algorithm: ResizeAlgorithm,
    /// Color that transparent pixels are flattened onto for JPEG output.
    pub background: Rgb<u8>,
    pub optimize_png: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            threads: 0,
            algorithm: ResizeAlgorithm::default(),
            background: Rgb([255, 255, 255]),
            optimize_png: true,
        }
    }
}

impl BatchOptions {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_algorithm(mut self, algorithm: ResizeAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_background(mut self, background: Rgb<u8>) -> Self {
        self.background = background;
        self
    }

    pub fn with_png_optimization(mut self, optimize: bool) -> Self {
        self.optimize_png = optimize;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success { output_path: PathBuf, bytes_written: u64 },
    Failed(FailureReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutcome {
    pub source: PathBuf,
    pub status: OutcomeStatus,
}

impl ConversionOutcome {
    pub fn success(source: &Path, output_path: PathBuf, bytes_written: u64) -> Self {
        Self {
            source: source.to_path_buf(),
            status: OutcomeStatus::Success {
                output_path,
                bytes_written,
            },
        }
    }

    pub fn failed(source: &Path, reason: FailureReason) -> Self {
        Self {
            source: source.to_path_buf(),
            status: OutcomeStatus::Failed(reason),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success { .. })
    }

    pub fn output_path(&self) -> Option<&Path> {
        match &self.status {
            OutcomeStatus::Success { output_path, .. } => Some(output_path),
            OutcomeStatus::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.status {
            OutcomeStatus::Success { .. } => None,
            OutcomeStatus::Failed(reason) => Some(reason),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<ConversionOutcome>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn from_outcomes(outcomes: Vec<ConversionOutcome>, elapsed: Duration) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();

        Self {
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            outcomes,
            elapsed,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &FailureReason)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.failure().map(|reason| (o.source.as_path(), reason)))
    }

    pub fn bytes_written(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                OutcomeStatus::Success { bytes_written, .. } => bytes_written,
                OutcomeStatus::Failed(_) => 0,
            })
            .sum()
    }
}

/// Request-level problems. Any of these aborts the whole batch before a file is read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No input files were supplied")]
    EmptyFileList,

    #[error("Unsupported format: {0} (expected jpg, png or webp)")]
    UnsupportedFormat(String),

    #[error("Quality must be between 1 and 100, got {0}")]
    QualityOutOfRange(String),

    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),

    #[error("Invalid output directory {}: {reason}", path.display())]
    InvalidOutputDirectory { path: PathBuf, reason: String },
}

/// Why a single file was not converted. Recorded in its outcome; never fatal to the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("write error: {0}")]
    WriteError(String),

    #[error("unexpected failure: {0}")]
    Unknown(String),

    #[error("batch cancelled before this file was started")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum ImageToolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Processing error: {0}")]
    ProcessingError(String),
}

pub type Result<T> = std::result::Result<T, ImageToolError>;
