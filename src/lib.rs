mod cli;
mod core;
mod processors;
mod utils;

pub use crate::cli::{Algorithm, Cli, Commands, ProgressBarSink};
pub use crate::core::{
    BatchOptions, BatchReport, ConversionJob, ConversionOutcome, ConversionRequest, FailureReason,
    ImageToolError, OutcomeStatus, OutputFormat, RequestForm, ResizeAlgorithm, Result,
    ValidationError, DEFAULT_QUALITY,
};
pub use crate::processors::{
    composite_onto, resolve, BatchProcessor, CancellationToken, Compressor, ImageDocument, Loader,
    Previewer, ProgressSink, ResizeTarget, Resizer, MAX_DIMENSION, MAX_PIXELS, PREVIEW_MAX_SIDE,
};
pub use crate::utils::{
    collect_image_paths, format_file_size, generate_output_path, is_supported_format,
    parse_dimension, parse_hex_color, quality_from_slider, SUPPORTED_EXTENSIONS,
};

pub mod prelude {
    pub use crate::{
        BatchOptions, BatchProcessor, ConversionRequest, OutputFormat, ProgressSink, RequestForm,
    };
}

// Re-export commonly used types
pub use image::DynamicImage;
