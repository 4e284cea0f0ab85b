// pixbatch/src/cli.rs
use crate::core::ResizeAlgorithm;
use crate::processors::{ProgressSink, PREVIEW_MAX_SIDE};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pixbatch", version, about = "Batch convert and resize images")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert and resize a set of images into one directory
    Convert {
        /// Image files, or directories to scan for png/jpg/jpeg/webp files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Output format: jpg, png or webp
        #[arg(short, long, default_value = "jpg")]
        format: String,

        /// Target width in pixels
        #[arg(long, default_value = "")]
        width: String,

        /// Target height in pixels
        #[arg(long, default_value = "")]
        height: String,

        /// Quality from 1 to 100; fractional values are rounded
        #[arg(short, long)]
        quality: Option<f64>,

        /// Worker threads (0 = one per core)
        #[arg(short = 'j', long, default_value_t = 0)]
        threads: usize,

        /// Scan input directories recursively
        #[arg(short, long)]
        recursive: bool,

        /// Resampling filter
        #[arg(short, long, value_enum, default_value_t = Algorithm::Bicubic)]
        algorithm: Algorithm,

        /// Background color for flattening transparency into JPEG
        #[arg(long, default_value = "ffffff")]
        background: String,

        /// Skip lossless PNG recompression
        #[arg(long)]
        no_png_optimize: bool,
    },

    /// Write a bounded PNG thumbnail of a single image
    Preview {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Longest side of the thumbnail
        #[arg(long, default_value_t = PREVIEW_MAX_SIDE)]
        max_side: u32,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    Nearest,
    Bilinear,
    Bicubic,
    Lanczos3,
}

impl From<Algorithm> for ResizeAlgorithm {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Nearest => ResizeAlgorithm::Nearest,
            Algorithm::Bilinear => ResizeAlgorithm::Bilinear,
            Algorithm::Bicubic => ResizeAlgorithm::Bicubic,
            Algorithm::Lanczos3 => ResizeAlgorithm::Lanczos3,
        }
    }
}

/// Terminal progress bar fed by batch progress events.
pub struct ProgressBarSink {
    bar: ProgressBar,
}

impl ProgressBarSink {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);

        Self { bar }
    }

    pub fn finish(&self, message: String) {
        self.bar.finish_with_message(message);
    }
}

impl ProgressSink for ProgressBarSink {
    fn on_progress(&self, completed: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(completed as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_convert_defaults() {
        let cli = Cli::parse_from(["pixbatch", "convert", "a.png", "b.jpg", "-o", "out"]);

        match cli.command {
            Commands::Convert {
                inputs,
                output,
                format,
                width,
                height,
                quality,
                algorithm,
                no_png_optimize,
                ..
            } => {
                assert_eq!(inputs, vec![PathBuf::from("a.png"), PathBuf::from("b.jpg")]);
                assert_eq!(output, PathBuf::from("out"));
                assert_eq!(format, "jpg");
                assert!(width.is_empty());
                assert!(height.is_empty());
                assert_eq!(quality, None);
                assert_eq!(algorithm, Algorithm::Bicubic);
                assert!(!no_png_optimize);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_convert_accepts_free_text_dimensions() {
        let cli = Cli::parse_from([
            "pixbatch", "convert", "a.png", "-o", "out", "-f", "webp", "--width", "150", "-q", "80.4", "-v",
        ]);

        assert!(cli.verbose);
        match cli.command {
            Commands::Convert { format, width, quality, .. } => {
                assert_eq!(format, "webp");
                assert_eq!(width, "150");
                assert_eq!(quality, Some(80.4));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
