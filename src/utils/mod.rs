// pixbatch/src/utils/mod.rs
use crate::core::{ImageToolError, OutputFormat, Result, ValidationError};
use image::Rgb;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// `output_dir/<stem>.<ext>`. Files sharing a stem map to the same path; the later write wins.
pub fn generate_output_path(input_path: &Path, output_dir: &Path, format: OutputFormat) -> PathBuf {
    let mut file_name: OsString = input_path
        .file_stem()
        .map(|stem| stem.to_os_string())
        .unwrap_or_else(|| OsString::from("image"));
    file_name.push(".");
    file_name.push(format.extension());

    output_dir.join(file_name)
}

pub fn get_file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
}

pub fn is_supported_format(path: &Path) -> bool {
    get_file_extension(path)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Expands directories into the supported image files they contain.
/// Plain file arguments are kept as given, in order.
pub fn collect_image_paths(inputs: &[PathBuf], recursive: bool) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    for input in inputs {
        if !input.is_dir() {
            paths.push(input.clone());
            continue;
        }

        let walker = if recursive {
            WalkDir::new(input)
        } else {
            WalkDir::new(input).max_depth(1)
        };

        paths.extend(
            walker
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| is_supported_format(entry.path()))
                .map(|entry| entry.into_path()),
        );
    }

    paths
}

/// Free-text dimension field. Blank means "not set".
pub fn parse_dimension(text: &str, label: &str) -> std::result::Result<Option<u32>, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    match text.parse::<u32>() {
        Ok(0) => Err(ValidationError::InvalidDimension(format!(
            "{} must be greater than zero",
            label
        ))),
        Ok(value) => Ok(Some(value)),
        Err(_) => Err(ValidationError::InvalidDimension(format!(
            "{} must be a whole number, got {:?}",
            label, text
        ))),
    }
}

/// Rounds a slider position to the nearest integer (halves away from zero), then range-checks it.
pub fn quality_from_slider(value: f64) -> std::result::Result<u8, ValidationError> {
    let rounded = value.round();
    if !rounded.is_finite() || !(1.0..=100.0).contains(&rounded) {
        return Err(ValidationError::QualityOutOfRange(value.to_string()));
    }

    Ok(rounded as u8)
}

/// Parses `rrggbb` (optionally prefixed with `#`).
pub fn parse_hex_color(text: &str) -> Result<Rgb<u8>> {
    let hex = text.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(ImageToolError::InvalidParameter(format!(
            "Expected a color like ffffff, got {:?}",
            text
        )));
    }

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).map_err(|_| {
            ImageToolError::InvalidParameter(format!("Invalid hex color: {:?}", text))
        })
    };

    Ok(Rgb([channel(0..2)?, channel(2..4)?, channel(4..6)?]))
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let base = 1024_f64;
    let bytes_f64 = bytes as f64;
    let exponent = ((bytes_f64.log10() / base.log10()).floor() as usize).min(UNITS.len() - 1);
    let size = bytes_f64 / base.powi(exponent as i32);

    format!("{:.2} {}", size, UNITS[exponent])
}
