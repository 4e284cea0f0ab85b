use anyhow::{bail, Context};
use clap::Parser;
use log::LevelFilter;
use pixbatch::{
    collect_image_paths, format_file_size, parse_hex_color, Algorithm, BatchOptions,
    BatchProcessor, Cli, Commands, Previewer, ProgressBarSink, RequestForm,
};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger; RUST_LOG still overrides the default level
    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    match cli.command {
        Commands::Convert {
            inputs,
            output,
            format,
            width,
            height,
            quality,
            threads,
            recursive,
            algorithm,
            background,
            no_png_optimize,
        } => {
            let form = RequestForm {
                format,
                width,
                height,
                quality,
            };
            process_convert(
                inputs,
                output,
                form,
                threads,
                recursive,
                algorithm,
                &background,
                !no_png_optimize,
            )?;
        }
        Commands::Preview {
            input,
            output,
            max_side,
        } => {
            process_preview(input, output, max_side)?;
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn process_convert(
    inputs: Vec<PathBuf>,
    output: PathBuf,
    form: RequestForm,
    threads: usize,
    recursive: bool,
    algorithm: Algorithm,
    background: &str,
    optimize_png: bool,
) -> anyhow::Result<()> {
    let files = collect_image_paths(&inputs, recursive);
    let request = form.into_request(files, output)?;

    let options = BatchOptions::default()
        .with_threads(threads)
        .with_algorithm(algorithm.into())
        .with_background(parse_hex_color(background)?)
        .with_png_optimization(optimize_png);
    let processor = BatchProcessor::new(options)?;

    let progress = ProgressBarSink::new(request.files().len());
    let report = processor.run_batch(&request, &progress)?;
    progress.finish(format!(
        "Converted {} of {} images ({} written)",
        report.succeeded,
        report.total,
        format_file_size(report.bytes_written())
    ));

    println!(
        "Batch complete in {:.2?}: {} succeeded, {} failed. Output: {}",
        report.elapsed,
        report.succeeded,
        report.failed,
        request.output_dir().display()
    );
    for (source, reason) in report.failures() {
        println!("  {}: {}", source.display(), reason);
    }

    if report.failed > 0 && report.succeeded == 0 {
        bail!("No images were converted");
    }

    Ok(())
}

fn process_preview(input: PathBuf, output: PathBuf, max_side: u32) -> anyhow::Result<()> {
    let (width, height) = Previewer::new()
        .with_max_side(max_side)
        .save_thumbnail(&input, &output)
        .with_context(|| format!("Failed to preview {}", input.display()))?;

    println!(
        "Preview ({}x{}) saved to: {}",
        width,
        height,
        output.display()
    );

    Ok(())
}
