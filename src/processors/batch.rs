// pixbatch/src/processors/batch.rs
use crate::core::{
    BatchOptions, BatchReport, ConversionJob, ConversionOutcome, ConversionRequest,
    FailureReason, ImageToolError, Result, ValidationError,
};
use rayon::prelude::*;
use std::fs::{self, OpenOptions};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Receives `(completed, total)` after every file. May be called from worker threads.
///
/// A panic inside `on_progress` is logged and swallowed; it never fails a file
/// or the batch.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, completed: usize, total: usize);
}

impl<F> ProgressSink for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn on_progress(&self, completed: usize, total: usize) {
        self(completed, total)
    }
}

/// Stops a running batch before its next file starts. Files already converting finish.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct BatchProcessor {
    options: BatchOptions,
    thread_pool: Option<rayon::ThreadPool>,
    cancellation: CancellationToken,
}

impl BatchProcessor {
    pub fn new(options: BatchOptions) -> Result<Self> {
        let mut processor = Self {
            options,
            thread_pool: None,
            cancellation: CancellationToken::new(),
        };

        if processor.options.threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(processor.options.threads)
                .build()
                .map_err(|e| {
                    ImageToolError::ProcessingError(format!("Failed to create thread pool: {}", e))
                })?;
            processor.thread_pool = Some(pool);
        }

        Ok(processor)
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Converts every file in `request` and reports one outcome per file, in input order.
    ///
    /// Only request validation can fail the call; per-file problems are
    /// recorded in the report and the remaining files are still processed.
    pub fn run_batch(
        &self,
        request: &ConversionRequest,
        progress: &dyn ProgressSink,
    ) -> std::result::Result<BatchReport, ValidationError> {
        request.validate()?;
        self.validate_output_dir(request.output_dir())?;

        let files = request.files();
        let total = files.len();
        log::info!(
            "Converting {} images to {} in {}",
            total,
            request.format(),
            request.output_dir().display()
        );

        let started = Instant::now();
        let job = ConversionJob::new(request, &self.options);
        let completed = Mutex::new(0usize);

        let convert = |source: &PathBuf| -> ConversionOutcome {
            let outcome = if self.cancellation.is_cancelled() {
                log::debug!("Skipping {} after cancellation", source.display());
                ConversionOutcome::failed(source, FailureReason::Cancelled)
            } else {
                job.run(source)
            };

            // Held across the callback so events arrive in counter order.
            let mut done = completed.lock().unwrap_or_else(PoisonError::into_inner);
            *done += 1;
            let notified =
                panic::catch_unwind(AssertUnwindSafe(|| progress.on_progress(*done, total)));
            if notified.is_err() {
                log::warn!("Progress callback panicked at {}/{}", *done, total);
            }

            outcome
        };

        // Indexed collect writes each outcome into its input slot.
        let outcomes: Vec<ConversionOutcome> = match &self.thread_pool {
            Some(pool) => pool.install(|| files.par_iter().map(&convert).collect::<Vec<_>>()),
            None => files.par_iter().map(&convert).collect::<Vec<_>>(),
        };

        let report = BatchReport::from_outcomes(outcomes, started.elapsed());
        if self.cancellation.is_cancelled() {
            log::warn!("Batch cancelled, {} files skipped", cancelled_count(&report));
        }
        log::info!(
            "Batch finished in {:.2?}: {} succeeded, {} failed",
            report.elapsed,
            report.succeeded,
            report.failed
        );

        Ok(report)
    }

    /// Creates the directory if needed and proves a file can be written into it.
    pub fn validate_output_dir(&self, output_dir: &Path) -> std::result::Result<(), ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidOutputDirectory {
            path: output_dir.to_path_buf(),
            reason,
        };

        if output_dir.as_os_str().is_empty() {
            return Err(invalid("path is empty".to_string()));
        }

        if output_dir.exists() && !output_dir.is_dir() {
            return Err(invalid("path exists but is not a directory".to_string()));
        }

        fs::create_dir_all(output_dir).map_err(|e| invalid(format!("cannot create: {}", e)))?;

        let marker = output_dir.join(format!(".pixbatch-write-check-{}", std::process::id()));
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&marker)
            .map_err(|e| invalid(format!("not writable: {}", e)))?;
        if let Err(e) = fs::remove_file(&marker) {
            log::warn!("Could not remove {}: {}", marker.display(), e);
        }

        Ok(())
    }
}

fn cancelled_count(report: &BatchReport) -> usize {
    report
        .failures()
        .filter(|(_, reason)| matches!(reason, FailureReason::Cancelled))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OutputFormat;
    use image::RgbImage;

    fn noop(_: usize, _: usize) {}

    #[test]
    fn test_output_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a").join("b");
        let processor = BatchProcessor::new(BatchOptions::default()).unwrap();

        processor.validate_output_dir(&target).unwrap();

        assert!(target.is_dir());
        assert_eq!(fs::read_dir(&target).unwrap().count(), 0);
    }

    #[test]
    fn test_output_dir_rejects_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("taken");
        fs::write(&file, b"x").unwrap();
        let processor = BatchProcessor::new(BatchOptions::default()).unwrap();

        assert!(matches!(
            processor.validate_output_dir(&file),
            Err(ValidationError::InvalidOutputDirectory { .. })
        ));
    }

    #[test]
    fn test_sequential_pool_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<PathBuf> = (0..5)
            .map(|i| {
                let path = dir.path().join(format!("img{}.png", i));
                RgbImage::new(3 + i, 2).save(&path).unwrap();
                path
            })
            .collect();
        let request = ConversionRequest::new(files.clone(), dir.path().join("out"), OutputFormat::WebP);
        let processor = BatchProcessor::new(BatchOptions::default().with_threads(1)).unwrap();

        let report = processor.run_batch(&request, &noop).unwrap();

        let sources: Vec<PathBuf> = report.outcomes.iter().map(|o| o.source.clone()).collect();
        assert_eq!(sources, files);
        assert_eq!(report.succeeded, 5);
    }

    #[test]
    fn test_panicking_progress_sink_does_not_abort_batch() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<PathBuf> = (0..4)
            .map(|i| {
                let path = dir.path().join(format!("pic{}.png", i));
                RgbImage::new(4, 4 + i).save(&path).unwrap();
                path
            })
            .collect();
        let out = dir.path().join("out");
        let request = ConversionRequest::new(files, &out, OutputFormat::Png);
        let calls = Mutex::new(Vec::new());
        let sink = |completed: usize, total: usize| {
            calls.lock().unwrap().push((completed, total));
            if completed == 2 {
                panic!("progress widget went away");
            }
        };
        let processor = BatchProcessor::new(BatchOptions::default().with_threads(2)).unwrap();

        let report = processor.run_batch(&request, &sink).unwrap();

        assert_eq!(report.total, 4);
        assert_eq!(report.succeeded, 4);
        assert_eq!(calls.into_inner().unwrap(), vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
        // only the converted files remain, the write check leaves nothing behind
        assert_eq!(fs::read_dir(&out).unwrap().count(), 4);
    }

    #[test]
    fn test_cancellation_token_is_shared() {
        let processor = BatchProcessor::new(BatchOptions::default()).unwrap();
        let token = processor.cancellation_token();

        token.cancel();

        assert!(processor.cancellation.is_cancelled());
    }
}
