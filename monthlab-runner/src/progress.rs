//! Progress reporting for pipeline runs.

use crate::pipeline::SeriesError;

/// Callback trait for pipeline progress. Called from rayon workers.
pub trait PipelineProgress: Send + Sync {
    /// Called when a series starts harmonizing.
    fn on_start(&self, series: &str, index: usize, total: usize);

    /// Called when a series has been harmonized and written, or has failed.
    fn on_complete(&self, series: &str, index: usize, total: usize, result: Result<(), &SeriesError>);

    /// Called once after the merge and the run report.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl PipelineProgress for StdoutProgress {
    fn on_start(&self, series: &str, index: usize, total: usize) {
        println!("[{}/{}] Harmonizing {series}...", index + 1, total);
    }

    fn on_complete(&self, series: &str, _index: usize, _total: usize, result: Result<(), &SeriesError>) {
        match result {
            Ok(()) => println!("  OK: {series}"),
            Err(e) => println!("  FAIL: {series}: {e}"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        println!("\nHarmonization complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}

/// Reports nothing.
pub struct NoProgress;

impl PipelineProgress for NoProgress {
    fn on_start(&self, _series: &str, _index: usize, _total: usize) {}

    fn on_complete(&self, _series: &str, _index: usize, _total: usize, _result: Result<(), &SeriesError>) {}

    fn on_batch_complete(&self, _succeeded: usize, _failed: usize, _total: usize) {}
}
