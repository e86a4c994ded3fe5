//! Progress reporting for the conversion pipeline.
use log::info;
use std::path::Path;

/// Number of samples or timesteps between two progress checkpoints.
pub const PROGRESS_INTERVAL: usize = 10;

/// Returns `true` if `count` completed items warrant a checkpoint.
pub(crate) fn is_checkpoint(count: usize) -> bool {
    count > 0 && count % PROGRESS_INTERVAL == 0
}

/// Receives notifications at fixed checkpoints of the pipeline.
///
/// All methods default to doing nothing, so implementors only override the checkpoints they
/// care about.
pub trait ProgressObserver {
    /// The dataset is about to be opened.
    fn loading_started(&mut self, _dataset_path: &Path, _split: &str) {}

    /// `count` samples have been materialized. Called for every multiple of
    /// [`PROGRESS_INTERVAL`].
    fn samples_processed(&mut self, _count: usize) {}

    /// All `total` samples have been materialized.
    fn processing_finished(&mut self, _total: usize) {}

    /// Writing of instance `instance` (zero-based) out of `total` is starting.
    fn instance_started(&mut self, _instance: usize, _total: usize) {}

    /// `count` out of `total` timesteps of `instance` have been saved. Called for every multiple
    /// of [`PROGRESS_INTERVAL`].
    fn timesteps_saved(&mut self, _instance: usize, _count: usize, _total: usize) {}

    /// Every instance has been written below `output_root`.
    fn writing_finished(&mut self, _output_root: &Path) {}
}

/// Observer that ignores every checkpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

/// Observer that reports every checkpoint through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn loading_started(&mut self, dataset_path: &Path, split: &str) {
        info!("Loading split `{}` of dataset {}", split, dataset_path.display());
    }

    fn samples_processed(&mut self, count: usize) {
        info!("Processed {} samples", count);
    }

    fn processing_finished(&mut self, total: usize) {
        info!("Finished processing {} samples", total);
    }

    fn instance_started(&mut self, instance: usize, total: usize) {
        info!("Processing instance {}/{}", instance + 1, total);
    }

    fn timesteps_saved(&mut self, instance: usize, count: usize, total: usize) {
        info!("Instance {}: saved {}/{} timesteps", instance + 1, count, total);
    }

    fn writing_finished(&mut self, output_root: &Path) {
        info!("All VTK files have been written to {}", output_root.display());
    }
}
