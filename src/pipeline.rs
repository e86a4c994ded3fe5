use crate::config::ConversionConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::materialize::materialize;
use crate::progress::ProgressObserver;
use crate::writer::{write, WriteSummary};

/// Converts the configured dataset split into VTK files.
///
/// Runs the three stages in order: open the dataset, buffer all of its samples and write one
/// file per instance and timestep to [`ConversionConfig::output_dir`].
pub fn convert<O>(config: &ConversionConfig, observer: &mut O) -> Result<WriteSummary>
where
    O: ProgressObserver,
{
    observer.loading_started(&config.dataset_path, &config.split);
    let dataset = Dataset::open(&config.dataset_path, &config.split)?;
    let processed = materialize(dataset, observer)?;
    write(&processed, config.output_dir(), observer)
}
