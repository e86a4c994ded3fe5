//! Command line interface of `simvtk`.

use clap::{value_parser, Parser};
use eyre::{eyre, Context};
use log::info;
use simvtk::config::ConversionConfig;
use simvtk::pipeline::convert;
use simvtk::progress::LogProgress;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Convert a mesh simulation dataset into one VTK file per instance and timestep
#[derive(Clone, Debug, Parser)]
#[command(version)]
struct Args {
    /// Root directory of the dataset, containing meta.json and one directory per split
    #[arg(value_parser = value_parser!(PathBuf), required_unless_present = "config")]
    dataset_path: Option<PathBuf>,
    /// Split of the dataset to convert (default: "train")
    #[arg(short, long)]
    split: Option<String>,
    /// Directory to write the VTK files to (default: "<DATASET_PATH>/vtk_files")
    #[arg(short, long, value_parser = value_parser!(PathBuf))]
    output_dir: Option<PathBuf>,
    /// JSON file with a conversion configuration, individual arguments take precedence over it
    #[arg(short, long, value_parser = value_parser!(PathBuf))]
    config: Option<PathBuf>,
}

fn load_config_file(path: &Path) -> eyre::Result<ConversionConfig> {
    let file = File::open(path).wrap_err_with(|| format!("failed to open configuration file {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .wrap_err_with(|| format!("failed to parse configuration file {}", path.display()))
}

fn build_config(args: Args) -> eyre::Result<ConversionConfig> {
    let mut config = match (&args.config, &args.dataset_path) {
        (Some(config_path), _) => load_config_file(config_path)?,
        (None, Some(dataset_path)) => ConversionConfig::new(dataset_path),
        (None, None) => return Err(eyre!("either a dataset path or a configuration file is required")),
    };

    if let Some(dataset_path) = args.dataset_path {
        config.dataset_path = dataset_path;
    }
    if let Some(split) = args.split {
        config.split = split;
    }
    if let Some(output_dir) = args.output_dir {
        config.output_dir = Some(output_dir);
    }
    Ok(config)
}

fn main() -> eyre::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = build_config(Args::parse())?;
    let summary = convert(&config, &mut LogProgress).wrap_err_with(|| {
        format!(
            "failed to convert split `{}` of dataset {}",
            config.split,
            config.dataset_path.display()
        )
    })?;

    info!(
        "Successfully wrote {} files for {} instances",
        summary.files, summary.instances
    );
    Ok(())
}
