use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Split converted when none is given.
pub const DEFAULT_SPLIT: &str = "train";

/// Name of the output directory created below the dataset root when no output directory is given.
pub const DEFAULT_OUTPUT_DIR_NAME: &str = "vtk_files";

/// Where to read a dataset from and where to write the resulting VTK files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionConfig {
    pub dataset_path: PathBuf,
    #[serde(default = "default_split")]
    pub split: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

fn default_split() -> String {
    DEFAULT_SPLIT.to_string()
}

impl ConversionConfig {
    pub fn new(dataset_path: impl Into<PathBuf>) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            split: default_split(),
            output_dir: None,
        }
    }

    pub fn with_split(self, split: impl Into<String>) -> Self {
        Self {
            split: split.into(),
            ..self
        }
    }

    pub fn with_output_dir(self, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: Some(output_dir.into()),
            ..self
        }
    }

    /// The directory the VTK files are written to.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.dataset_path.join(DEFAULT_OUTPUT_DIR_NAME))
    }
}
