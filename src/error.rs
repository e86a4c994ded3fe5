//! Error types for the conversion pipeline.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Every failure the pipeline can produce.
///
/// None of these are recovered from inside the library. They propagate to the caller, which
/// for the `simvtk` binary means the process exits with a non-zero status.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The dataset root, its metadata or the requested split could not be opened.
    #[error("failed to open dataset at {path:?}: {reason}")]
    DatasetOpen { path: PathBuf, reason: String },

    /// A field is missing from a sample, or has a shape or element type the writer can not use.
    #[error("{}", format_field_access(.field, .instance, .reason))]
    FieldAccess {
        field: String,
        instance: Option<usize>,
        reason: String,
    },

    /// Creating a directory or reading/writing a file failed.
    #[error("filesystem error at {path:?}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A mesh could not be turned into (or recovered from) a VTK file.
    #[error("failed to serialize mesh to {path:?}: {reason}")]
    Serialization { path: PathBuf, reason: String },
}

fn format_field_access(field: &str, instance: &Option<usize>, reason: &str) -> String {
    match instance {
        Some(n) => format!("field `{field}` of instance {n}: {reason}"),
        None => format!("field `{field}`: {reason}"),
    }
}

impl ConversionError {
    pub(crate) fn field_access(field: impl Into<String>, instance: Option<usize>, reason: impl Into<String>) -> Self {
        Self::FieldAccess {
            field: field.into(),
            instance,
            reason: reason.into(),
        }
    }

    pub(crate) fn dataset_open(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::DatasetOpen {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn serialization(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Serialization {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConversionError>;
