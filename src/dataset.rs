//! Loading of simulation datasets stored as npz archives.
//!
//! A dataset root contains a `meta.json` describing the fields of every sample, and one
//! directory per split holding one `.npz` archive per trajectory:
//!
//! ```text
//! <root>/meta.json
//! <root>/train/trajectory_000.npz
//! <root>/train/trajectory_001.npz
//! <root>/valid/...
//! ```
//!
//! Samples are produced in the lexicographic order of the archive file names.
use crate::error::{ConversionError, Result};
use crate::field::FieldArray;
use log::debug;
use ndarray::{IxDyn, OwnedRepr};
use ndarray_npy::{NpzReader, ReadNpzError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

/// Name of the metadata file at the root of every dataset.
pub const META_FILE_NAME: &str = "meta.json";

/// Element type of a stored field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    Float32,
    Float64,
    Int32,
    Int64,
    Uint8,
}

impl Dtype {
    /// Element types tried, in order, for fields whose type is not declared.
    pub const ALL: [Dtype; 5] = [Dtype::Float32, Dtype::Float64, Dtype::Int32, Dtype::Int64, Dtype::Uint8];
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<Dtype>,
}

/// Contents of `meta.json`.
///
/// Keys other than `field_names` and `features` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMeta {
    pub field_names: Vec<String>,
    #[serde(default)]
    pub features: BTreeMap<String, FeatureMeta>,
}

impl DatasetMeta {
    fn declared_dtype(&self, field: &str) -> Option<Dtype> {
        self.features.get(field).and_then(|feature| feature.dtype)
    }
}

/// A single trajectory: a mapping from field name to array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample {
    fields: BTreeMap<String, FieldArray>,
}

impl Sample {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, array: impl Into<FieldArray>) -> Self {
        self.insert(name, array);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, array: impl Into<FieldArray>) {
        self.fields.insert(name.into(), array.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldArray> {
        self.fields.get(name)
    }

    pub fn take(&mut self, name: &str) -> Option<FieldArray> {
        self.fields.remove(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Anything that declares a fixed field vocabulary and yields samples in a single pass.
pub trait SampleSource: IntoIterator<Item = Result<Sample>> {
    fn field_names(&self) -> &BTreeSet<String>;
}

/// Handle to one split of an on-disk dataset.
///
/// Iterating consumes the handle, so the samples can only be read once.
#[derive(Debug, Clone)]
pub struct Dataset {
    root: PathBuf,
    split: String,
    meta: DatasetMeta,
    field_names: BTreeSet<String>,
    sample_paths: Vec<PathBuf>,
}

impl Dataset {
    /// Opens the given split of the dataset rooted at `path`.
    ///
    /// Fails with [`ConversionError::DatasetOpen`] if the root is not a directory, `meta.json`
    /// is missing or malformed, or the split directory can not be listed. Archives are not
    /// opened until iteration.
    pub fn open(path: impl AsRef<Path>, split: &str) -> Result<Self> {
        let root = path.as_ref();
        if !root.is_dir() {
            return Err(ConversionError::dataset_open(root, "dataset root is not a directory"));
        }
        if split.is_empty() {
            return Err(ConversionError::dataset_open(root, "split name must not be empty"));
        }

        let meta_path = root.join(META_FILE_NAME);
        let meta_file = File::open(&meta_path)
            .map_err(|err| ConversionError::dataset_open(&meta_path, format!("failed to open metadata: {err}")))?;
        let meta: DatasetMeta = serde_json::from_reader(BufReader::new(meta_file))
            .map_err(|err| ConversionError::dataset_open(&meta_path, format!("invalid metadata: {err}")))?;

        let split_dir = root.join(split);
        let entries = fs::read_dir(&split_dir)
            .map_err(|err| ConversionError::dataset_open(&split_dir, format!("failed to list split `{split}`: {err}")))?;

        let mut sample_paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|err| ConversionError::dataset_open(&split_dir, format!("failed to list split `{split}`: {err}")))?
                .path();
            if path.is_file() && path.extension().map_or(false, |ext| ext == "npz") {
                sample_paths.push(path);
            }
        }
        sample_paths.sort();

        debug!(
            "Opened split `{}` of {:?}: {} samples, fields {:?}",
            split,
            root,
            sample_paths.len(),
            meta.field_names
        );

        Ok(Self {
            root: root.to_path_buf(),
            split: split.to_string(),
            field_names: meta.field_names.iter().cloned().collect(),
            meta,
            sample_paths,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn split(&self) -> &str {
        &self.split
    }

    pub fn meta(&self) -> &DatasetMeta {
        &self.meta
    }

    pub fn field_names(&self) -> &BTreeSet<String> {
        &self.field_names
    }

    /// Number of samples in the split.
    pub fn len(&self) -> usize {
        self.sample_paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sample_paths.is_empty()
    }
}

impl SampleSource for Dataset {
    fn field_names(&self) -> &BTreeSet<String> {
        &self.field_names
    }
}

impl IntoIterator for Dataset {
    type Item = Result<Sample>;
    type IntoIter = Samples;

    fn into_iter(self) -> Self::IntoIter {
        Samples {
            paths: self.sample_paths.into_iter(),
            index: 0,
            field_names: self.field_names,
            meta: self.meta,
        }
    }
}

/// Iterator over the samples of a [`Dataset`].
#[derive(Debug)]
pub struct Samples {
    paths: std::vec::IntoIter<PathBuf>,
    index: usize,
    field_names: BTreeSet<String>,
    meta: DatasetMeta,
}

impl Iterator for Samples {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.next()?;
        let index = self.index;
        self.index += 1;
        Some(load_sample(&path, index, &self.field_names, &self.meta))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.paths.size_hint()
    }
}

impl ExactSizeIterator for Samples {}

fn load_sample(path: &Path, index: usize, field_names: &BTreeSet<String>, meta: &DatasetMeta) -> Result<Sample> {
    debug!("Reading sample {} from {:?}", index, path);
    let file = File::open(path).map_err(|err| ConversionError::filesystem(path, err))?;
    let mut npz = NpzReader::new(file)
        .map_err(|err| ConversionError::dataset_open(path, format!("failed to open archive: {err}")))?;
    let entries = npz
        .names()
        .map_err(|err| ConversionError::dataset_open(path, format!("failed to list archive: {err}")))?;

    let mut sample = Sample::new();
    for field in field_names {
        // Fields absent from the archive are left out; the caller decides whether that is fatal
        let Some(entry) = find_entry(&entries, field) else {
            continue;
        };
        let array = read_field(&mut npz, entry, meta.declared_dtype(field))
            .map_err(|err| ConversionError::field_access(field.as_str(), Some(index), err.to_string()))?;
        sample.insert(field.as_str(), array);
    }
    Ok(sample)
}

/// Arrays are stored as `<field>.npy` by numpy, but a bare `<field>` is accepted too.
fn find_entry<'a>(entries: &'a [String], field: &str) -> Option<&'a str> {
    entries
        .iter()
        .find(|entry| entry.strip_suffix(".npy") == Some(field))
        .or_else(|| entries.iter().find(|entry| entry.as_str() == field))
        .map(String::as_str)
}

fn read_field<R: Read + Seek>(
    npz: &mut NpzReader<R>,
    entry: &str,
    dtype: Option<Dtype>,
) -> std::result::Result<FieldArray, ReadNpzError> {
    if let Some(dtype) = dtype {
        return read_as(npz, entry, dtype);
    }

    let mut result = read_as(npz, entry, Dtype::ALL[0]);
    for &dtype in &Dtype::ALL[1..] {
        if result.is_ok() {
            break;
        }
        result = read_as(npz, entry, dtype);
    }
    result
}

fn read_as<R: Read + Seek>(
    npz: &mut NpzReader<R>,
    entry: &str,
    dtype: Dtype,
) -> std::result::Result<FieldArray, ReadNpzError> {
    let array = match dtype {
        Dtype::Float32 => FieldArray::from(npz.by_name::<OwnedRepr<f32>, IxDyn>(entry)?),
        Dtype::Float64 => FieldArray::from(npz.by_name::<OwnedRepr<f64>, IxDyn>(entry)?),
        Dtype::Int32 => FieldArray::from(npz.by_name::<OwnedRepr<i32>, IxDyn>(entry)?),
        Dtype::Int64 => FieldArray::from(npz.by_name::<OwnedRepr<i64>, IxDyn>(entry)?),
        Dtype::Uint8 => FieldArray::from(npz.by_name::<OwnedRepr<u8>, IxDyn>(entry)?),
    };
    Ok(array)
}
