//! Buffering of a whole dataset split into memory.
use crate::dataset::SampleSource;
use crate::error::{ConversionError, Result};
use crate::field::FieldArray;
use crate::progress::{is_checkpoint, ProgressObserver};
use std::collections::BTreeMap;

/// Name of the field holding per-timestep node positions.
pub const WORLD_POS: &str = "world_pos";
/// Name of the field holding tetrahedral connectivity.
pub const CELLS: &str = "cells";
/// Name of the field holding per-node stress.
pub const STRESS: &str = "stress";
/// Name of the field holding per-node type markers.
pub const NODE_TYPE: &str = "node_type";

/// Every field of every sample, indexed by field name and then by instance.
///
/// Built once by [`materialize`] and only read afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessedData {
    fields: BTreeMap<String, Vec<FieldArray>>,
}

impl ProcessedData {
    /// Builds processed data directly from per-field sequences of per-instance arrays.
    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<FieldArray>)>,
        S: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(name, arrays)| (name.into(), arrays))
                .collect(),
        }
    }

    /// The per-instance arrays of the given field, if the field exists.
    pub fn field(&self, name: &str) -> Option<&[FieldArray]> {
        self.fields.get(name).map(Vec::as_slice)
    }

    /// The array of `name` for instance `instance`, or a [`ConversionError::FieldAccess`].
    pub fn instance_field(&self, name: &str, instance: usize) -> Result<&FieldArray> {
        let arrays = self
            .field(name)
            .ok_or_else(|| ConversionError::field_access(name, Some(instance), "field is not present in the dataset"))?;
        arrays.get(instance).ok_or_else(|| {
            ConversionError::field_access(
                name,
                Some(instance),
                format!("field only has {} instances", arrays.len()),
            )
        })
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of instances, i.e. the length of the `world_pos` sequence.
    pub fn num_instances(&self) -> usize {
        self.field(WORLD_POS).map_or(0, <[FieldArray]>::len)
    }
}

/// Reads every sample of `source` into memory.
///
/// Every field in the source's vocabulary must be present in every sample. Samples are stored
/// in iteration order, so the sample index becomes the instance index. The first error aborts
/// materialization.
pub fn materialize<S, O>(source: S, observer: &mut O) -> Result<ProcessedData>
where
    S: SampleSource,
    O: ProgressObserver,
{
    let field_names = source.field_names().clone();
    let mut fields: BTreeMap<String, Vec<FieldArray>> = field_names
        .iter()
        .map(|name| (name.clone(), Vec::new()))
        .collect();

    let mut num_samples = 0;
    for (index, sample) in source.into_iter().enumerate() {
        let mut sample = sample?;
        for (name, arrays) in &mut fields {
            let array = sample
                .take(name)
                .ok_or_else(|| ConversionError::field_access(name.as_str(), Some(index), "sample is missing the field"))?;
            arrays.push(array);
        }

        num_samples = index + 1;
        if is_checkpoint(num_samples) {
            observer.samples_processed(num_samples);
        }
    }

    observer.processing_finished(num_samples);
    Ok(ProcessedData { fields })
}
