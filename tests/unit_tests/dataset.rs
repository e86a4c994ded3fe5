use insta::assert_debug_snapshot;
use simvtk::dataset::{Dataset, META_FILE_NAME};
use simvtk::field::FieldArray;
use simvtk::ConversionError;
use std::fs;
use util::{tetrahedral_strip, DatasetBuilder, StoredArray, Trajectory};

#[test]
fn open_reads_vocabulary_and_sample_count() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let builder = DatasetBuilder::new(dir.path());
    builder.write_split("train", &[tetrahedral_strip(2, 1), tetrahedral_strip(3, 2)])?;

    let dataset = Dataset::open(dir.path(), "train")?;
    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.split(), "train");
    assert_eq!(dataset.root(), dir.path());
    assert_debug_snapshot!(dataset.field_names(), @r###"
    {
        "cells",
        "mesh_pos",
        "node_type",
        "stress",
        "world_pos",
    }
    "###);
    Ok(())
}

#[test]
fn samples_follow_archive_name_order() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let builder = DatasetBuilder::new(dir.path());
    builder.write_meta(&tetrahedral_strip(1, 1))?;
    builder.write_trajectory("train", "b.npz", &tetrahedral_strip(2, 1))?;
    builder.write_trajectory("train", "a.npz", &tetrahedral_strip(5, 1))?;
    builder.write_trajectory("train", "c.npz", &tetrahedral_strip(1, 1))?;
    fs::write(dir.path().join("train").join("README.txt"), "not an archive")?;

    let frames: Vec<usize> = Dataset::open(dir.path(), "train")?
        .into_iter()
        .map(|sample| sample.map(|s| s.get("world_pos").unwrap().num_frames()))
        .collect::<Result<_, _>>()?;
    assert_eq!(frames, [5, 2, 1]);
    Ok(())
}

#[test]
fn samples_contain_declared_fields_with_their_element_kind() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    DatasetBuilder::new(dir.path()).write_split("valid", &[tetrahedral_strip(3, 2)])?;

    let mut samples = Dataset::open(dir.path(), "valid")?.into_iter();
    let sample = samples.next().unwrap()?;
    assert!(samples.next().is_none());

    assert_eq!(sample.len(), 5);
    assert_eq!(sample.get("world_pos").unwrap().shape(), [3, 5, 3]);
    assert_eq!(sample.get("cells").unwrap().shape(), [1, 2, 4]);
    assert!(sample.get("cells").unwrap().is_integer());
    assert!(sample.get("node_type").unwrap().is_integer());
    assert!(!sample.get("stress").unwrap().is_integer());
    Ok(())
}

#[test]
fn element_types_are_detected_when_not_declared() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    DatasetBuilder::new(dir.path())
        .declare_dtypes(false)
        .write_split("train", &[tetrahedral_strip(2, 1)])?;

    let sample = Dataset::open(dir.path(), "train")?.into_iter().next().unwrap()?;
    let expected_cells = StoredArray::i32(&[1, 1, 4], vec![0, 1, 2, 3]);
    match (sample.get("cells"), expected_cells) {
        (Some(FieldArray::Int(cells)), StoredArray::I32(expected)) => {
            assert_eq!(cells, &expected.mapv(i64::from));
        }
        other => panic!("unexpected cells: {other:?}"),
    }
    assert!(matches!(sample.get("world_pos"), Some(FieldArray::Float(_))));
    Ok(())
}

#[test]
fn fields_outside_the_vocabulary_are_ignored_and_missing_fields_are_absent() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let builder = DatasetBuilder::new(dir.path()).with_field_names(&["cells", "world_pos"]);
    builder.write_split("train", &[tetrahedral_strip(2, 1).without_field("cells")])?;

    let sample = Dataset::open(dir.path(), "train")?.into_iter().next().unwrap()?;
    let names: Vec<_> = sample.field_names().collect();
    assert_eq!(names, ["world_pos"]);
    Ok(())
}

#[test]
fn empty_split_has_no_samples() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    DatasetBuilder::new(dir.path()).write_split("test", &[])?;

    let dataset = Dataset::open(dir.path(), "test")?;
    assert!(dataset.is_empty());
    assert_eq!(dataset.into_iter().count(), 0);
    Ok(())
}

fn assert_dataset_open_error<T: std::fmt::Debug>(result: Result<T, ConversionError>) {
    match result {
        Err(ConversionError::DatasetOpen { .. }) => {}
        other => panic!("expected DatasetOpen error, got {other:?}"),
    }
}

#[test]
fn open_fails_for_missing_root_meta_or_split() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    assert_dataset_open_error(Dataset::open(dir.path().join("does_not_exist"), "train"));

    // No meta.json yet
    fs::create_dir_all(dir.path().join("train"))?;
    assert_dataset_open_error(Dataset::open(dir.path(), "train"));

    fs::write(dir.path().join(META_FILE_NAME), "{ not json")?;
    assert_dataset_open_error(Dataset::open(dir.path(), "train"));

    fs::write(dir.path().join(META_FILE_NAME), r#"{"features": {}}"#)?;
    assert_dataset_open_error(Dataset::open(dir.path(), "train"));

    DatasetBuilder::new(dir.path()).write_meta(&Trajectory::default())?;
    assert!(Dataset::open(dir.path(), "train").is_ok());
    assert_dataset_open_error(Dataset::open(dir.path(), "valid"));
    assert_dataset_open_error(Dataset::open(dir.path(), ""));
    Ok(())
}

#[test]
fn corrupt_archive_is_reported_when_iterated() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let builder = DatasetBuilder::new(dir.path());
    builder.write_split("train", &[tetrahedral_strip(1, 1)])?;
    fs::write(dir.path().join("train").join("trajectory_00001.npz"), b"garbage")?;

    let dataset = Dataset::open(dir.path(), "train")?;
    assert_eq!(dataset.len(), 2);
    let mut results: Vec<_> = dataset.into_iter().collect();
    let corrupt = results.pop().unwrap();
    assert!(results[0].is_ok());
    assert_dataset_open_error(corrupt);
    Ok(())
}
