use crate::integration_tests::CountingObserver;
use proptest::collection::vec;
use proptest::prelude::*;
use simvtk::config::ConversionConfig;
use simvtk::connectivity::Tet4Connectivity;
use simvtk::io::vtk::load_vtk_tet_mesh;
use simvtk::pipeline::convert;
use simvtk::progress::NoProgress;
use simvtk::writer::{instance_dir, timestep_file_name, WriteSummary};
use simvtk::ConversionError;
use std::fs;
use util::{sorted_file_names, tetrahedral_strip, DatasetBuilder};

#[test]
fn converts_every_timestep_of_every_trajectory() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    DatasetBuilder::new(dir.path()).write_split(
        "train",
        &[
            tetrahedral_strip(3, 2),
            tetrahedral_strip(12, 1),
            tetrahedral_strip(0, 1),
        ],
    )?;

    let config = ConversionConfig::new(dir.path());
    let mut observer = CountingObserver::default();
    let summary = convert(&config, &mut observer)?;
    assert_eq!(summary, WriteSummary { instances: 3, files: 15 });

    let output_dir = dir.path().join("vtk_files");
    assert_eq!(config.output_dir(), output_dir);
    assert_eq!(
        sorted_file_names(&output_dir)?,
        ["instance_0", "instance_1", "instance_2"]
    );
    assert_eq!(
        sorted_file_names(instance_dir(&output_dir, 0))?,
        ["data_t0.vtk", "data_t1.vtk", "data_t2.vtk"]
    );
    assert_eq!(sorted_file_names(instance_dir(&output_dir, 1))?.len(), 12);
    assert!(sorted_file_names(instance_dir(&output_dir, 2))?.is_empty());

    assert_eq!(observer.loading_started, 1);
    assert_eq!(observer.samples_processed, 0);
    assert_eq!(observer.processing_finished, Some(3));
    assert_eq!(observer.instances_started, 3);
    assert_eq!(observer.timesteps_saved, 1);
    assert_eq!(observer.writing_finished, 1);
    Ok(())
}

#[test]
fn written_meshes_carry_positions_stress_and_node_type() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    DatasetBuilder::new(dir.path()).write_split("train", &[tetrahedral_strip(12, 2)])?;
    convert(&ConversionConfig::new(dir.path()), &mut NoProgress)?;

    let t = 11;
    let path = instance_dir(dir.path().join("vtk_files"), 0).join(timestep_file_name(t));
    let mesh = load_vtk_tet_mesh(path)?;

    assert_eq!(
        mesh.connectivity(),
        [Tet4Connectivity([0, 1, 2, 3]), Tet4Connectivity([1, 2, 3, 4])]
    );
    assert_eq!(mesh.vertices().len(), 5);
    let scale = 1.0 + 0.1 * t as f32;
    for (k, vertex) in mesh.vertices().iter().enumerate() {
        let expected = [k as f32, (k % 2) as f32, (k % 3) as f32].map(|x| f64::from(x * scale));
        for (actual, expected) in vertex.coords.iter().zip(expected) {
            assert!((actual - expected).abs() < 1e-6, "node {k}: {actual} != {expected}");
        }
    }

    let stress: Vec<f32> = (0..5).map(|k| k as f32 + 0.5 * t as f32).collect();
    let node_type: Vec<f32> = (0..5).map(|k| (k % 3) as f32).collect();
    assert_eq!(mesh.point_scalar("stress"), Some(stress.as_slice()));
    assert_eq!(mesh.point_scalar("node_type"), Some(node_type.as_slice()));
    Ok(())
}

#[test]
fn split_and_output_dir_can_be_configured() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let out = tempfile::tempdir()?;
    let builder = DatasetBuilder::new(dir.path());
    builder.write_split("train", &[tetrahedral_strip(1, 1)])?;
    builder.write_split("valid", &[tetrahedral_strip(2, 1), tetrahedral_strip(2, 1)])?;

    let config = ConversionConfig::new(dir.path())
        .with_split("valid")
        .with_output_dir(out.path().join("plates"));
    let summary = convert(&config, &mut NoProgress)?;

    assert_eq!(summary, WriteSummary { instances: 2, files: 4 });
    assert_eq!(sorted_file_names(out.path().join("plates"))?, ["instance_0", "instance_1"]);
    assert!(!dir.path().join("vtk_files").exists());
    Ok(())
}

#[test]
fn sample_missing_cells_fails_before_anything_is_written() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    DatasetBuilder::new(dir.path()).write_split(
        "train",
        &[
            tetrahedral_strip(2, 1),
            tetrahedral_strip(2, 1).without_field("cells"),
        ],
    )?;

    let mut observer = CountingObserver::default();
    match convert(&ConversionConfig::new(dir.path()), &mut observer) {
        Err(ConversionError::FieldAccess { field, instance, .. }) => {
            assert_eq!(field, "cells");
            assert_eq!(instance, Some(1));
        }
        other => panic!("expected FieldAccess error, got {other:?}"),
    }
    assert!(!dir.path().join("vtk_files").exists());
    assert_eq!(observer.processing_finished, None);
    assert_eq!(observer.writing_finished, 0);
    Ok(())
}

#[test]
fn missing_dataset_is_reported() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = ConversionConfig::new(dir.path().join("missing"));
    assert!(matches!(
        convert(&config, &mut NoProgress),
        Err(ConversionError::DatasetOpen { .. })
    ));
    assert!(!config.output_dir().exists());
    Ok(())
}

#[test]
fn converting_twice_gives_identical_output() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    DatasetBuilder::new(dir.path()).write_split("train", &[tetrahedral_strip(2, 3)])?;
    let config = ConversionConfig::new(dir.path());
    let path = instance_dir(config.output_dir(), 0).join(timestep_file_name(1));

    convert(&config, &mut NoProgress)?;
    let first = fs::read(&path)?;
    let summary = convert(&config, &mut NoProgress)?;
    assert_eq!(summary, WriteSummary { instances: 1, files: 2 });
    assert_eq!(fs::read(&path)?, first);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn one_file_per_instance_and_timestep(shapes in vec((0usize..4, 1usize..3), 0..4)) {
        let dir = tempfile::tempdir().unwrap();
        let trajectories: Vec<_> = shapes
            .iter()
            .map(|&(num_timesteps, num_cells)| tetrahedral_strip(num_timesteps, num_cells))
            .collect();
        DatasetBuilder::new(dir.path()).write_split("train", &trajectories).unwrap();

        let config = ConversionConfig::new(dir.path());
        let summary = convert(&config, &mut NoProgress).unwrap();
        let expected_files: usize = shapes.iter().map(|&(num_timesteps, _)| num_timesteps).sum();
        prop_assert_eq!(summary, WriteSummary { instances: shapes.len(), files: expected_files });

        for (n, &(num_timesteps, _)) in shapes.iter().enumerate() {
            let names = sorted_file_names(instance_dir(config.output_dir(), n)).unwrap();
            prop_assert_eq!(names.len(), num_timesteps);
        }
    }
}
