//! Writing of processed datasets as one VTK file per instance and timestep.
//!
//! The output is laid out as
//!
//! ```text
//! <output_root>/instance_0/data_t0.vtk
//! <output_root>/instance_0/data_t1.vtk
//! <output_root>/instance_1/...
//! ```
//!
//! Connectivity is always taken from the first time slice of `cells`, since the topology of an
//! instance does not change over time.
use crate::connectivity::Tet4Connectivity;
use crate::error::{ConversionError, Result};
use crate::field::FieldArray;
use crate::io::vtk::MeshDataSetBuilder;
use crate::materialize::{ProcessedData, CELLS, NODE_TYPE, STRESS, WORLD_POS};
use crate::mesh::{Mesh, Tet4Mesh};
use crate::progress::{is_checkpoint, ProgressObserver};
use itertools::izip;
use log::debug;
use nalgebra::Point3;
use ndarray::{Array2, Axis};
use std::fs;
use std::path::{Path, PathBuf};

/// Counts of what [`write`] produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub instances: usize,
    pub files: usize,
}

/// Directory holding the files of instance `instance` below `output_root`.
pub fn instance_dir(output_root: impl AsRef<Path>, instance: usize) -> PathBuf {
    output_root.as_ref().join(format!("instance_{instance}"))
}

/// File name of the mesh for timestep `t`.
pub fn timestep_file_name(t: usize) -> String {
    format!("data_t{t}.vtk")
}

/// Writes every timestep of every instance in `processed` below `output_root`.
///
/// The number of instances is the length of the `world_pos` sequence, which must be present.
/// Each instance is validated before its directory is created. Any error aborts the whole run;
/// files written up to that point are left in place.
pub fn write<O>(processed: &ProcessedData, output_root: impl AsRef<Path>, observer: &mut O) -> Result<WriteSummary>
where
    O: ProgressObserver,
{
    let output_root = output_root.as_ref();
    let num_instances = processed
        .field(WORLD_POS)
        .ok_or_else(|| ConversionError::field_access(WORLD_POS, None, "field is not present in the dataset"))?
        .len();
    let mut summary = WriteSummary::default();

    for n in 0..num_instances {
        observer.instance_started(n, num_instances);
        let instance = InstanceFields::gather(processed, n)?;

        let dir = instance_dir(output_root, n);
        fs::create_dir_all(&dir).map_err(|err| ConversionError::filesystem(&dir, err))?;

        let num_timesteps = instance.num_timesteps();
        debug!(
            "Instance {}: {} timesteps, {} cells",
            n,
            num_timesteps,
            instance.connectivity.len()
        );
        for t in 0..num_timesteps {
            let mesh = instance.mesh_at(t)?;
            MeshDataSetBuilder::from_mesh(&mesh).try_export(dir.join(timestep_file_name(t)))?;
            summary.files += 1;

            if is_checkpoint(t + 1) {
                observer.timesteps_saved(n, t + 1, num_timesteps);
            }
        }
        summary.instances += 1;
    }

    observer.writing_finished(output_root);
    Ok(summary)
}

/// Assembles the mesh of instance `instance` at timestep `t` without writing it.
pub fn build_output_mesh(processed: &ProcessedData, instance: usize, t: usize) -> Result<Tet4Mesh> {
    let fields = InstanceFields::gather(processed, instance)?;
    if t >= fields.num_timesteps() {
        return Err(ConversionError::field_access(
            WORLD_POS,
            Some(instance),
            format!("timestep {t} out of range ({} timesteps)", fields.num_timesteps()),
        ));
    }
    fields.mesh_at(t)
}

/// The fields of a single instance, with the connectivity already extracted and checked.
struct InstanceFields<'a> {
    instance: usize,
    world_pos: &'a FieldArray,
    stress: &'a FieldArray,
    node_type: &'a FieldArray,
    connectivity: Vec<Tet4Connectivity>,
}

impl<'a> InstanceFields<'a> {
    /// Looks up and validates everything that does not vary per timestep.
    fn gather(processed: &'a ProcessedData, instance: usize) -> Result<Self> {
        let world_pos = processed.instance_field(WORLD_POS, instance)?;
        let cells = processed.instance_field(CELLS, instance)?;
        let stress = processed.instance_field(STRESS, instance)?;
        let node_type = processed.instance_field(NODE_TYPE, instance)?;

        if world_pos.ndim() != 3 || world_pos.shape()[2] != 3 {
            return Err(ConversionError::field_access(
                WORLD_POS,
                Some(instance),
                format!("expected shape (time, nodes, 3), found {:?}", world_pos.shape()),
            ));
        }
        let num_timesteps = world_pos.num_frames();
        let num_nodes = world_pos.shape()[1];

        for (name, field) in [(STRESS, stress), (NODE_TYPE, node_type)] {
            if field.ndim() != 3 || field.num_frames() < num_timesteps {
                return Err(ConversionError::field_access(
                    name,
                    Some(instance),
                    format!(
                        "expected shape ({num_timesteps}, nodes, channels), found {:?}",
                        field.shape()
                    ),
                ));
            }
        }

        // Without timesteps nothing is written, so `cells` may be empty as well
        let connectivity = if num_timesteps > 0 {
            extract_connectivity(cells, num_nodes)
                .map_err(|reason| ConversionError::field_access(CELLS, Some(instance), reason))?
        } else {
            Vec::new()
        };

        Ok(Self {
            instance,
            world_pos,
            stress,
            node_type,
            connectivity,
        })
    }

    fn num_timesteps(&self) -> usize {
        self.world_pos.num_frames()
    }

    fn mesh_at(&self, t: usize) -> Result<Tet4Mesh> {
        let positions = self.frame(WORLD_POS, self.world_pos, t)?;
        if positions.ncols() != 3 {
            return Err(self.shape_error(WORLD_POS, t, "3 coordinates per node", &positions));
        }
        let num_nodes = positions.nrows();

        let stress = self.first_channel(STRESS, self.stress, t, num_nodes)?;
        let node_type = self.first_channel(NODE_TYPE, self.node_type, t, num_nodes)?;

        let vertices = positions
            .rows()
            .into_iter()
            .map(|row| Point3::new(row[0], row[1], row[2]))
            .collect();

        Ok(Mesh::from_vertices_and_connectivity(vertices, self.connectivity.clone())
            .with_point_scalars(STRESS, stress)
            .with_point_scalars(NODE_TYPE, node_type))
    }

    fn frame(&self, name: &str, field: &FieldArray, t: usize) -> Result<Array2<f64>> {
        field.frame_f64(t).ok_or_else(|| {
            ConversionError::field_access(
                name,
                Some(self.instance),
                format!("no timestep {t} in array of shape {:?}", field.shape()),
            )
        })
    }

    /// Channel 0 of the given field at timestep `t`, as `f32`.
    fn first_channel(&self, name: &str, field: &FieldArray, t: usize, num_nodes: usize) -> Result<Vec<f32>> {
        let frame = self.frame(name, field, t)?;
        if frame.nrows() != num_nodes || frame.ncols() == 0 {
            return Err(self.shape_error(name, t, &format!("{num_nodes} nodes with at least one channel"), &frame));
        }
        Ok(frame.column(0).iter().map(|&x| x as f32).collect())
    }

    fn shape_error(&self, name: &str, t: usize, expected: &str, frame: &Array2<f64>) -> ConversionError {
        ConversionError::field_access(
            name,
            Some(self.instance),
            format!("timestep {t}: expected {expected}, found shape {:?}", frame.shape()),
        )
    }
}

/// Reads the tetrahedra of the first time slice of `cells`, checking every index against
/// `num_nodes`.
fn extract_connectivity(cells: &FieldArray, num_nodes: usize) -> std::result::Result<Vec<Tet4Connectivity>, String> {
    if !cells.is_integer() {
        return Err(format!("expected integer connectivity, found {} data", cells.kind()));
    }
    let first = cells
        .frame_i64(0)
        .ok_or_else(|| format!("expected shape (time, cells, 4), found {:?}", cells.shape()))?;
    if first.ncols() != 4 {
        return Err(format!(
            "expected 4 node indices per cell, found {}",
            first.ncols()
        ));
    }

    let mut connectivity = Vec::with_capacity(first.nrows());
    for (cell_idx, row) in first.axis_iter(Axis(0)).enumerate() {
        let mut indices = [0usize; 4];
        for (index, &value) in izip!(&mut indices, row.iter()) {
            *index = usize::try_from(value)
                .ok()
                .filter(|&idx| idx < num_nodes)
                .ok_or_else(|| format!("cell {cell_idx} references node {value}, but there are {num_nodes} nodes"))?;
        }
        connectivity.push(Tet4Connectivity(indices));
    }
    Ok(connectivity)
}
