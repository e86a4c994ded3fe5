//! Fixtures shared by the integration tests: synthetic trajectories and on-disk datasets.
use ndarray::{ArrayD, IxDyn};
use ndarray_npy::{NpzWriter, WriteNpzError};
use serde_json::json;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// An array as it is stored in a dataset archive.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredArray {
    F32(ArrayD<f32>),
    I32(ArrayD<i32>),
}

impl StoredArray {
    pub fn f32(shape: &[usize], data: Vec<f32>) -> Self {
        Self::F32(ArrayD::from_shape_vec(IxDyn(shape), data).expect("shape must match data length"))
    }

    pub fn i32(shape: &[usize], data: Vec<i32>) -> Self {
        Self::I32(ArrayD::from_shape_vec(IxDyn(shape), data).expect("shape must match data length"))
    }

    pub fn dtype(&self) -> &'static str {
        match self {
            Self::F32(_) => "float32",
            Self::I32(_) => "int32",
        }
    }
}

/// The fields of one trajectory, in the order they are written to the archive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    pub fields: Vec<(String, StoredArray)>,
}

impl Trajectory {
    pub fn with_field(mut self, name: &str, array: StoredArray) -> Self {
        self.fields.retain(|(existing, _)| existing != name);
        self.fields.push((name.to_string(), array));
        self
    }

    pub fn without_field(mut self, name: &str) -> Self {
        self.fields.retain(|(existing, _)| existing != name);
        self
    }

    pub fn get(&self, name: &str) -> Option<&StoredArray> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, array)| array)
    }
}

/// A deforming strip of `num_cells` tetrahedra over `num_timesteps` timesteps.
///
/// Tetrahedron `i` connects nodes `i..i + 4`, so there are `num_cells + 3` nodes. Connectivity is
/// stored once (static), everything else per timestep. Values are chosen so that node `k` at
/// timestep `t` has stress `k + 0.5 t` and node type `k % 3`. A `mesh_pos` field is included
/// to check that fields unused by the writer are carried along harmlessly.
pub fn tetrahedral_strip(num_timesteps: usize, num_cells: usize) -> Trajectory {
    let num_nodes = num_cells + 3;

    let mut world_pos = Vec::with_capacity(num_timesteps * num_nodes * 3);
    let mut stress = Vec::with_capacity(num_timesteps * num_nodes);
    let mut node_type = Vec::with_capacity(num_timesteps * num_nodes);
    for t in 0..num_timesteps {
        let scale = 1.0 + 0.1 * t as f32;
        for k in 0..num_nodes {
            world_pos.extend_from_slice(&node_position(k).map(|x| x * scale));
            stress.push(k as f32 + 0.5 * t as f32);
            node_type.push((k % 3) as i32);
        }
    }

    let mesh_pos: Vec<f32> = (0..num_nodes).flat_map(node_position).collect();
    let cells: Vec<i32> = (0..num_cells)
        .flat_map(|i| (i..i + 4).map(|idx| idx as i32))
        .collect();

    Trajectory::default()
        .with_field("cells", StoredArray::i32(&[1, num_cells, 4], cells))
        .with_field("mesh_pos", StoredArray::f32(&[1, num_nodes, 3], mesh_pos))
        .with_field("node_type", StoredArray::i32(&[num_timesteps, num_nodes, 1], node_type))
        .with_field("stress", StoredArray::f32(&[num_timesteps, num_nodes, 1], stress))
        .with_field("world_pos", StoredArray::f32(&[num_timesteps, num_nodes, 3], world_pos))
}

fn node_position(k: usize) -> [f32; 3] {
    [k as f32, (k % 2) as f32, (k % 3) as f32]
}

/// The field names written to `meta.json` by default.
pub const DEFAULT_FIELD_NAMES: [&str; 5] = ["cells", "mesh_pos", "node_type", "stress", "world_pos"];

/// Writes datasets in the on-disk layout read by `simvtk`.
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    root: PathBuf,
    field_names: Vec<String>,
    declare_dtypes: bool,
}

impl DatasetBuilder {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            field_names: DEFAULT_FIELD_NAMES.iter().map(|s| s.to_string()).collect(),
            declare_dtypes: true,
        }
    }

    pub fn with_field_names(self, field_names: &[&str]) -> Self {
        Self {
            field_names: field_names.iter().map(|s| s.to_string()).collect(),
            ..self
        }
    }

    /// Whether `meta.json` declares the element type of each field (the default).
    pub fn declare_dtypes(self, declare_dtypes: bool) -> Self {
        Self { declare_dtypes, ..self }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `meta.json`, taking element types from `reference`.
    pub fn write_meta(&self, reference: &Trajectory) -> io::Result<()> {
        let mut features = serde_json::Map::new();
        for name in &self.field_names {
            let mut feature = json!({ "type": "dynamic" });
            if let (true, Some(array)) = (self.declare_dtypes, reference.get(name)) {
                feature["dtype"] = json!(array.dtype());
            }
            features.insert(name.clone(), feature);
        }
        let meta = json!({
            "simulator": "synthetic",
            "field_names": self.field_names,
            "features": features,
        });
        fs::create_dir_all(&self.root)?;
        fs::write(self.root.join("meta.json"), serde_json::to_vec_pretty(&meta)?)
    }

    /// Writes a whole split, naming archives so that they sort in the given order.
    pub fn write_split(&self, split: &str, trajectories: &[Trajectory]) -> io::Result<()> {
        if let Some(first) = trajectories.first() {
            self.write_meta(first)?;
        } else {
            self.write_meta(&Trajectory::default())?;
        }
        fs::create_dir_all(self.root.join(split))?;
        for (i, trajectory) in trajectories.iter().enumerate() {
            self.write_trajectory(split, &format!("trajectory_{i:05}.npz"), trajectory)?;
        }
        Ok(())
    }

    pub fn write_trajectory(&self, split: &str, file_name: &str, trajectory: &Trajectory) -> io::Result<()> {
        let split_dir = self.root.join(split);
        fs::create_dir_all(&split_dir)?;
        let mut npz = NpzWriter::new(File::create(split_dir.join(file_name))?);
        for (name, array) in &trajectory.fields {
            let added = match array {
                StoredArray::F32(array) => npz.add_array(name.as_str(), array),
                StoredArray::I32(array) => npz.add_array(name.as_str(), array),
            };
            added.map_err(npz_error)?;
        }
        npz.finish().map_err(npz_error)?;
        Ok(())
    }
}

fn npz_error(err: WriteNpzError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}

/// Lists the file names in `dir`, sorted.
pub fn sorted_file_names(dir: impl AsRef<Path>) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        names.push(entry?.file_name().to_string_lossy().to_string());
    }
    names.sort();
    Ok(names)
}
