//! Tetrahedral meshes with per-vertex scalar attributes.
use crate::connectivity::{Connectivity, Tet4Connectivity};
use nalgebra::Point3;

/// A named scalar attribute with one value per mesh vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct PointScalars {
    pub name: String,
    pub values: Vec<f32>,
}

/// Index-based volumetric mesh in 3D with scalar point attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh<Connectivity> {
    vertices: Vec<Point3<f64>>,
    connectivity: Vec<Connectivity>,
    point_scalars: Vec<PointScalars>,
}

pub type Tet4Mesh = Mesh<Tet4Connectivity>;

impl<C> Mesh<C> {
    /// Construct a mesh from vertices and connectivity.
    ///
    /// Indices are not checked here. Use [`Mesh::find_invalid_cell`] before relying on them.
    pub fn from_vertices_and_connectivity(vertices: Vec<Point3<f64>>, connectivity: Vec<C>) -> Self {
        Self {
            vertices,
            connectivity,
            point_scalars: Vec::new(),
        }
    }

    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    pub fn connectivity(&self) -> &[C] {
        &self.connectivity
    }

    pub fn point_scalars(&self) -> &[PointScalars] {
        &self.point_scalars
    }

    /// Values of the point attribute with the given name.
    pub fn point_scalar(&self, name: &str) -> Option<&[f32]> {
        self.point_scalars
            .iter()
            .find(|scalars| scalars.name == name)
            .map(|scalars| scalars.values.as_slice())
    }

    /// Attaches a point attribute, replacing any existing attribute with the same name.
    ///
    /// The attribute is written in the order it was first added.
    pub fn with_point_scalars(mut self, name: impl Into<String>, values: Vec<f32>) -> Self {
        let name = name.into();
        match self.point_scalars.iter_mut().find(|scalars| scalars.name == name) {
            Some(existing) => existing.values = values,
            None => self.point_scalars.push(PointScalars { name, values }),
        }
        self
    }
}

impl<C: Connectivity> Mesh<C> {
    /// Index of the first cell that references a vertex out of bounds, if any.
    pub fn find_invalid_cell(&self) -> Option<usize> {
        let num_vertices = self.vertices.len();
        self.connectivity
            .iter()
            .position(|cell| cell.vertex_indices().iter().any(|&idx| idx >= num_vertices))
    }
}
