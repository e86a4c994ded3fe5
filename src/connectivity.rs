//! Cell connectivity of volumetric meshes.
use serde::{Deserialize, Serialize};

pub trait Connectivity: Clone {
    fn vertex_indices(&self) -> &[usize];

    fn num_nodes(&self) -> usize {
        self.vertex_indices().len()
    }
}

/// Connectivity for a linear 4-node tetrahedron.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tet4Connectivity(pub [usize; 4]);

impl Connectivity for Tet4Connectivity {
    fn vertex_indices(&self) -> &[usize] {
        &self.0
    }
}
