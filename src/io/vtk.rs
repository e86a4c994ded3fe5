use crate::connectivity::{Connectivity, Tet4Connectivity};
use crate::error::{ConversionError, Result};
use crate::mesh::{Mesh, Tet4Mesh};
use log::trace;
use nalgebra::Point3;
use std::convert::TryInto;
use std::path::Path;
use thiserror::Error;
use vtkio::model::{
    Attribute, Attributes, ByteOrder, CellType, Cells, DataArray, DataSet, ElementType, IOBuffer, Piece,
    UnstructuredGridPiece, Version, VertexNumbers, Vtk,
};

/// Represents connectivity that is supported by VTK.
pub trait VtkCellConnectivity: Connectivity {
    fn cell_type(&self) -> CellType;

    /// Write connectivity in VTK node order.
    ///
    /// Panics if `connectivity.len() != self.num_nodes()`.
    fn write_vtk_connectivity(&self, connectivity: &mut [usize]) {
        assert_eq!(connectivity.len(), self.num_nodes());
        connectivity.clone_from_slice(self.vertex_indices());
    }
}

impl VtkCellConnectivity for Tet4Connectivity {
    fn cell_type(&self) -> CellType {
        CellType::Tetra
    }
}

/// Reasons a mesh can not be turned into a VTK data set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshBuildError {
    #[error("cell {cell} references a vertex out of bounds (mesh has {num_vertices} vertices)")]
    InvalidCell { cell: usize, num_vertices: usize },
    #[error("{what} {value} does not fit in u32")]
    IndexOverflow { what: &'static str, value: usize },
    #[error("point attribute `{name}` has {len} values, but the mesh has {num_vertices} vertices")]
    AttributeLength { name: String, len: usize, num_vertices: usize },
}

fn to_u32(what: &'static str, value: usize) -> std::result::Result<u32, MeshBuildError> {
    value
        .try_into()
        .map_err(|_| MeshBuildError::IndexOverflow { what, value })
}

/// Builds a VTK unstructured grid from a [`Mesh`] and its point attributes.
pub struct MeshDataSetBuilder<'a, C> {
    mesh: &'a Mesh<C>,

    // Only used for exporting directly to file
    title: Option<String>,
}

impl<'a, C> MeshDataSetBuilder<'a, C> {
    pub fn from_mesh(mesh: &'a Mesh<C>) -> Self {
        Self { mesh, title: None }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            mesh: self.mesh,
            title: Some(title.into()),
        }
    }
}

impl<'a, C> MeshDataSetBuilder<'a, C>
where
    C: VtkCellConnectivity,
{
    /// Assembles the VTK data set.
    ///
    /// Fails if a cell references a vertex out of bounds, an index does not fit in `u32`
    /// or a point attribute does not have one value per vertex.
    pub fn try_build(&self) -> std::result::Result<DataSet, MeshBuildError> {
        let num_vertices = self.mesh.vertices().len();
        if let Some(cell) = self.mesh.find_invalid_cell() {
            return Err(MeshBuildError::InvalidCell { cell, num_vertices });
        }

        let points: Vec<f64> = self
            .mesh
            .vertices()
            .iter()
            .flat_map(|v| v.coords.iter().copied())
            .collect();

        // Vertices is laid out as follows: N, i_1, i_2, ... i_N,
        // so for tetrahedra this becomes 4 followed by the four node indices
        let mut vertices: Vec<u32> = Vec::new();
        let mut cell_types = Vec::new();
        let mut vertex_indices = Vec::new();
        for cell in self.mesh.connectivity() {
            vertices.push(to_u32("cell node count", cell.num_nodes())?);

            vertex_indices.clear();
            vertex_indices.resize(cell.num_nodes(), 0);
            cell.write_vtk_connectivity(&mut vertex_indices);

            for &idx in &vertex_indices {
                vertices.push(to_u32("vertex index", idx)?);
            }
            cell_types.push(cell.cell_type());
        }

        let mut point_attributes = Vec::with_capacity(self.mesh.point_scalars().len());
        for scalars in self.mesh.point_scalars() {
            if scalars.values.len() != num_vertices {
                return Err(MeshBuildError::AttributeLength {
                    name: scalars.name.clone(),
                    len: scalars.values.len(),
                    num_vertices,
                });
            }
            point_attributes.push(Attribute::scalars(scalars.name.clone(), 1).with_data(scalars.values.clone()));
        }

        let piece = UnstructuredGridPiece {
            points: points.into(),
            cells: Cells {
                cell_verts: VertexNumbers::Legacy {
                    num_cells: to_u32("number of cells", self.mesh.connectivity().len())?,
                    vertices,
                },
                types: cell_types,
            },
            data: Attributes {
                point: point_attributes,
                cell: Vec::new(),
            },
        };

        Ok(DataSet::UnstructuredGrid {
            meta: None,
            pieces: vec![Piece::Inline(Box::new(piece))],
        })
    }

    /// Convenience function for directly exporting the dataset to a legacy ASCII VTK file.
    ///
    /// The file is written in place; the parent directory must already exist.
    pub fn try_export(&self, filename: impl AsRef<Path>) -> Result<()> {
        let filepath = filename.as_ref();
        let fallback_title = filepath
            .file_stem()
            .map(|os_str| os_str.to_string_lossy().to_string())
            .unwrap_or_else(|| "untitled".to_string());
        let dataset = self
            .try_build()
            .map_err(|reason| ConversionError::serialization(filepath, reason))?;
        trace!("Exporting {} cells to {:?}", self.mesh.connectivity().len(), filepath);
        Vtk {
            version: Version { major: 4, minor: 1 },
            // If we don't have a title then just make the file stem the title
            title: self.title.clone().unwrap_or(fallback_title),
            byte_order: ByteOrder::BigEndian,
            data: dataset,
            file_path: None,
        }
        .export_ascii(filepath)
        .map_err(|err| match err {
            vtkio::Error::IO(source) => ConversionError::filesystem(filepath, source),
            other => ConversionError::serialization(filepath, other),
        })
    }
}

/// Loads a tetrahedral mesh and its scalar point attributes from a legacy VTK file.
///
/// Only unstructured grids made up exclusively of linear tetrahedra are supported. Scalar point
/// attributes are converted to `f32`; other attribute kinds are skipped.
pub fn load_vtk_tet_mesh(path: impl AsRef<Path>) -> Result<Tet4Mesh> {
    let path = path.as_ref();
    let vtk = Vtk::import(path).map_err(|err| match err {
        vtkio::Error::IO(source) => ConversionError::filesystem(path, source),
        other => ConversionError::serialization(path, other),
    })?;
    tet_mesh_from_dataset(vtk.data).map_err(|reason| ConversionError::serialization(path, reason))
}

fn tet_mesh_from_dataset(data: DataSet) -> std::result::Result<Tet4Mesh, String> {
    let piece = match data {
        DataSet::UnstructuredGrid { mut pieces, .. } if pieces.len() == 1 => match pieces.remove(0) {
            Piece::Inline(piece) => *piece,
            _ => return Err("unstructured grid piece is not stored inline".to_string()),
        },
        DataSet::UnstructuredGrid { pieces, .. } => {
            return Err(format!("expected a single unstructured grid piece, found {}", pieces.len()))
        }
        _ => return Err("data set is not an unstructured grid".to_string()),
    };

    let coords = buffer_to_f64(piece.points).ok_or_else(|| "unsupported point coordinate type".to_string())?;
    if coords.len() % 3 != 0 {
        return Err(format!("point buffer length {} is not a multiple of 3", coords.len()));
    }
    let vertices: Vec<_> = coords
        .chunks_exact(3)
        .map(|p| Point3::new(p[0], p[1], p[2]))
        .collect();

    if let Some(cell_type) = piece.cells.types.iter().find(|&&ty| ty != CellType::Tetra) {
        return Err(format!("unsupported cell type {cell_type:?}"));
    }
    let vertex_numbers = match piece.cells.cell_verts {
        VertexNumbers::Legacy { vertices, .. } => vertices,
        _ => return Err("expected legacy cell layout".to_string()),
    };
    let mut connectivity = Vec::with_capacity(piece.cells.types.len());
    for cell in vertex_numbers.chunks(5) {
        match cell {
            &[4, a, b, c, d] => connectivity.push(Tet4Connectivity([a, b, c, d].map(|idx| idx as usize))),
            _ => return Err(format!("malformed tetrahedron record {cell:?}")),
        }
    }

    let mut mesh = Mesh::from_vertices_and_connectivity(vertices, connectivity);
    for attribute in piece.data.point {
        if let Attribute::DataArray(DataArray {
            name,
            elem: ElementType::Scalars { num_comp: 1, .. },
            data,
        }) = attribute
        {
            let values = buffer_to_f32(data).ok_or_else(|| format!("unsupported element type for `{name}`"))?;
            mesh = mesh.with_point_scalars(name, values);
        }
    }
    Ok(mesh)
}

fn buffer_to_f64(buffer: IOBuffer) -> Option<Vec<f64>> {
    match buffer {
        IOBuffer::F64(values) => Some(values),
        IOBuffer::F32(values) => Some(values.into_iter().map(f64::from).collect()),
        _ => None,
    }
}

fn buffer_to_f32(buffer: IOBuffer) -> Option<Vec<f32>> {
    match buffer {
        IOBuffer::F32(values) => Some(values),
        IOBuffer::F64(values) => Some(values.into_iter().map(|x| x as f32).collect()),
        _ => None,
    }
}
