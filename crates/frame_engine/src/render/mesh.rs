//! Mesh representation
//!
//! CPU-side geometry and the backend-agnostic vertex format. Backends derive
//! their input layout from [`Vertex::FORMAT`] instead of hard-coding offsets.

use thiserror::Error;

/// Mesh validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// No vertices supplied
    #[error("Mesh has no vertices")]
    NoVertices,

    /// No indices supplied
    #[error("Mesh has no indices")]
    NoIndices,

    /// Index count does not describe whole triangles
    #[error("Index count {index_count} is not a multiple of 3")]
    IncompleteTriangle {
        /// Number of indices supplied
        index_count: usize,
    },

    /// An index references a vertex past the end of the vertex list
    #[error("Index {index} at position {position} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// Position of the offending entry in the index list
        position: usize,
        /// The offending index value
        index: u32,
        /// Number of vertices in the mesh
        vertex_count: usize,
    },

    /// More indices than a 32-bit draw call can address
    #[error("Too many indices: {0}")]
    TooManyIndices(usize),
}

/// Vertex with position and color
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position in model space
    pub position: [f32; 3],
    /// Linear RGBA color
    pub color: [f32; 4],
}

// SAFETY: `Vertex` is `repr(C)`, made only of `f32`s and has no padding.
unsafe impl bytemuck::Pod for Vertex {}
unsafe impl bytemuck::Zeroable for Vertex {}

/// Component layout of one vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeFormat {
    /// Three 32-bit floats
    Float32x3,
    /// Four 32-bit floats
    Float32x4,
}

impl AttributeFormat {
    /// Size of the attribute in bytes
    pub const fn size(self) -> u32 {
        match self {
            Self::Float32x3 => 12,
            Self::Float32x4 => 16,
        }
    }
}

/// One attribute inside an interleaved vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Shader input location
    pub location: u32,
    /// Component layout
    pub format: AttributeFormat,
    /// Byte offset from the start of the vertex
    pub offset: u32,
}

/// Interleaved vertex layout description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexFormat {
    /// Distance in bytes between consecutive vertices
    pub stride: u32,
    /// Attributes in location order
    pub attributes: &'static [VertexAttribute],
}

impl Vertex {
    /// Layout of [`Vertex`] in a vertex buffer
    pub const FORMAT: VertexFormat = VertexFormat {
        stride: std::mem::size_of::<Self>() as u32,
        attributes: &[
            VertexAttribute { location: 0, format: AttributeFormat::Float32x3, offset: 0 },
            VertexAttribute { location: 1, format: AttributeFormat::Float32x4, offset: 12 },
        ],
    };

    /// Create a vertex
    pub const fn new(position: [f32; 3], color: [f32; 4]) -> Self {
        Self { position, color }
    }
}

/// Static indexed triangle-list geometry, validated on construction
#[derive(Debug, Clone, PartialEq)]
pub struct RenderableMesh {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl RenderableMesh {
    /// Create a mesh, checking that every index refers to an existing vertex
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Result<Self, MeshError> {
        if vertices.is_empty() {
            return Err(MeshError::NoVertices);
        }
        if indices.is_empty() {
            return Err(MeshError::NoIndices);
        }
        if indices.len() % 3 != 0 {
            return Err(MeshError::IncompleteTriangle { index_count: indices.len() });
        }
        if u32::try_from(indices.len()).is_err() {
            return Err(MeshError::TooManyIndices(indices.len()));
        }

        let vertex_count = vertices.len();
        if let Some((position, &index)) = indices
            .iter()
            .enumerate()
            .find(|&(_, &index)| index as usize >= vertex_count)
        {
            return Err(MeshError::IndexOutOfRange { position, index, vertex_count });
        }

        Ok(Self { vertices, indices })
    }

    /// The demo triangle: red top, green right, blue left, facing the camera
    pub fn triangle() -> Self {
        Self {
            vertices: vec![
                Vertex::new([0.0, 0.5, 0.5], [1.0, 0.0, 0.0, 1.0]),
                Vertex::new([0.5, -0.5, 0.5], [0.0, 1.0, 0.0, 1.0]),
                Vertex::new([-0.5, -0.5, 0.5], [0.0, 0.0, 1.0, 1.0]),
            ],
            indices: vec![0, 1, 2],
        }
    }

    /// Vertex data in draw order
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Index data
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of indices covered by one full draw
    pub fn index_count(&self) -> u32 {
        // Bounded by the check in `new`
        self.indices.len() as u32
    }

    /// Raw vertex bytes for upload
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_format_matches_struct_layout() {
        assert_eq!(Vertex::FORMAT.stride as usize, std::mem::size_of::<Vertex>());
        assert_eq!(Vertex::FORMAT.stride, 28);

        let color = Vertex::FORMAT.attributes[1];
        assert_eq!(color.offset as usize, std::mem::offset_of!(Vertex, color));

        let covered: u32 = Vertex::FORMAT.attributes.iter().map(|a| a.format.size()).sum();
        assert_eq!(covered, Vertex::FORMAT.stride);
    }

    /// Vertex and index counts agree: three vertices, one triangle
    #[test]
    fn test_triangle_is_consistent() {
        let triangle = RenderableMesh::triangle();
        assert_eq!(triangle.vertex_count(), 3);
        assert_eq!(triangle.index_count(), 3);
        assert!(RenderableMesh::new(triangle.vertices().to_vec(), triangle.indices().to_vec()).is_ok());
    }

    #[test]
    fn test_triangle_vertex_colors() {
        let triangle = RenderableMesh::triangle();
        let colors: Vec<[f32; 4]> = triangle.vertices().iter().map(|v| v.color).collect();
        assert_eq!(colors, vec![[1.0, 0.0, 0.0, 1.0], [0.0, 1.0, 0.0, 1.0], [0.0, 0.0, 1.0, 1.0]]);
    }

    /// Quad-style indices over three vertices reference a fourth vertex that does not exist
    #[test]
    fn test_quad_indices_over_triangle_vertices_are_rejected() {
        let vertices = RenderableMesh::triangle().vertices().to_vec();
        let err = RenderableMesh::new(vertices, vec![0, 1, 2, 0, 2, 3]).unwrap_err();
        assert_eq!(err, MeshError::IndexOutOfRange { position: 5, index: 3, vertex_count: 3 });
    }

    #[test]
    fn test_incomplete_triangle_is_rejected() {
        let vertices = RenderableMesh::triangle().vertices().to_vec();
        let err = RenderableMesh::new(vertices, vec![0, 1]).unwrap_err();
        assert_eq!(err, MeshError::IncompleteTriangle { index_count: 2 });
    }

    #[test]
    fn test_empty_mesh_is_rejected() {
        assert_eq!(RenderableMesh::new(Vec::new(), vec![0, 1, 2]), Err(MeshError::NoVertices));
        let vertices = RenderableMesh::triangle().vertices().to_vec();
        assert_eq!(RenderableMesh::new(vertices, Vec::new()), Err(MeshError::NoIndices));
    }

    #[test]
    fn test_vertex_bytes_length() {
        let triangle = RenderableMesh::triangle();
        assert_eq!(triangle.vertex_bytes().len(), 3 * 28);
    }
}
