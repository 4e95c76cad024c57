//! The single unit-quad mesh shared by every instance.

use crate::vertex::Vertex;

/// Owns the 4 vertices and 6 indices of the unit quad (0,0)→(1,1).
///
/// Constant for the life of the process; uploaded once by the GPU layer.
pub struct GeometryTable;

impl GeometryTable {
    pub const VERTICES: [Vertex; 4] = [
        Vertex { position: [0.0, 0.0], tex_coords: [0.0, 0.0] }, // top-left
        Vertex { position: [0.0, 1.0], tex_coords: [0.0, 1.0] }, // bottom-left
        Vertex { position: [1.0, 1.0], tex_coords: [1.0, 1.0] }, // bottom-right
        Vertex { position: [1.0, 0.0], tex_coords: [1.0, 0.0] }, // top-right
    ];

    /// Two triangles, counter-clockwise.
    pub const INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

    pub const INDEX_COUNT: u32 = Self::INDICES.len() as u32;

    pub fn unit_quad() -> ([Vertex; 4], [u16; 6]) {
        (Self::VERTICES, Self::INDICES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_quad_counts() {
        let (vertices, indices) = GeometryTable::unit_quad();
        assert_eq!(vertices.len(), 4);
        assert_eq!(indices.len(), 6);
        assert_eq!(GeometryTable::INDEX_COUNT, 6);
    }

    #[test]
    fn test_indices_in_range() {
        assert!(GeometryTable::INDICES.iter().all(|&i| (i as usize) < GeometryTable::VERTICES.len()));
    }

    #[test]
    fn test_uv_matches_position() {
        for v in GeometryTable::VERTICES {
            assert_eq!(v.position, v.tex_coords);
            assert!(v.position.iter().all(|c| *c == 0.0 || *c == 1.0));
        }
    }
}
