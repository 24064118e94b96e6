//! Element class metadata for cmesh trees.

/// Topological shape of a tree or element.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Eclass {
    /// 0D vertex.
    Vertex,
    /// 1D segment/edge.
    Line,
    /// 2D tensor-product cell (quad).
    Quad,
    /// 2D simplex (triangle).
    Triangle,
    /// 3D tensor-product cell (hex).
    Hex,
    /// 3D simplex (tet).
    Tet,
    /// 3D wedge/prism.
    Prism,
    /// 3D pyramid.
    Pyramid,
}

impl Eclass {
    /// Number of corners (vertices) of the shape.
    pub const fn num_vertices(self) -> usize {
        match self {
            Eclass::Vertex => 1,
            Eclass::Line => 2,
            Eclass::Quad => 4,
            Eclass::Triangle => 3,
            Eclass::Hex => 8,
            Eclass::Tet => 4,
            Eclass::Prism => 6,
            Eclass::Pyramid => 5,
        }
    }

    /// Number of codimension-1 faces of the shape.
    pub const fn num_faces(self) -> usize {
        match self {
            Eclass::Vertex => 0,
            Eclass::Line => 2,
            Eclass::Quad => 4,
            Eclass::Triangle => 3,
            Eclass::Hex => 6,
            Eclass::Tet => 4,
            Eclass::Prism => 5,
            Eclass::Pyramid => 5,
        }
    }

    /// Topological dimension of the shape.
    pub const fn dimension(self) -> u8 {
        match self {
            Eclass::Vertex => 0,
            Eclass::Line => 1,
            Eclass::Quad | Eclass::Triangle => 2,
            Eclass::Hex | Eclass::Tet | Eclass::Prism | Eclass::Pyramid => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corner_counts() {
        assert_eq!(Eclass::Quad.num_vertices(), 4);
        assert_eq!(Eclass::Triangle.num_vertices(), 3);
        assert_eq!(Eclass::Hex.num_vertices(), 8);
        assert_eq!(Eclass::Pyramid.num_vertices(), 5);
    }

    #[test]
    fn face_counts_and_dimension() {
        assert_eq!(Eclass::Quad.num_faces(), 4);
        assert_eq!(Eclass::Hex.num_faces(), 6);
        assert_eq!(Eclass::Prism.num_faces(), 5);
        assert_eq!(Eclass::Line.dimension(), 1);
        assert_eq!(Eclass::Tet.dimension(), 3);
    }
}
