//! Validated rest-pose geometry.

use nalgebra::{Point3, Vector3};

use crate::error::{DeformError, Result};

/// The undeformed reference mesh: vertex positions and triangle indices.
///
/// A `RestMesh` is validated once on construction and never mutated
/// afterwards. Edge vectors and weights are always measured on this geometry.
#[derive(Debug, Clone)]
pub struct RestMesh {
    vertices: Vec<Point3<f64>>,
    triangles: Vec<[usize; 3]>,
}

impl RestMesh {
    /// Build a rest mesh from vertex positions and triangles.
    ///
    /// # Errors
    ///
    /// - [`DeformError::EmptyMesh`] if there are no vertices or no triangles
    /// - [`DeformError::InvalidVertexIndex`] if a triangle index is out of range
    /// - [`DeformError::DegenerateFace`] if a triangle repeats an index
    /// - [`DeformError::NonFiniteVertex`] if a coordinate is NaN or infinite
    ///
    /// Triangles with coincident or collinear *positions* are accepted; they
    /// simply contribute nothing to the cotangent weights.
    pub fn new(vertices: &[Point3<f64>], triangles: &[[usize; 3]]) -> Result<Self> {
        if vertices.is_empty() || triangles.is_empty() {
            return Err(DeformError::EmptyMesh);
        }

        for (vi, p) in vertices.iter().enumerate() {
            if !p.coords.iter().all(|c| c.is_finite()) {
                return Err(DeformError::NonFiniteVertex { vertex: vi });
            }
        }

        for (fi, tri) in triangles.iter().enumerate() {
            for &vi in tri {
                if vi >= vertices.len() {
                    return Err(DeformError::InvalidVertexIndex { face: fi, vertex: vi });
                }
            }
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
                return Err(DeformError::DegenerateFace { face: fi });
            }
        }

        Ok(Self {
            vertices: vertices.to_vec(),
            triangles: triangles.to_vec(),
        })
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Rest-pose vertex positions.
    #[inline]
    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    /// Triangle index triples.
    #[inline]
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Rest position of vertex `v`.
    #[inline]
    pub fn position(&self, v: usize) -> &Point3<f64> {
        &self.vertices[v]
    }

    /// Rest-pose edge vector `p_i - p_j`.
    #[inline]
    pub fn edge(&self, i: usize, j: usize) -> Vector3<f64> {
        self.vertices[i] - self.vertices[j]
    }

    /// Axis-aligned bounding box of the rest pose.
    pub fn bounding_box(&self) -> (Point3<f64>, Point3<f64>) {
        bounding_box(&self.vertices).unwrap_or((Point3::origin(), Point3::origin()))
    }
}

/// Axis-aligned bounding box of a point set, or `None` if it is empty.
pub fn bounding_box(points: &[Point3<f64>]) -> Option<(Point3<f64>, Point3<f64>)> {
    let first = points.first()?;
    let mut min = *first;
    let mut max = *first;
    for p in &points[1..] {
        min = min.inf(p);
        max = max.sup(p);
    }
    Some((min, max))
}
