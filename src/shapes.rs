//! Procedural triangle meshes.
//!
//! Both generators return raw vertex and triangle buffers, ready for
//! [`ArapSolver::init`](crate::deform::ArapSolver::init) or
//! [`RestMesh::new`](crate::mesh::RestMesh::new).

use nalgebra::Point3;

use crate::error::{DeformError, Result};

/// Vertex and triangle buffers.
pub type TriangleSoup = (Vec<Point3<f64>>, Vec<[usize; 3]>);

/// Index of grid vertex `(i, j)` in a grid with `nx` cells along x.
#[inline]
pub fn grid_index(nx: usize, i: usize, j: usize) -> usize {
    j * (nx + 1) + i
}

/// A flat `nx` by `ny` grid in the xy plane with square cells of side
/// `spacing`, two triangles per cell.
///
/// Vertex `(i, j)` sits at `(i * spacing, j * spacing, 0)` and has index
/// [`grid_index(nx, i, j)`](grid_index).
pub fn grid(nx: usize, ny: usize, spacing: f64) -> Result<TriangleSoup> {
    if nx == 0 {
        return Err(DeformError::invalid_param("nx", nx, "must be positive"));
    }
    if ny == 0 {
        return Err(DeformError::invalid_param("ny", ny, "must be positive"));
    }
    if !(spacing.is_finite() && spacing > 0.0) {
        return Err(DeformError::invalid_param(
            "spacing",
            spacing,
            "must be positive and finite",
        ));
    }

    let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..=ny {
        for i in 0..=nx {
            vertices.push(Point3::new(i as f64 * spacing, j as f64 * spacing, 0.0));
        }
    }

    let mut triangles = Vec::with_capacity(2 * nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let v00 = grid_index(nx, i, j);
            let v10 = grid_index(nx, i + 1, j);
            let v01 = grid_index(nx, i, j + 1);
            let v11 = grid_index(nx, i + 1, j + 1);

            triangles.push([v00, v10, v11]);
            triangles.push([v00, v11, v01]);
        }
    }

    Ok((vertices, triangles))
}

/// A rectangular strip of `segments` cells along x, `length` long and
/// `width` wide.
///
/// Vertices come in pairs along the strip: `2k` is at `y = 0` and `2k + 1`
/// at `y = width`, both at `x = k * length / segments`.
pub fn strip(segments: usize, width: f64, length: f64) -> Result<TriangleSoup> {
    if segments == 0 {
        return Err(DeformError::invalid_param("segments", segments, "must be positive"));
    }
    for (name, value) in [("width", width), ("length", length)] {
        if !(value.is_finite() && value > 0.0) {
            return Err(DeformError::invalid_param(name, value, "must be positive and finite"));
        }
    }

    let step = length / segments as f64;
    let mut vertices = Vec::with_capacity(2 * (segments + 1));
    for k in 0..=segments {
        let x = k as f64 * step;
        vertices.push(Point3::new(x, 0.0, 0.0));
        vertices.push(Point3::new(x, width, 0.0));
    }

    let mut triangles = Vec::with_capacity(2 * segments);
    for k in 0..segments {
        let (a, b, c, d) = (2 * k, 2 * k + 1, 2 * k + 2, 2 * k + 3);
        triangles.push([a, c, d]);
        triangles.push([a, d, b]);
    }

    Ok((vertices, triangles))
}
