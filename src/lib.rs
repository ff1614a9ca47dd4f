//! # arapmesh
//!
//! As-Rigid-As-Possible (ARAP) deformation of triangle meshes.
//!
//! A user pins a subset of vertices (the *handles*) to target positions and
//! the solver moves every other vertex so that each vertex neighborhood is
//! deformed as close to a rigid motion as possible.
//!
//! ## Features
//!
//! - **Plain buffers in, plain buffers out**: positions as `Point3<f64>`,
//!   triangles as index triples
//! - **Factor once, solve often**: the constrained cotangent Laplacian is
//!   factored per handle selection and reused across drags
//! - **Parallel local step**: per-vertex rotations are fitted on the rayon
//!   pool
//! - **Explicit readiness**: [`SolverState`](deform::SolverState) tells
//!   whether a call to `compute_deformation` can succeed
//!
//! ## Quick Start
//!
//! ```
//! use arapmesh::prelude::*;
//! use nalgebra::{Point3, Vector3};
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let triangles = vec![[0, 1, 2], [0, 2, 3]];
//!
//! let mut solver = ArapSolver::new();
//! solver.init(&vertices, &triangles).unwrap();
//! assert_eq!(solver.state(), SolverState::WeightsReady);
//!
//! // Pin the bottom edge.
//! solver.set_handles(&[true, true, false, false]).unwrap();
//! assert_eq!(solver.state(), SolverState::Factorized);
//!
//! // Drag the handles: write targets into the buffer, then solve.
//! let mut positions = vertices.clone();
//! positions[0] += Vector3::new(0.0, 0.0, 1.0);
//! positions[1] += Vector3::new(0.0, 0.0, 1.0);
//! solver.compute_deformation(&mut positions).unwrap();
//!
//! println!("deformed: {:?}", positions);
//! ```
//!
//! ## Constraint Sets
//!
//! [`Constraints`](constraints::Constraints) pairs vertices with targets and
//! drives the same solver:
//!
//! ```
//! use arapmesh::prelude::*;
//! use arapmesh::shapes;
//! use nalgebra::Vector3;
//!
//! let (vertices, triangles) = shapes::strip(8, 1.0, 8.0).unwrap();
//! let mut solver = ArapSolver::new();
//! solver.init(&vertices, &triangles).unwrap();
//!
//! let shift = Vector3::new(2.0, 1.0, 0.0);
//! let constraints: Constraints = (0..vertices.len())
//!     .filter(|v| v % 4 == 0)
//!     .map(|v| (v, vertices[v] + shift))
//!     .collect();
//!
//! let mut positions = vertices.clone();
//! constraints.align(&mut positions);
//! solver.deform_to(&constraints, &mut positions).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constraints;
pub mod deform;
pub mod error;
pub mod mesh;
pub mod shapes;

/// Prelude module for convenient imports.
///
/// ```
/// use arapmesh::prelude::*;
/// ```
pub mod prelude {
    pub use crate::constraints::Constraints;
    pub use crate::deform::{ArapOptions, ArapSolver, SolverState, WeightPolicy};
    pub use crate::error::{DeformError, Result};
    pub use crate::mesh::{OneRing, RestMesh};
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::{Point3, Rotation3, Vector3};

    #[test]
    fn test_tetrahedron_rigid_motion() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];

        let faces = vec![
            [0, 2, 1], // bottom
            [0, 1, 3], // front
            [1, 2, 3], // right
            [2, 0, 3], // left
        ];

        let mut solver = ArapSolver::with_options(ArapOptions::default().with_iterations(50));
        solver.init(&vertices, &faces).unwrap();
        solver.set_handles(&[true, true, true, false]).unwrap();

        // Rigidly move the three handles; the apex must follow.
        let rot = Rotation3::from_axis_angle(&Vector3::z_axis(), 0.5);
        let shift = Vector3::new(0.3, -0.2, 0.1);
        let target: Vec<_> = vertices.iter().map(|p| rot * p + shift).collect();

        let mut positions = vertices.clone();
        positions[..3].copy_from_slice(&target[..3]);
        solver.compute_deformation(&mut positions).unwrap();

        assert!((positions[3] - target[3]).norm() < 1e-5);
    }
}
