//! As-Rigid-As-Possible surface deformation.
//!
//! Given a rest-pose triangle mesh and a set of handle vertices pinned to
//! target positions, ARAP finds positions for the remaining vertices such
//! that every vertex's one-ring moves as close to rigidly as possible. The
//! solver alternates two steps:
//!
//! - **Local**: fit a best rotation per vertex from the current iterate
//!   (SVD of a 3x3 covariance)
//! - **Global**: solve a sparse, symmetric positive definite system for the
//!   positions, with the cotangent Laplacian as matrix
//!
//! The matrix depends only on the rest pose and the handle mask, so it is
//! factored once per mask and reused across iterations and calls.
//!
//! # Example
//!
//! ```
//! use arapmesh::prelude::*;
//! use arapmesh::shapes;
//! use nalgebra::Vector3;
//!
//! let (vertices, triangles) = shapes::grid(4, 4, 0.25).unwrap();
//!
//! let mut solver = ArapSolver::with_options(ArapOptions::default().with_iterations(10));
//! solver.init(&vertices, &triangles).unwrap();
//!
//! // Pin the bottom row in place and lift the top row.
//! let mut constraints = Constraints::new();
//! for i in 0..=4 {
//!     constraints.push(shapes::grid_index(4, i, 0), vertices[shapes::grid_index(4, i, 0)]);
//!     let top = shapes::grid_index(4, i, 4);
//!     constraints.push(top, vertices[top] + Vector3::new(0.0, 0.0, 0.5));
//! }
//!
//! let mut positions = vertices.clone();
//! solver.deform_to(&constraints, &mut positions).unwrap();
//!
//! // Handles land exactly on their targets.
//! assert_eq!(positions[shapes::grid_index(4, 2, 4)].z, 0.5);
//! assert!(positions.iter().all(|p| p.z.is_finite()));
//! ```
//!
//! # References
//!
//! - Sorkine, O. & Alexa, M. (2007). "As-rigid-as-possible surface modeling."
//!   Symposium on Geometry Processing.

mod energy;
mod global;
mod local;
mod options;
mod solver;
mod sparse;
mod system;
mod weights;

pub use energy::arap_energy;
pub use local::{covariance, fit_rotation, fit_rotations, RANK_TOLERANCE};
pub use options::{ArapOptions, WeightPolicy, MIN_EDGE_WEIGHT};
pub use solver::{ArapSolver, SolverState};
pub use sparse::CsrMatrix;
pub use system::FactoredSystem;
pub use weights::{cotangent_at, CotangentWeights};
