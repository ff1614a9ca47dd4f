//! Rest-pose mesh data and adjacency.
//!
//! The deformation solver works on plain face-vertex data: a list of
//! positions and a list of triangles as index triples. This module validates
//! that input ([`RestMesh`]) and derives the vertex adjacency ([`OneRing`])
//! the solver iterates over.

mod rest;
mod topology;

pub use rest::{bounding_box, RestMesh};
pub use topology::OneRing;
