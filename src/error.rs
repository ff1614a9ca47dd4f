//! Error types for arapmesh.
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Result type alias using [`DeformError`].
pub type Result<T> = std::result::Result<T, DeformError>;

/// Errors that can occur while preparing or running a deformation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeformError {
    /// The mesh has no vertices or no triangles.
    #[error("mesh has no vertices or no triangles")]
    EmptyMesh,

    /// A triangle references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A triangle has duplicate vertex indices.
    #[error("face {face} is degenerate (has duplicate vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// A rest-pose vertex has a NaN or infinite coordinate.
    #[error("vertex {vertex} has a non-finite coordinate")]
    NonFiniteVertex {
        /// The vertex index.
        vertex: usize,
    },

    /// The solver is not in a state that allows the requested operation.
    #[error("solver not ready: {0}")]
    NotReady(&'static str),

    /// The constrained system is not symmetric positive definite.
    #[error("singular system: {0}")]
    SingularSystem(String),

    /// The handle mask does not cover every vertex.
    #[error("handle mask has {actual} entries, mesh has {expected} vertices")]
    HandleCountMismatch {
        /// Number of mesh vertices.
        expected: usize,
        /// Length of the supplied mask.
        actual: usize,
    },

    /// The positions buffer does not match the mesh.
    #[error("positions buffer has {actual} entries, mesh has {expected} vertices")]
    PositionCountMismatch {
        /// Number of mesh vertices.
        expected: usize,
        /// Length of the supplied buffer.
        actual: usize,
    },

    /// The solve produced NaN or infinite coordinates; nothing was written.
    #[error("deformation produced non-finite positions")]
    NonFiniteResult,

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl DeformError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        DeformError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Whether this error is a precondition failure that a later
    /// `set_handles` call can resolve.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DeformError::NotReady(_) | DeformError::SingularSystem(_)
        )
    }
}
