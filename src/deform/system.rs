//! Constrained Laplacian assembly and sparse Cholesky factorization.
//!
//! The system matrix has one row per vertex:
//!
//! - free vertex `i`: `L_ii = Σ_j w_ij`, `L_ij = -w_ij` for free neighbors `j`
//! - pinned vertex `h`: identity row and column
//!
//! Couplings between a free vertex and its pinned neighbors are moved to the
//! right-hand side at solve time, which keeps the matrix symmetric. The matrix
//! only depends on the weights and on which vertices are pinned, so a single
//! factorization serves the x, y and z solves of every iteration.

use faer::linalg::solvers::Solve;
use faer::sparse::linalg::solvers::{Llt, SymbolicLlt};
use faer::sparse::{SparseColMat, Triplet};
use faer::{Mat, Side};

use crate::error::{DeformError, Result};
use crate::mesh::OneRing;

use super::sparse::CsrMatrix;
use super::weights::CotangentWeights;

/// A factored constrained system, stamped with the handle generation it was
/// built for.
pub struct FactoredSystem {
    /// Cached LLᵀ factorization.
    llt: Llt<usize, f64>,
    /// The assembled matrix, kept for residual checks.
    matrix: CsrMatrix,
    /// Handles plus isolated vertices.
    pinned: Vec<bool>,
    generation: u64,
}

impl std::fmt::Debug for FactoredSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoredSystem")
            .field("dimension", &self.matrix.nrows())
            .field("nnz", &self.matrix.nnz())
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl FactoredSystem {
    /// Assemble and factor the system for the given handle mask.
    ///
    /// Isolated vertices (no incident triangle) are pinned in place in
    /// addition to the handles.
    ///
    /// # Errors
    ///
    /// [`DeformError::SingularSystem`] if no vertex is a handle, if a
    /// connected component of the mesh has no handle, or if the Cholesky
    /// factorization rejects the matrix.
    pub fn build(
        one_ring: &OneRing,
        weights: &CotangentWeights,
        handles: &[bool],
        generation: u64,
    ) -> Result<Self> {
        let n = one_ring.num_vertices();
        debug_assert_eq!(handles.len(), n);

        if !handles.iter().any(|&h| h) {
            return Err(DeformError::SingularSystem(
                "no vertex is marked as a handle".into(),
            ));
        }
        check_components_anchored(one_ring, handles)?;

        let pinned: Vec<bool> = (0..n)
            .map(|i| handles[i] || one_ring.is_isolated(i))
            .collect();

        let matrix = assemble(one_ring, weights, &pinned);
        let llt = factorize(&matrix)?;

        log::debug!(
            "factored constrained system: {} rows, {} non-zeros, {} pinned, generation {}",
            matrix.nrows(),
            matrix.nnz(),
            pinned.iter().filter(|&&p| p).count(),
            generation
        );

        Ok(Self {
            llt,
            matrix,
            pinned,
            generation,
        })
    }

    /// Handle generation this factor was built for.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of unknowns (one per vertex).
    #[inline]
    pub fn dimension(&self) -> usize {
        self.matrix.nrows()
    }

    /// Whether vertex `v` has an identity row.
    ///
    /// # Panics
    /// Panics if `v` is not below [`dimension`](Self::dimension).
    #[inline]
    pub fn is_pinned(&self, v: usize) -> bool {
        self.pinned[v]
    }

    /// Pinned flags for all vertices.
    #[inline]
    pub fn pinned(&self) -> &[bool] {
        &self.pinned
    }

    /// The assembled (unfactored) matrix.
    #[inline]
    pub fn matrix(&self) -> &CsrMatrix {
        &self.matrix
    }

    /// Solve `A x = rhs` with the cached factor.
    ///
    /// # Panics
    /// Panics if `rhs` is shorter than [`dimension`](Self::dimension).
    pub fn solve(&self, rhs: &[f64]) -> Vec<f64> {
        let n = self.dimension();
        debug_assert_eq!(rhs.len(), n);

        let b: Mat<f64> = Mat::from_fn(n, 1, |i, _| rhs[i]);
        let x = self.llt.solve(&b);

        (0..n).map(|i| x[(i, 0)]).collect()
    }
}

/// Every connected component with at least one edge must contain a handle,
/// otherwise it can translate freely and the system is singular.
fn check_components_anchored(one_ring: &OneRing, handles: &[bool]) -> Result<()> {
    let (labels, count) = one_ring.components();

    let mut anchored = vec![false; count];
    for (v, &is_handle) in handles.iter().enumerate() {
        if is_handle {
            anchored[labels[v]] = true;
        }
    }

    for v in 0..one_ring.num_vertices() {
        if !one_ring.is_isolated(v) && !anchored[labels[v]] {
            return Err(DeformError::SingularSystem(format!(
                "the mesh component containing vertex {} has no handle",
                v
            )));
        }
    }
    Ok(())
}

fn assemble(one_ring: &OneRing, weights: &CotangentWeights, pinned: &[bool]) -> CsrMatrix {
    let n = one_ring.num_vertices();
    let mut triplets: Vec<(usize, usize, f64)> = Vec::with_capacity(n * 7);

    for i in 0..n {
        if pinned[i] {
            triplets.push((i, i, 1.0));
            continue;
        }

        triplets.push((i, i, weights.ring_sum(i)));
        for (&j, &w) in one_ring.neighbors(i).iter().zip(weights.ring(i)) {
            if !pinned[j] {
                triplets.push((i, j, -w));
            }
        }
    }

    CsrMatrix::from_triplets(n, n, triplets)
}

fn factorize(matrix: &CsrMatrix) -> Result<Llt<usize, f64>> {
    let triplets: Vec<Triplet<usize, usize, f64>> = matrix
        .triplets()
        .map(|(row, col, val)| Triplet { row, col, val })
        .collect();

    let csc = SparseColMat::try_new_from_triplets(matrix.nrows(), matrix.ncols(), &triplets)
        .map_err(|e| DeformError::SingularSystem(format!("cannot build sparse matrix: {e:?}")))?;

    let symbolic = SymbolicLlt::try_new(csc.symbolic().as_ref(), Side::Upper)
        .map_err(|e| DeformError::SingularSystem(format!("symbolic analysis failed: {e:?}")))?;

    Llt::try_new_with_symbolic(symbolic, csc.as_ref(), Side::Upper).map_err(|e| {
        log::warn!("Cholesky factorization rejected the constrained system: {e:?}");
        DeformError::SingularSystem(format!("matrix is not positive definite: {e:?}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deform::options::WeightPolicy;
    use crate::mesh::RestMesh;
    use nalgebra::{DVector, Point3};

    fn square() -> (OneRing, CotangentWeights) {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mesh = RestMesh::new(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap();
        let ring = OneRing::from_triangles(4, mesh.triangles());
        let weights = CotangentWeights::compute(&mesh, &ring, WeightPolicy::Clamped);
        (ring, weights)
    }

    #[test]
    fn test_empty_mask_is_singular() {
        let (ring, weights) = square();
        let err = FactoredSystem::build(&ring, &weights, &[false; 4], 1).unwrap_err();
        assert!(matches!(err, DeformError::SingularSystem(_)));
    }

    #[test]
    fn test_unanchored_component_is_singular() {
        // Two disjoint triangles.
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
            Point3::new(6.0, 0.0, 0.0),
            Point3::new(5.0, 1.0, 0.0),
        ];
        let mesh = RestMesh::new(&vertices, &[[0, 1, 2], [3, 4, 5]]).unwrap();
        let ring = OneRing::from_triangles(6, mesh.triangles());
        let weights = CotangentWeights::compute(&mesh, &ring, WeightPolicy::Clamped);

        let mask = [true, false, false, false, false, false];
        let err = FactoredSystem::build(&ring, &weights, &mask, 1).unwrap_err();
        assert!(matches!(err, DeformError::SingularSystem(_)));

        let mask = [true, false, false, false, true, false];
        assert!(FactoredSystem::build(&ring, &weights, &mask, 1).is_ok());
    }

    #[test]
    fn test_matrix_is_symmetric_with_identity_rows() {
        let (ring, weights) = square();
        let system = FactoredSystem::build(&ring, &weights, &[true, false, false, true], 7).unwrap();

        assert_eq!(system.generation(), 7);
        assert_eq!(system.dimension(), 4);
        let m = system.matrix();
        assert!(m.is_symmetric(1e-12));
        assert_eq!(m.get(0, 0), 1.0);
        assert_eq!(m.get(1, 0), 0.0);
        assert_eq!(m.get(3, 3), 1.0);
        assert!((m.get(1, 1) - weights.ring_sum(1)).abs() < 1e-12);
        assert!((m.get(1, 2) + weights.get(1, 2).unwrap()).abs() < 1e-12);
    }

    #[test]
    fn test_solve_residual() {
        let (ring, weights) = square();
        let system = FactoredSystem::build(&ring, &weights, &[true, false, true, false], 1).unwrap();

        let rhs = vec![1.0, -2.0, 3.0, 0.5];
        let x = system.solve(&rhs);

        let r = system.matrix().mul_vec(&DVector::from_vec(x.clone())) - DVector::from_vec(rhs);
        assert!(r.norm() < 1e-9);
        // Identity rows reproduce their right-hand side.
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[2] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_isolated_vertex_is_pinned() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(5.0, 5.0, 5.0),
        ];
        let mesh = RestMesh::new(&vertices, &[[0, 1, 2]]).unwrap();
        let ring = OneRing::from_triangles(4, mesh.triangles());
        let weights = CotangentWeights::compute(&mesh, &ring, WeightPolicy::Clamped);

        let system = FactoredSystem::build(&ring, &weights, &[true, false, false, false], 1).unwrap();
        assert!(system.is_pinned(3));
        assert!(!system.is_pinned(1));
    }

    #[test]
    #[should_panic]
    fn test_is_pinned_out_of_range_panics() {
        let (ring, weights) = square();
        let system = FactoredSystem::build(&ring, &weights, &[true, false, false, false], 1).unwrap();
        system.is_pinned(system.dimension());
    }
}
