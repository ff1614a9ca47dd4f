//! The handle-driven ARAP deformation solver.

use nalgebra::{Matrix3, Point3};

use crate::constraints::Constraints;
use crate::error::{DeformError, Result};
use crate::mesh::{OneRing, RestMesh};

use super::energy::arap_energy;
use super::global::{build_rhs, solve_positions};
use super::local::fit_rotations;
use super::options::ArapOptions;
use super::system::FactoredSystem;
use super::weights::CotangentWeights;

/// Lifecycle state of an [`ArapSolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    /// No mesh loaded.
    Uninitialized,
    /// Mesh, adjacency and weights are ready; no valid factorization.
    WeightsReady,
    /// A factorization matching the current handle mask is cached.
    Factorized,
}

/// Data derived once per mesh by `init`.
#[derive(Debug, Clone)]
struct Precomputed {
    rest: RestMesh,
    one_ring: OneRing,
    weights: CotangentWeights,
}

/// As-Rigid-As-Possible surface deformation solver.
///
/// Typical use:
///
/// 1. [`init`](Self::init) with the rest pose, once per mesh
/// 2. [`set_handles`](Self::set_handles) whenever the selection changes
/// 3. write handle targets into a positions buffer and call
///    [`compute_deformation`](Self::compute_deformation) as often as needed
///
/// # Example
///
/// ```
/// use arapmesh::prelude::*;
/// use nalgebra::{Point3, Vector3};
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
/// let triangles = vec![[0, 1, 2], [0, 2, 3]];
///
/// let mut solver = ArapSolver::with_options(ArapOptions::default().with_iterations(60));
/// solver.init(&vertices, &triangles).unwrap();
/// solver.set_handles(&[true, true, false, false]).unwrap();
///
/// let shift = Vector3::new(1.0, 0.0, 0.0);
/// let mut positions = vertices.clone();
/// positions[0] += shift;
/// positions[1] += shift;
/// solver.compute_deformation(&mut positions).unwrap();
///
/// assert!((positions[2] - (vertices[2] + shift)).norm() < 1e-6);
/// ```
#[derive(Debug)]
pub struct ArapSolver {
    options: ArapOptions,
    mesh: Option<Precomputed>,
    handles: Vec<bool>,
    /// Bumped on every `init` and `set_handles`.
    handle_generation: u64,
    system: Option<FactoredSystem>,
    rotations: Vec<Matrix3<f64>>,
}

impl Default for ArapSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ArapSolver {
    /// Create a solver with default options.
    pub fn new() -> Self {
        Self::with_options(ArapOptions::default())
    }

    /// Create a solver with the given options.
    pub fn with_options(options: ArapOptions) -> Self {
        Self {
            options,
            mesh: None,
            handles: Vec::new(),
            handle_generation: 0,
            system: None,
            rotations: Vec::new(),
        }
    }

    /// Current options.
    #[inline]
    pub fn options(&self) -> &ArapOptions {
        &self.options
    }

    /// Load a rest-pose mesh and precompute adjacency and weights.
    ///
    /// Any previous mesh, handle mask and factorization are discarded. On
    /// error the solver is left uninitialized.
    pub fn init(&mut self, vertices: &[Point3<f64>], triangles: &[[usize; 3]]) -> Result<()> {
        self.clear();

        let rest = RestMesh::new(vertices, triangles)?;
        let one_ring = OneRing::from_triangles(rest.num_vertices(), rest.triangles());
        let weights = CotangentWeights::compute(&rest, &one_ring, self.options.weight_policy);

        log::debug!(
            "ARAP init: {} vertices, {} triangles, {} edges",
            rest.num_vertices(),
            rest.num_triangles(),
            weights.num_edges()
        );

        let n = rest.num_vertices();
        self.handles = vec![false; n];
        self.rotations = vec![Matrix3::identity(); n];
        self.handle_generation += 1;
        self.mesh = Some(Precomputed {
            rest,
            one_ring,
            weights,
        });
        Ok(())
    }

    /// Replace the handle mask and refactor the constrained system.
    ///
    /// # Errors
    ///
    /// - [`DeformError::NotReady`] before `init`
    /// - [`DeformError::HandleCountMismatch`] if `mask` does not cover every
    ///   vertex; the solver state is unchanged
    /// - [`DeformError::SingularSystem`] if the system cannot be factored; the
    ///   new mask is kept but the solver drops back to
    ///   [`SolverState::WeightsReady`]
    pub fn set_handles(&mut self, mask: &[bool]) -> Result<()> {
        let pre = self
            .mesh
            .as_ref()
            .ok_or(DeformError::NotReady("no mesh loaded; call init first"))?;

        let n = pre.rest.num_vertices();
        if mask.len() != n {
            return Err(DeformError::HandleCountMismatch {
                expected: n,
                actual: mask.len(),
            });
        }

        self.handles.clear();
        self.handles.extend_from_slice(mask);
        self.handle_generation += 1;
        self.system = None;

        let system = FactoredSystem::build(
            &pre.one_ring,
            &pre.weights,
            &self.handles,
            self.handle_generation,
        )?;
        self.system = Some(system);
        Ok(())
    }

    /// Deform `positions` in place.
    ///
    /// On input, handle vertices hold their targets and free vertices hold
    /// the initial guess (usually the previous result). Runs the configured
    /// number of local/global rounds. On error `positions` is left untouched.
    ///
    /// # Errors
    ///
    /// - [`DeformError::NotReady`] unless a factorization matching the
    ///   current handle mask exists
    /// - [`DeformError::PositionCountMismatch`] if the buffer does not match
    ///   the mesh
    /// - [`DeformError::NonFiniteResult`] if the iterate is not finite
    pub fn compute_deformation(&mut self, positions: &mut [Point3<f64>]) -> Result<()> {
        let pre = self
            .mesh
            .as_ref()
            .ok_or(DeformError::NotReady("no mesh loaded; call init first"))?;
        let system = self.system.as_ref().ok_or(DeformError::NotReady(
            "no valid factorization; call set_handles first",
        ))?;
        if system.generation() != self.handle_generation {
            return Err(DeformError::NotReady("factorization is stale for the current handles"));
        }

        let n = pre.rest.num_vertices();
        if positions.len() != n {
            return Err(DeformError::PositionCountMismatch {
                expected: n,
                actual: positions.len(),
            });
        }

        let iterations = self.options.iterations;
        if iterations == 0 {
            return Ok(());
        }

        let mut current = positions.to_vec();
        for _ in 0..iterations {
            fit_rotations(
                &pre.rest,
                &pre.one_ring,
                &pre.weights,
                &current,
                self.options.parallel,
                &mut self.rotations,
            );
            let rhs = build_rhs(
                &pre.rest,
                &pre.one_ring,
                &pre.weights,
                &self.rotations,
                &current,
                system,
            );
            solve_positions(system, &rhs, &mut current);
        }

        if !current.iter().all(|p| p.coords.iter().all(|c| c.is_finite())) {
            log::warn!("ARAP solve produced non-finite positions; discarding result");
            return Err(DeformError::NonFiniteResult);
        }

        if log::log_enabled!(log::Level::Debug) {
            let mut rotations = Vec::new();
            fit_rotations(
                &pre.rest,
                &pre.one_ring,
                &pre.weights,
                &current,
                self.options.parallel,
                &mut rotations,
            );
            let energy = arap_energy(&pre.rest, &pre.one_ring, &pre.weights, &current, &rotations);
            log::debug!("ARAP: {} iterations, energy {:.6e}", iterations, energy);
        }

        positions.copy_from_slice(&current);
        Ok(())
    }

    /// Set the pin mask from `constraints`, write their targets and deform.
    ///
    /// The system is only refactored when the constrained vertex set differs
    /// from the current mask. On error `positions` is left untouched.
    pub fn deform_to(&mut self, constraints: &Constraints, positions: &mut [Point3<f64>]) -> Result<()> {
        let n = self.num_vertices();
        if self.mesh.is_none() {
            return Err(DeformError::NotReady("no mesh loaded; call init first"));
        }

        let mask = constraints.handle_mask(n)?;
        if mask != self.handles || self.state() != SolverState::Factorized {
            self.set_handles(&mask)?;
        }

        let mut work = positions.to_vec();
        constraints.apply_targets(&mut work)?;
        self.compute_deformation(&mut work)?;
        positions.copy_from_slice(&work);
        Ok(())
    }

    /// Set the number of local/global rounds per call.
    #[inline]
    pub fn set_iteration_nb(&mut self, iterations: usize) {
        self.options.iterations = iterations;
    }

    /// Number of local/global rounds per call.
    #[inline]
    pub fn iteration_nb(&self) -> usize {
        self.options.iterations
    }

    /// Discard the mesh, handles and factorization.
    pub fn clear(&mut self) {
        self.mesh = None;
        self.system = None;
        self.handles.clear();
        self.rotations.clear();
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SolverState {
        match (&self.mesh, &self.system) {
            (None, _) => SolverState::Uninitialized,
            (Some(_), Some(system)) if system.generation() == self.handle_generation => {
                SolverState::Factorized
            }
            (Some(_), _) => SolverState::WeightsReady,
        }
    }

    /// Number of vertices of the loaded mesh (zero when uninitialized).
    pub fn num_vertices(&self) -> usize {
        self.mesh.as_ref().map_or(0, |pre| pre.rest.num_vertices())
    }

    /// The loaded rest mesh.
    pub fn rest_mesh(&self) -> Option<&RestMesh> {
        self.mesh.as_ref().map(|pre| &pre.rest)
    }

    /// Rest-pose positions (empty when uninitialized).
    pub fn rest_vertices(&self) -> &[Point3<f64>] {
        match &self.mesh {
            Some(pre) => pre.rest.vertices(),
            None => &[],
        }
    }

    /// Current handle mask.
    #[inline]
    pub fn handles(&self) -> &[bool] {
        &self.handles
    }

    /// Neighbors of vertex `v` (empty when uninitialized).
    pub fn one_ring(&self, v: usize) -> &[usize] {
        match &self.mesh {
            Some(pre) => pre.one_ring.neighbors(v),
            None => &[],
        }
    }

    /// Cotangent weight of the edge `i-j`.
    pub fn weight(&self, i: usize, j: usize) -> Option<f64> {
        self.mesh.as_ref().and_then(|pre| pre.weights.get(i, j))
    }

    /// Rotations of the last local step.
    #[inline]
    pub fn rotations(&self) -> &[Matrix3<f64>] {
        &self.rotations
    }

    /// ARAP energy of `positions`, with rotations fitted to them.
    pub fn energy(&self, positions: &[Point3<f64>]) -> Result<f64> {
        let pre = self
            .mesh
            .as_ref()
            .ok_or(DeformError::NotReady("no mesh loaded; call init first"))?;
        let n = pre.rest.num_vertices();
        if positions.len() != n {
            return Err(DeformError::PositionCountMismatch {
                expected: n,
                actual: positions.len(),
            });
        }

        let mut rotations = Vec::with_capacity(n);
        fit_rotations(
            &pre.rest,
            &pre.one_ring,
            &pre.weights,
            positions,
            self.options.parallel,
            &mut rotations,
        );
        Ok(arap_energy(&pre.rest, &pre.one_ring, &pre.weights, positions, &rotations))
    }
}
