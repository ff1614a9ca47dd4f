//! Global step: solve for positions given per-vertex rotations.

use nalgebra::{Matrix3, Point3, Vector3};

use crate::mesh::{OneRing, RestMesh};

use super::system::FactoredSystem;
use super::weights::CotangentWeights;

/// Build the x, y and z right-hand sides.
///
/// For a free vertex `i`:
/// `b_i = Σ_j (w_ij / 2)(R_i + R_j)(p_i - p_j) + Σ_{j pinned} w_ij · q_j`,
/// where the second sum carries the pinned columns eliminated from the
/// matrix. For a pinned vertex, `b_i = q_i`. The values `q` are read from
/// `current`, which holds the handle targets at pinned vertices.
pub fn build_rhs(
    rest: &RestMesh,
    one_ring: &OneRing,
    weights: &CotangentWeights,
    rotations: &[Matrix3<f64>],
    current: &[Point3<f64>],
    system: &FactoredSystem,
) -> [Vec<f64>; 3] {
    let n = rest.num_vertices();
    let mut rhs = [vec![0.0; n], vec![0.0; n], vec![0.0; n]];

    for i in 0..n {
        let b = if system.is_pinned(i) {
            current[i].coords
        } else {
            let mut b = Vector3::zeros();
            for (&j, &w) in one_ring.neighbors(i).iter().zip(weights.ring(i)) {
                b += (0.5 * w) * ((rotations[i] + rotations[j]) * rest.edge(i, j));
                if system.is_pinned(j) {
                    b += w * current[j].coords;
                }
            }
            b
        };

        for axis in 0..3 {
            rhs[axis][i] = b[axis];
        }
    }

    rhs
}

/// Solve each axis against the cached factor and write free vertices.
///
/// Pinned vertices are left untouched so handle targets are reproduced
/// exactly.
pub fn solve_positions(system: &FactoredSystem, rhs: &[Vec<f64>; 3], current: &mut [Point3<f64>]) {
    for (axis, b) in rhs.iter().enumerate() {
        let x = system.solve(b);
        for (i, p) in current.iter_mut().enumerate() {
            if !system.is_pinned(i) {
                p[axis] = x[i];
            }
        }
    }
}
