//! Local step: per-vertex best-fit rotations.
//!
//! For vertex `i` the weighted covariance of rest and deformed one-ring edges
//! is `S_i = Σ_j w_ij (p_i - p_j)(p'_i - p'_j)ᵀ`. With `S_i = U Σ Vᵀ` the
//! rotation minimizing the one-ring's rigidity error is `R_i = V Uᵀ`,
//! corrected to a proper rotation when it comes out as a reflection.

use nalgebra::{Matrix3, Point3};
use rayon::prelude::*;

use crate::mesh::{OneRing, RestMesh};

use super::weights::CotangentWeights;

/// Relative size of the second singular value under which a covariance is
/// treated as rank-deficient (collinear or empty one-ring).
pub const RANK_TOLERANCE: f64 = 1e-10;

/// Weighted edge covariance of vertex `i`.
pub fn covariance(
    i: usize,
    rest: &RestMesh,
    one_ring: &OneRing,
    weights: &CotangentWeights,
    current: &[Point3<f64>],
) -> Matrix3<f64> {
    let mut s = Matrix3::zeros();
    for (&j, &w) in one_ring.neighbors(i).iter().zip(weights.ring(i)) {
        let e_rest = rest.edge(i, j);
        let e_def = current[i] - current[j];
        s += w * e_rest * e_def.transpose();
    }
    s
}

/// Closest proper rotation to the covariance `s`.
///
/// Returns `None` when `s` is non-finite or has rank below two; the caller
/// substitutes the identity.
pub fn fit_rotation(s: &Matrix3<f64>) -> Option<Matrix3<f64>> {
    if !s.iter().all(|x| x.is_finite()) {
        return None;
    }

    let svd = s.svd(true, true);
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return None,
    };

    let sigma = svd.singular_values;
    let mut sorted = [sigma[0], sigma[1], sigma[2]];
    sorted.sort_by(|a, b| b.total_cmp(a));
    if !(sorted[0] > f64::MIN_POSITIVE) || sorted[1] <= RANK_TOLERANCE * sorted[0] {
        return None;
    }

    let v = v_t.transpose();
    let mut r = v * u.transpose();

    if r.determinant() < 0.0 {
        // Flip the singular vector of the smallest singular value.
        let smallest = sigma.imin();
        let mut u_fixed = u;
        for row in 0..3 {
            u_fixed[(row, smallest)] = -u_fixed[(row, smallest)];
        }
        r = v * u_fixed.transpose();
    }

    Some(r)
}

/// Fit one rotation per vertex into `rotations`.
///
/// `rotations` is resized to the vertex count. Returns the number of vertices
/// that fell back to the identity.
pub fn fit_rotations(
    rest: &RestMesh,
    one_ring: &OneRing,
    weights: &CotangentWeights,
    current: &[Point3<f64>],
    parallel: bool,
    rotations: &mut Vec<Matrix3<f64>>,
) -> usize {
    let n = rest.num_vertices();
    let fit = |i: usize| fit_rotation(&covariance(i, rest, one_ring, weights, current));

    let fitted: Vec<Option<Matrix3<f64>>> = if parallel {
        (0..n).into_par_iter().map(fit).collect()
    } else {
        (0..n).map(fit).collect()
    };

    rotations.clear();
    rotations.reserve(n);
    let mut fallbacks = 0;
    for r in fitted {
        match r {
            Some(r) => rotations.push(r),
            None => {
                fallbacks += 1;
                rotations.push(Matrix3::identity());
            }
        }
    }

    if fallbacks > 0 {
        log::debug!("local step: {} vertices fell back to the identity rotation", fallbacks);
    }
    fallbacks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deform::options::WeightPolicy;
    use nalgebra::{Rotation3, Vector3};

    #[test]
    fn test_identity_covariance() {
        let r = fit_rotation(&Matrix3::identity()).unwrap();
        assert!((r - Matrix3::identity()).norm() < 1e-10);
    }

    #[test]
    fn test_recovers_rotation() {
        // S = Σ e e'^T with e' = R e gives S = E Eᵀ Rᵀ, whose fit is R.
        let rot = Rotation3::from_axis_angle(&Vector3::z_axis(), 0.7)
            * Rotation3::from_axis_angle(&Vector3::x_axis(), -0.3);
        let edges = [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 2.0, 0.0),
            Vector3::new(0.3, 0.1, 1.5),
        ];
        let mut s = Matrix3::zeros();
        for e in &edges {
            s += e * (rot * e).transpose();
        }

        let r = fit_rotation(&s).unwrap();
        assert!((r - rot.matrix()).norm() < 1e-9);
    }

    #[test]
    fn test_reflection_is_corrected() {
        // A mirror across the xy plane: the best proper rotation has det +1.
        let s = Matrix3::new(2.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, -0.5);
        let r = fit_rotation(&s).unwrap();
        assert!((r.determinant() - 1.0).abs() < 1e-10);
        assert!((r * r.transpose() - Matrix3::identity()).norm() < 1e-10);
    }

    #[test]
    fn test_planar_covariance_is_regular() {
        let rot = Rotation3::from_axis_angle(&Vector3::z_axis(), 1.2);
        let edges = [Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0)];
        let mut s = Matrix3::zeros();
        for e in &edges {
            s += e * (rot * e).transpose();
        }
        let r = fit_rotation(&s).unwrap();
        assert!((r - rot.matrix()).norm() < 1e-9);
    }

    #[test]
    fn test_degenerate_covariances() {
        assert!(fit_rotation(&Matrix3::zeros()).is_none());

        // Rank one: all edges collinear.
        let e = Vector3::new(1.0, 1.0, 0.0);
        assert!(fit_rotation(&(e * e.transpose())).is_none());

        let mut s = Matrix3::identity();
        s[(0, 1)] = f64::NAN;
        assert!(fit_rotation(&s).is_none());
    }

    #[test]
    fn test_fit_rotations_collinear_ring() {
        // Vertex 3 only touches collinear points 0, 1, 2 via flat triangles.
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
        ];
        let triangles = vec![[0, 1, 2], [1, 2, 3]];
        let rest = RestMesh::new(&vertices, &triangles).unwrap();
        let ring = OneRing::from_triangles(4, rest.triangles());
        let weights = CotangentWeights::compute(&rest, &ring, WeightPolicy::Clamped);

        let mut rotations = Vec::new();
        let fallbacks = fit_rotations(&rest, &ring, &weights, &vertices, false, &mut rotations);

        assert_eq!(rotations.len(), 4);
        assert_eq!(fallbacks, 4);
        for r in &rotations {
            assert!((r.determinant() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.2),
        ];
        let triangles = vec![[0, 1, 2], [0, 2, 3]];
        let rest = RestMesh::new(&vertices, &triangles).unwrap();
        let ring = OneRing::from_triangles(4, rest.triangles());
        let weights = CotangentWeights::compute(&rest, &ring, WeightPolicy::Clamped);

        let rot = Rotation3::from_axis_angle(&Vector3::y_axis(), 0.4);
        let current: Vec<_> = vertices.iter().map(|p| rot * p).collect();

        let mut seq = Vec::new();
        let mut par = Vec::new();
        fit_rotations(&rest, &ring, &weights, &current, false, &mut seq);
        fit_rotations(&rest, &ring, &weights, &current, true, &mut par);

        for (a, b) in seq.iter().zip(&par) {
            assert_eq!(a, b);
        }
        for r in &seq {
            assert!((r - rot.matrix()).norm() < 1e-9);
        }
    }
}
