//! ARAP energy evaluation.

use nalgebra::{Matrix3, Point3};

use crate::mesh::{OneRing, RestMesh};

use super::weights::CotangentWeights;

/// `Σ_i Σ_{j∈N(i)} w_ij ‖(p'_i - p'_j) - R_i (p_i - p_j)‖²`.
///
/// Each undirected edge is visited from both endpoints, once with each
/// endpoint's rotation.
pub fn arap_energy(
    rest: &RestMesh,
    one_ring: &OneRing,
    weights: &CotangentWeights,
    current: &[Point3<f64>],
    rotations: &[Matrix3<f64>],
) -> f64 {
    (0..rest.num_vertices())
        .map(|i| {
            one_ring
                .neighbors(i)
                .iter()
                .zip(weights.ring(i))
                .map(|(&j, &w)| {
                    let residual = (current[i] - current[j]) - rotations[i] * rest.edge(i, j);
                    w * residual.norm_squared()
                })
                .sum::<f64>()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deform::options::WeightPolicy;
    use nalgebra::{Rotation3, Vector3};

    #[test]
    fn test_rigid_motion_has_zero_energy() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let rest = RestMesh::new(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap();
        let ring = OneRing::from_triangles(4, rest.triangles());
        let weights = CotangentWeights::compute(&rest, &ring, WeightPolicy::Clamped);

        let rot = Rotation3::from_axis_angle(&Vector3::x_axis(), 0.9);
        let shift = Vector3::new(0.5, -2.0, 3.0);
        let current: Vec<_> = vertices.iter().map(|p| rot * p + shift).collect();
        let rotations = vec![*rot.matrix(); 4];

        let e = arap_energy(&rest, &ring, &weights, &current, &rotations);
        assert!(e.abs() < 1e-20);

        // Wrong rotations are penalized.
        let identity = vec![Matrix3::identity(); 4];
        assert!(arap_energy(&rest, &ring, &weights, &current, &identity) > 1e-3);
    }
}
