//! Cotangent edge weights.
//!
//! For a triangle `(i, j, k)` the edge `i-j` receives half the cotangent of
//! the angle at `k`. Interior edges accumulate two such contributions,
//! boundary edges one.

use std::collections::HashMap;

use nalgebra::Point3;

use crate::mesh::{OneRing, RestMesh};

use super::options::WeightPolicy;

/// Relative tolerance under which a corner is treated as degenerate.
const DEGENERATE_CORNER_TOLERANCE: f64 = 1e-12;

/// Symmetric per-edge weights computed once from the rest pose.
///
/// Weights are stored per undirected edge and mirrored per one-ring entry so
/// that the local and global steps can walk a vertex's neighbors and weights
/// side by side.
#[derive(Debug, Clone, Default)]
pub struct CotangentWeights {
    edges: HashMap<(usize, usize), f64>,
    /// `ring[i][k]` is the weight of the edge to `one_ring.neighbors(i)[k]`.
    ring: Vec<Vec<f64>>,
    /// Number of corners skipped because their cotangent was undefined.
    skipped_corners: usize,
}

impl CotangentWeights {
    /// Compute weights for every edge of `mesh`.
    pub fn compute(mesh: &RestMesh, one_ring: &OneRing, policy: WeightPolicy) -> Self {
        let vertices = mesh.vertices();

        let mut edges: HashMap<(usize, usize), f64> = one_ring.edges().map(|e| (e, 0.0)).collect();
        let mut skipped_corners = 0;

        for tri in mesh.triangles() {
            for k in 0..3 {
                let a = tri[k];
                let b = tri[(k + 1) % 3];
                let c = tri[(k + 2) % 3];

                // The angle at `a` is opposite the edge b-c.
                match cotangent_at(&vertices[a], &vertices[b], &vertices[c]) {
                    Some(cot) => {
                        *edges.entry(canonical_edge(b, c)).or_insert(0.0) += 0.5 * cot;
                    }
                    None => skipped_corners += 1,
                }
            }
        }

        for w in edges.values_mut() {
            *w = policy.apply(*w);
        }

        let ring = (0..one_ring.num_vertices())
            .map(|i| {
                one_ring
                    .neighbors(i)
                    .iter()
                    .map(|&j| edges[&canonical_edge(i, j)])
                    .collect()
            })
            .collect();

        if skipped_corners > 0 {
            log::debug!(
                "cotangent weights: skipped {} degenerate corners",
                skipped_corners
            );
        }

        Self {
            edges,
            ring,
            skipped_corners,
        }
    }

    /// Weight of the edge `i-j`, or `None` if it is not a mesh edge.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.edges.get(&canonical_edge(i, j)).copied()
    }

    /// Weights of the one-ring of `i`, aligned with `OneRing::neighbors(i)`.
    #[inline]
    pub fn ring(&self, i: usize) -> &[f64] {
        &self.ring[i]
    }

    /// Sum of the weights around vertex `i` (the Laplacian diagonal).
    pub fn ring_sum(&self, i: usize) -> f64 {
        self.ring[i].iter().sum()
    }

    /// Number of undirected edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Number of triangle corners whose cotangent was undefined.
    #[inline]
    pub fn skipped_corners(&self) -> usize {
        self.skipped_corners
    }

    /// Iterate over `((i, j), weight)` with `i < j`.
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), f64)> + '_ {
        self.edges.iter().map(|(&e, &w)| (e, w))
    }
}

/// Cotangent of the angle at `a` in triangle `(a, b, c)`.
///
/// Returns `None` when the angle is undefined (zero-length sides or
/// collinear points) or the result is not finite.
pub fn cotangent_at(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Option<f64> {
    let ab = b - a;
    let ac = c - a;

    let scale = ab.norm() * ac.norm();
    let cross_len = ab.cross(&ac).norm();

    if !(scale > 0.0) || cross_len <= DEGENERATE_CORNER_TOLERANCE * scale {
        return None;
    }

    let cot = ab.dot(&ac) / cross_len;
    cot.is_finite().then_some(cot)
}

/// Get canonical edge representation (smaller index first).
#[inline]
fn canonical_edge(v0: usize, v1: usize) -> (usize, usize) {
    if v0 < v1 {
        (v0, v1)
    } else {
        (v1, v0)
    }
}
