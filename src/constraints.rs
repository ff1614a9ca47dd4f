//! Handle constraints: which vertices are pinned, and where to.
//!
//! A [`Constraints`] set is what a selection tool or a landmark matcher
//! produces: pairs of mesh vertex and target position. It converts into the
//! boolean handle mask the solver factors, writes targets into a positions
//! buffer, and offers two cheap initial guesses for large displacements:
//!
//! - [`Constraints::align`] translates the whole mesh by the mean
//!   handle-to-target offset
//! - [`Constraints::scale`] scales the whole mesh about its centroid so the
//!   handles' extent matches the targets' extent
//!
//! Starting ARAP from an aligned, scaled pose needs far fewer iterations than
//! starting from the rest pose.

use nalgebra::{Point3, Vector3};

use crate::error::{DeformError, Result};
use crate::mesh::bounding_box;

/// Bounding-box diagonal under which a point set counts as a single point.
const MIN_EXTENT: f64 = 1e-12;

/// A list of `(vertex, target)` pinning constraints.
///
/// If a vertex appears more than once, the last target wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    entries: Vec<(usize, Point3<f64>)>,
}

impl Constraints {
    /// Create an empty constraint set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin `vertex` to `target`.
    pub fn push(&mut self, vertex: usize, target: Point3<f64>) {
        self.entries.push((vertex, target));
    }

    /// Number of constraints.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no constraints.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(vertex, target)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Point3<f64>)> + '_ {
        self.entries.iter().copied()
    }

    /// Boolean handle mask for a mesh with `n_vertices` vertices.
    pub fn handle_mask(&self, n_vertices: usize) -> Result<Vec<bool>> {
        self.check_range(n_vertices)?;
        let mut mask = vec![false; n_vertices];
        for &(v, _) in &self.entries {
            mask[v] = true;
        }
        Ok(mask)
    }

    /// Write each target into `positions`.
    pub fn apply_targets(&self, positions: &mut [Point3<f64>]) -> Result<()> {
        self.check_range(positions.len())?;
        for &(v, target) in &self.entries {
            positions[v] = target;
        }
        Ok(())
    }

    /// Average offset from the constrained vertices' current positions to
    /// their targets.
    ///
    /// Returns `None` if the set is empty, references a vertex outside
    /// `positions`, or the result is not finite.
    pub fn mean_translation(&self, positions: &[Point3<f64>]) -> Option<Vector3<f64>> {
        if self.is_empty() || self.check_range(positions.len()).is_err() {
            return None;
        }

        let sum: Vector3<f64> = self
            .entries
            .iter()
            .map(|&(v, target)| target - positions[v])
            .sum();
        let mean = sum / self.len() as f64;

        mean.iter().all(|c| c.is_finite()).then_some(mean)
    }

    /// Ratio of the targets' bounding-box diagonal to the constrained
    /// vertices' bounding-box diagonal.
    ///
    /// Returns `None` if either box is degenerate or the ratio is not finite.
    pub fn scale_factor(&self, positions: &[Point3<f64>]) -> Option<f64> {
        if self.check_range(positions.len()).is_err() {
            return None;
        }

        let current: Vec<Point3<f64>> = self.entries.iter().map(|&(v, _)| positions[v]).collect();
        let targets: Vec<Point3<f64>> = self.entries.iter().map(|&(_, t)| t).collect();

        let diagonal = |points: &[Point3<f64>]| {
            bounding_box(points).map(|(min, max)| (max - min).norm())
        };
        let from = diagonal(&current)?;
        let to = diagonal(&targets)?;

        if !(from > MIN_EXTENT) || !(to > MIN_EXTENT) {
            return None;
        }
        let ratio = to / from;
        ratio.is_finite().then_some(ratio)
    }

    /// Translate every vertex by [`mean_translation`](Self::mean_translation).
    ///
    /// Returns the applied translation, or `None` if nothing was changed.
    pub fn align(&self, positions: &mut [Point3<f64>]) -> Option<Vector3<f64>> {
        let t = self.mean_translation(positions)?;
        log::debug!("aligning mesh by ({:.4}, {:.4}, {:.4})", t.x, t.y, t.z);
        for p in positions.iter_mut() {
            *p += t;
        }
        Some(t)
    }

    /// Scale every vertex about the mesh centroid by
    /// [`scale_factor`](Self::scale_factor).
    ///
    /// Returns the applied factor, or `None` if nothing was changed.
    pub fn scale(&self, positions: &mut [Point3<f64>]) -> Option<f64> {
        let factor = self.scale_factor(positions)?;

        let centroid = positions
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords)
            / positions.len() as f64;

        log::debug!("scaling mesh by {:.4} about its centroid", factor);
        for p in positions.iter_mut() {
            p.coords = centroid + (p.coords - centroid) * factor;
        }
        Some(factor)
    }

    fn check_range(&self, n_vertices: usize) -> Result<()> {
        match self.entries.iter().find(|&&(v, _)| v >= n_vertices) {
            Some(&(v, _)) => Err(DeformError::invalid_param(
                "constraint vertex",
                v,
                "index out of range",
            )),
            None => Ok(()),
        }
    }
}

impl FromIterator<(usize, Point3<f64>)> for Constraints {
    fn from_iter<T: IntoIterator<Item = (usize, Point3<f64>)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
