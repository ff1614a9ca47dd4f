//! One-ring adjacency derived from triangle lists.

use std::collections::VecDeque;

/// Vertex adjacency: for each vertex, the sorted set of vertices sharing an
/// edge with it.
///
/// The relation is symmetric: `j` is in the ring of `i` exactly when `i` is
/// in the ring of `j`. Vertices not referenced by any triangle have an empty
/// ring and are called *isolated*.
#[derive(Debug, Clone, Default)]
pub struct OneRing {
    neighbors: Vec<Vec<usize>>,
}

impl OneRing {
    /// Build the one-ring of every vertex from triangle edges.
    ///
    /// Triangle indices must already be validated against `n_vertices`.
    pub fn from_triangles(n_vertices: usize, triangles: &[[usize; 3]]) -> Self {
        let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); n_vertices];

        for tri in triangles {
            for k in 0..3 {
                let a = tri[k];
                let b = tri[(k + 1) % 3];
                neighbors[a].push(b);
                neighbors[b].push(a);
            }
        }

        for ring in &mut neighbors {
            ring.sort_unstable();
            ring.dedup();
        }

        Self { neighbors }
    }

    /// Number of vertices covered.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.neighbors.len()
    }

    /// Neighbors of vertex `v`, sorted ascending.
    #[inline]
    pub fn neighbors(&self, v: usize) -> &[usize] {
        &self.neighbors[v]
    }

    /// Number of neighbors of `v`.
    #[inline]
    pub fn degree(&self, v: usize) -> usize {
        self.neighbors[v].len()
    }

    /// Whether `v` belongs to no triangle.
    #[inline]
    pub fn is_isolated(&self, v: usize) -> bool {
        self.neighbors[v].is_empty()
    }

    /// Whether `i` and `j` share an edge.
    pub fn contains(&self, i: usize, j: usize) -> bool {
        self.neighbors
            .get(i)
            .is_some_and(|ring| ring.binary_search(&j).is_ok())
    }

    /// Iterate over undirected edges `(i, j)` with `i < j`.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.neighbors.iter().enumerate().flat_map(|(i, ring)| {
            ring.iter()
                .copied()
                .filter(move |&j| i < j)
                .map(move |j| (i, j))
        })
    }

    /// Label connected components.
    ///
    /// Returns one label per vertex and the number of components. Isolated
    /// vertices each form their own component.
    pub fn components(&self) -> (Vec<usize>, usize) {
        let n = self.neighbors.len();
        let mut labels = vec![usize::MAX; n];
        let mut count = 0;
        let mut queue = VecDeque::new();

        for start in 0..n {
            if labels[start] != usize::MAX {
                continue;
            }
            labels[start] = count;
            queue.push_back(start);
            while let Some(v) = queue.pop_front() {
                for &w in &self.neighbors[v] {
                    if labels[w] == usize::MAX {
                        labels[w] = count;
                        queue.push_back(w);
                    }
                }
            }
            count += 1;
        }

        (labels, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_triangles() -> OneRing {
        // Unit square split along the 0-2 diagonal, plus an unused vertex 4.
        OneRing::from_triangles(5, &[[0, 1, 2], [0, 2, 3]])
    }

    #[test]
    fn test_neighbors_sorted_and_unique() {
        let ring = two_triangles();
        assert_eq!(ring.neighbors(0), &[1, 2, 3]);
        assert_eq!(ring.neighbors(1), &[0, 2]);
        assert_eq!(ring.neighbors(2), &[0, 1, 3]);
        assert_eq!(ring.degree(3), 2);
    }

    #[test]
    fn test_symmetry() {
        let ring = two_triangles();
        for i in 0..ring.num_vertices() {
            for &j in ring.neighbors(i) {
                assert!(ring.contains(j, i), "{} in ring of {} but not vice versa", i, j);
            }
        }
    }

    #[test]
    fn test_isolated_vertex() {
        let ring = two_triangles();
        assert!(ring.is_isolated(4));
        assert!(!ring.is_isolated(0));
        assert!(!ring.contains(4, 0));
    }

    #[test]
    fn test_edges() {
        let ring = two_triangles();
        let edges: Vec<_> = ring.edges().collect();
        assert_eq!(edges, vec![(0, 1), (0, 2), (0, 3), (1, 2), (2, 3)]);
    }

    #[test]
    fn test_components() {
        let ring = OneRing::from_triangles(7, &[[0, 1, 2], [3, 4, 5]]);
        let (labels, count) = ring.components();
        // two triangles plus isolated vertex 6
        assert_eq!(count, 3);
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[3], labels[5]);
        assert_ne!(labels[0], labels[3]);
        assert_ne!(labels[6], labels[0]);
    }
}
