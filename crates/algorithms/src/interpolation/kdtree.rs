//! 3-D k-d tree for nearest-site queries
//!
//! Used to seed point location in the tetrahedral mesh: the walk starts
//! from a tetrahedron incident to the nearest site, which keeps walks short
//! and independent of query order.
//!
//! Reference:
//! Bentley, J.L. (1975). Multidimensional binary search trees used
//! for associative searching. CACM, 18(9).

use super::Site;

/// A 3-D k-d tree over a fixed set of sites.
#[derive(Debug, Clone)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    points: Vec<Site>,
}

#[derive(Debug, Clone)]
struct KdNode {
    /// Index into `points`
    point_idx: usize,
    /// Split axis: 0 = x, 1 = y, 2 = z
    split_dim: u8,
    left: Option<usize>,
    right: Option<usize>,
}

/// Result of a nearest-neighbor query
#[derive(Debug, Clone, Copy)]
pub struct NearestResult {
    pub point: Site,
    pub distance_sq: f64,
    /// Index of the site in the slice the tree was built from
    pub index: usize,
}

impl KdTree {
    /// Build a k-d tree. Construction is O(n log² n) with median splits.
    pub fn build(points: &[Site]) -> Self {
        let mut nodes = Vec::with_capacity(points.len());
        if !points.is_empty() {
            let mut indices: Vec<usize> = (0..points.len()).collect();
            build_recursive(points, &mut indices, 0, &mut nodes);
        }

        Self {
            nodes,
            points: points.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Find the nearest site to `q`. Returns `None` if the tree is empty.
    pub fn nearest(&self, q: &Site) -> Option<NearestResult> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut best_dist_sq = f64::MAX;
        let mut best_idx = self.nodes[0].point_idx;
        self.nearest_recursive(0, q, &mut best_dist_sq, &mut best_idx);

        Some(NearestResult {
            point: self.points[best_idx],
            distance_sq: best_dist_sq,
            index: best_idx,
        })
    }

    fn nearest_recursive(&self, node_idx: usize, q: &Site, best_dist_sq: &mut f64, best_idx: &mut usize) {
        let node = &self.nodes[node_idx];
        let p = &self.points[node.point_idx];

        let dist_sq = p.dist_sq(q);
        if dist_sq < *best_dist_sq {
            *best_dist_sq = dist_sq;
            *best_idx = node.point_idx;
        }

        let axis = node.split_dim as usize;
        let diff = q.coord(axis) - p.coord(axis);
        let (first, second) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(child) = first {
            self.nearest_recursive(child, q, best_dist_sq, best_idx);
        }

        if diff * diff < *best_dist_sq {
            if let Some(child) = second {
                self.nearest_recursive(child, q, best_dist_sq, best_idx);
            }
        }
    }
}

fn build_recursive(points: &[Site], indices: &mut [usize], depth: usize, nodes: &mut Vec<KdNode>) -> usize {
    let axis = depth % 3;

    indices.sort_by(|&a, &b| {
        points[a]
            .coord(axis)
            .partial_cmp(&points[b].coord(axis))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let median = indices.len() / 2;
    let node_idx = nodes.len();
    nodes.push(KdNode {
        point_idx: indices[median],
        split_dim: axis as u8,
        left: None,
        right: None,
    });

    let (lower, rest) = indices.split_at_mut(median);
    let upper = &mut rest[1..];

    if !lower.is_empty() {
        let left = build_recursive(points, lower, depth + 1, nodes);
        nodes[node_idx].left = Some(left);
    }
    if !upper.is_empty() {
        let right = build_recursive(points, upper, depth + 1, nodes);
        nodes[node_idx].right = Some(right);
    }

    node_idx
}
