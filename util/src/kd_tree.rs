//! # K-d Tree Implementation
//!
//! This is an implementation of a two dimensional k-d tree, as described in
//! [the wikipedia article](https://en.wikipedia.org/wiki/K-d_tree). The tree
//! is built once over a fixed set of points and answers nearest neighbour
//! queries in `O(log n)` on average, rather than the `O(n)` of a linear scan.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use ordered_float::OrderedFloat;

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// A balanced two dimensional k-d tree.
///
/// Each point keeps the index it had in the slice the tree was built from, so
/// queries can be mapped back to the caller's own data.
#[derive(Clone, Debug)]
pub struct KdTree {
    /// The root node of the tree, present for any successfully built tree
    root: Node,

    /// Number of points stored in the tree
    num_points: usize
}

/// A single node of the tree, splitting space at `point` along `axis`.
#[derive(Clone, Debug)]
struct Node {
    /// The point stored in this node
    point: Vector2<f64>,

    /// The index of the point in the original slice
    index: usize,

    /// The axis this node splits along (0 = x, 1 = y)
    axis: usize,

    /// Child containing points below `point[axis]`
    left: Option<Box<Node>>,

    /// Child containing points at or above `point[axis]`
    right: Option<Box<Node>>
}

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum KdTreeError {
    #[error("Cannot build a tree from an empty set of points")]
    NoPoints,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl KdTree {
    /// Build a balanced tree over the given points.
    ///
    /// The index returned by queries is the index of the point in `points`.
    pub fn build(points: &[Vector2<f64>]) -> Result<Self, KdTreeError> {
        if points.is_empty() {
            return Err(KdTreeError::NoPoints);
        }

        let mut indexed: Vec<(Vector2<f64>, usize)> = points
            .iter()
            .copied()
            .enumerate()
            .map(|(i, p)| (p, i))
            .collect();

        Ok(Self {
            root: build_node(&mut indexed, 0),
            num_points: points.len()
        })
    }

    /// Find the point closest to `query`.
    ///
    /// Returns the index of the closest point and the square of its distance
    /// to the query.
    pub fn nearest(&self, query: &Vector2<f64>) -> (usize, f64) {
        let mut best_index = self.root.index;
        let mut best_dist_sq = f64::INFINITY;

        nearest_in_node(&self.root, query, &mut best_index, &mut best_dist_sq);

        (best_index, best_dist_sq)
    }

    /// Get the number of points stored in the tree
    pub fn get_num_points(&self) -> usize {
        self.num_points
    }
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Recursively build the node for the given set of points.
///
/// The median point along `axis` becomes this node, the halves either side of
/// it become the children, split along the next axis.
fn build_node(points: &mut [(Vector2<f64>, usize)], axis: usize) -> Node {
    points.sort_unstable_by_key(|&(p, _)| OrderedFloat(p[axis]));

    let median = points.len() / 2;
    let (point, index) = points[median];

    let next_axis = (axis + 1) % 2;
    let (below, at_or_above) = points.split_at_mut(median);

    let left = if below.is_empty() {
        None
    }
    else {
        Some(Box::new(build_node(below, next_axis)))
    };

    let right = if at_or_above[1..].is_empty() {
        None
    }
    else {
        Some(Box::new(build_node(&mut at_or_above[1..], next_axis)))
    };

    Node {
        point,
        index,
        axis,
        left,
        right
    }
}

/// Search the subtree rooted at `node`, updating the best match found so far.
fn nearest_in_node(
    node: &Node,
    query: &Vector2<f64>,
    best_index: &mut usize,
    best_dist_sq: &mut f64
) {
    let dist_sq = (node.point - query).norm_squared();

    if dist_sq < *best_dist_sq {
        *best_dist_sq = dist_sq;
        *best_index = node.index;
    }

    // Distance from the query to this node's splitting plane
    let to_plane = query[node.axis] - node.point[node.axis];

    let (near, far) = if to_plane < 0.0 {
        (&node.left, &node.right)
    }
    else {
        (&node.right, &node.left)
    };

    if let Some(ref child) = near {
        nearest_in_node(child, query, best_index, best_dist_sq);
    }

    // The far side can only hold a closer point if the plane itself is closer
    // than the best match found so far
    if to_plane * to_plane < *best_dist_sq {
        if let Some(ref child) = far {
            nearest_in_node(child, query, best_index, best_dist_sq);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Simple deterministic congruential sequence, good enough for scattering
    /// test points about.
    fn scatter(n: usize) -> Vec<Vector2<f64>> {
        let mut seed: u64 = 0x2545F4914F6CDD1D;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((seed >> 33) as f64 / (1u64 << 31) as f64) * 200.0 - 100.0
        };

        (0..n).map(|_| Vector2::new(next(), next())).collect()
    }

    fn nearest_linear(points: &[Vector2<f64>], query: &Vector2<f64>) -> (usize, f64) {
        let mut best = (0, f64::INFINITY);

        for (i, p) in points.iter().enumerate() {
            let d = (p - query).norm_squared();
            if d < best.1 {
                best = (i, d);
            }
        }

        best
    }

    #[test]
    fn test_empty() {
        assert!(KdTree::build(&[]).is_err());
    }

    #[test]
    fn test_nearest_simple() {
        let points = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 0.0),
            Vector2::new(10.0, 10.0),
            Vector2::new(0.0, 10.0),
        ];

        let tree = KdTree::build(&points).unwrap();

        assert_eq!(tree.get_num_points(), 4);
        assert_eq!(tree.nearest(&Vector2::new(1.0, 1.0)).0, 0);
        assert_eq!(tree.nearest(&Vector2::new(9.0, 2.0)).0, 1);
        assert_eq!(tree.nearest(&Vector2::new(11.0, 11.0)).0, 2);
        assert_eq!(tree.nearest(&Vector2::new(-3.0, 12.0)).0, 3);

        // Query on a stored point returns that point at zero distance
        let (i, d_sq) = tree.nearest(&Vector2::new(10.0, 0.0));
        assert_eq!(i, 1);
        assert_eq!(d_sq, 0.0);
    }

    #[test]
    fn test_nearest_matches_linear_scan() {
        let points = scatter(500);
        let queries = scatter(100);

        let tree = KdTree::build(&points).unwrap();

        for query in queries.iter() {
            let (tree_idx, tree_dist_sq) = tree.nearest(query);
            let (lin_idx, lin_dist_sq) = nearest_linear(&points, query);

            // Indices may differ only if two points are exactly equidistant
            assert_eq!(tree_dist_sq, lin_dist_sq);
            if tree_idx != lin_idx {
                let d_tree = (points[tree_idx] - query).norm_squared();
                assert_eq!(d_tree, lin_dist_sq);
            }
        }
    }
}
