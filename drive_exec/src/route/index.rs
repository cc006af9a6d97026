//! # Route index
//!
//! Spatial index over the route waypoints, used to find the waypoint the
//! vehicle is at (or about to reach) without scanning the whole route every
//! cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use std::sync::Arc;

// Internal
use super::{Route, RouteError};
use util::kd_tree::KdTree;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A route together with a k-d tree over its waypoint positions.
///
/// The index is built once at startup and shared (via [`Arc`]) between the
/// modules that need waypoint lookups.
pub struct RouteIndex {
    route: Arc<Route>,
    tree: KdTree
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RouteIndex {

    /// Build the index over the given route.
    pub fn build(route: Arc<Route>) -> Result<Self, RouteError> {
        let points: Vec<Vector2<f64>> = route
            .waypoints
            .iter()
            .map(|wp| wp.position2())
            .collect();

        let tree = KdTree::build(&points).map_err(|_| RouteError::EmptyRoute)?;

        Ok(Self { route, tree })
    }

    /// Get a reference to the indexed route.
    pub fn get_route(&self) -> &Route {
        &self.route
    }

    /// Get the index of the waypoint closest to the given map-frame position.
    pub fn nearest(&self, position_m: &Vector2<f64>) -> usize {
        self.tree.nearest(position_m).0
    }

    /// Get the index of the closest waypoint that is not behind the given
    /// position.
    ///
    /// The closest waypoint is found first, then the position is tested
    /// against the hyperplane through that waypoint perpendicular to the
    /// route direction there. A position beyond the hyperplane has already
    /// passed the waypoint, in which case the next one along the route is
    /// returned instead.
    pub fn nearest_ahead(&self, position_m: &Vector2<f64>) -> usize {
        let closest = self.nearest(position_m);
        let num_wps = self.route.waypoints.len();

        let prev = (closest + num_wps - 1) % num_wps;

        let closest_pos_m = self.route.waypoints[closest].position2();
        let prev_pos_m = self.route.waypoints[prev].position2();

        let route_dir = closest_pos_m - prev_pos_m;
        let to_position = position_m - closest_pos_m;

        if route_dir.dot(&to_position) > 0.0 {
            (closest + 1) % num_wps
        }
        else {
            closest
        }
    }

    /// Find the first stop line at or after the given waypoint index.
    ///
    /// `stop_line_wp_idxs` maps each stop line to the route waypoint it sits
    /// on. Returns the waypoint index of the stop line and the index of the
    /// line itself within the slice, or `None` if every stop line is behind
    /// the vehicle. Ties go to the earlier entry in the slice.
    pub fn next_stop_line(
        &self,
        car_wp_idx: usize,
        stop_line_wp_idxs: &[usize]
    ) -> Option<(usize, usize)> {
        let mut next: Option<(usize, usize)> = None;

        for (line_idx, &stop_wp_idx) in stop_line_wp_idxs.iter().enumerate() {
            if stop_wp_idx < car_wp_idx {
                continue;
            }

            match next {
                Some((next_wp_idx, _)) if next_wp_idx <= stop_wp_idx => (),
                _ => next = Some((stop_wp_idx, line_idx))
            }
        }

        next
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::route::Waypoint;
    use nalgebra::Vector3;

    /// A 4 waypoint square route, traversed anticlockwise from the origin
    fn square_route() -> Arc<Route> {
        let corners = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]];

        let waypoints = corners
            .iter()
            .map(|c| Waypoint {
                position_m: Vector3::new(c[0], c[1], 0.0),
                yaw_rad: 0.0,
                speed_ms: 5.0
            })
            .collect();

        Arc::new(Route::from_waypoints(waypoints).unwrap())
    }

    #[test]
    fn test_nearest() {
        let index = RouteIndex::build(square_route()).unwrap();

        assert_eq!(index.nearest(&Vector2::new(1.0, 1.0)), 0);
        assert_eq!(index.nearest(&Vector2::new(9.0, 1.0)), 1);
        assert_eq!(index.nearest(&Vector2::new(4.0, 9.0)), 3);
    }

    #[test]
    fn test_nearest_ahead() {
        let index = RouteIndex::build(square_route()).unwrap();

        // Approaching waypoint 1 from behind, the waypoint itself is still
        // ahead of the vehicle
        assert_eq!(index.nearest_ahead(&Vector2::new(8.0, 0.0)), 1);

        // Just past waypoint 0 (beyond the hyperplane through it), the next
        // waypoint along the route is the target
        assert_eq!(index.nearest_ahead(&Vector2::new(1.0, -0.5)), 1);

        // Short of waypoint 0 on the closing segment
        assert_eq!(index.nearest_ahead(&Vector2::new(0.0, 0.5)), 0);
    }

    #[test]
    fn test_next_stop_line() {
        let index = RouteIndex::build(square_route()).unwrap();

        let stop_lines = [3, 1, 3];

        // The earliest stop line at or after the vehicle wins, with ties
        // going to the first entry
        assert_eq!(index.next_stop_line(0, &stop_lines), Some((1, 1)));
        assert_eq!(index.next_stop_line(1, &stop_lines), Some((1, 1)));
        assert_eq!(index.next_stop_line(2, &stop_lines), Some((3, 0)));

        // No stop line ahead
        assert_eq!(index.next_stop_line(4, &stop_lines), None);

        // Vehicle exactly on a stop line waypoint still reports it
        assert_eq!(index.next_stop_line(3, &stop_lines), Some((3, 0)));
    }
}
