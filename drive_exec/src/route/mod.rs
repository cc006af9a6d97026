//! # Route
//!
//! This module defines the route followed by the vehicle: a fixed, ordered
//! list of waypoints loaded once at startup. The route is treated as a loop,
//! the waypoint after the last is the first.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod index;

pub use index::RouteIndex;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single waypoint of the route.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    /// Position of the waypoint in the map frame.
    ///
    /// Units: meters
    pub position_m: Vector3<f64>,

    /// Heading of the route at this waypoint (angle to the map X axis).
    ///
    /// Units: radians
    pub yaw_rad: f64,

    /// Nominal speed of the route at this waypoint.
    ///
    /// Units: meters/second
    pub speed_ms: f64
}

/// The route the vehicle is to follow.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Route {
    pub waypoints: Vec<Waypoint>
}

/// A single row of a route CSV file.
#[derive(Debug, Deserialize)]
struct RouteRecord {
    x_m: f64,
    y_m: f64,
    z_m: f64,
    yaw_rad: f64,
    speed_ms: f64
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("The route contains no waypoints")]
    EmptyRoute,

    #[error("Could not load the route file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Could not read a route record: {0}")]
    RecordError(csv::Error)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Waypoint {
    /// Return the 2D position of the waypoint in the map frame.
    pub fn position2(&self) -> Vector2<f64> {
        Vector2::new(self.position_m[0], self.position_m[1])
    }
}

impl Route {

    /// Load a route from the CSV file at the given path.
    ///
    /// The file shall have the header `x_m,y_m,z_m,yaw_rad,speed_ms` and one
    /// row per waypoint.
    pub fn from_csv<P: AsRef<std::path::Path>>(path: P) -> Result<Self, RouteError> {
        let file = std::fs::File::open(path).map_err(RouteError::FileLoadError)?;
        Self::from_reader(file)
    }

    /// Load a route from any CSV reader.
    pub fn from_reader<R: std::io::Read>(rdr: R) -> Result<Self, RouteError> {
        let mut reader = csv::Reader::from_reader(rdr);

        let mut waypoints = Vec::new();

        for record in reader.deserialize() {
            let record: RouteRecord = record.map_err(RouteError::RecordError)?;

            waypoints.push(Waypoint {
                position_m: Vector3::new(record.x_m, record.y_m, record.z_m),
                yaw_rad: record.yaw_rad,
                speed_ms: record.speed_ms
            });
        }

        Self::from_waypoints(waypoints)
    }

    /// Build a route directly from a list of waypoints.
    pub fn from_waypoints(waypoints: Vec<Waypoint>) -> Result<Self, RouteError> {
        if waypoints.is_empty() {
            return Err(RouteError::EmptyRoute);
        }

        Ok(Self { waypoints })
    }

    /// Get the number of waypoints in the route
    pub fn get_num_waypoints(&self) -> usize {
        self.waypoints.len()
    }

    /// Get the total length of the route polyline in meters.
    ///
    /// This does not include the wrap-around segment from the last waypoint
    /// back to the first.
    pub fn get_length_m(&self) -> f64 {
        self.distance_between_m(0, self.waypoints.len() - 1)
    }

    /// Get the distance in meters along the route from `from_idx` to
    /// `to_idx`, following the waypoint polyline.
    ///
    /// If `from_idx >= to_idx` the distance is zero.
    pub fn distance_between_m(&self, from_idx: usize, to_idx: usize) -> f64 {
        if from_idx >= to_idx || to_idx >= self.waypoints.len() {
            return 0.0;
        }

        let mut dist_m = 0.0;

        for i in from_idx..to_idx {
            dist_m += (self.waypoints[i + 1].position2()
                - self.waypoints[i].position2())
                .norm();
        }

        dist_m
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Build a straight route along the X axis with the given spacing
    pub(crate) fn straight_route(num_wps: usize, spacing_m: f64, speed_ms: f64) -> Route {
        let waypoints = (0..num_wps)
            .map(|i| Waypoint {
                position_m: Vector3::new(i as f64 * spacing_m, 0.0, 0.0),
                yaw_rad: 0.0,
                speed_ms
            })
            .collect();

        Route::from_waypoints(waypoints).unwrap()
    }

    #[test]
    fn test_empty_route() {
        assert!(matches!(
            Route::from_waypoints(vec![]),
            Err(RouteError::EmptyRoute)
        ));
    }

    #[test]
    fn test_from_reader() {
        let csv = "\
            x_m,y_m,z_m,yaw_rad,speed_ms\n\
            0.0,0.0,0.0,0.0,11.1\n\
            1.0,0.0,0.0,0.0,11.1\n\
            2.0,1.0,0.0,0.785,11.1\n";

        let route = Route::from_reader(csv.as_bytes()).unwrap();

        assert_eq!(route.get_num_waypoints(), 3);
        assert_eq!(route.waypoints[2].position_m[1], 1.0);
        assert_eq!(route.waypoints[2].yaw_rad, 0.785);
    }

    #[test]
    fn test_distances() {
        let route = straight_route(11, 2.0, 5.0);

        assert_eq!(route.get_length_m(), 20.0);
        assert_eq!(route.distance_between_m(3, 7), 8.0);
        assert_eq!(route.distance_between_m(7, 3), 0.0);
        assert_eq!(route.distance_between_m(5, 5), 0.0);
    }
}
