// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Boundary between route construction and the graph search producing raw paths.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::geometry::{Path, Point};
use crate::profile::{AccessFlags, Gradient, Profile, RoadType};
use crate::route::PathToJunction;
use crate::Error;

/// Finds raw paths through a road network.
///
/// Implementations run on a worker thread when used through
/// [Navigator::request_route](crate::Navigator::request_route), and should poll
/// the [CancellationToken] regularly, giving up with [Error::Cancel] once it's set.
pub trait Router: Send + Sync {
    /// Finds a path visiting all `waypoints` in order. Each pair of consecutive
    /// waypoints produces a section, numbered from zero.
    ///
    /// With `best_effort` set, unreachable intermediate waypoints are skipped
    /// instead of failing the whole route.
    fn find_route(
        &self,
        profile: &Profile,
        waypoints: &[RoutePoint],
        best_effort: bool,
        cancel: &CancellationToken,
    ) -> Result<RawRoute, Error>;
}

/// Cooperative cancellation flag shared between a requester and a worker.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Returns [Error::Cancel] if cancellation was requested.
    pub fn check(&self) -> Result<(), Error> {
        if self.is_canceled() {
            Err(Error::Cancel)
        } else {
            Ok(())
        }
    }
}

/// Controls how a [RoutePoint] is matched to the road network.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LocationMatchParam {
    /// Accuracy of the position, in metres. Zero means the default of 8.
    pub location_accuracy: f64,

    /// Accuracy of the heading, in degrees. Zero means the default of 22.5.
    pub heading_accuracy: f64,

    /// Roads further away than this (in metres) are never matched.
    /// Zero means the default of 100.
    pub max_road_distance: f64,
}

impl LocationMatchParam {
    pub const DEFAULT_LOCATION_ACCURACY: f64 = 8.0;
    pub const DEFAULT_HEADING_ACCURACY: f64 = 22.5;
    pub const DEFAULT_MAX_ROAD_DISTANCE: f64 = 100.0;

    /// Replaces zero (and invalid) values with defaults and clamps all fields:
    /// location accuracy to 1..1000, heading accuracy to 1..90 and
    /// maximum road distance to 5..10000.
    pub fn normalized(&self) -> Self {
        fn clamp(v: f64, default: f64, min: f64, max: f64) -> f64 {
            if v == 0.0 || !v.is_finite() {
                default
            } else {
                v.clamp(min, max)
            }
        }

        Self {
            location_accuracy: clamp(
                self.location_accuracy,
                Self::DEFAULT_LOCATION_ACCURACY,
                1.0,
                1000.0,
            ),
            heading_accuracy: clamp(self.heading_accuracy, Self::DEFAULT_HEADING_ACCURACY, 1.0, 90.0),
            max_road_distance: clamp(
                self.max_road_distance,
                Self::DEFAULT_MAX_ROAD_DISTANCE,
                5.0,
                10_000.0,
            ),
        }
    }
}

/// A waypoint of a route request.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RoutePoint {
    pub point: Point,

    /// Direction of travel at the waypoint, if known.
    pub heading: Option<f64>,

    pub match_param: LocationMatchParam,
}

impl RoutePoint {
    pub fn new(point: Point) -> Self {
        Self {
            point,
            ..Default::default()
        }
    }
}

impl From<Point> for RoutePoint {
    fn from(point: Point) -> Self {
        Self::new(point)
    }
}

/// Properties of the junction at the start of a [RawEdge].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Junction {
    /// Number of ways out of the junction, including the one taken; zero if unknown.
    pub choices: i32,
    pub left_alternatives: i32,
    pub right_alternatives: i32,
    pub is_fork: bool,
    pub is_turn_off: bool,
    pub traffic_light: bool,
    pub name: String,
    pub ref_: String,
}

/// One edge of a path found by a [Router], in the direction of travel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawEdge {
    /// Geometry in map units.
    pub path: Path,

    /// Length in metres. Zero (or less) means: derive from the path and point scale.
    pub distance: f64,

    pub road_type: RoadType,

    /// Legal speed limit in km/h, or zero if unknown.
    pub max_speed_kph: f64,

    pub name: String,
    pub ref_: String,
    pub gradient: Gradient,

    /// "No access" bits of the road, see [AccessFlags].
    pub access: AccessFlags,

    pub toll: bool,
    pub roundabout: bool,

    /// Set in countries where traffic keeps to the left.
    pub drive_on_left: bool,

    /// Index of the waypoint pair this edge leads between.
    pub section: i32,

    /// The junction this edge starts at. Ignored for the first edge.
    pub junction: Junction,
}

/// Output of a [Router].
#[derive(Debug, Clone, PartialEq)]
pub struct RawRoute {
    pub edges: Vec<RawEdge>,

    /// Metres per map unit.
    pub point_scale: f64,

    pub path_to_junction_before: PathToJunction,
    pub path_to_junction_after: PathToJunction,
}

impl Default for RawRoute {
    fn default() -> Self {
        Self {
            edges: Vec::default(),
            point_scale: 1.0,
            path_to_junction_before: PathToJunction::default(),
            path_to_junction_after: PathToJunction::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_param_defaults() {
        let p = LocationMatchParam::default().normalized();
        assert_eq!(p.location_accuracy, 8.0);
        assert_eq!(p.heading_accuracy, 22.5);
        assert_eq!(p.max_road_distance, 100.0);
    }

    #[test]
    fn match_param_clamping() {
        let p = LocationMatchParam {
            location_accuracy: 5000.0,
            heading_accuracy: -4.0,
            max_road_distance: 1.0,
        }
        .normalized();
        assert_eq!(p.location_accuracy, 1000.0);
        assert_eq!(p.heading_accuracy, 1.0);
        assert_eq!(p.max_road_distance, 5.0);
    }

    #[test]
    fn cancellation() {
        let t = CancellationToken::new();
        let shared = t.clone();
        assert!(t.check().is_ok());
        shared.cancel();
        assert!(t.is_canceled());
        assert!(matches!(t.check(), Err(Error::Cancel)));
    }
}
