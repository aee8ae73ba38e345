// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Routes and turn-by-turn navigation.
//!
//! A [Router] finds a [RawRoute] between waypoints under a [Profile]. The
//! [RouteBuilder] turns it into a [Route]: a sequence of [RouteSegments](RouteSegment),
//! each entered through a classified [Turn]. A [Navigator] follows a traveller
//! along the route, reporting upcoming turns and its [NavigationState] to
//! [NavigatorObservers](NavigatorObserver), and re-routing once the traveller
//! leaves the route.
//!
//! [GraphRouter] is a [Router] running A* over an in-memory road [Graph].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use routenav::{Edge, Graph, GraphRouter, Navigator, NavigationData, NavigationState,
//!     Node, Point, Profile, RoadType, RoutePoint};
//!
//! let mut g = Graph::default();
//! g.set_node(Node::new(1, 0.0, 0.0)).unwrap();
//! g.set_node(Node::new(2, 500.0, 0.0)).unwrap();
//! g.set_two_way_edge(1, Edge::new(2, RoadType::ResidentialRoad)).unwrap();
//!
//! let mut navigator = Navigator::default().with_router(Arc::new(GraphRouter::new(g)));
//! navigator
//!     .start_navigation(
//!         &Profile::default(),
//!         &[RoutePoint::new(Point::new(0.0, 0.0)), RoutePoint::new(Point::new(500.0, 0.0))],
//!     )
//!     .unwrap();
//!
//! let state = navigator.navigate(NavigationData::new(Point::new(100.0, 0.0), 0.0)).unwrap();
//! assert_eq!(state, NavigationState::Turn);
//! ```

mod astar;
mod error;
pub mod geometry;
mod graph;
mod instructions;
mod navigator;
mod profile;
mod route;
mod router;
mod turn;
mod xml;

pub use astar::{GraphRouter, DEFAULT_STEP_LIMIT};
pub use error::Error;
pub use geometry::{Path, Point};
pub use graph::{Edge, Graph, Node};
pub use instructions::{EnglishInstructions, Instructions};
pub use navigator::{
    NavigationData, NavigationState, NavigationValidity, Navigator, NavigatorObserver,
    NavigatorParam, NavigatorTurn, ObserverHandle, ObserverRegistry, RequestId, RouteCallback,
    ARRIVAL_DISTANCE, OFF_ROUTE_DISTANCE_FACTOR, SECOND_TURN_DISTANCE, TURN_ROUND_ANGLE,
};
pub use profile::{
    AccessFlags, Gradient, Profile, ProfileType, RoadType, VehicleType, MIN_SPEED_KPH,
};
pub use route::{FileFormat, NearestSegmentInfo, PathToJunction, Route, RouteBuilder, RouteSegment};
pub use router::{
    CancellationToken, Junction, LocationMatchParam, RawEdge, RawRoute, RoutePoint, Router,
};
pub use turn::{
    RoundaboutState, Turn, TurnType, BEAR_ANGLE, FORK_ANGLE, PLAIN_ANGLE, SHARP_ANGLE,
    U_TURN_ANGLE,
};
