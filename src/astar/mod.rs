// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Reference [Router] running A* over an in-memory [Graph].

mod flat;

use log::{debug, warn};

use crate::geometry::{wrap_degrees, Path};
use crate::graph::{Edge, Graph, Node};
use crate::profile::Profile;
use crate::route::PathToJunction;
use crate::turn::FORK_ANGLE;
use crate::{CancellationToken, Error, Junction, RawEdge, RawRoute, RoutePoint, Router};
use flat::{Search, Step};

/// Recommended number of allowed node expansions before a [GraphRouter]
/// gives up with [Error::NoRoute].
pub const DEFAULT_STEP_LIMIT: usize = 1_000_000;

/// Upper bound on the number of edges followed when looking for the junctions
/// around the ends of a route.
const MAX_JUNCTION_WALK: usize = 1000;

/// Finds routes over a [Graph], snapping waypoints to the nearest nodes.
#[derive(Debug, Clone)]
pub struct GraphRouter {
    graph: Graph,
    step_limit: usize,
}

impl GraphRouter {
    pub fn new(graph: Graph) -> Self {
        Self {
            graph,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    pub fn with_step_limit(mut self, step_limit: usize) -> Self {
        self.step_limit = step_limit;
        self
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Finds the nodes corresponding to the waypoints, skipping unmatched
    /// intermediate waypoints if `best_effort` is set.
    fn snap(&self, waypoints: &[RoutePoint], best_effort: bool) -> Result<Vec<i64>, Error> {
        let last = waypoints.len() - 1;
        let mut nodes: Vec<i64> = Vec::with_capacity(waypoints.len());

        for (i, wp) in waypoints.iter().enumerate() {
            let max_distance = wp.match_param.normalized().max_road_distance;
            match self.graph.find_nearest_node(wp.point, max_distance) {
                Some(node) => nodes.push(node.id),
                None if i == 0 => return Err(Error::NoRoadsNearStartOfRoute),
                None if i < last && best_effort => {
                    warn!("skipping waypoint {}: no roads within {} m", i, max_distance)
                }
                None => return Err(Error::NoRoadsNearEndOfRoute),
            }
        }

        return Ok(nodes);
    }

    /// Describes the junction between two consecutive edges of a route.
    fn junction(
        &self,
        profile: &Profile,
        prev_from: &Node,
        prev_edge: &Edge,
        at: &Node,
        taken: &Edge,
    ) -> Junction {
        let mut j = Junction {
            traffic_light: at.traffic_light,
            name: at.name.clone(),
            ref_: at.ref_.clone(),
            ..Default::default()
        };

        let out_direction = |e: &Edge| {
            self.graph
                .edge_path(at, e)
                .and_then(|p| p.direction_at_start())
        };
        let in_direction = self
            .graph
            .edge_path(prev_from, prev_edge)
            .and_then(|p| p.direction_at_end());
        let (Some(in_direction), Some(taken_out)) = (in_direction, out_direction(taken)) else {
            return j;
        };

        let taken_angle = wrap_degrees(in_direction - taken_out);
        let mut road_continues = false;
        j.choices = 1;

        for e in self.graph.get_edges(at.id) {
            if e.to == taken.to || e.to == prev_from.id {
                continue;
            }
            if !profile.is_usable(e.road_type) || profile.is_restricted(e.road_type, e.access) {
                continue;
            }
            let Some(out) = out_direction(e) else {
                continue;
            };

            j.choices += 1;
            if wrap_degrees(in_direction - out) < taken_angle {
                j.left_alternatives += 1;
            } else {
                j.right_alternatives += 1;
            }
            if wrap_degrees(out - taken_out).abs() < FORK_ANGLE {
                j.is_fork = true;
            }
            if !e.road_type.is_less_important_than(prev_edge.road_type) {
                road_continues = true;
            }
        }

        j.is_turn_off = road_continues && taken.road_type.is_less_important_than(prev_edge.road_type);
        return j;
    }

    /// Follows the road from `from` (never going back to `avoid`) until reaching a node
    /// with more than one way on, returning the path walked.
    fn walk_to_junction(&self, profile: &Profile, from: i64, avoid: i64) -> PathToJunction {
        let mut result = PathToJunction::default();
        let Some(mut at) = self.graph.get_node(from) else {
            return result;
        };
        let mut previous = avoid;
        let mut path = Path::new();
        path.push(at.position);

        for _ in 0..MAX_JUNCTION_WALK {
            let mut onward = self
                .graph
                .get_edges(at.id)
                .iter()
                .filter(|e| e.to != previous && profile.is_usable_at_end(e.road_type));
            let (Some(e), None) = (onward.next(), onward.next()) else {
                break;
            };
            let (Some(next), Some(edge_path)) = (self.graph.get_node(e.to), self.graph.edge_path(at, e)) else {
                break;
            };

            if result.distance == 0.0 {
                result.start_road_type = e.road_type;
            }
            result.end_road_type = e.road_type;
            result.distance += edge_path.length() * self.graph.point_scale();
            path.append(&edge_path);

            previous = at.id;
            at = next;
            if at.id == from {
                break;
            }
        }

        if path.len() > 1 {
            result.path = path;
        } else {
            result = PathToJunction::default();
        }
        return result;
    }

    /// Converts a sequence of steps into a [RawRoute].
    fn describe(&self, profile: &Profile, steps: &[(Step, i32)]) -> Result<RawRoute, Error> {
        let mut raw = RawRoute {
            point_scale: self.graph.point_scale(),
            ..Default::default()
        };
        let mut previous: Option<(&Node, &Edge)> = None;

        for &(step, section) in steps {
            let from = self.graph.get_node(step.from).ok_or(Error::NoRoute)?;
            let edge = self
                .graph
                .get_edges(step.from)
                .get(step.edge_index)
                .ok_or(Error::NoRoute)?;
            let path = self.graph.edge_path(from, edge).ok_or(Error::NoRoute)?;

            let junction = match previous {
                Some((prev_from, prev_edge)) => {
                    self.junction(profile, prev_from, prev_edge, from, edge)
                }
                None => Junction::default(),
            };

            raw.edges.push(RawEdge {
                distance: path.length() * self.graph.point_scale(),
                path,
                road_type: edge.road_type,
                max_speed_kph: edge.max_speed_kph,
                name: edge.name.clone(),
                ref_: edge.ref_.clone(),
                gradient: edge.gradient,
                access: edge.access,
                toll: edge.toll,
                roundabout: edge.roundabout,
                drive_on_left: edge.drive_on_left,
                section,
                junction,
            });
            previous = Some((from, edge));
        }

        if let (Some((first, _)), Some((last, _))) = (steps.first(), steps.last()) {
            let first_to = self
                .graph
                .get_edges(first.from)
                .get(first.edge_index)
                .map_or(0, |e| e.to);
            raw.path_to_junction_before = self.walk_to_junction(profile, first.from, first_to);
            raw.path_to_junction_before.reverse();

            if let Some(goal) = self.graph.get_edges(last.from).get(last.edge_index) {
                raw.path_to_junction_after = self.walk_to_junction(profile, goal.to, last.from);
            }
        }

        return Ok(raw);
    }
}

impl Router for GraphRouter {
    fn find_route(
        &self,
        profile: &Profile,
        waypoints: &[RoutePoint],
        best_effort: bool,
        cancel: &CancellationToken,
    ) -> Result<RawRoute, Error> {
        if waypoints.len() < 2 {
            return Err(Error::InvalidArgument(format!(
                "a route needs at least 2 waypoints, got {}",
                waypoints.len()
            )));
        }

        let profile = profile.normalized();
        if !profile.accepts_any_road() {
            return Err(Error::NoRoute);
        }

        let nodes = self.snap(waypoints, best_effort)?;
        let search = Search {
            graph: &self.graph,
            profile: &profile,
            step_limit: self.step_limit,
            cancel,
        };

        let mut steps: Vec<(Step, i32)> = Vec::default();
        let mut at = nodes[0];
        let mut section = 0;
        for (i, &target) in nodes.iter().enumerate().skip(1) {
            cancel.check()?;
            match search.find_route(at, target) {
                Ok(leg) => {
                    steps.extend(leg.into_iter().map(|s| (s, section)));
                    section += 1;
                    at = target;
                }
                Err(Error::NoRouteConnectivity) if best_effort && i < nodes.len() - 1 => {
                    warn!("skipping unreachable waypoint node {}", target);
                }
                Err(e) => return Err(e),
            }
        }

        if steps.is_empty() {
            return Err(Error::NoRoute);
        }

        debug!("found route over {} edges in {} sections", steps.len(), section);
        return self.describe(&profile, &steps);
    }
}
