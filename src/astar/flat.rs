// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BinaryHeap, HashMap};

use crate::geometry::Point;
use crate::graph::{Edge, Graph, Node};
use crate::profile::{Profile, MIN_SPEED_KPH};
use crate::{CancellationToken, Error};

/// Number of node expansions between checks of the [CancellationToken].
const CANCEL_CHECK_INTERVAL: usize = 1024;

#[derive(Debug, Clone, Copy)]
struct FlatQueueItem {
    at: i64,
    cost: f64,
    score: f64,
}

impl PartialEq for FlatQueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.score.eq(&other.score)
    }
}

impl PartialOrd for FlatQueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for FlatQueueItem {}

impl Ord for FlatQueueItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // NOTE: We revert the order of comparison,
        // as lower scores are considered better ("higher"),
        // and Rust's BinaryHeap is a max-heap.
        other.score.total_cmp(&self.score)
    }
}

/// One edge of a found path, identified by its start node and
/// its position in the start node's edge list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Step {
    pub(crate) from: i64,
    pub(crate) edge_index: usize,
}

fn reconstruct_flat_path(came_from: &HashMap<i64, Step>, from: i64, mut last: i64) -> Vec<Step> {
    let mut path = Vec::default();

    while let Some(&step) = came_from.get(&last) {
        path.push(step);
        last = step.from;
        if last == from {
            break;
        }
    }

    path.reverse();
    return path;
}

/// A* search over a [Graph], costing edges with a [Profile].
pub(crate) struct Search<'a> {
    pub(crate) graph: &'a Graph,
    pub(crate) profile: &'a Profile,
    pub(crate) step_limit: usize,
    pub(crate) cancel: &'a CancellationToken,
}

impl Search<'_> {
    /// Returns the cost of traversing an edge, or [None] if the profile forbids it.
    ///
    /// Road types usable only at the ends of a route, and roads restricted for the
    /// vehicle, are permitted only if `at_end` is set.
    pub(crate) fn edge_cost(&self, from: &Node, edge: &Edge, at_end: bool) -> Option<f64> {
        let p = self.profile;
        let usable = p.is_usable(edge.road_type) || (at_end && p.is_usable_at_end(edge.road_type));
        if !usable || (!at_end && p.is_restricted(edge.road_type, edge.access)) {
            return None;
        }

        let length = self.graph.edge_length(from, edge)?;
        let mut cost = if p.shortest {
            length
        } else if p.shortest_by_time {
            length * 3.6 / p.raw_speed_kph(edge.road_type, edge.gradient, edge.max_speed_kph)
        } else {
            length * 3.6 / p.preference_kph(edge.road_type, edge.gradient).max(MIN_SPEED_KPH)
        };

        if edge.toll && p.toll_penalty > 0.0 {
            if p.toll_penalty >= 1.0 {
                return None;
            }
            cost /= 1.0 - p.toll_penalty;
        }

        return Some(cost);
    }

    fn heuristic(&self, from: Point, to: Point) -> f64 {
        let distance = from.distance(to) * self.graph.point_scale();
        if self.profile.shortest {
            distance
        } else {
            distance * 3.6 / self.profile.top_speed_kph()
        }
    }

    /// Uses the [A* algorithm](https://en.wikipedia.org/wiki/A*_search_algorithm)
    /// to find the cheapest path between two nodes.
    ///
    /// Fails with [Error::NoRouteConnectivity] if the nodes aren't connected,
    /// and with [Error::NoRoute] if more than `step_limit` nodes had to be expanded.
    /// Concluding that no route exists requires expanding all nodes accessible
    /// from the start; the step limit protects against resource exhaustion.
    pub(crate) fn find_route(&self, from_id: i64, to_id: i64) -> Result<Vec<Step>, Error> {
        if from_id == to_id {
            return Ok(Vec::default());
        }

        let mut queue: BinaryHeap<FlatQueueItem> = BinaryHeap::default();
        let mut came_from: HashMap<i64, Step> = HashMap::default();
        let mut known_costs: HashMap<i64, f64> = HashMap::default();
        let mut steps: usize = 0;

        let to_node = self.graph.get_node(to_id).ok_or(Error::NoRoute)?;

        {
            let from_node = self.graph.get_node(from_id).ok_or(Error::NoRoute)?;
            queue.push(FlatQueueItem {
                at: from_id,
                cost: 0.0,
                score: self.heuristic(from_node.position, to_node.position),
            });
            known_costs.insert(from_id, 0.0);
        }

        while let Some(item) = queue.pop() {
            if item.at == to_id {
                return Ok(reconstruct_flat_path(&came_from, from_id, to_id));
            }

            // Contrary to the wikipedia definition, we might keep multiple items in the queue for the same node.
            if item.cost > known_costs.get(&item.at).cloned().unwrap_or(f64::INFINITY) {
                continue;
            }

            steps += 1;
            if steps > self.step_limit {
                return Err(Error::NoRoute);
            }
            if steps % CANCEL_CHECK_INTERVAL == 0 {
                self.cancel.check()?;
            }

            let Some(node) = self.graph.get_node(item.at) else {
                continue;
            };

            for (edge_index, edge) in self.graph.get_edges(item.at).iter().enumerate() {
                // Check if the referred node exists
                let Some(neighbor) = self.graph.get_node(edge.to) else {
                    continue;
                };

                let at_end = item.at == from_id || edge.to == to_id;
                let Some(edge_cost) = self.edge_cost(node, edge, at_end) else {
                    continue;
                };

                // Check if this is the cheapest way to the neighbor
                let neighbor_cost = item.cost + edge_cost;
                if neighbor_cost >= known_costs.get(&edge.to).cloned().unwrap_or(f64::INFINITY) {
                    continue;
                }

                // Push the new item into the queue
                came_from.insert(
                    edge.to,
                    Step {
                        from: item.at,
                        edge_index,
                    },
                );
                known_costs.insert(edge.to, neighbor_cost);
                queue.push(FlatQueueItem {
                    at: edge.to,
                    cost: neighbor_cost,
                    score: neighbor_cost + self.heuristic(neighbor.position, to_node.position),
                });
            }
        }

        return Err(Error::NoRouteConnectivity);
    }
}
