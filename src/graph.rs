// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::btree_map::{BTreeMap, Entry};

use crate::geometry::{Path, Point};
use crate::profile::{AccessFlags, Gradient, RoadType};
use crate::Error;

/// A junction or a shape point of a road network.
///
/// Nodes with `id == 0` are disallowed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub id: i64,

    /// Position in map units.
    pub position: Point,

    /// Set if passing this node involves waiting at traffic lights.
    pub traffic_light: bool,

    /// Name of the junction, e.g. a motorway interchange.
    pub name: String,
    pub ref_: String,
}

impl Node {
    pub fn new(id: i64, x: f64, y: f64) -> Self {
        Self {
            id,
            position: Point::new(x, y),
            ..Default::default()
        }
    }
}

/// Represents an outgoing (one-way) road from a specific [Node].
///
/// Due to implementation details, `to` might not exist in the [Graph].
/// Users must silently ignore such edges.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Edge {
    pub to: i64,
    pub road_type: RoadType,

    /// Legal speed limit in km/h, or zero if unknown.
    pub max_speed_kph: f64,

    pub name: String,
    pub ref_: String,
    pub gradient: Gradient,

    /// "No access" bits, see [AccessFlags].
    pub access: AccessFlags,

    pub toll: bool,
    pub roundabout: bool,
    pub drive_on_left: bool,

    /// Shape points between the two nodes, in map units.
    pub via: Vec<Point>,
}

impl Edge {
    pub fn new(to: i64, road_type: RoadType) -> Self {
        Self {
            to,
            road_type,
            ..Default::default()
        }
    }
}

/// Represents a road network as a set of [Nodes](Node) and [Edges](Edge) between them.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    nodes: BTreeMap<i64, (Node, Vec<Edge>)>,

    /// Metres per map unit.
    point_scale: f64,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Graph {
    /// Creates an empty graph whose positions are expressed in map units of
    /// `point_scale` metres. Non-positive scales are replaced by 1.
    pub fn new(point_scale: f64) -> Self {
        Self {
            nodes: BTreeMap::default(),
            point_scale: if point_scale > 0.0 { point_scale } else { 1.0 },
        }
    }

    /// Returns the number of metres per map unit.
    pub fn point_scale(&self) -> f64 {
        self.point_scale
    }

    /// Returns the number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns an iterator over all [Nodes](Node) in the graph.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().map(|(node, _)| node)
    }

    /// Retrieves a [Node] with the provided id.
    pub fn get_node(&self, id: i64) -> Option<&Node> {
        self.nodes.get(&id).map(|(node, _)| node)
    }

    /// Creates or updates a [Node] with `node.id`.
    ///
    /// All outgoing and incoming edges are preserved.
    pub fn set_node(&mut self, node: Node) -> Result<(), Error> {
        if node.id == 0 {
            return Err(Error::InvalidArgument("node id must not be zero".to_string()));
        }

        match self.nodes.entry(node.id) {
            Entry::Vacant(e) => {
                e.insert((node, Vec::default()));
            }
            Entry::Occupied(mut e) => {
                e.get_mut().0 = node;
            }
        }
        return Ok(());
    }

    /// Deletes a [Node] with a given `id`.
    ///
    /// While all outgoing edges are removed, incoming edges are preserved
    /// (as this would require a walk over all nodes in the graph).
    pub fn delete_node(&mut self, id: i64) {
        self.nodes.remove(&id);
    }

    /// Finds the [Node] closest to the given position, no further than
    /// `max_distance` metres away.
    ///
    /// This function requires computing the distance to every [Node] in the graph,
    /// and is not suitable for large graphs.
    pub fn find_nearest_node(&self, p: Point, max_distance: f64) -> Option<&Node> {
        self.nodes
            .values()
            .map(|(nd, _)| (nd.position.distance(p) * self.point_scale, nd))
            .filter(|&(d, _)| d <= max_distance)
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, nd)| nd)
    }

    /// Gets all outgoing [Edges](Edge) from a node with a given id.
    pub fn get_edges(&self, from_id: i64) -> &[Edge] {
        self.nodes
            .get(&from_id)
            .map(|(_, e)| e.as_slice())
            .unwrap_or_default()
    }

    /// Gets an [Edge] from one node to another.
    pub fn get_edge(&self, from_id: i64, to_id: i64) -> Option<&Edge> {
        self.get_edges(from_id).iter().find(|e| e.to == to_id)
    }

    /// Creates or updates an [Edge] from a node with a given id.
    /// Edges from nodes which don't exist are ignored.
    pub fn set_edge(&mut self, from_id: i64, edge: Edge) -> Result<(), Error> {
        if from_id == 0 || edge.to == 0 {
            return Err(Error::InvalidArgument("node id must not be zero".to_string()));
        }

        if let Some((_, edges)) = self.nodes.get_mut(&from_id) {
            if let Some(candidate) = edges.iter_mut().find(|e| e.to == edge.to) {
                *candidate = edge;
            } else {
                edges.push(edge);
            }
        }
        return Ok(());
    }

    /// Adds a road in both directions between two nodes: `edge` going from
    /// `from_id` to `edge.to`, and its mirror image going back. The mirror image
    /// gets reversed shape points and gradient.
    pub fn set_two_way_edge(&mut self, from_id: i64, edge: Edge) -> Result<(), Error> {
        let mut back = edge.clone();
        back.to = from_id;
        back.via.reverse();
        back.gradient = edge.gradient.reversed();

        let to_id = edge.to;
        self.set_edge(from_id, edge)?;
        self.set_edge(to_id, back)?;
        return Ok(());
    }

    /// Removes an edge from one node to another.
    pub fn delete_edge(&mut self, from_id: i64, to_id: i64) {
        if let Some((_, edges)) = self.nodes.get_mut(&from_id) {
            if let Some(idx) = edges.iter().position(|e| e.to == to_id) {
                edges.swap_remove(idx);
            }
        }
    }

    /// Returns the geometry of an edge, from its start node to its end node,
    /// or [None] if the end node doesn't exist.
    pub fn edge_path(&self, from: &Node, edge: &Edge) -> Option<Path> {
        let to = self.get_node(edge.to)?;
        let mut path = Path::new();
        path.push(from.position);
        for &p in &edge.via {
            path.push(p);
        }
        path.push(to.position);
        return Some(path);
    }

    /// Returns the length of an edge in metres.
    pub fn edge_length(&self, from: &Node, edge: &Edge) -> Option<f64> {
        self.edge_path(from, edge)
            .map(|p| p.length() * self.point_scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_and_edges() {
        let mut g = Graph::new(2.0);
        g.set_node(Node::new(1, 0.0, 0.0)).unwrap();
        g.set_node(Node::new(2, 3.0, 4.0)).unwrap();
        g.set_two_way_edge(1, Edge::new(2, RoadType::PrimaryRoad)).unwrap();

        assert_eq!(g.len(), 2);
        assert!(g.get_edge(1, 2).is_some());
        assert!(g.get_edge(2, 1).is_some());
        assert!(g.get_edge(1, 3).is_none());

        let from = g.get_node(1).unwrap();
        let e = g.get_edge(1, 2).unwrap();
        assert_eq!(g.edge_length(from, e), Some(10.0));

        g.delete_edge(1, 2);
        assert!(g.get_edges(1).is_empty());
    }

    #[test]
    fn zero_ids_rejected() {
        let mut g = Graph::default();
        assert!(g.set_node(Node::new(0, 0.0, 0.0)).is_err());
        assert!(g.set_edge(1, Edge::new(0, RoadType::PrimaryRoad)).is_err());
    }

    #[test]
    fn find_nearest_node() {
        let mut g = Graph::default();
        g.set_node(Node::new(1, 0.0, 0.0)).unwrap();
        g.set_node(Node::new(2, 100.0, 0.0)).unwrap();

        assert_eq!(g.find_nearest_node(Point::new(70.0, 5.0), 100.0).map(|n| n.id), Some(2));
        assert_eq!(g.find_nearest_node(Point::new(70.0, 500.0), 100.0), None);
    }

    #[test]
    fn two_way_edge_reverses_shape() {
        let mut g = Graph::default();
        g.set_node(Node::new(1, 0.0, 0.0)).unwrap();
        g.set_node(Node::new(2, 10.0, 0.0)).unwrap();
        let mut e = Edge::new(2, RoadType::ResidentialRoad);
        e.via = vec![Point::new(3.0, 1.0), Point::new(7.0, 1.0)];
        e.gradient = Gradient::Up1;
        g.set_two_way_edge(1, e).unwrap();

        let back = g.get_edge(2, 1).unwrap();
        assert_eq!(back.via, vec![Point::new(7.0, 1.0), Point::new(3.0, 1.0)]);
        assert_eq!(back.gradient, Gradient::Down1);
    }
}
