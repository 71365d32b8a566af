//! Road network graph for routing between modules
//!
//! Nodes are lane points derived from the placed road and entrance modules;
//! points shared by neighbouring modules merge into one node, which is what
//! stitches the modules into a network.

use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

use super::module::Module;
use super::types::{ModuleId, Position};
use super::waypoint::Waypoint;

/// Role of a node in the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Plain lane point
    Lane,
    /// Middle of an entrance, guarded by that entrance's gate
    Gate(ModuleId),
    /// Edge of an entrance where a facility can attach
    Connector,
}

#[derive(Debug, Clone, Copy)]
pub struct RoadNode {
    pub position: Position,
    pub kind: NodeKind,
}

/// Edge data for the road network graph
#[derive(Debug, Clone, Copy)]
pub struct RoadEdge {
    pub weight: u32, // Length scaled for integer weights
}

impl RoadEdge {
    pub fn between(from: &Position, to: &Position) -> Self {
        // Scale by 100 to preserve precision
        let weight = (from.distance(to) * 100.0) as u32;
        Self {
            weight: weight.max(1),
        }
    }
}

/// Directed lane graph; every road segment is added in both directions
#[derive(Debug, Default)]
pub struct RoadNetwork {
    graph: DiGraph<RoadNode, RoadEdge>,

    /// Maps rounded positions to nodes so touching modules share nodes
    nodes_by_cell: HashMap<(i32, i32), NodeIndex>,
}

fn cell_of(position: &Position) -> (i32, i32) {
    (position.x.round() as i32, position.y.round() as i32)
}

impl RoadNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the network from every road-like module
    pub fn from_modules<'a>(modules: impl IntoIterator<Item = (ModuleId, &'a Module)>) -> Self {
        let mut network = Self::new();
        for (module_id, module) in modules {
            network.add_module(module_id, module);
        }
        network
    }

    /// Adds the lane geometry of a road or entrance module; facilities are ignored
    pub fn add_module(&mut self, module_id: ModuleId, module: &Module) {
        let Some((west, east)) = module.lane_ends() else {
            return;
        };

        let west_node = self.node_at(west, NodeKind::Lane);
        let east_node = self.node_at(east, NodeKind::Lane);

        match module.gate_point() {
            Some(gate) => {
                let gate_node = self.node_at(gate, NodeKind::Gate(module_id));
                self.add_two_way(west_node, gate_node);
                self.add_two_way(gate_node, east_node);

                for connector in module.connectors() {
                    let connector_node = self.node_at(connector, NodeKind::Connector);
                    self.add_two_way(gate_node, connector_node);
                }
            }
            None => self.add_two_way(west_node, east_node),
        }
    }

    fn node_at(&mut self, position: Position, kind: NodeKind) -> NodeIndex {
        let cell = cell_of(&position);
        if let Some(&index) = self.nodes_by_cell.get(&cell) {
            if kind != NodeKind::Lane {
                self.graph[index].kind = kind;
            }
            return index;
        }

        let index = self.graph.add_node(RoadNode { position, kind });
        self.nodes_by_cell.insert(cell, index);
        index
    }

    fn add_two_way(&mut self, a: NodeIndex, b: NodeIndex) {
        if a == b || self.graph.contains_edge(a, b) {
            return;
        }
        let edge = RoadEdge::between(&self.graph[a].position, &self.graph[b].position);
        self.graph.add_edge(a, b, edge);
        self.graph.add_edge(b, a, edge);
    }

    pub fn node(&self, index: NodeIndex) -> Option<&RoadNode> {
        self.graph.node_weight(index)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// The connector node touching `position`, if any
    pub fn connector_near(&self, position: &Position, epsilon: f32) -> Option<NodeIndex> {
        self.graph.node_indices().find(|&index| {
            let node = &self.graph[index];
            node.kind == NodeKind::Connector && node.position.approx_eq(position, epsilon)
        })
    }

    /// Find the closest lane or gate node to a given position
    pub fn closest_lane_node(&self, position: &Position) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&index| self.graph[index].kind != NodeKind::Connector)
            .min_by(|&a, &b| {
                let dist_a = position.distance(&self.graph[a].position);
                let dist_b = position.distance(&self.graph[b].position);
                dist_a
                    .partial_cmp(&dist_b)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Finds a path between two nodes using A* (Dijkstra with null heuristic).
    /// The returned path starts with `start`.
    pub fn find_path(&self, start: NodeIndex, end: NodeIndex) -> Option<Vec<NodeIndex>> {
        if start == end {
            return Some(vec![start]);
        }

        let (_, path) = astar(
            &self.graph,
            start,
            |node| node == end,
            |edge| edge.weight().weight,
            |_| 0, // Null heuristic = Dijkstra
        )?;

        Some(path)
    }

    /// Dead-end lane nodes: where cars enter and leave the world
    pub fn exit_nodes(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&index| {
                self.graph[index].kind == NodeKind::Lane
                    && self
                        .graph
                        .neighbors(index)
                        .collect::<HashSet<_>>()
                        .len()
                        == 1
            })
            .collect()
    }

    /// Turn a node path into waypoints, tagging gate nodes with their entrance
    pub fn waypoints_for(&self, path: &[NodeIndex]) -> Vec<Waypoint> {
        path.iter()
            .filter_map(|&index| self.graph.node_weight(index))
            .map(|node| match node.kind {
                NodeKind::Gate(module) => Waypoint::gated(node.position, module),
                NodeKind::Lane | NodeKind::Connector => Waypoint::new(node.position),
            })
            .collect()
    }
}
