//! The surface's read-through mirror of the host's graph, plus per-node
//! simulation state.

use crate::layout::{Body, ForceLayout, LayoutStatus};
use mindmap_core::{Edge, EdgeId, GraphPayload, Node, NodeId, Rect, Vec2};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default, Clone)]
pub struct Scene {
    nodes: Vec<Node>,
    bodies: Vec<Body>,
    /// Nodes whose position the simulation owns until it settles.
    auto_placed: HashSet<NodeId>,
    index: HashMap<NodeId, usize>,
    edges: Vec<Edge>,
}

impl Scene {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn is_pinned(&self, id: &NodeId) -> bool {
        self.index.get(id).is_some_and(|&i| self.bodies[i].pinned)
    }

    pub fn has_free_nodes(&self) -> bool {
        self.bodies.iter().any(|b| !b.pinned)
    }

    fn reindex(&mut self) {
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
    }

    /// Full replacement. Positions from the host are canonical, so every
    /// node starts pinned. Edges with a missing endpoint or repeating an
    /// already-seen pair are dropped.
    pub fn replace(&mut self, payload: GraphPayload) {
        self.nodes.clear();
        self.bodies.clear();
        self.auto_placed.clear();
        self.index.clear();
        self.edges.clear();
        for node in payload.nodes {
            if self.index.contains_key(&node.id) {
                tracing::warn!(node_id = %node.id, "Dropping duplicate node from payload");
                continue;
            }
            self.index.insert(node.id.clone(), self.nodes.len());
            self.bodies.push(Body::pinned(node.position));
            self.nodes.push(node);
        }
        for edge in payload.edges {
            if !self.add_edge(edge.clone()) {
                tracing::warn!(edge_id = %edge.id, "Dropping invalid edge from payload");
            }
        }
    }

    /// Adds a node the simulation may move, or replaces an existing one.
    pub fn insert_free(&mut self, node: Node) {
        if let Some(&i) = self.index.get(&node.id) {
            self.bodies[i] = Body::free(node.position);
            self.nodes[i] = node;
            return;
        }
        self.auto_placed.insert(node.id.clone());
        self.bodies.push(Body::free(node.position));
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
    }

    /// Replaces node data. A changed position is taken as canonical and pins
    /// the node there.
    pub fn update(&mut self, node: Node) -> bool {
        let Some(&i) = self.index.get(&node.id) else {
            return false;
        };
        if node.position != self.nodes[i].position {
            self.bodies[i] = Body::pinned(node.position);
            self.auto_placed.remove(&node.id);
        }
        self.nodes[i] = node;
        true
    }

    /// Places a node where the user dropped it and pins it.
    pub fn move_node(&mut self, id: &NodeId, position: Vec2) -> bool {
        let Some(&i) = self.index.get(id) else {
            return false;
        };
        self.nodes[i].position = position;
        self.bodies[i] = Body::pinned(position);
        self.auto_placed.remove(id);
        true
    }

    /// Removes a node and every edge touching it.
    pub fn remove(&mut self, id: &NodeId) -> bool {
        let Some(i) = self.index.remove(id) else {
            return false;
        };
        self.nodes.remove(i);
        self.bodies.remove(i);
        self.auto_placed.remove(id);
        self.edges.retain(|e| !e.touches(id));
        self.reindex();
        true
    }

    pub fn add_edge(&mut self, edge: Edge) -> bool {
        let valid = edge.source != edge.target
            && self.contains(&edge.source)
            && self.contains(&edge.target)
            && !self
                .edges
                .iter()
                .any(|e| e.id == edge.id || e.connects(&edge.source, &edge.target));
        if valid {
            self.edges.push(edge);
        }
        valid
    }

    pub fn remove_edge(&mut self, id: &EdgeId) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| &e.id != id);
        self.edges.len() != before
    }

    /// Union of the bounds of nodes matching `include`.
    pub fn bounds(&self, include: impl Fn(&Node) -> bool) -> Option<Rect> {
        self.nodes
            .iter()
            .filter(|n| include(n))
            .map(Node::bounds)
            .reduce(Rect::union)
    }

    fn springs(&self) -> Vec<(usize, usize)> {
        self.edges
            .iter()
            .filter_map(|e| Some((*self.index.get(&e.source)?, *self.index.get(&e.target)?)))
            .collect()
    }

    /// One simulation tick. When the layout freezes, auto-placed nodes are
    /// pinned and returned with their settled positions.
    pub fn simulate(&mut self, layout: &mut ForceLayout) -> Vec<(NodeId, Vec2)> {
        let springs = self.springs();
        let status = layout.step(&mut self.bodies, &springs);
        for (node, body) in self.nodes.iter_mut().zip(&self.bodies) {
            if !body.pinned {
                node.position = body.position;
            }
        }
        if status == LayoutStatus::Running {
            return Vec::new();
        }
        self.settle()
    }

    fn settle(&mut self) -> Vec<(NodeId, Vec2)> {
        let mut placed = Vec::new();
        for (node, body) in self.nodes.iter().zip(self.bodies.iter_mut()) {
            if !body.pinned {
                body.pinned = true;
                body.velocity = Vec2::ZERO;
                if self.auto_placed.remove(&node.id) {
                    placed.push((node.id.clone(), node.position));
                }
            }
        }
        placed
    }
}
