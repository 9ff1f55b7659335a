use crate::edge::Edge;
use crate::error::CoreError;
use crate::node::{Node, NodePatch};
use crate::view::ViewTransform;
use crate::{DocumentId, EdgeId, NodeId, Vec2};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full node/edge payload, as exchanged with the rendering surface and the
/// persistence API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphPayload {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub view: ViewTransform,
}

impl DocumentMeta {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            view: ViewTransform::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<ViewTransform>,
}

impl DocumentMeta {
    pub fn apply(&mut self, patch: &DocumentPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(view) = patch.view {
            self.view = view;
        }
    }
}

/// One mind map: nodes, edges and metadata.
///
/// All mutation primitives keep two invariants: every edge endpoint exists as
/// a node, and no two edges connect the same unordered pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub meta: DocumentMeta,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(id: DocumentId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            meta: DocumentMeta::titled(title),
            nodes: Vec::new(),
            edges: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn payload(&self) -> GraphPayload {
        GraphPayload {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| &n.id == id)
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.iter().any(|n| &n.id == id)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| &e.id == id)
    }

    /// Looks up an edge between `a` and `b` in either direction.
    pub fn edge_between(&self, a: &NodeId, b: &NodeId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.connects(a, b))
    }

    pub fn edges_of<'a>(&'a self, node: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.touches(node))
    }

    pub fn insert_node(&mut self, node: Node) -> Result<&Node, CoreError> {
        if self.contains_node(&node.id) {
            return Err(CoreError::DuplicateNode(node.id));
        }
        if !node.position.is_finite() {
            return Err(CoreError::InvalidPosition(node.position.x, node.position.y));
        }
        self.nodes.push(node);
        self.touch();
        let last = self.nodes.len() - 1;
        Ok(&self.nodes[last])
    }

    /// Checks whether `source -> target` may be inserted, without inserting.
    pub fn check_connection(&self, source: &NodeId, target: &NodeId) -> Result<(), CoreError> {
        if source == target {
            return Err(CoreError::SelfLoop(source.clone()));
        }
        for endpoint in [source, target] {
            if !self.contains_node(endpoint) {
                return Err(CoreError::DanglingEndpoint(endpoint.clone()));
            }
        }
        if self.edge_between(source, target).is_some() {
            return Err(CoreError::DuplicateConnection(
                source.clone(),
                target.clone(),
            ));
        }
        Ok(())
    }

    pub fn insert_edge(&mut self, edge: Edge) -> Result<&Edge, CoreError> {
        if self.edge(&edge.id).is_some() {
            return Err(CoreError::DuplicateEdgeId(edge.id));
        }
        self.check_connection(&edge.source, &edge.target)?;
        self.edges.push(edge);
        self.touch();
        let last = self.edges.len() - 1;
        Ok(&self.edges[last])
    }

    pub fn update_node(&mut self, id: &NodeId, patch: &NodePatch) -> Result<&Node, CoreError> {
        if let Some(position) = patch.position
            && !position.is_finite()
        {
            return Err(CoreError::InvalidPosition(position.x, position.y));
        }
        let idx = self
            .nodes
            .iter()
            .position(|n| &n.id == id)
            .ok_or_else(|| CoreError::NodeNotFound(id.clone()))?;
        self.nodes[idx].apply(patch);
        self.touch();
        Ok(&self.nodes[idx])
    }

    pub fn move_node(&mut self, id: &NodeId, position: Vec2) -> Result<&Node, CoreError> {
        self.update_node(id, &NodePatch::position(position))
    }

    /// Removes a node together with every edge touching it.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<(Node, Vec<Edge>), CoreError> {
        let idx = self
            .nodes
            .iter()
            .position(|n| &n.id == id)
            .ok_or_else(|| CoreError::NodeNotFound(id.clone()))?;
        let node = self.nodes.remove(idx);
        let (removed, kept): (Vec<Edge>, Vec<Edge>) =
            std::mem::take(&mut self.edges).into_iter().partition(|e| e.touches(id));
        self.edges = kept;
        self.touch();
        Ok((node, removed))
    }

    pub fn remove_edge(&mut self, id: &EdgeId) -> Result<Edge, CoreError> {
        let idx = self
            .edges
            .iter()
            .position(|e| &e.id == id)
            .ok_or_else(|| CoreError::EdgeNotFound(id.clone()))?;
        let edge = self.edges.remove(idx);
        self.touch();
        Ok(edge)
    }

    pub fn update_meta(&mut self, patch: &DocumentPatch) {
        self.meta.apply(patch);
        self.touch();
    }

    /// Drops edges that violate the document invariants (dangling endpoints,
    /// self loops, duplicates of an earlier pair). Returns how many were
    /// dropped. Used when accepting payloads from outside.
    pub fn prune_invalid_edges(&mut self) -> usize {
        let before = self.edges.len();
        let mut kept: Vec<Edge> = Vec::with_capacity(before);
        for edge in std::mem::take(&mut self.edges) {
            let valid = edge.source != edge.target
                && self.contains_node(&edge.source)
                && self.contains_node(&edge.target)
                && !kept.iter().any(|k| k.connects(&edge.source, &edge.target));
            if valid {
                kept.push(edge);
            } else {
                tracing::warn!(edge = %edge.id, "Dropping invalid edge from payload");
            }
        }
        self.edges = kept;
        before - self.edges.len()
    }
}
