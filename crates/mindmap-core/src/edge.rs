use crate::node::PaletteColor;
use crate::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};

pub const DEFAULT_EDGE_WIDTH: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

/// A styled link between two nodes. Direction is kept for rendering only;
/// uniqueness and traversal treat edges as undirected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub style: LineStyle,
    pub width: f32,
    #[serde(default = "default_edge_color")]
    pub color: PaletteColor,
    #[serde(default)]
    pub animated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

fn default_edge_color() -> PaletteColor {
    PaletteColor::Gray
}

impl Edge {
    /// Creates an edge with the default connection style.
    pub fn new(id: EdgeId, source: NodeId, target: NodeId) -> Self {
        Self {
            id,
            source,
            target,
            style: LineStyle::Solid,
            width: DEFAULT_EDGE_WIDTH,
            color: default_edge_color(),
            animated: false,
            label: None,
        }
    }

    pub fn touches(&self, node: &NodeId) -> bool {
        &self.source == node || &self.target == node
    }

    /// True when this edge links `a` and `b` in either direction.
    pub fn connects(&self, a: &NodeId, b: &NodeId) -> bool {
        (&self.source == a && &self.target == b) || (&self.source == b && &self.target == a)
    }

    pub fn other_end(&self, node: &NodeId) -> Option<&NodeId> {
        if &self.source == node {
            Some(&self.target)
        } else if &self.target == node {
            Some(&self.source)
        } else {
            None
        }
    }
}
