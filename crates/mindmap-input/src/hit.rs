use mindmap_core::{Document, Node, NodeId, Vec2};

/// Resolves a canvas point to the node under it.
pub trait HitTest {
    /// Topmost node containing `canvas`, with its current center.
    fn node_at(&self, canvas: Vec2) -> Option<(NodeId, Vec2)>;
}

/// Later nodes draw on top, so search back to front.
pub fn topmost<'a>(nodes: impl DoubleEndedIterator<Item = &'a Node>, canvas: Vec2) -> Option<(NodeId, Vec2)> {
    nodes
        .rev()
        .find(|node| node.contains(canvas))
        .map(|node| (node.id.clone(), node.position))
}

impl HitTest for Document {
    fn node_at(&self, canvas: Vec2) -> Option<(NodeId, Vec2)> {
        topmost(self.nodes.iter(), canvas)
    }
}

impl HitTest for [Node] {
    fn node_at(&self, canvas: Vec2) -> Option<(NodeId, Vec2)> {
        topmost(self.iter(), canvas)
    }
}
