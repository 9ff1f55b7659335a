use crate::{EdgeId, NodeId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Label must not be empty")]
    EmptyLabel,
    #[error("Node {0} already exists")]
    DuplicateNode(NodeId),
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),
    #[error("Edge {0} already exists")]
    DuplicateEdgeId(EdgeId),
    #[error("Edge {0} not found")]
    EdgeNotFound(EdgeId),
    #[error("Cannot connect node {0} to itself")]
    SelfLoop(NodeId),
    #[error("Nodes {0} and {1} are already connected")]
    DuplicateConnection(NodeId, NodeId),
    #[error("Edge endpoint {0} does not exist")]
    DanglingEndpoint(NodeId),
    #[error("Invalid position ({0}, {1})")]
    InvalidPosition(f64, f64),
    #[error("Invalid enum value: {0}")]
    InvalidToken(String),
}

impl CoreError {
    /// Graph invariant violations are reachable through UI races only and are
    /// refused silently by callers instead of being surfaced.
    pub fn is_invariant_refusal(&self) -> bool {
        matches!(
            self,
            CoreError::SelfLoop(_) | CoreError::DuplicateConnection(_, _)
        )
    }
}
