//! Envelope protocol between the host controller and the rendering surface.
//!
//! Every message is a JSON object `{ "type": ..., "data": {...} }`. Field
//! names inside `data` are camelCase.

use mindmap_core::{Edge, EdgeId, GraphMode, GraphPayload, Node, NodeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    Global,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomDirection {
    In,
    Out,
}

/// Host → surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum HostMessage {
    Init(GraphPayload),
    /// Full replacement of the node/edge payload, never a diff.
    Update(GraphPayload),
    Select {
        node_id: Option<NodeId>,
    },
    AddNode {
        node: Node,
    },
    UpdateNode {
        node: Node,
    },
    RemoveNode {
        node_id: NodeId,
    },
    AddEdge {
        edge: Edge,
    },
    RemoveEdge {
        edge_id: EdgeId,
    },
    Fit,
    Focus {
        node_id: NodeId,
    },
    Search {
        query: String,
    },
    SetMode {
        mode: ModeKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node_id: Option<NodeId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        depth: Option<u32>,
    },
    Zoom {
        direction: ZoomDirection,
    },
    Reset,
}

impl HostMessage {
    pub fn set_mode(mode: &GraphMode) -> Self {
        match mode {
            GraphMode::Global => HostMessage::SetMode {
                mode: ModeKind::Global,
                node_id: None,
                depth: None,
            },
            GraphMode::Local { focus, depth } => HostMessage::SetMode {
                mode: ModeKind::Local,
                node_id: Some(focus.clone()),
                depth: Some(*depth),
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            HostMessage::Init(_) => "init",
            HostMessage::Update(_) => "update",
            HostMessage::Select { .. } => "select",
            HostMessage::AddNode { .. } => "addNode",
            HostMessage::UpdateNode { .. } => "updateNode",
            HostMessage::RemoveNode { .. } => "removeNode",
            HostMessage::AddEdge { .. } => "addEdge",
            HostMessage::RemoveEdge { .. } => "removeEdge",
            HostMessage::Fit => "fit",
            HostMessage::Focus { .. } => "focus",
            HostMessage::Search { .. } => "search",
            HostMessage::SetMode { .. } => "setMode",
            HostMessage::Zoom { .. } => "zoom",
            HostMessage::Reset => "reset",
        }
    }

    /// Messages that carry graph data. A later `init` subsumes all of them.
    pub fn carries_graph_data(&self) -> bool {
        matches!(
            self,
            HostMessage::Init(_)
                | HostMessage::Update(_)
                | HostMessage::AddNode { .. }
                | HostMessage::UpdateNode { .. }
                | HostMessage::RemoveNode { .. }
                | HostMessage::AddEdge { .. }
                | HostMessage::RemoveEdge { .. }
        )
    }
}

/// Resolves a wire-level `setMode` into a [`GraphMode`]. A local request
/// without a focus node falls back to global.
pub fn resolve_mode(mode: ModeKind, node_id: Option<NodeId>, depth: Option<u32>) -> GraphMode {
    match (mode, node_id) {
        (ModeKind::Local, Some(focus)) => GraphMode::Local {
            focus,
            depth: depth.unwrap_or(GraphMode::DEFAULT_LOCAL_DEPTH),
        },
        _ => GraphMode::Global,
    }
}

/// Surface → host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum SurfaceMessage {
    Ready,
    Error { message: String },
    NodeSelect { node_id: Option<NodeId> },
    NodeDoubleTap { node_id: NodeId },
    AddNode { x: f64, y: f64 },
    NodeMove { node_id: NodeId, x: f64, y: f64 },
    LongPress { node_id: NodeId, x: f64, y: f64 },
}

impl SurfaceMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            SurfaceMessage::Ready => "ready",
            SurfaceMessage::Error { .. } => "error",
            SurfaceMessage::NodeSelect { .. } => "nodeSelect",
            SurfaceMessage::NodeDoubleTap { .. } => "nodeDoubleTap",
            SurfaceMessage::AddNode { .. } => "addNode",
            SurfaceMessage::NodeMove { .. } => "nodeMove",
            SurfaceMessage::LongPress { .. } => "longPress",
        }
    }
}

pub fn encode<T: Serialize>(message: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}

pub fn decode<T: for<'de> Deserialize<'de>>(text: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindmap_core::Vec2;

    #[test]
    fn test_host_envelope_shape() {
        let msg = HostMessage::Focus {
            node_id: NodeId::new("n1"),
        };
        let json = encode(&msg).unwrap();
        assert_eq!(json, r#"{"type":"focus","data":{"nodeId":"n1"}}"#);

        let msg = HostMessage::set_mode(&GraphMode::Local {
            focus: NodeId::new("n1"),
            depth: 2,
        });
        let json = encode(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"type":"setMode","data":{"mode":"local","nodeId":"n1","depth":2}}"#
        );
    }

    #[test]
    fn test_init_carries_full_payload() {
        let payload = GraphPayload {
            nodes: vec![Node::new(NodeId::new("a"), "A", Vec2::new(1.0, 2.0))],
            edges: vec![],
        };
        let json = encode(&HostMessage::Init(payload.clone())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "init");
        assert_eq!(value["data"]["nodes"][0]["label"], "A");

        let back: HostMessage = decode(&json).unwrap();
        assert_eq!(back, HostMessage::Init(payload));
    }

    #[test]
    fn test_surface_messages_decode_from_page_json() {
        let msg: SurfaceMessage =
            decode(r#"{"type":"nodeMove","data":{"nodeId":"n1","x":10.5,"y":-3}}"#).unwrap();
        assert_eq!(
            msg,
            SurfaceMessage::NodeMove {
                node_id: NodeId::new("n1"),
                x: 10.5,
                y: -3.0
            }
        );

        let msg: SurfaceMessage = decode(r#"{"type":"nodeSelect","data":{"nodeId":null}}"#).unwrap();
        assert_eq!(msg, SurfaceMessage::NodeSelect { node_id: None });

        let msg: SurfaceMessage = decode(r#"{"type":"ready"}"#).unwrap();
        assert_eq!(msg, SurfaceMessage::Ready);

        assert!(decode::<SurfaceMessage>(r#"{"type":"explode","data":{}}"#).is_err());
    }

    #[test]
    fn test_resolve_mode() {
        assert_eq!(
            resolve_mode(ModeKind::Local, Some(NodeId::new("x")), None),
            GraphMode::Local {
                focus: NodeId::new("x"),
                depth: GraphMode::DEFAULT_LOCAL_DEPTH
            }
        );
        assert_eq!(resolve_mode(ModeKind::Local, None, Some(3)), GraphMode::Global);
        assert_eq!(resolve_mode(ModeKind::Global, Some(NodeId::new("x")), Some(1)), GraphMode::Global);
    }
}
