//! Presentation-only emphasis: visibility, depth fading and search accents.
//!
//! Precedence, strongest first:
//! 1. the mode decides visibility (local view hides everything outside the
//!    reachable set);
//! 2. an active search decides opacity (matches full plus accent, the rest
//!    dimmed);
//! 3. otherwise the selected node, or failing that the local focus, anchors
//!    depth fading by undirected hop distance.
//!
//! Nothing here touches the data model.

use mindmap_core::graph::MIN_SEARCH_LEN;
use mindmap_core::{Adjacency, Edge, EdgeId, GraphMode, Node, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmphasisConfig {
    /// Opacity at hop distance 0, 1, 2 and 3-or-more/unreachable.
    pub depth_opacity: [f32; 4],
    pub search_dim: f32,
    /// Opacity of edges not incident to the anchor while fading.
    pub edge_dim: f32,
    /// Width multiplier for highlighted edges.
    pub highlight_width: f32,
}

impl Default for EmphasisConfig {
    fn default() -> Self {
        Self {
            depth_opacity: [1.0, 0.85, 0.6, 0.2],
            search_dim: 0.15,
            edge_dim: 0.25,
            highlight_width: 2.0,
        }
    }
}

impl EmphasisConfig {
    pub fn opacity_at(&self, distance: Option<u32>) -> f32 {
        match distance {
            Some(d) if (d as usize) < self.depth_opacity.len() => self.depth_opacity[d as usize],
            _ => self.depth_opacity[self.depth_opacity.len() - 1],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeEmphasis {
    pub hidden: bool,
    pub opacity: f32,
    /// Search match border.
    pub accent: bool,
}

impl NodeEmphasis {
    pub const NEUTRAL: NodeEmphasis = NodeEmphasis {
        hidden: false,
        opacity: 1.0,
        accent: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeEmphasis {
    pub hidden: bool,
    pub opacity: f32,
    pub highlighted: bool,
}

impl EdgeEmphasis {
    pub const NEUTRAL: EdgeEmphasis = EdgeEmphasis {
        hidden: false,
        opacity: 1.0,
        highlighted: false,
    };
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Emphasis {
    pub nodes: HashMap<NodeId, NodeEmphasis>,
    pub edges: HashMap<EdgeId, EdgeEmphasis>,
    /// Search matches among visible nodes, in collection order.
    pub matches: Vec<NodeId>,
}

impl Emphasis {
    pub fn node(&self, id: &NodeId) -> NodeEmphasis {
        self.nodes.get(id).copied().unwrap_or(NodeEmphasis::NEUTRAL)
    }

    pub fn edge(&self, id: &EdgeId) -> EdgeEmphasis {
        self.edges.get(id).copied().unwrap_or(EdgeEmphasis::NEUTRAL)
    }

    pub fn is_neutral(&self) -> bool {
        self.nodes.values().all(|n| *n == NodeEmphasis::NEUTRAL)
            && self.edges.values().all(|e| *e == EdgeEmphasis::NEUTRAL)
    }

    pub fn first_match(&self) -> Option<&NodeId> {
        self.matches.first()
    }
}

/// The view state emphasis is derived from.
#[derive(Debug, Clone, Copy)]
pub struct EmphasisInput<'a> {
    pub nodes: &'a [Node],
    pub edges: &'a [Edge],
    pub selected: Option<&'a NodeId>,
    pub mode: &'a GraphMode,
    pub search: Option<&'a str>,
}

pub fn compute(input: EmphasisInput<'_>, config: &EmphasisConfig) -> Emphasis {
    let visible: Option<HashSet<NodeId>> = match input.mode {
        GraphMode::Global => None,
        GraphMode::Local { focus, depth } => {
            Some(Adjacency::from_edges(input.edges).within(focus, *depth))
        }
    };
    let is_visible = |id: &NodeId| visible.as_ref().is_none_or(|set| set.contains(id));

    let visible_edges: Vec<&Edge> = input
        .edges
        .iter()
        .filter(|e| is_visible(&e.source) && is_visible(&e.target))
        .collect();

    let needle = input
        .search
        .map(|q| q.trim().to_lowercase())
        .filter(|q| q.chars().count() >= MIN_SEARCH_LEN);

    let mut emphasis = Emphasis::default();

    if let Some(needle) = needle {
        for node in input.nodes {
            let hidden = !is_visible(&node.id);
            let hit = !hidden && node.label.to_lowercase().contains(&needle);
            if hit {
                emphasis.matches.push(node.id.clone());
            }
            emphasis.nodes.insert(
                node.id.clone(),
                NodeEmphasis {
                    hidden,
                    opacity: if hit { 1.0 } else { config.search_dim },
                    accent: hit,
                },
            );
        }
        let matched: HashSet<&NodeId> = emphasis.matches.iter().collect();
        for edge in input.edges {
            let hidden = !(is_visible(&edge.source) && is_visible(&edge.target));
            let both = matched.contains(&edge.source) && matched.contains(&edge.target);
            emphasis.edges.insert(
                edge.id.clone(),
                EdgeEmphasis {
                    hidden,
                    opacity: if both { 1.0 } else { config.search_dim },
                    highlighted: false,
                },
            );
        }
        return emphasis;
    }

    // Local view fades from its focus; selection only anchors global view.
    let anchor = match input.mode.focus() {
        Some(focus) => Some(focus),
        None => input
            .selected
            .filter(|id| input.nodes.iter().any(|n| &n.id == *id)),
    };

    let distances = anchor.map(|anchor| {
        Adjacency::from_edges(visible_edges.iter().copied()).distances_from(anchor)
    });

    for node in input.nodes {
        let hidden = !is_visible(&node.id);
        let opacity = match &distances {
            Some(dist) => config.opacity_at(dist.get(&node.id).copied()),
            None => 1.0,
        };
        emphasis.nodes.insert(
            node.id.clone(),
            NodeEmphasis {
                hidden,
                opacity,
                accent: false,
            },
        );
    }

    for edge in input.edges {
        let hidden = !(is_visible(&edge.source) && is_visible(&edge.target));
        let (opacity, highlighted) = match anchor {
            Some(anchor) if edge.touches(anchor) => (1.0, true),
            Some(_) => (config.edge_dim, false),
            None => (1.0, false),
        };
        emphasis.edges.insert(
            edge.id.clone(),
            EdgeEmphasis {
                hidden,
                opacity,
                highlighted,
            },
        );
    }
    emphasis
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindmap_core::Vec2;

    fn node(id: &str, label: &str) -> Node {
        Node::new(NodeId::new(id), label, Vec2::ZERO)
    }

    fn edge(id: &str, a: &str, b: &str) -> Edge {
        Edge::new(EdgeId::new(id), NodeId::new(a), NodeId::new(b))
    }

    /// A - B - C - D, plus isolated E.
    fn fixture() -> (Vec<Node>, Vec<Edge>) {
        (
            vec![
                node("A", "Alpha"),
                node("B", "Beta"),
                node("C", "Gamma"),
                node("D", "Delta"),
                node("E", "Epsilon"),
            ],
            vec![edge("ab", "A", "B"), edge("bc", "B", "C"), edge("cd", "C", "D")],
        )
    }

    fn id(s: &str) -> NodeId {
        NodeId::new(s)
    }

    #[test]
    fn test_selection_fades_by_depth() {
        let (nodes, edges) = fixture();
        let cfg = EmphasisConfig::default();
        let selected = id("A");
        let out = compute(
            EmphasisInput {
                nodes: &nodes,
                edges: &edges,
                selected: Some(&selected),
                mode: &GraphMode::Global,
                search: None,
            },
            &cfg,
        );
        assert_eq!(out.node(&id("A")).opacity, 1.0);
        assert_eq!(out.node(&id("B")).opacity, 0.85);
        assert_eq!(out.node(&id("C")).opacity, 0.6);
        assert_eq!(out.node(&id("D")).opacity, 0.2);
        assert_eq!(out.node(&id("E")).opacity, 0.2);

        assert!(out.edge(&EdgeId::new("ab")).highlighted);
        assert!(!out.edge(&EdgeId::new("bc")).highlighted);
        assert_eq!(out.edge(&EdgeId::new("bc")).opacity, cfg.edge_dim);
    }

    #[test]
    fn test_local_mode_hides_outside_reachable_set() {
        let (nodes, edges) = fixture();
        let mode = GraphMode::Local {
            focus: id("A"),
            depth: 2,
        };
        let out = compute(
            EmphasisInput {
                nodes: &nodes,
                edges: &edges,
                selected: None,
                mode: &mode,
                search: None,
            },
            &EmphasisConfig::default(),
        );
        let shown: HashSet<&str> = out
            .nodes
            .iter()
            .filter(|(_, e)| !e.hidden)
            .map(|(id, _)| id.as_str())
            .collect();
        assert_eq!(shown, HashSet::from(["A", "B", "C"]));
        assert!(out.edge(&EdgeId::new("cd")).hidden);
        assert!(!out.edge(&EdgeId::new("bc")).hidden);
        // Faded relative to the focus.
        assert_eq!(out.node(&id("C")).opacity, 0.6);
    }

    #[test]
    fn test_local_mode_fades_from_focus_not_selection() {
        let (nodes, edges) = fixture();
        let mode = GraphMode::Local {
            focus: id("A"),
            depth: 3,
        };
        let selected = id("C");
        let out = compute(
            EmphasisInput {
                nodes: &nodes,
                edges: &edges,
                selected: Some(&selected),
                mode: &mode,
                search: None,
            },
            &EmphasisConfig::default(),
        );
        assert_eq!(out.node(&id("A")).opacity, 1.0);
        assert_eq!(out.node(&id("B")).opacity, 0.85);
        assert_eq!(out.node(&id("C")).opacity, 0.6);
        assert!(out.edge(&EdgeId::new("ab")).highlighted);
        assert!(!out.edge(&EdgeId::new("cd")).highlighted);
    }

    #[test]
    fn test_global_without_selection_is_neutral() {
        let (nodes, edges) = fixture();
        let out = compute(
            EmphasisInput {
                nodes: &nodes,
                edges: &edges,
                selected: None,
                mode: &GraphMode::Global,
                search: Some("a"),
            },
            &EmphasisConfig::default(),
        );
        assert!(out.is_neutral());
        assert!(out.matches.is_empty());
    }

    #[test]
    fn test_search_overrides_selection_fading() {
        let nodes = vec![
            node("economy", "Economy"),
            node("ecology", "Ecology"),
            node("polity", "Polity"),
        ];
        let edges = vec![edge("e1", "economy", "polity")];
        let selected = id("polity");
        let cfg = EmphasisConfig::default();
        let out = compute(
            EmphasisInput {
                nodes: &nodes,
                edges: &edges,
                selected: Some(&selected),
                mode: &GraphMode::Global,
                search: Some("  ECO "),
            },
            &cfg,
        );
        assert_eq!(out.matches, vec![id("economy"), id("ecology")]);
        assert_eq!(out.first_match(), Some(&id("economy")));
        assert!(out.node(&id("economy")).accent);
        assert_eq!(out.node(&id("ecology")).opacity, 1.0);
        assert_eq!(out.node(&id("polity")).opacity, cfg.search_dim);
        assert!(!out.node(&id("polity")).accent);
    }
}
