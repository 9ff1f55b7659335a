use crate::edge::Edge;
use crate::node::Node;
use crate::NodeId;
use std::collections::{HashMap, HashSet, VecDeque};

/// Minimum query length (in characters) before search emphasis kicks in.
pub const MIN_SEARCH_LEN: usize = 2;

/// Undirected neighbor lists built from an edge set.
#[derive(Debug, Default, Clone)]
pub struct Adjacency {
    neighbors: HashMap<NodeId, Vec<NodeId>>,
}

impl Adjacency {
    pub fn from_edges<'a>(edges: impl IntoIterator<Item = &'a Edge>) -> Self {
        let mut neighbors: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for edge in edges {
            neighbors
                .entry(edge.source.clone())
                .or_default()
                .push(edge.target.clone());
            neighbors
                .entry(edge.target.clone())
                .or_default()
                .push(edge.source.clone());
        }
        Self { neighbors }
    }

    pub fn neighbors(&self, node: &NodeId) -> &[NodeId] {
        self.neighbors.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Hop distance from `start` to every reachable node, `start` included at 0.
    pub fn distances_from(&self, start: &NodeId) -> HashMap<NodeId, u32> {
        let mut depth_map = HashMap::new();
        let mut queue = VecDeque::new();
        depth_map.insert(start.clone(), 0);
        queue.push_back((start.clone(), 0u32));

        while let Some((current, depth)) = queue.pop_front() {
            for neighbor in self.neighbors(&current) {
                if !depth_map.contains_key(neighbor) {
                    depth_map.insert(neighbor.clone(), depth + 1);
                    queue.push_back((neighbor.clone(), depth + 1));
                }
            }
        }
        depth_map
    }

    /// Nodes reachable within `depth` hops of `focus`, expanded one frontier
    /// per round. `focus` is always part of the result.
    pub fn within(&self, focus: &NodeId, depth: u32) -> HashSet<NodeId> {
        let mut visited = HashSet::new();
        visited.insert(focus.clone());
        let mut frontier = vec![focus.clone()];

        for _ in 0..depth {
            let mut next = Vec::new();
            for node in &frontier {
                for neighbor in self.neighbors(node) {
                    if visited.insert(neighbor.clone()) {
                        next.push(neighbor.clone());
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        visited
    }
}

pub fn bfs_distances(edges: &[Edge], start: &NodeId) -> HashMap<NodeId, u32> {
    Adjacency::from_edges(edges).distances_from(start)
}

pub fn reachable_within(edges: &[Edge], focus: &NodeId, depth: u32) -> HashSet<NodeId> {
    Adjacency::from_edges(edges).within(focus, depth)
}

/// Case-insensitive substring search over labels, in collection order.
///
/// Returns `None` when the query is too short to search, which callers treat
/// as "clear search emphasis".
pub fn search_matches<'a>(nodes: &'a [Node], query: &str) -> Option<Vec<&'a NodeId>> {
    let needle = query.trim().to_lowercase();
    if needle.chars().count() < MIN_SEARCH_LEN {
        return None;
    }
    Some(
        nodes
            .iter()
            .filter(|n| n.label.to_lowercase().contains(&needle))
            .map(|n| &n.id)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EdgeId, Vec2};

    fn path_graph() -> Vec<Edge> {
        // A - B - C - D
        vec![
            Edge::new(EdgeId::new("ab"), NodeId::new("A"), NodeId::new("B")),
            Edge::new(EdgeId::new("cb"), NodeId::new("C"), NodeId::new("B")),
            Edge::new(EdgeId::new("cd"), NodeId::new("C"), NodeId::new("D")),
        ]
    }

    fn ids(names: &[&str]) -> HashSet<NodeId> {
        names.iter().map(|n| NodeId::new(*n)).collect()
    }

    #[test]
    fn test_local_view_depths_on_path_graph() {
        let edges = path_graph();
        let a = NodeId::new("A");
        assert_eq!(reachable_within(&edges, &a, 2), ids(&["A", "B", "C"]));
        assert_eq!(reachable_within(&edges, &a, 1), ids(&["A", "B"]));
        assert_eq!(reachable_within(&edges, &a, 0), ids(&["A"]));
        assert_eq!(reachable_within(&edges, &a, 10), ids(&["A", "B", "C", "D"]));
    }

    #[test]
    fn test_bfs_distances_are_undirected() {
        let edges = path_graph();
        let dist = bfs_distances(&edges, &NodeId::new("B"));
        assert_eq!(dist[&NodeId::new("B")], 0);
        assert_eq!(dist[&NodeId::new("A")], 1);
        assert_eq!(dist[&NodeId::new("C")], 1);
        assert_eq!(dist[&NodeId::new("D")], 2);
    }

    #[test]
    fn test_isolated_focus_is_only_itself() {
        let edges = path_graph();
        let lonely = NodeId::new("Z");
        assert_eq!(reachable_within(&edges, &lonely, 3), ids(&["Z"]));
        let dist = bfs_distances(&edges, &lonely);
        assert_eq!(dist.len(), 1);
    }

    #[test]
    fn test_search_matches_case_insensitive_in_order() {
        let nodes: Vec<Node> = ["Economy", "Ecology", "Polity"]
            .iter()
            .map(|label| Node::new(NodeId::new(label.to_lowercase()), *label, Vec2::ZERO))
            .collect();

        let hits = search_matches(&nodes, "eco").unwrap();
        let hit_ids: Vec<_> = hits.iter().map(|id| id.as_str()).collect();
        assert_eq!(hit_ids, vec!["economy", "ecology"]);

        assert!(search_matches(&nodes, "e").is_none());
        assert!(search_matches(&nodes, "").is_none());
        assert_eq!(search_matches(&nodes, "zzz").unwrap().len(), 0);
    }
}
