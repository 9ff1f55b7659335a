use mindmap_core::{Document, DocumentId, Edge, EdgeId, Node, NodeId, Vec2};

/// Builds a study map shaped like a real one: a central node, `branches`
/// subject nodes, and `leaves` topics under each subject. Every fifth topic
/// also links to the same topic of the next subject.
pub fn synthetic_document(branches: usize, leaves: usize) -> Document {
    let mut document = Document::new(DocumentId::new("bench"), "General Studies");
    let root = NodeId::new("root");
    push_node(&mut document, root.clone(), "General Studies".to_string(), Vec2::ZERO);

    for b in 0..branches {
        let angle = b as f64 / branches.max(1) as f64 * std::f64::consts::TAU;
        let subject = NodeId::new(format!("s{b}"));
        let at = Vec2::new(angle.cos() * 400.0, angle.sin() * 400.0);
        push_node(&mut document, subject.clone(), format!("Subject {b}"), at);
        push_edge(&mut document, &root, &subject);

        for l in 0..leaves {
            let topic = NodeId::new(format!("s{b}t{l}"));
            let offset = Vec2::new((l as f64 - leaves as f64 / 2.0) * 180.0, 250.0);
            push_node(&mut document, topic.clone(), format!("Topic {b}.{l}"), at + offset);
            push_edge(&mut document, &subject, &topic);
        }
    }

    for b in 0..branches.saturating_sub(1) {
        for l in (0..leaves).step_by(5) {
            let from = NodeId::new(format!("s{b}t{l}"));
            let to = NodeId::new(format!("s{}t{l}", b + 1));
            push_edge(&mut document, &from, &to);
        }
    }
    document
}

fn push_node(document: &mut Document, id: NodeId, label: String, position: Vec2) {
    document.nodes.push(Node::new(id, label, position));
}

fn push_edge(document: &mut Document, source: &NodeId, target: &NodeId) {
    let id = EdgeId::new(format!("{source}-{target}"));
    document
        .edges
        .push(Edge::new(id, source.clone(), target.clone()));
}
