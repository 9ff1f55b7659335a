use super::*;
use mindmap_core::{PaletteColor, Vec2, ViewTransform};

fn doc_id() -> DocumentId {
    DocumentId::new("doc-1")
}

fn node(id: &str, label: &str) -> Node {
    Node::new(NodeId::new(id), label, Vec2::new(0.0, 0.0))
}

fn edge(id: &str, a: &str, b: &str) -> Edge {
    Edge::new(EdgeId::new(id), NodeId::new(a), NodeId::new(b))
}

/// Behaviour every store must share.
async fn exercise_store<S: DocumentStore>(store: &S) {
    let id = doc_id();
    store
        .create_document(&Document::new(id.clone(), "Polity"))
        .await
        .unwrap();
    assert!(store.create_document(&Document::new(id.clone(), "Again")).await.is_err());

    for (nid, label) in [("a", "Constitution"), ("b", "Parliament"), ("c", "Judiciary")] {
        store.create_node(&id, &node(nid, label)).await.unwrap();
    }
    assert!(store.create_node(&id, &node("a", "Dup")).await.is_err());

    store.create_edge(&id, &edge("ab", "a", "b")).await.unwrap();
    store.create_edge(&id, &edge("bc", "b", "c")).await.unwrap();
    // Reverse pair, self loop and dangling endpoint are all refused.
    assert!(store.create_edge(&id, &edge("ba", "b", "a")).await.is_err());
    assert!(store.create_edge(&id, &edge("aa", "a", "a")).await.is_err());
    assert!(store.create_edge(&id, &edge("ax", "a", "x")).await.is_err());

    let moved = store
        .update_node(&id, &NodeId::new("b"), &NodePatch::position(Vec2::new(40.0, -8.0)))
        .await
        .unwrap();
    assert_eq!(moved.position, Vec2::new(40.0, -8.0));
    assert_eq!(moved.label, "Parliament");
    let recolored = store
        .update_node(&id, &NodeId::new("b"), &NodePatch::color(PaletteColor::Red))
        .await
        .unwrap();
    assert_eq!(recolored.position, Vec2::new(40.0, -8.0));
    assert!(
        store
            .update_node(&id, &NodeId::new("zz"), &NodePatch::label("x"))
            .await
            .is_err()
    );

    assert_eq!(
        store.delete_edges_for_node(&id, &NodeId::new("b")).await.unwrap(),
        2
    );
    store.delete_node(&id, &NodeId::new("b")).await.unwrap();
    assert!(store.delete_node(&id, &NodeId::new("b")).await.is_err());

    let doc = store.fetch_document(&id).await.unwrap();
    let labels: Vec<&str> = doc.nodes.iter().map(|n| n.label.as_str()).collect();
    assert_eq!(labels, vec!["Constitution", "Judiciary"]);
    assert!(doc.edges.is_empty());

    let view = ViewTransform {
        zoom: 0.5,
        pan: Vec2::new(10.0, 20.0),
    };
    let meta = store
        .update_document_metadata(
            &id,
            &DocumentPatch {
                view: Some(view),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(meta.title, "Polity");
    assert_eq!(store.fetch_document(&id).await.unwrap().meta.view, view);

    let missing = DocumentId::new("nope");
    let err = store.fetch_document(&missing).await.unwrap_err();
    assert!(err.message.contains("nope"));
    assert!(store.create_node(&missing, &node("q", "Q")).await.is_err());
}

#[tokio::test]
async fn test_memory_store_contract() {
    exercise_store(&MemoryDocumentStore::new()).await;
}

#[tokio::test]
async fn test_sqlite_store_contract() -> Result<(), StorageError> {
    exercise_store(&SqliteDocumentStore::new_in_memory()?).await;
    Ok(())
}

#[test]
fn test_delete_node_cascades_remaining_edges() -> Result<(), StorageError> {
    let store = SqliteDocumentStore::new_in_memory()?;
    let id = doc_id();
    let mut doc = Document::new(id.clone(), "Economy");
    doc.insert_node(node("n", "Inflation"))?;
    doc.insert_node(node("m", "Monetary policy"))?;
    doc.insert_edge(edge("nm", "n", "m"))?;
    store.insert_document(&doc)?;

    store.remove_node(&id, &NodeId::new("n"))?;
    let loaded = store.load(&id)?;
    assert_eq!(loaded.nodes.len(), 1);
    assert!(loaded.edges.is_empty());
    Ok(())
}

#[test]
fn test_document_survives_reopen() -> Result<(), StorageError> {
    let dir = tempfile::tempdir().map_err(|e| StorageError::Other(e.to_string()))?;
    let path = dir.path().join("mindmaps.db");
    let id = doc_id();

    {
        let store = SqliteDocumentStore::open(&path)?;
        let mut doc = Document::new(id.clone(), "Geography");
        doc.meta.description = "Physical and human".to_string();
        doc.insert_node(node("r", "Rivers"))?;
        doc.insert_node(node("m", "Monsoon"))?;
        doc.insert_edge(edge("rm", "r", "m"))?;
        store.insert_document(&doc)?;
    }

    let store = SqliteDocumentStore::open(&path)?;
    let loaded = store.load(&id)?;
    assert_eq!(loaded.meta.title, "Geography");
    assert_eq!(loaded.meta.description, "Physical and human");
    assert_eq!(loaded.nodes[0].label, "Rivers");
    assert_eq!(loaded.nodes[1].label, "Monsoon");
    assert_eq!(loaded.edges[0].id, EdgeId::new("rm"));
    Ok(())
}

#[test]
fn test_summaries_most_recent_first() -> Result<(), StorageError> {
    let store = SqliteDocumentStore::new_in_memory()?;
    store.insert_document(&Document::new(DocumentId::new("old"), "Old"))?;
    store.insert_document(&Document::new(DocumentId::new("new"), "New"))?;
    std::thread::sleep(std::time::Duration::from_millis(2));
    store.insert_node(&DocumentId::new("old"), &node("x", "Touched"))?;

    let summaries = store.summaries()?;
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].id, DocumentId::new("old"));
    assert_eq!(summaries[0].node_count, 1);
    assert_eq!(summaries[1].node_count, 0);
    Ok(())
}

#[test]
fn test_rejects_newer_schema() -> Result<(), StorageError> {
    let dir = tempfile::tempdir().map_err(|e| StorageError::Other(e.to_string()))?;
    let path = dir.path().join("future.db");
    {
        let conn = rusqlite::Connection::open(&path)?;
        conn.pragma_update(None, "user_version", (SCHEMA_VERSION + 1).to_string())?;
    }
    assert!(matches!(
        SqliteDocumentStore::open(&path),
        Err(StorageError::Other(_))
    ));
    Ok(())
}

#[test]
fn test_store_error_is_opaque_message() {
    let err: StoreError = StorageError::Graph(CoreError::SelfLoop(NodeId::new("a"))).into();
    assert_eq!(err.message, "Cannot connect node a to itself");
}
