use crate::{DocumentStore, DocumentSummary, StorageError, StoreResult};
use mindmap_core::{
    Document, DocumentId, DocumentMeta, DocumentPatch, Edge, EdgeId, Node, NodeId, NodePatch,
};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Process-local store. Used by tests and by sessions that do not need to
/// outlive the process.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<DocumentId, Document>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        Self {
            documents: RwLock::new(documents.into_iter().map(|d| (d.id.clone(), d)).collect()),
        }
    }

    /// Snapshot of a stored document, bypassing the async interface.
    pub fn snapshot(&self, id: &DocumentId) -> Option<Document> {
        self.documents.read().get(id).cloned()
    }

    fn with_document<T>(
        &self,
        id: &DocumentId,
        f: impl FnOnce(&mut Document) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut documents = self.documents.write();
        let document = documents
            .get_mut(id)
            .ok_or_else(|| StorageError::DocumentNotFound(id.clone()))?;
        f(document)
    }
}

impl DocumentStore for MemoryDocumentStore {
    async fn list_documents(&self) -> StoreResult<Vec<DocumentSummary>> {
        let mut summaries: Vec<DocumentSummary> =
            self.documents.read().values().map(DocumentSummary::of).collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    async fn fetch_document(&self, id: &DocumentId) -> StoreResult<Document> {
        Ok(self
            .snapshot(id)
            .ok_or_else(|| StorageError::DocumentNotFound(id.clone()))?)
    }

    async fn create_document(&self, document: &Document) -> StoreResult<()> {
        let mut documents = self.documents.write();
        if documents.contains_key(&document.id) {
            return Err(StorageError::DuplicateDocument(document.id.clone()).into());
        }
        documents.insert(document.id.clone(), document.clone());
        Ok(())
    }

    async fn delete_document(&self, id: &DocumentId) -> StoreResult<()> {
        self.documents
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::DocumentNotFound(id.clone()).into())
    }

    async fn create_node(&self, document: &DocumentId, node: &Node) -> StoreResult<()> {
        Ok(self.with_document(document, |doc| {
            doc.insert_node(node.clone())?;
            Ok(())
        })?)
    }

    async fn update_node(
        &self,
        document: &DocumentId,
        node: &NodeId,
        patch: &NodePatch,
    ) -> StoreResult<Node> {
        Ok(self.with_document(document, |doc| Ok(doc.update_node(node, patch)?.clone()))?)
    }

    async fn delete_node(&self, document: &DocumentId, node: &NodeId) -> StoreResult<()> {
        Ok(self.with_document(document, |doc| {
            doc.remove_node(node)?;
            Ok(())
        })?)
    }

    async fn delete_edges_for_node(&self, document: &DocumentId, node: &NodeId) -> StoreResult<usize> {
        Ok(self.with_document(document, |doc| {
            let before = doc.edges.len();
            doc.edges.retain(|e| !e.touches(node));
            doc.touch();
            Ok(before - doc.edges.len())
        })?)
    }

    async fn create_edge(&self, document: &DocumentId, edge: &Edge) -> StoreResult<()> {
        Ok(self.with_document(document, |doc| {
            doc.insert_edge(edge.clone())?;
            Ok(())
        })?)
    }

    async fn delete_edge(&self, document: &DocumentId, edge: &EdgeId) -> StoreResult<()> {
        Ok(self.with_document(document, |doc| {
            doc.remove_edge(edge)?;
            Ok(())
        })?)
    }

    async fn update_document_metadata(
        &self,
        document: &DocumentId,
        patch: &DocumentPatch,
    ) -> StoreResult<DocumentMeta> {
        Ok(self.with_document(document, |doc| {
            doc.update_meta(patch);
            Ok(doc.meta.clone())
        })?)
    }
}
