//! Document persistence behind one capability interface, with an in-memory
//! and a sqlite implementation chosen once at startup.

use chrono::{DateTime, Utc};
use mindmap_core::{
    CoreError, Document, DocumentId, DocumentMeta, DocumentPatch, Edge, EdgeId, Node, NodeId,
    NodePatch,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

mod memory;
mod row_mapping;
mod schema;
mod sqlite;

pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

const SCHEMA_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("{0}")]
    Graph(#[from] CoreError),
    #[error("Document {0} not found")]
    DocumentNotFound(DocumentId),
    #[error("Document {0} already exists")]
    DuplicateDocument(DocumentId),
    #[error("Other error: {0}")]
    Other(String),
}

/// What callers of a [`DocumentStore`] see: a message and nothing else.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<StorageError> for StoreError {
    fn from(error: StorageError) -> Self {
        Self::new(error.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub title: String,
    pub node_count: usize,
    pub updated_at: DateTime<Utc>,
}

impl DocumentSummary {
    pub fn of(document: &Document) -> Self {
        Self {
            id: document.id.clone(),
            title: document.meta.title.clone(),
            node_count: document.nodes.len(),
            updated_at: document.updated_at,
        }
    }
}

/// Key-addressed document store. Every call is a request/response whose
/// failure is opaque to the caller.
pub trait DocumentStore: Send + Sync {
    /// Most recently updated first.
    fn list_documents(&self) -> impl Future<Output = StoreResult<Vec<DocumentSummary>>> + Send;

    fn fetch_document(
        &self,
        id: &DocumentId,
    ) -> impl Future<Output = StoreResult<Document>> + Send;

    fn create_document(&self, document: &Document) -> impl Future<Output = StoreResult<()>> + Send;

    fn delete_document(&self, id: &DocumentId) -> impl Future<Output = StoreResult<()>> + Send;

    fn create_node(
        &self,
        document: &DocumentId,
        node: &Node,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn update_node(
        &self,
        document: &DocumentId,
        node: &NodeId,
        patch: &NodePatch,
    ) -> impl Future<Output = StoreResult<Node>> + Send;

    /// Also drops any edge still touching the node.
    fn delete_node(
        &self,
        document: &DocumentId,
        node: &NodeId,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Returns how many edges were removed.
    fn delete_edges_for_node(
        &self,
        document: &DocumentId,
        node: &NodeId,
    ) -> impl Future<Output = StoreResult<usize>> + Send;

    fn create_edge(
        &self,
        document: &DocumentId,
        edge: &Edge,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn delete_edge(
        &self,
        document: &DocumentId,
        edge: &EdgeId,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn update_document_metadata(
        &self,
        document: &DocumentId,
        patch: &DocumentPatch,
    ) -> impl Future<Output = StoreResult<DocumentMeta>> + Send;
}

#[cfg(test)]
mod tests;
