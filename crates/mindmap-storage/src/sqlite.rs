use crate::row_mapping::{
    DOCUMENT_SELECT, document_from_row, edge_from_payload, node_from_payload, timestamp_db_value,
    timestamp_from_db,
};
use crate::{DocumentStore, DocumentSummary, StorageError, StoreResult, schema};
use chrono::Utc;
use mindmap_core::{
    CoreError, Document, DocumentId, DocumentMeta, DocumentPatch, Edge, EdgeId, Node, NodeId,
    NodePatch,
};
use parking_lot::Mutex;
use rusqlite::{Connection, params};
use std::path::Path;
use std::time::Duration;

/// Nodes and edges are kept as JSON payload columns next to the few columns
/// needed for lookups and cascades. Insertion order is preserved through a
/// sequence column.
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let _ = conn.busy_timeout(Duration::from_millis(2_500));
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        let _ = conn.pragma_update(None, "synchronous", "NORMAL");
        Self::with_connection(conn)
    }

    pub fn new_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn now() -> String {
        timestamp_db_value(Utc::now())
    }

    /// Bumps `updated_at`; doubles as the existence check for the document.
    fn touch(conn: &Connection, document: &DocumentId) -> Result<(), StorageError> {
        let changed = conn.execute(
            "UPDATE document SET updated_at = ?2 WHERE id = ?1",
            params![document.as_str(), Self::now()],
        )?;
        if changed == 0 {
            return Err(StorageError::DocumentNotFound(document.clone()));
        }
        Ok(())
    }

    fn node_exists(conn: &Connection, document: &DocumentId, node: &NodeId) -> Result<bool, StorageError> {
        Ok(conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM node WHERE document_id = ?1 AND id = ?2)",
            params![document.as_str(), node.as_str()],
            |row| row.get(0),
        )?)
    }

    fn insert_node_row(conn: &Connection, document: &DocumentId, node: &Node) -> Result<(), StorageError> {
        conn.execute(
            "INSERT INTO node (document_id, id, payload) VALUES (?1, ?2, ?3)",
            params![document.as_str(), node.id.as_str(), serde_json::to_string(node)?],
        )?;
        Ok(())
    }

    fn insert_edge_row(conn: &Connection, document: &DocumentId, edge: &Edge) -> Result<(), StorageError> {
        conn.execute(
            "INSERT INTO edge (document_id, id, source_id, target_id, payload) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                document.as_str(),
                edge.id.as_str(),
                edge.source.as_str(),
                edge.target.as_str(),
                serde_json::to_string(edge)?
            ],
        )?;
        Ok(())
    }

    pub(crate) fn summaries(&self) -> Result<Vec<DocumentSummary>, StorageError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT d.id, d.title, d.updated_at,
                    (SELECT COUNT(*) FROM node n WHERE n.document_id = d.id)
             FROM document d
             ORDER BY d.updated_at DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter()
            .map(|(id, title, updated_at, count)| -> Result<_, StorageError> {
                Ok(DocumentSummary {
                    id: DocumentId::new(id),
                    title,
                    node_count: count.max(0) as usize,
                    updated_at: timestamp_from_db(&updated_at)?,
                })
            })
            .collect()
    }

    pub(crate) fn load(&self, id: &DocumentId) -> Result<Document, StorageError> {
        let conn = self.conn.lock();
        let header = {
            let mut stmt = conn.prepare(&format!("{DOCUMENT_SELECT} WHERE id = ?1"))?;
            let mut rows = stmt.query([id.as_str()])?;
            let Some(row) = rows.next()? else {
                return Err(StorageError::DocumentNotFound(id.clone()));
            };
            document_from_row(row)?
        };

        let mut stmt = conn.prepare("SELECT payload FROM node WHERE document_id = ?1 ORDER BY seq")?;
        let nodes = stmt
            .query_map([id.as_str()], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
            .iter()
            .map(|payload| node_from_payload(payload))
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare("SELECT payload FROM edge WHERE document_id = ?1 ORDER BY seq")?;
        let edges = stmt
            .query_map([id.as_str()], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
            .iter()
            .map(|payload| edge_from_payload(payload))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Document {
            id: header.id,
            meta: header.meta,
            nodes,
            edges,
            created_at: header.created_at,
            updated_at: header.updated_at,
        })
    }

    pub(crate) fn insert_document(&self, document: &Document) -> Result<(), StorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM document WHERE id = ?1)",
            [document.id.as_str()],
            |row| row.get(0),
        )?;
        if exists {
            return Err(StorageError::DuplicateDocument(document.id.clone()));
        }
        tx.execute(
            "INSERT INTO document (id, title, description, view, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                document.id.as_str(),
                document.meta.title,
                document.meta.description,
                serde_json::to_string(&document.meta.view)?,
                timestamp_db_value(document.created_at),
                timestamp_db_value(document.updated_at),
            ],
        )?;
        for node in &document.nodes {
            Self::insert_node_row(&tx, &document.id, node)?;
        }
        for edge in &document.edges {
            Self::insert_edge_row(&tx, &document.id, edge)?;
        }
        tx.commit()?;
        tracing::debug!(document = %document.id, nodes = document.nodes.len(), "Created document");
        Ok(())
    }

    pub(crate) fn remove_document(&self, id: &DocumentId) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM document WHERE id = ?1", [id.as_str()])?;
        if changed == 0 {
            return Err(StorageError::DocumentNotFound(id.clone()));
        }
        tracing::debug!(document = %id, "Deleted document");
        Ok(())
    }

    pub(crate) fn insert_node(&self, document: &DocumentId, node: &Node) -> Result<(), StorageError> {
        if !node.position.is_finite() {
            return Err(CoreError::InvalidPosition(node.position.x, node.position.y).into());
        }
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        Self::touch(&tx, document)?;
        if Self::node_exists(&tx, document, &node.id)? {
            return Err(CoreError::DuplicateNode(node.id.clone()).into());
        }
        Self::insert_node_row(&tx, document, node)?;
        tx.commit()?;
        tracing::debug!(%document, node = %node.id, "Stored node");
        Ok(())
    }

    pub(crate) fn patch_node(
        &self,
        document: &DocumentId,
        id: &NodeId,
        patch: &NodePatch,
    ) -> Result<Node, StorageError> {
        if let Some(position) = patch.position
            && !position.is_finite()
        {
            return Err(CoreError::InvalidPosition(position.x, position.y).into());
        }
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        Self::touch(&tx, document)?;
        let payload: Option<String> = {
            let mut stmt = tx.prepare("SELECT payload FROM node WHERE document_id = ?1 AND id = ?2")?;
            let mut rows = stmt.query(params![document.as_str(), id.as_str()])?;
            match rows.next()? {
                Some(row) => Some(row.get(0)?),
                None => None,
            }
        };
        let Some(payload) = payload else {
            return Err(CoreError::NodeNotFound(id.clone()).into());
        };
        let mut node = node_from_payload(&payload)?;
        node.apply(patch);
        tx.execute(
            "UPDATE node SET payload = ?3 WHERE document_id = ?1 AND id = ?2",
            params![document.as_str(), id.as_str(), serde_json::to_string(&node)?],
        )?;
        tx.commit()?;
        tracing::debug!(%document, node = %id, "Updated node");
        Ok(node)
    }

    pub(crate) fn remove_node(&self, document: &DocumentId, id: &NodeId) -> Result<(), StorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        Self::touch(&tx, document)?;
        // Remaining edges go with it through the foreign key cascade.
        let changed = tx.execute(
            "DELETE FROM node WHERE document_id = ?1 AND id = ?2",
            params![document.as_str(), id.as_str()],
        )?;
        if changed == 0 {
            return Err(CoreError::NodeNotFound(id.clone()).into());
        }
        tx.commit()?;
        tracing::debug!(%document, node = %id, "Deleted node");
        Ok(())
    }

    pub(crate) fn remove_edges_for_node(
        &self,
        document: &DocumentId,
        id: &NodeId,
    ) -> Result<usize, StorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        Self::touch(&tx, document)?;
        let removed = tx.execute(
            "DELETE FROM edge WHERE document_id = ?1 AND (source_id = ?2 OR target_id = ?2)",
            params![document.as_str(), id.as_str()],
        )?;
        tx.commit()?;
        tracing::debug!(%document, node = %id, removed, "Deleted edges for node");
        Ok(removed)
    }

    pub(crate) fn insert_edge(&self, document: &DocumentId, edge: &Edge) -> Result<(), StorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        Self::touch(&tx, document)?;
        let id_taken: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM edge WHERE document_id = ?1 AND id = ?2)",
            params![document.as_str(), edge.id.as_str()],
            |row| row.get(0),
        )?;
        if id_taken {
            return Err(CoreError::DuplicateEdgeId(edge.id.clone()).into());
        }
        if edge.source == edge.target {
            return Err(CoreError::SelfLoop(edge.source.clone()).into());
        }
        for endpoint in [&edge.source, &edge.target] {
            if !Self::node_exists(&tx, document, endpoint)? {
                return Err(CoreError::DanglingEndpoint(endpoint.clone()).into());
            }
        }
        let connected: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM edge WHERE document_id = ?1
                AND ((source_id = ?2 AND target_id = ?3) OR (source_id = ?3 AND target_id = ?2)))",
            params![document.as_str(), edge.source.as_str(), edge.target.as_str()],
            |row| row.get(0),
        )?;
        if connected {
            return Err(CoreError::DuplicateConnection(edge.source.clone(), edge.target.clone()).into());
        }
        Self::insert_edge_row(&tx, document, edge)?;
        tx.commit()?;
        tracing::debug!(%document, edge = %edge.id, "Stored edge");
        Ok(())
    }

    pub(crate) fn remove_edge(&self, document: &DocumentId, id: &EdgeId) -> Result<(), StorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        Self::touch(&tx, document)?;
        let changed = tx.execute(
            "DELETE FROM edge WHERE document_id = ?1 AND id = ?2",
            params![document.as_str(), id.as_str()],
        )?;
        if changed == 0 {
            return Err(CoreError::EdgeNotFound(id.clone()).into());
        }
        tx.commit()?;
        tracing::debug!(%document, edge = %id, "Deleted edge");
        Ok(())
    }

    pub(crate) fn patch_metadata(
        &self,
        document: &DocumentId,
        patch: &DocumentPatch,
    ) -> Result<DocumentMeta, StorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut meta = {
            let mut stmt = tx.prepare(&format!("{DOCUMENT_SELECT} WHERE id = ?1"))?;
            let mut rows = stmt.query([document.as_str()])?;
            let Some(row) = rows.next()? else {
                return Err(StorageError::DocumentNotFound(document.clone()));
            };
            document_from_row(row)?.meta
        };
        meta.apply(patch);
        tx.execute(
            "UPDATE document SET title = ?2, description = ?3, view = ?4, updated_at = ?5 WHERE id = ?1",
            params![
                document.as_str(),
                meta.title,
                meta.description,
                serde_json::to_string(&meta.view)?,
                Self::now(),
            ],
        )?;
        tx.commit()?;
        tracing::debug!(%document, "Updated document metadata");
        Ok(meta)
    }
}

impl DocumentStore for SqliteDocumentStore {
    async fn list_documents(&self) -> StoreResult<Vec<DocumentSummary>> {
        Ok(self.summaries()?)
    }

    async fn fetch_document(&self, id: &DocumentId) -> StoreResult<Document> {
        Ok(self.load(id)?)
    }

    async fn create_document(&self, document: &Document) -> StoreResult<()> {
        Ok(self.insert_document(document)?)
    }

    async fn delete_document(&self, id: &DocumentId) -> StoreResult<()> {
        Ok(self.remove_document(id)?)
    }

    async fn create_node(&self, document: &DocumentId, node: &Node) -> StoreResult<()> {
        Ok(self.insert_node(document, node)?)
    }

    async fn update_node(
        &self,
        document: &DocumentId,
        node: &NodeId,
        patch: &NodePatch,
    ) -> StoreResult<Node> {
        Ok(self.patch_node(document, node, patch)?)
    }

    async fn delete_node(&self, document: &DocumentId, node: &NodeId) -> StoreResult<()> {
        Ok(self.remove_node(document, node)?)
    }

    async fn delete_edges_for_node(&self, document: &DocumentId, node: &NodeId) -> StoreResult<usize> {
        Ok(self.remove_edges_for_node(document, node)?)
    }

    async fn create_edge(&self, document: &DocumentId, edge: &Edge) -> StoreResult<()> {
        Ok(self.insert_edge(document, edge)?)
    }

    async fn delete_edge(&self, document: &DocumentId, edge: &EdgeId) -> StoreResult<()> {
        Ok(self.remove_edge(document, edge)?)
    }

    async fn update_document_metadata(
        &self,
        document: &DocumentId,
        patch: &DocumentPatch,
    ) -> StoreResult<DocumentMeta> {
        Ok(self.patch_metadata(document, patch)?)
    }
}
