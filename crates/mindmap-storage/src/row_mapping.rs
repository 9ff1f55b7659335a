use crate::StorageError;
use chrono::{DateTime, SecondsFormat, Utc};
use mindmap_core::{DocumentId, DocumentMeta, Edge, Node, ViewTransform};
use rusqlite::Row;

/// Document columns as selected by `DOCUMENT_SELECT`.
pub(crate) struct DocumentRow {
    pub id: DocumentId,
    pub meta: DocumentMeta,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) const DOCUMENT_SELECT: &str =
    "SELECT id, title, description, view, created_at, updated_at FROM document";

pub(crate) fn document_from_row(row: &Row) -> Result<DocumentRow, StorageError> {
    let view: String = row.get(3)?;
    Ok(DocumentRow {
        id: DocumentId::new(row.get::<_, String>(0)?),
        meta: DocumentMeta {
            title: row.get(1)?,
            description: row.get(2)?,
            view: serde_json::from_str::<ViewTransform>(&view)?,
        },
        created_at: timestamp_from_db(&row.get::<_, String>(4)?)?,
        updated_at: timestamp_from_db(&row.get::<_, String>(5)?)?,
    })
}

pub(crate) fn node_from_payload(payload: &str) -> Result<Node, StorageError> {
    Ok(serde_json::from_str(payload)?)
}

pub(crate) fn edge_from_payload(payload: &str) -> Result<Edge, StorageError> {
    Ok(serde_json::from_str(payload)?)
}

/// Fixed-width so that text ordering in sqlite matches time ordering.
pub(crate) fn timestamp_db_value(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn timestamp_from_db(value: &str) -> Result<DateTime<Utc>, StorageError> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}
