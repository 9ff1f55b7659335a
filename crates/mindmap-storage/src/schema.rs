use crate::{SCHEMA_VERSION, StorageError};
use rusqlite::Connection;

const TABLE_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS document (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        view TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS node (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        document_id TEXT NOT NULL,
        id TEXT NOT NULL,
        payload TEXT NOT NULL,
        UNIQUE(document_id, id),
        FOREIGN KEY(document_id) REFERENCES document(id) ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS edge (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        document_id TEXT NOT NULL,
        id TEXT NOT NULL,
        source_id TEXT NOT NULL,
        target_id TEXT NOT NULL,
        payload TEXT NOT NULL,
        UNIQUE(document_id, id),
        FOREIGN KEY(document_id) REFERENCES document(id) ON DELETE CASCADE,
        FOREIGN KEY(document_id, source_id) REFERENCES node(document_id, id) ON DELETE CASCADE,
        FOREIGN KEY(document_id, target_id) REFERENCES node(document_id, id) ON DELETE CASCADE
    )",
];

const INDEX_STATEMENTS: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_node_document ON node(document_id)",
    "CREATE INDEX IF NOT EXISTS idx_edge_source ON edge(document_id, source_id)",
    "CREATE INDEX IF NOT EXISTS idx_edge_target ON edge(document_id, target_id)",
    "CREATE INDEX IF NOT EXISTS idx_document_updated ON document(updated_at)",
];

pub(crate) fn init(conn: &Connection) -> Result<(), StorageError> {
    for statement in TABLE_STATEMENTS.iter().chain(INDEX_STATEMENTS) {
        conn.execute(statement, [])?;
    }
    apply_schema_migrations(conn)
}

fn schema_version(conn: &Connection) -> Result<u32, StorageError> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(version.max(0) as u32)
}

fn apply_schema_migrations(conn: &Connection) -> Result<(), StorageError> {
    let stored_version = schema_version(conn)?;
    if stored_version > SCHEMA_VERSION {
        return Err(StorageError::Other(format!(
            "Unsupported database schema version: {stored_version} (max supported: {SCHEMA_VERSION})"
        )));
    }
    if stored_version < SCHEMA_VERSION {
        tracing::info!(from = stored_version, to = SCHEMA_VERSION, "Upgrading database schema");
        conn.pragma_update(None, "user_version", SCHEMA_VERSION.to_string())?;
    }
    Ok(())
}
