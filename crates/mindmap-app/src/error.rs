use mindmap_core::{CoreError, DocumentId};
use mindmap_storage::StoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No document open. Call load_document first.")]
    NoDocument,
    /// Rejected locally before anything reaches the store.
    #[error("{0}")]
    Invalid(#[from] CoreError),
    #[error("Failed to open document {id}: {source}")]
    Load {
        id: DocumentId,
        #[source]
        source: StoreError,
    },
    #[error("Rendering surface error: {0}")]
    Surface(String),
    #[error("Failed to read settings from {path}: {source}")]
    SettingsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed settings in {path}: {source}")]
    SettingsFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid settings: {0}")]
    Settings(String),
}
