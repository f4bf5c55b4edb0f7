//! Error types for store operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing a dataset store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying SQLite error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error (directory creation, file checks).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error for meta values or cursors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Read-only open of a database file that does not exist.
    #[error("database file not found: {}", .0.display())]
    DatabaseMissing(PathBuf),

    /// Workspace id not present in the store.
    #[error("workspace not found: {0}")]
    WorkspaceNotFound(String),

    /// Pagination token that does not decode to a known cursor shape.
    #[error("invalid cursor")]
    InvalidCursor,

    /// Cursor and offset pagination requested together.
    #[error("cursor cannot be combined with offset")]
    CursorWithOffset,

    /// Channel row with a type string outside the known set.
    #[error(transparent)]
    UnknownChannelType(#[from] synth_core::UnknownChannelType),
}
