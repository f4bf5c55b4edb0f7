//! Error types for export and import operations.

use std::path::PathBuf;
use synth_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Export without a workspace id when the store has none.
    #[error("database has no workspace to export")]
    NoWorkspace,

    /// Incremental state file written for a different workspace.
    #[error("state file tracks workspace {state}, not {workspace}")]
    StateWorkspaceMismatch { state: String, workspace: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A JSONL line that does not parse as the expected entity.
    #[error("{}:{line}: {source}", .file.display())]
    MalformedLine {
        file: PathBuf,
        line: u64,
        #[source]
        source: serde_json::Error,
    },

    /// A required export artifact is absent.
    #[error("missing export artifact: {}", .0.display())]
    MissingArtifact(PathBuf),

    /// The source root has no export directory, or several when no
    /// workspace id was given.
    #[error("cannot pick an export under {}: {reason}", .root.display())]
    AmbiguousSource { root: PathBuf, reason: String },

    /// The exported workspace row disagrees with the directory name.
    #[error("export directory {expected} contains workspace {found}")]
    WorkspaceMismatch { expected: String, found: String },

    /// Fresh import into a store that already has data.
    #[error("target database already contains workspace {0}; use append mode to merge")]
    TargetNotEmpty(String),
}
