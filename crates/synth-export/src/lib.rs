//! JSONL export and import for workspace datasets.
//!
//! An export is a per-workspace directory of newline-delimited JSON
//! streams plus `workspace.json`, `summary.json` and
//! `export_manifest.json`. Import reads the same layout back, in
//! dependency order, so a round trip reproduces the dataset.

pub mod error;
pub mod export;
pub mod import;
pub mod state;

pub use error::{ExportError, ImportError};
pub use export::{export_workspace, ExportManifest, ExportOptions, ExportReport};
pub use import::{import_workspace, ImportMode, ImportReport};
pub use state::ExportState;
