//! Incremental export watermark state.
//!
//! The state file remembers the largest message and file timestamps an
//! export has seen for one workspace. The next export run can load it to
//! default its `after_ts` filters and ship only newer content.

use crate::error::ExportError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportState {
    pub workspace_id: String,
    pub messages_max_ts: Option<i64>,
    pub files_max_ts: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl ExportState {
    pub fn load(path: &Path) -> Result<Self, ExportError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ExportError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut body = serde_json::to_string_pretty(self)?;
        body.push('\n');
        std::fs::write(path, body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("state/export.json");
        let state = ExportState {
            workspace_id: "ws1".to_string(),
            messages_max_ts: Some(1_700_000_500),
            files_max_ts: None,
            updated_at: Utc::now(),
        };
        state.save(&path).expect("save");

        let loaded = ExportState::load(&path).expect("load");
        assert_eq!(loaded.workspace_id, "ws1");
        assert_eq!(loaded.messages_max_ts, Some(1_700_000_500));
        assert_eq!(loaded.files_max_ts, None);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = TempDir::new().expect("tempdir");
        let result = ExportState::load(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(ExportError::Io(_))));
    }
}
