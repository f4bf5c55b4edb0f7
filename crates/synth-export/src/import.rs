//! JSONL import of a previously exported workspace.

use crate::error::ImportError;
use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use synth_core::{Channel, ChannelMember, FileRecord, Message, User, Workspace, DEFAULT_BATCH_SIZE};
use synth_store::{ConflictMode, Store, StoreError};
use tracing::info;

/// How to treat rows that already exist in the target database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Target must hold no workspace yet; every row is inserted strictly.
    Fresh,
    /// Rows already present keep their first-written values.
    Append,
}

impl ImportMode {
    fn conflict_mode(self) -> ConflictMode {
        match self {
            Self::Fresh => ConflictMode::Strict,
            Self::Append => ConflictMode::FirstWriteWins,
        }
    }
}

/// What one import run inserted.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub workspace_id: String,
    pub users: u64,
    pub channels: u64,
    pub channel_members: u64,
    pub messages: u64,
    pub files: u64,
    /// Rows read from the artifacts but already present in the target.
    pub skipped: u64,
}

#[derive(Debug, Deserialize)]
struct WorkspaceFile {
    workspace: Workspace,
}

#[derive(Debug, Deserialize)]
struct SummaryFile {
    #[serde(default)]
    meta: serde_json::Map<String, serde_json::Value>,
}

/// Import one exported workspace from `<source_root>/<workspace_id>/`.
///
/// Without an explicit workspace id the source root must contain exactly
/// one export directory. Entities load in dependency order so that foreign
/// keys always point at rows that already exist.
pub fn import_workspace(
    store: &mut Store,
    source_root: &Path,
    workspace_id: Option<&str>,
    mode: ImportMode,
) -> Result<ImportReport, ImportError> {
    let dir = resolve_export_dir(source_root, workspace_id)?;
    let dir_name = dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    if mode == ImportMode::Fresh {
        if let Some(existing) = store.list_workspaces()?.first() {
            return Err(ImportError::TargetNotEmpty(existing.id.clone()));
        }
    }

    let workspace = read_workspace(&dir)?;
    if workspace.id != dir_name {
        return Err(ImportError::WorkspaceMismatch {
            expected: dir_name,
            found: workspace.id,
        });
    }

    let conflict = mode.conflict_mode();
    info!(
        "Importing workspace {} from {}",
        workspace.id,
        dir.display()
    );
    store.insert_workspace(&workspace, conflict)?;
    let meta = read_summary_meta(&dir)?;
    if !meta.is_empty() {
        store.set_workspace_meta(&workspace.id, &meta)?;
    }

    let mut skipped = 0u64;
    let users = import_entities(&dir, "users", &mut skipped, |batch: &[User]| {
        store.insert_users(batch, conflict)
    })?;
    let channels = import_entities(&dir, "channels", &mut skipped, |batch: &[Channel]| {
        store.insert_channels(batch, conflict)
    })?;
    let channel_members = import_entities(
        &dir,
        "channel_members",
        &mut skipped,
        |batch: &[ChannelMember]| store.insert_channel_members(batch, conflict),
    )?;
    let messages = import_entities(&dir, "messages", &mut skipped, |batch: &[Message]| {
        store.insert_messages(batch, conflict)
    })?;
    let files = import_entities(&dir, "files", &mut skipped, |batch: &[FileRecord]| {
        store.insert_files(batch, conflict)
    })?;

    info!(
        "Import complete: {} users, {} channels, {} members, {} messages, {} files ({} skipped)",
        users, channels, channel_members, messages, files, skipped
    );
    Ok(ImportReport {
        workspace_id: workspace.id,
        users,
        channels,
        channel_members,
        messages,
        files,
        skipped,
    })
}

fn resolve_export_dir(
    source_root: &Path,
    workspace_id: Option<&str>,
) -> Result<PathBuf, ImportError> {
    if let Some(id) = workspace_id {
        let dir = source_root.join(id);
        if !dir.is_dir() {
            return Err(ImportError::MissingArtifact(dir));
        }
        return Ok(dir);
    }
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(source_root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    match dirs.len() {
        0 => Err(ImportError::AmbiguousSource {
            root: source_root.to_path_buf(),
            reason: "no export directories found".to_string(),
        }),
        1 => Ok(dirs.remove(0)),
        found => Err(ImportError::AmbiguousSource {
            root: source_root.to_path_buf(),
            reason: format!("{found} export directories found; pass a workspace id"),
        }),
    }
}

fn read_workspace(dir: &Path) -> Result<Workspace, ImportError> {
    let path = dir.join("workspace.json");
    if !path.exists() {
        return Err(ImportError::MissingArtifact(path));
    }
    let raw = std::fs::read_to_string(&path)?;
    let parsed: WorkspaceFile = serde_json::from_str(&raw)?;
    Ok(parsed.workspace)
}

/// Workspace meta rides along in summary.json; restoring it keeps the
/// imported database acceptable to `synth-store` validation.
fn read_summary_meta(
    dir: &Path,
) -> Result<serde_json::Map<String, serde_json::Value>, ImportError> {
    let path = dir.join("summary.json");
    if !path.exists() {
        return Ok(serde_json::Map::new());
    }
    let raw = std::fs::read_to_string(&path)?;
    let parsed: SummaryFile = serde_json::from_str(&raw)?;
    Ok(parsed.meta)
}

fn import_entities<T, F>(
    dir: &Path,
    name: &str,
    skipped: &mut u64,
    mut flush: F,
) -> Result<u64, ImportError>
where
    T: DeserializeOwned,
    F: FnMut(&[T]) -> Result<usize, StoreError>,
{
    let (reader, path) = open_entity_reader(dir, name)?;
    let mut batch: Vec<T> = Vec::with_capacity(DEFAULT_BATCH_SIZE);
    let mut read = 0u64;
    let mut inserted = 0u64;
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: T =
            serde_json::from_str(&line).map_err(|source| ImportError::MalformedLine {
                file: path.clone(),
                line: number as u64 + 1,
                source,
            })?;
        read += 1;
        batch.push(record);
        if batch.len() >= DEFAULT_BATCH_SIZE {
            inserted += flush(&batch)? as u64;
            batch.clear();
        }
    }
    if !batch.is_empty() {
        inserted += flush(&batch)? as u64;
    }
    *skipped += read - inserted;
    info!("Imported {} of {} {} rows", inserted, read, name);
    Ok(inserted)
}

fn open_entity_reader(
    dir: &Path,
    name: &str,
) -> Result<(Box<dyn BufRead>, PathBuf), ImportError> {
    let plain = dir.join(format!("{name}.jsonl"));
    if plain.exists() {
        let file = File::open(&plain)?;
        return Ok((Box::new(BufReader::new(file)), plain));
    }
    let gz = dir.join(format!("{name}.jsonl.gz"));
    if gz.exists() {
        let file = File::open(&gz)?;
        return Ok((Box::new(BufReader::new(GzDecoder::new(file))), gz));
    }
    Err(ImportError::MissingArtifact(plain))
}
