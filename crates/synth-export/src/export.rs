//! Streaming JSONL export.

use crate::error::ExportError;
use crate::state::ExportState;
use chrono::{DateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use synth_store::{MaxTimestamps, Store};
use tracing::info;

/// Options for one export run.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Workspace to export; the most recently created one when unset.
    pub workspace_id: Option<String>,
    /// Write `.jsonl.gz` artifacts instead of plain `.jsonl`.
    pub compress: bool,
    /// Only messages strictly newer than this watermark.
    pub messages_after_ts: Option<i64>,
    /// Only files strictly newer than this watermark.
    pub files_after_ts: Option<i64>,
    /// Incremental watermark state; loaded for default filters and
    /// rewritten with the new maxima after the export.
    pub state_path: Option<PathBuf>,
}

/// What one export run wrote.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub workspace_id: String,
    pub out_dir: PathBuf,
    pub compress: bool,
    pub users: u64,
    pub channels: u64,
    pub channel_members: u64,
    pub messages: u64,
    pub files: u64,
    pub messages_after_ts: Option<i64>,
    pub files_after_ts: Option<i64>,
    pub messages_max_ts: Option<i64>,
    pub files_max_ts: Option<i64>,
}

/// Sidecar describing an export directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportManifest {
    pub generator_version: String,
    pub workspace_id: String,
    pub compress: bool,
    pub counts: ManifestCounts,
    pub filters: ManifestFilters,
    pub max: MaxTimestamps,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ManifestCounts {
    pub users: u64,
    pub channels: u64,
    pub channel_members: u64,
    pub messages: u64,
    pub files: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ManifestFilters {
    pub messages_after_ts: Option<i64>,
    pub files_after_ts: Option<i64>,
}

enum ArtifactWriter {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl ArtifactWriter {
    fn create(dir: &Path, name: &str, compress: bool) -> Result<Self, ExportError> {
        if compress {
            let file = File::create(dir.join(format!("{name}.jsonl.gz")))?;
            Ok(Self::Gzip(GzEncoder::new(
                BufWriter::new(file),
                Compression::default(),
            )))
        } else {
            let file = File::create(dir.join(format!("{name}.jsonl")))?;
            Ok(Self::Plain(BufWriter::new(file)))
        }
    }

    fn finish(self) -> std::io::Result<()> {
        match self {
            Self::Plain(mut writer) => writer.flush(),
            Self::Gzip(encoder) => encoder.finish()?.flush(),
        }
    }
}

impl Write for ArtifactWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Plain(writer) => writer.write(buf),
            Self::Gzip(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Plain(writer) => writer.flush(),
            Self::Gzip(writer) => writer.flush(),
        }
    }
}

/// Export one workspace into `<out_root>/<workspace_id>/`.
pub fn export_workspace(
    store: &Store,
    out_root: &Path,
    options: &ExportOptions,
) -> Result<ExportReport, ExportError> {
    let workspace_id = match &options.workspace_id {
        Some(id) => id.clone(),
        None => store
            .latest_workspace_id()?
            .ok_or(ExportError::NoWorkspace)?,
    };
    // Also fails early when the requested workspace does not exist.
    let summary = store.export_summary(&workspace_id)?;

    let state = match &options.state_path {
        Some(path) if path.exists() => {
            let state = ExportState::load(path)?;
            if state.workspace_id != workspace_id {
                return Err(ExportError::StateWorkspaceMismatch {
                    state: state.workspace_id,
                    workspace: workspace_id,
                });
            }
            Some(state)
        }
        _ => None,
    };
    let messages_after_ts = options
        .messages_after_ts
        .or(state.as_ref().and_then(|s| s.messages_max_ts));
    let files_after_ts = options
        .files_after_ts
        .or(state.as_ref().and_then(|s| s.files_max_ts));

    let dir = out_root.join(&workspace_id);
    std::fs::create_dir_all(&dir)?;
    info!("Exporting workspace {} to {}", workspace_id, dir.display());

    write_json(&dir.join("workspace.json"), &json!({ "workspace": &summary.workspace }))?;
    write_json(&dir.join("summary.json"), &summary)?;

    let users = write_entities(&dir, "users", options.compress, |writer| {
        store.for_each_user::<ExportError, _>(&workspace_id, |user| write_line(writer, &user))
    })?;
    let channels = write_entities(&dir, "channels", options.compress, |writer| {
        store.for_each_channel::<ExportError, _>(&workspace_id, |channel| {
            write_line(writer, &channel)
        })
    })?;
    let channel_members = write_entities(&dir, "channel_members", options.compress, |writer| {
        store.for_each_channel_member::<ExportError, _>(&workspace_id, |member| {
            write_line(writer, &member)
        })
    })?;
    let messages = write_entities(&dir, "messages", options.compress, |writer| {
        store.for_each_message::<ExportError, _>(&workspace_id, messages_after_ts, |message| {
            write_line(writer, &message)
        })
    })?;
    let files = write_entities(&dir, "files", options.compress, |writer| {
        store.for_each_file::<ExportError, _>(&workspace_id, files_after_ts, |file| {
            write_line(writer, &file)
        })
    })?;

    let manifest = ExportManifest {
        generator_version: env!("CARGO_PKG_VERSION").to_string(),
        workspace_id: workspace_id.clone(),
        compress: options.compress,
        counts: ManifestCounts {
            users,
            channels,
            channel_members,
            messages,
            files,
        },
        filters: ManifestFilters {
            messages_after_ts,
            files_after_ts,
        },
        max: summary.max,
        generated_at: Utc::now(),
    };
    write_json(&dir.join("export_manifest.json"), &manifest)?;

    if let Some(path) = &options.state_path {
        ExportState {
            workspace_id: workspace_id.clone(),
            messages_max_ts: summary.max.messages_max_ts,
            files_max_ts: summary.max.files_max_ts,
            updated_at: Utc::now(),
        }
        .save(path)?;
        info!("Updated incremental state at {}", path.display());
    }

    info!(
        "Export complete: {} users, {} channels, {} members, {} messages, {} files",
        users, channels, channel_members, messages, files
    );
    Ok(ExportReport {
        workspace_id,
        out_dir: dir,
        compress: options.compress,
        users,
        channels,
        channel_members,
        messages,
        files,
        messages_after_ts,
        files_after_ts,
        messages_max_ts: summary.max.messages_max_ts,
        files_max_ts: summary.max.files_max_ts,
    })
}

fn write_entities<F>(
    dir: &Path,
    name: &str,
    compress: bool,
    visit: F,
) -> Result<u64, ExportError>
where
    F: FnOnce(&mut ArtifactWriter) -> Result<u64, ExportError>,
{
    let mut writer = ArtifactWriter::create(dir, name, compress)?;
    let count = visit(&mut writer)?;
    writer.finish()?;
    Ok(count)
}

fn write_line<T: Serialize>(writer: &mut ArtifactWriter, record: &T) -> Result<(), ExportError> {
    serde_json::to_writer(&mut *writer, record)?;
    writeln!(writer)?;
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ExportError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
