//! Read-only dataset validation.
//!
//! Validation never mutates the database and never fails outright; every
//! problem lands in the report as an error or a warning. Errors mean the
//! dataset cannot be trusted, warnings mean it may have been produced by a
//! different tool revision.

use crate::schema::SCHEMA_VERSION;
use crate::store::Store;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use synth_core::GENERATOR_NAME;

const REQUIRED_TABLES: &[(&str, &[&str])] = &[
    ("workspaces", &["id", "name", "created_at"]),
    ("workspace_meta", &["workspace_id", "key", "value"]),
    (
        "users",
        &["id", "workspace_id", "name", "email", "title", "is_bot", "created_at"],
    ),
    (
        "channels",
        &["id", "workspace_id", "name", "channel_type", "topic", "created_at"],
    ),
    (
        "channel_members",
        &["channel_id", "workspace_id", "user_id", "created_at"],
    ),
    (
        "messages",
        &[
            "id",
            "workspace_id",
            "channel_id",
            "user_id",
            "ts",
            "text",
            "thread_ts",
            "reply_count",
            "reactions_json",
        ],
    ),
    (
        "files",
        &[
            "id",
            "workspace_id",
            "user_id",
            "name",
            "size",
            "mimetype",
            "created_ts",
            "channel_id",
            "message_id",
            "url",
        ],
    ),
];

/// Knobs for one validation run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateOptions<'a> {
    /// Validate this workspace instead of the most recently created one.
    pub workspace_id: Option<&'a str>,
    /// Treat an empty database (no workspace rows) as an error.
    pub require_workspace: bool,
    /// Version of the running tool, compared against the recorded
    /// generator_version.
    pub tool_version: Option<&'a str>,
}

/// Outcome of one validation run.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub db: String,
    pub ok: bool,
    pub workspace_id: Option<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub meta: serde_json::Map<String, serde_json::Value>,
    pub tool_version: Option<String>,
    pub required_schema_version: i64,
}

impl ValidationReport {
    fn new(path: &Path, options: &ValidateOptions<'_>) -> Self {
        Self {
            db: path.display().to_string(),
            ok: true,
            workspace_id: None,
            errors: Vec::new(),
            warnings: Vec::new(),
            meta: serde_json::Map::new(),
            tool_version: options.tool_version.map(str::to_string),
            required_schema_version: SCHEMA_VERSION,
        }
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Validate the dataset at `path` and report everything found.
pub fn validate_store(path: impl AsRef<Path>, options: &ValidateOptions<'_>) -> ValidationReport {
    let path = path.as_ref();
    let mut report = ValidationReport::new(path, options);

    if !path.exists() {
        report.error(format!("database file not found: {}", path.display()));
        report.ok = false;
        return report;
    }

    let store = match Store::open_read_only(path) {
        Ok(store) => store,
        Err(e) => {
            report.error(format!("failed to open database: {e}"));
            report.ok = false;
            return report;
        }
    };

    if let Err(e) = check_schema(&store, &mut report) {
        report.error(format!("schema inspection failed: {e}"));
    }
    if let Err(e) = check_workspace(&store, options, &mut report) {
        report.error(format!("workspace inspection failed: {e}"));
    }

    report.ok = report.errors.is_empty();
    report
}

fn check_schema(store: &Store, report: &mut ValidationReport) -> rusqlite::Result<()> {
    let mut stmt = store
        .conn()
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
    let existing: HashSet<String> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;

    for (table, columns) in REQUIRED_TABLES {
        if !existing.contains(*table) {
            report.error(format!("missing table: {table}"));
            continue;
        }
        let mut stmt = store
            .conn()
            .prepare(&format!("PRAGMA table_info({table})"))?;
        let found: HashSet<String> = stmt
            .query_map([], |row| row.get(1))?
            .collect::<rusqlite::Result<_>>()?;
        for column in *columns {
            if !found.contains(*column) {
                report.error(format!("table {table} missing column: {column}"));
            }
        }
    }
    Ok(())
}

fn check_workspace(
    store: &Store,
    options: &ValidateOptions<'_>,
    report: &mut ValidationReport,
) -> Result<(), crate::StoreError> {
    let workspace_id = match options.workspace_id {
        Some(requested) => match store.get_workspace(requested)? {
            Some(workspace) => Some(workspace.id),
            None => {
                report.error(format!("workspace not found: {requested}"));
                None
            }
        },
        None => {
            let latest = store.latest_workspace_id()?;
            if latest.is_none() {
                if options.require_workspace {
                    report.error("no workspace found in database");
                } else {
                    report.warning("no workspace found in database");
                }
            }
            latest
        }
    };

    let Some(workspace_id) = workspace_id else {
        return Ok(());
    };
    report.workspace_id = Some(workspace_id.clone());
    report.meta = store.get_workspace_meta(&workspace_id)?;
    check_meta(report);
    Ok(())
}

fn check_meta(report: &mut ValidationReport) {
    match report.meta.get("generator").cloned() {
        None => report.warning("meta missing key: generator"),
        Some(value) => {
            let generator = value_as_string(&value);
            if generator != GENERATOR_NAME {
                report.warning(format!(
                    "generator {generator:?} does not match {GENERATOR_NAME:?}"
                ));
            }
        }
    }

    match report.meta.get("generator_version").cloned() {
        None => report.warning("meta missing key: generator_version"),
        Some(value) => {
            let recorded = value_as_string(&value);
            match (
                parse_semver(&recorded),
                report.tool_version.as_deref().and_then(parse_semver),
            ) {
                (Some(gen), Some(tool)) if gen > tool => {
                    report.warning(format!(
                        "generator_version {} is newer than tool version {}",
                        recorded,
                        report.tool_version.as_deref().unwrap_or_default()
                    ));
                }
                (None, _) => {
                    report.warning(format!("generator_version {recorded:?} is not semver"))
                }
                _ => {}
            }
        }
    }

    match report.meta.get("schema_version").cloned() {
        None => report.warning("meta missing key: schema_version"),
        Some(value) => match value.as_i64() {
            Some(recorded) if recorded > SCHEMA_VERSION => {
                report.error(format!(
                    "schema_version {recorded} is newer than supported {SCHEMA_VERSION}"
                ));
            }
            Some(recorded) if recorded < SCHEMA_VERSION => {
                report.warning(format!(
                    "schema_version {recorded} is older than current {SCHEMA_VERSION}"
                ));
            }
            Some(_) => {}
            None => report.warning("schema_version is not an integer"),
        },
    }

    if report.meta.get("generation_complete") != Some(&serde_json::Value::Bool(true)) {
        report.warning("generation_complete not set; dataset may be partial");
    }
}

fn value_as_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_semver(version: &str) -> Option<(u64, u64, u64)> {
    let mut parts = version.trim().splitn(3, '.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch: String = parts
        .next()?
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    Some((major, minor, patch.parse().ok()?))
}
