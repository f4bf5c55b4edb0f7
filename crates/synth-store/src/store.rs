//! SQLite-backed dataset store.

use crate::cursor::{
    decode_cursor, decode_member_cursor, encode_cursor, encode_member_cursor, MemberCursor,
    TimestampCursor,
};
use crate::error::StoreError;
use crate::schema;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension, ToSql};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use synth_core::{Channel, ChannelMember, ChannelType, FileRecord, Message, User, Workspace};
use tracing::debug;

const USER_COLUMNS: &str = "id, workspace_id, name, email, title, is_bot, created_at";
const CHANNEL_COLUMNS: &str = "id, workspace_id, name, channel_type, topic, created_at";
const MEMBER_COLUMNS: &str = "channel_id, workspace_id, user_id, created_at";
const MESSAGE_COLUMNS: &str =
    "id, workspace_id, channel_id, user_id, ts, text, thread_ts, reply_count, reactions_json";
const FILE_COLUMNS: &str =
    "id, workspace_id, user_id, name, size, mimetype, created_ts, channel_id, message_id, url";

/// How insert batches treat primary-key conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictMode {
    /// Plain INSERT; a duplicate key aborts the batch transaction.
    Strict,
    /// INSERT OR IGNORE; the first write wins and duplicates are skipped.
    FirstWriteWins,
}

impl ConflictMode {
    fn verb(self) -> &'static str {
        match self {
            ConflictMode::Strict => "INSERT",
            ConflictMode::FirstWriteWins => "INSERT OR IGNORE",
        }
    }
}

/// One keyset page request. An empty cursor means the first page.
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    pub limit: usize,
    pub cursor: Option<String>,
}

impl PageRequest {
    pub fn first(limit: usize) -> Self {
        Self {
            limit,
            cursor: None,
        }
    }

    pub fn after(limit: usize, cursor: impl Into<String>) -> Self {
        Self {
            limit,
            cursor: Some(cursor.into()),
        }
    }
}

/// One page of rows plus the continuation token, when more rows exist.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub next_cursor: Option<String>,
}

/// Shared filters for message and file listings.
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    pub channel_id: Option<String>,
    pub user_id: Option<String>,
    pub before_ts: Option<i64>,
    pub after_ts: Option<i64>,
}

/// Per-table row counts for one workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCounts {
    pub users: u64,
    pub channels: u64,
    pub channel_members: u64,
    pub messages: u64,
    pub files: u64,
}

/// Largest content timestamps for one workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxTimestamps {
    pub messages_max_ts: Option<i64>,
    pub files_max_ts: Option<i64>,
}

/// Self-describing summary of one workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSummary {
    pub workspace: Workspace,
    pub meta: serde_json::Map<String, serde_json::Value>,
    pub counts: TableCounts,
    pub channel_types: BTreeMap<String, u64>,
    pub max: MaxTimestamps,
}

/// A dataset store over one SQLite database file.
pub struct Store {
    conn: Connection,
    path: PathBuf,
}

impl Store {
    /// Open (creating if needed) a writable store, applying pragmas and
    /// the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&path)?;
        schema::configure(&conn)?;
        schema::ensure_schema(&conn)?;
        debug!("Opened store at {}", path.display());
        Ok(Self { conn, path })
    }

    /// Open an existing store read-only.
    ///
    /// Fails when the file does not exist rather than leaving an empty
    /// schema behind, so query surfaces never create databases.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(StoreError::DatabaseMissing(path));
        }
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    // -- writes -----------------------------------------------------------

    pub fn insert_workspace(
        &mut self,
        workspace: &Workspace,
        mode: ConflictMode,
    ) -> Result<usize, StoreError> {
        let sql = format!(
            "{} INTO workspaces (id, name, created_at) VALUES (?1, ?2, ?3)",
            mode.verb()
        );
        let inserted = self.conn.execute(
            &sql,
            params![workspace.id, workspace.name, workspace.created_at],
        )?;
        Ok(inserted)
    }

    pub fn insert_users(&mut self, users: &[User], mode: ConflictMode) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0usize;
        {
            let sql = format!(
                "{} INTO users ({USER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                mode.verb()
            );
            let mut stmt = tx.prepare(&sql)?;
            for user in users {
                inserted += stmt.execute(params![
                    user.id,
                    user.workspace_id,
                    user.name,
                    user.email,
                    user.title,
                    user.is_bot,
                    user.created_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    pub fn insert_channels(
        &mut self,
        channels: &[Channel],
        mode: ConflictMode,
    ) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0usize;
        {
            let sql = format!(
                "{} INTO channels ({CHANNEL_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                mode.verb()
            );
            let mut stmt = tx.prepare(&sql)?;
            for channel in channels {
                inserted += stmt.execute(params![
                    channel.id,
                    channel.workspace_id,
                    channel.name,
                    channel.channel_type.as_str(),
                    channel.topic,
                    channel.created_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    pub fn insert_channel_members(
        &mut self,
        members: &[ChannelMember],
        mode: ConflictMode,
    ) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0usize;
        {
            let sql = format!(
                "{} INTO channel_members ({MEMBER_COLUMNS}) VALUES (?1, ?2, ?3, ?4)",
                mode.verb()
            );
            let mut stmt = tx.prepare(&sql)?;
            for member in members {
                inserted += stmt.execute(params![
                    member.channel_id,
                    member.workspace_id,
                    member.user_id,
                    member.created_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    pub fn insert_messages(
        &mut self,
        messages: &[Message],
        mode: ConflictMode,
    ) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0usize;
        {
            let sql = format!(
                "{} INTO messages ({MESSAGE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                mode.verb()
            );
            let mut stmt = tx.prepare(&sql)?;
            for message in messages {
                inserted += stmt.execute(params![
                    message.id,
                    message.workspace_id,
                    message.channel_id,
                    message.user_id,
                    message.ts,
                    message.text,
                    message.thread_ts,
                    message.reply_count,
                    message.reactions_json,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    pub fn insert_files(
        &mut self,
        files: &[FileRecord],
        mode: ConflictMode,
    ) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0usize;
        {
            let sql = format!(
                "{} INTO files ({FILE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                mode.verb()
            );
            let mut stmt = tx.prepare(&sql)?;
            for file in files {
                inserted += stmt.execute(params![
                    file.id,
                    file.workspace_id,
                    file.user_id,
                    file.name,
                    file.size,
                    file.mimetype,
                    file.created_ts,
                    file.channel_id,
                    file.message_id,
                    file.url,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    // -- workspace metadata -----------------------------------------------

    /// Upsert metadata entries for a workspace. Values are stored as JSON.
    pub fn set_workspace_meta(
        &mut self,
        workspace_id: &str,
        meta: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO workspace_meta (workspace_id, key, value) VALUES (?1, ?2, ?3)",
            )?;
            for (key, value) in meta {
                let encoded = serde_json::to_string(value)?;
                stmt.execute(params![workspace_id, key, encoded])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_workspace_meta(
        &self,
        workspace_id: &str,
    ) -> Result<serde_json::Map<String, serde_json::Value>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT key, value FROM workspace_meta WHERE workspace_id = ?1 ORDER BY key ASC",
        )?;
        let rows = stmt.query_map(params![workspace_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut meta = serde_json::Map::new();
        for row in rows {
            let (key, raw) = row?;
            let value = match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(_) => serde_json::Value::String(raw),
            };
            meta.insert(key, value);
        }
        Ok(meta)
    }

    // -- workspace lookups ------------------------------------------------

    pub fn list_workspaces(&self) -> Result<Vec<Workspace>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, created_at FROM workspaces ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map([], row_to_workspace)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    pub fn latest_workspace_id(&self) -> Result<Option<String>, StoreError> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM workspaces ORDER BY created_at DESC, id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    pub fn get_workspace(&self, workspace_id: &str) -> Result<Option<Workspace>, StoreError> {
        let workspace = self
            .conn
            .query_row(
                "SELECT id, name, created_at FROM workspaces WHERE id = ?1",
                params![workspace_id],
                row_to_workspace,
            )
            .optional()?;
        Ok(workspace)
    }

    // -- offset listings --------------------------------------------------

    pub fn list_users(
        &self,
        workspace_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<User>, StoreError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE workspace_id = ?1 \
             ORDER BY created_at ASC, id ASC LIMIT ?2 OFFSET ?3"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![workspace_id, limit as i64, offset as i64],
            row_to_user,
        )?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    pub fn list_channels(
        &self,
        workspace_id: &str,
        limit: usize,
        offset: usize,
        channel_type: Option<ChannelType>,
    ) -> Result<Vec<Channel>, StoreError> {
        let mut sql = format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE workspace_id = ?");
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(workspace_id.to_string())];
        if let Some(channel_type) = channel_type {
            sql.push_str(" AND channel_type = ?");
            params.push(Box::new(channel_type.as_str().to_string()));
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC LIMIT ? OFFSET ?");
        params.push(Box::new(limit as i64));
        params.push(Box::new(offset as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params_from_iter(params.iter().map(|p| p.as_ref())),
            row_to_channel,
        )?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    pub fn list_channel_members(
        &self,
        workspace_id: &str,
        limit: usize,
        offset: usize,
        channel_id: Option<&str>,
    ) -> Result<Vec<ChannelMember>, StoreError> {
        let mut sql = format!("SELECT {MEMBER_COLUMNS} FROM channel_members WHERE workspace_id = ?");
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(workspace_id.to_string())];
        if let Some(channel_id) = channel_id {
            sql.push_str(" AND channel_id = ?");
            params.push(Box::new(channel_id.to_string()));
        }
        sql.push_str(" ORDER BY channel_id ASC, user_id ASC LIMIT ? OFFSET ?");
        params.push(Box::new(limit as i64));
        params.push(Box::new(offset as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params_from_iter(params.iter().map(|p| p.as_ref())),
            row_to_member,
        )?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    pub fn list_messages(
        &self,
        workspace_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Message>, StoreError> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE workspace_id = ?1 \
             ORDER BY ts ASC, id ASC LIMIT ?2 OFFSET ?3"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![workspace_id, limit as i64, offset as i64],
            row_to_message,
        )?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    pub fn list_files(
        &self,
        workspace_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<FileRecord>, StoreError> {
        let sql = format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE workspace_id = ?1 \
             ORDER BY created_ts ASC, id ASC LIMIT ?2 OFFSET ?3"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![workspace_id, limit as i64, offset as i64],
            row_to_file,
        )?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    // -- keyset pagination ------------------------------------------------

    pub fn list_users_page(
        &self,
        workspace_id: &str,
        page: &PageRequest,
    ) -> Result<Page<User>, StoreError> {
        let limit = page.limit.max(1);
        let decoded = decoded_timestamp_cursor(page.cursor.as_deref())?;

        let mut sql = format!("SELECT {USER_COLUMNS} FROM users WHERE workspace_id = ?");
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(workspace_id.to_string())];
        push_timestamp_predicate(&mut sql, &mut params, "created_at", decoded.as_ref());
        sql.push_str(" ORDER BY created_at ASC, id ASC LIMIT ?");
        params.push(Box::new(limit as i64 + 1));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows: Vec<User> = stmt
            .query_map(params_from_iter(params.iter().map(|p| p.as_ref())), row_to_user)?
            .collect::<rusqlite::Result<_>>()?;

        let next_cursor = if rows.len() > limit {
            rows.truncate(limit);
            rows.last()
                .map(|last| {
                    encode_cursor(&TimestampCursor {
                        ts: last.created_at,
                        id: last.id.clone(),
                    })
                })
                .transpose()?
        } else {
            None
        };
        Ok(Page { rows, next_cursor })
    }

    pub fn list_channels_page(
        &self,
        workspace_id: &str,
        page: &PageRequest,
        channel_type: Option<ChannelType>,
    ) -> Result<Page<Channel>, StoreError> {
        let limit = page.limit.max(1);
        let decoded = decoded_timestamp_cursor(page.cursor.as_deref())?;

        let mut sql = format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE workspace_id = ?");
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(workspace_id.to_string())];
        if let Some(channel_type) = channel_type {
            sql.push_str(" AND channel_type = ?");
            params.push(Box::new(channel_type.as_str().to_string()));
        }
        push_timestamp_predicate(&mut sql, &mut params, "created_at", decoded.as_ref());
        sql.push_str(" ORDER BY created_at ASC, id ASC LIMIT ?");
        params.push(Box::new(limit as i64 + 1));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows: Vec<Channel> = stmt
            .query_map(
                params_from_iter(params.iter().map(|p| p.as_ref())),
                row_to_channel,
            )?
            .collect::<rusqlite::Result<_>>()?;

        let next_cursor = if rows.len() > limit {
            rows.truncate(limit);
            rows.last()
                .map(|last| {
                    encode_cursor(&TimestampCursor {
                        ts: last.created_at,
                        id: last.id.clone(),
                    })
                })
                .transpose()?
        } else {
            None
        };
        Ok(Page { rows, next_cursor })
    }

    pub fn list_channel_members_page(
        &self,
        workspace_id: &str,
        page: &PageRequest,
        channel_id: Option<&str>,
    ) -> Result<Page<ChannelMember>, StoreError> {
        let limit = page.limit.max(1);
        let decoded = match active_cursor(page.cursor.as_deref()) {
            Some(token) => Some(decode_member_cursor(token)?),
            None => None,
        };

        let mut sql = format!("SELECT {MEMBER_COLUMNS} FROM channel_members WHERE workspace_id = ?");
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(workspace_id.to_string())];
        if let Some(channel_id) = channel_id {
            sql.push_str(" AND channel_id = ?");
            params.push(Box::new(channel_id.to_string()));
        }
        if let Some(cursor) = &decoded {
            sql.push_str(" AND (channel_id > ? OR (channel_id = ? AND user_id > ?))");
            params.push(Box::new(cursor.channel_id.clone()));
            params.push(Box::new(cursor.channel_id.clone()));
            params.push(Box::new(cursor.user_id.clone()));
        }
        sql.push_str(" ORDER BY channel_id ASC, user_id ASC LIMIT ?");
        params.push(Box::new(limit as i64 + 1));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows: Vec<ChannelMember> = stmt
            .query_map(
                params_from_iter(params.iter().map(|p| p.as_ref())),
                row_to_member,
            )?
            .collect::<rusqlite::Result<_>>()?;

        let next_cursor = if rows.len() > limit {
            rows.truncate(limit);
            rows.last()
                .map(|last| {
                    encode_member_cursor(&MemberCursor {
                        channel_id: last.channel_id.clone(),
                        user_id: last.user_id.clone(),
                    })
                })
                .transpose()?
        } else {
            None
        };
        Ok(Page { rows, next_cursor })
    }

    pub fn list_messages_page(
        &self,
        workspace_id: &str,
        page: &PageRequest,
        filter: &ContentFilter,
    ) -> Result<Page<Message>, StoreError> {
        let limit = page.limit.max(1);
        let decoded = decoded_timestamp_cursor(page.cursor.as_deref())?;

        let mut sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE workspace_id = ?");
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(workspace_id.to_string())];
        push_content_filter(&mut sql, &mut params, "ts", filter);
        push_timestamp_predicate(&mut sql, &mut params, "ts", decoded.as_ref());
        sql.push_str(" ORDER BY ts ASC, id ASC LIMIT ?");
        params.push(Box::new(limit as i64 + 1));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows: Vec<Message> = stmt
            .query_map(
                params_from_iter(params.iter().map(|p| p.as_ref())),
                row_to_message,
            )?
            .collect::<rusqlite::Result<_>>()?;

        let next_cursor = if rows.len() > limit {
            rows.truncate(limit);
            rows.last()
                .map(|last| {
                    encode_cursor(&TimestampCursor {
                        ts: last.ts,
                        id: last.id.clone(),
                    })
                })
                .transpose()?
        } else {
            None
        };
        Ok(Page { rows, next_cursor })
    }

    pub fn list_files_page(
        &self,
        workspace_id: &str,
        page: &PageRequest,
        filter: &ContentFilter,
    ) -> Result<Page<FileRecord>, StoreError> {
        let limit = page.limit.max(1);
        let decoded = decoded_timestamp_cursor(page.cursor.as_deref())?;

        let mut sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE workspace_id = ?");
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(workspace_id.to_string())];
        push_content_filter(&mut sql, &mut params, "created_ts", filter);
        push_timestamp_predicate(&mut sql, &mut params, "created_ts", decoded.as_ref());
        sql.push_str(" ORDER BY created_ts ASC, id ASC LIMIT ?");
        params.push(Box::new(limit as i64 + 1));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows: Vec<FileRecord> = stmt
            .query_map(
                params_from_iter(params.iter().map(|p| p.as_ref())),
                row_to_file,
            )?
            .collect::<rusqlite::Result<_>>()?;

        let next_cursor = if rows.len() > limit {
            rows.truncate(limit);
            rows.last()
                .map(|last| {
                    encode_cursor(&TimestampCursor {
                        ts: last.created_ts,
                        id: last.id.clone(),
                    })
                })
                .transpose()?
        } else {
            None
        };
        Ok(Page { rows, next_cursor })
    }

    // -- streaming visitors -----------------------------------------------

    /// Visit every user of a workspace in ascending (created_at, id) order.
    pub fn for_each_user<E, F>(&self, workspace_id: &str, mut f: F) -> Result<u64, E>
    where
        E: From<StoreError>,
        F: FnMut(User) -> Result<(), E>,
    {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE workspace_id = ?1 \
             ORDER BY created_at ASC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(StoreError::from)?;
        let rows = stmt
            .query_map(params![workspace_id], row_to_user)
            .map_err(StoreError::from)?;
        let mut seen = 0u64;
        for row in rows {
            f(row.map_err(StoreError::from)?)?;
            seen += 1;
        }
        Ok(seen)
    }

    /// Visit every channel of a workspace in ascending (created_at, id) order.
    pub fn for_each_channel<E, F>(&self, workspace_id: &str, mut f: F) -> Result<u64, E>
    where
        E: From<StoreError>,
        F: FnMut(Channel) -> Result<(), E>,
    {
        let sql = format!(
            "SELECT {CHANNEL_COLUMNS} FROM channels WHERE workspace_id = ?1 \
             ORDER BY created_at ASC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(StoreError::from)?;
        let rows = stmt
            .query_map(params![workspace_id], row_to_channel)
            .map_err(StoreError::from)?;
        let mut seen = 0u64;
        for row in rows {
            f(row.map_err(StoreError::from)?)?;
            seen += 1;
        }
        Ok(seen)
    }

    /// Visit every membership edge in ascending (channel_id, user_id) order.
    pub fn for_each_channel_member<E, F>(&self, workspace_id: &str, mut f: F) -> Result<u64, E>
    where
        E: From<StoreError>,
        F: FnMut(ChannelMember) -> Result<(), E>,
    {
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} FROM channel_members WHERE workspace_id = ?1 \
             ORDER BY channel_id ASC, user_id ASC"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(StoreError::from)?;
        let rows = stmt
            .query_map(params![workspace_id], row_to_member)
            .map_err(StoreError::from)?;
        let mut seen = 0u64;
        for row in rows {
            f(row.map_err(StoreError::from)?)?;
            seen += 1;
        }
        Ok(seen)
    }

    /// Visit messages in ascending (ts, id) order, optionally only those
    /// strictly newer than a watermark.
    pub fn for_each_message<E, F>(
        &self,
        workspace_id: &str,
        after_ts: Option<i64>,
        mut f: F,
    ) -> Result<u64, E>
    where
        E: From<StoreError>,
        F: FnMut(Message) -> Result<(), E>,
    {
        let mut sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE workspace_id = ?1");
        if after_ts.is_some() {
            sql.push_str(" AND ts > ?2");
        }
        sql.push_str(" ORDER BY ts ASC, id ASC");
        let mut stmt = self.conn.prepare(&sql).map_err(StoreError::from)?;
        let rows = match after_ts {
            Some(after) => stmt.query_map(params![workspace_id, after], row_to_message),
            None => stmt.query_map(params![workspace_id], row_to_message),
        }
        .map_err(StoreError::from)?;
        let mut seen = 0u64;
        for row in rows {
            f(row.map_err(StoreError::from)?)?;
            seen += 1;
        }
        Ok(seen)
    }

    /// Visit files in ascending (created_ts, id) order, optionally only
    /// those strictly newer than a watermark.
    pub fn for_each_file<E, F>(
        &self,
        workspace_id: &str,
        after_ts: Option<i64>,
        mut f: F,
    ) -> Result<u64, E>
    where
        E: From<StoreError>,
        F: FnMut(FileRecord) -> Result<(), E>,
    {
        let mut sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE workspace_id = ?1");
        if after_ts.is_some() {
            sql.push_str(" AND created_ts > ?2");
        }
        sql.push_str(" ORDER BY created_ts ASC, id ASC");
        let mut stmt = self.conn.prepare(&sql).map_err(StoreError::from)?;
        let rows = match after_ts {
            Some(after) => stmt.query_map(params![workspace_id, after], row_to_file),
            None => stmt.query_map(params![workspace_id], row_to_file),
        }
        .map_err(StoreError::from)?;
        let mut seen = 0u64;
        for row in rows {
            f(row.map_err(StoreError::from)?)?;
            seen += 1;
        }
        Ok(seen)
    }

    // -- summaries --------------------------------------------------------

    pub fn stats(&self, workspace_id: &str) -> Result<TableCounts, StoreError> {
        Ok(TableCounts {
            users: self.count_rows("users", workspace_id)?,
            channels: self.count_rows("channels", workspace_id)?,
            channel_members: self.count_rows("channel_members", workspace_id)?,
            messages: self.count_rows("messages", workspace_id)?,
            files: self.count_rows("files", workspace_id)?,
        })
    }

    fn count_rows(&self, table: &str, workspace_id: &str) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {table} WHERE workspace_id = ?1");
        let count: i64 = self.conn.query_row(&sql, params![workspace_id], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn max_message_ts(&self, workspace_id: &str) -> Result<Option<i64>, StoreError> {
        let max: Option<i64> = self.conn.query_row(
            "SELECT MAX(ts) FROM messages WHERE workspace_id = ?1",
            params![workspace_id],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    pub fn max_file_ts(&self, workspace_id: &str) -> Result<Option<i64>, StoreError> {
        let max: Option<i64> = self.conn.query_row(
            "SELECT MAX(created_ts) FROM files WHERE workspace_id = ?1",
            params![workspace_id],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    pub fn channel_type_counts(
        &self,
        workspace_id: &str,
    ) -> Result<BTreeMap<String, u64>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT channel_type, COUNT(*) FROM channels WHERE workspace_id = ?1 \
             GROUP BY channel_type",
        )?;
        let rows = stmt.query_map(params![workspace_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut counts = BTreeMap::new();
        for row in rows {
            let (channel_type, count) = row?;
            counts.insert(channel_type, count as u64);
        }
        Ok(counts)
    }

    /// Full summary for one workspace; errors when the workspace is absent.
    pub fn export_summary(&self, workspace_id: &str) -> Result<WorkspaceSummary, StoreError> {
        let workspace = self
            .get_workspace(workspace_id)?
            .ok_or_else(|| StoreError::WorkspaceNotFound(workspace_id.to_string()))?;
        Ok(WorkspaceSummary {
            workspace,
            meta: self.get_workspace_meta(workspace_id)?,
            counts: self.stats(workspace_id)?,
            channel_types: self.channel_type_counts(workspace_id)?,
            max: MaxTimestamps {
                messages_max_ts: self.max_message_ts(workspace_id)?,
                files_max_ts: self.max_file_ts(workspace_id)?,
            },
        })
    }
}

fn active_cursor(cursor: Option<&str>) -> Option<&str> {
    match cursor {
        Some(token) if !token.is_empty() => Some(token),
        _ => None,
    }
}

fn decoded_timestamp_cursor(
    cursor: Option<&str>,
) -> Result<Option<TimestampCursor>, StoreError> {
    match active_cursor(cursor) {
        Some(token) => Ok(Some(decode_cursor(token)?)),
        None => Ok(None),
    }
}

fn push_timestamp_predicate(
    sql: &mut String,
    params: &mut Vec<Box<dyn ToSql>>,
    ts_column: &str,
    cursor: Option<&TimestampCursor>,
) {
    if let Some(cursor) = cursor {
        sql.push_str(&format!(
            " AND ({ts_column} > ? OR ({ts_column} = ? AND id > ?))"
        ));
        params.push(Box::new(cursor.ts));
        params.push(Box::new(cursor.ts));
        params.push(Box::new(cursor.id.clone()));
    }
}

fn push_content_filter(
    sql: &mut String,
    params: &mut Vec<Box<dyn ToSql>>,
    ts_column: &str,
    filter: &ContentFilter,
) {
    if let Some(channel_id) = &filter.channel_id {
        sql.push_str(" AND channel_id = ?");
        params.push(Box::new(channel_id.clone()));
    }
    if let Some(user_id) = &filter.user_id {
        sql.push_str(" AND user_id = ?");
        params.push(Box::new(user_id.clone()));
    }
    if let Some(before_ts) = filter.before_ts {
        sql.push_str(&format!(" AND {ts_column} < ?"));
        params.push(Box::new(before_ts));
    }
    if let Some(after_ts) = filter.after_ts {
        sql.push_str(&format!(" AND {ts_column} > ?"));
        params.push(Box::new(after_ts));
    }
}

fn row_to_workspace(row: &rusqlite::Row<'_>) -> rusqlite::Result<Workspace> {
    Ok(Workspace {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        title: row.get(4)?,
        is_bot: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn row_to_channel(row: &rusqlite::Row<'_>) -> rusqlite::Result<Channel> {
    let raw_type: String = row.get(3)?;
    let channel_type = ChannelType::from_str(&raw_type).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Channel {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        name: row.get(2)?,
        channel_type,
        topic: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn row_to_member(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChannelMember> {
    Ok(ChannelMember {
        channel_id: row.get(0)?,
        workspace_id: row.get(1)?,
        user_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        channel_id: row.get(2)?,
        user_id: row.get(3)?,
        ts: row.get(4)?,
        text: row.get(5)?,
        thread_ts: row.get(6)?,
        reply_count: row.get(7)?,
        reactions_json: row.get(8)?,
    })
}

fn row_to_file(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        user_id: row.get(2)?,
        name: row.get(3)?,
        size: row.get(4)?,
        mimetype: row.get(5)?,
        created_ts: row.get(6)?,
        channel_id: row.get(7)?,
        message_id: row.get(8)?,
        url: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn workspace() -> Workspace {
        Workspace {
            id: "ws1".to_string(),
            name: "Test Workspace".to_string(),
            created_at: 1_700_000_000,
        }
    }

    fn user(id: &str, created_at: i64) -> User {
        User {
            id: id.to_string(),
            workspace_id: "ws1".to_string(),
            name: format!("User {id}"),
            email: format!("{id}@example.com"),
            title: "Engineer".to_string(),
            is_bot: false,
            created_at,
        }
    }

    fn channel(id: &str, channel_type: ChannelType, created_at: i64) -> Channel {
        Channel {
            id: id.to_string(),
            workspace_id: "ws1".to_string(),
            name: format!("chan-{id}"),
            channel_type,
            topic: "topic".to_string(),
            created_at,
        }
    }

    fn member(channel_id: &str, user_id: &str) -> ChannelMember {
        ChannelMember {
            channel_id: channel_id.to_string(),
            workspace_id: "ws1".to_string(),
            user_id: user_id.to_string(),
            created_at: 1_700_000_000,
        }
    }

    fn message(id: &str, channel_id: &str, ts: i64) -> Message {
        Message {
            id: id.to_string(),
            workspace_id: "ws1".to_string(),
            channel_id: channel_id.to_string(),
            user_id: "u1".to_string(),
            ts,
            text: "hello there".to_string(),
            thread_ts: None,
            reply_count: 0,
            reactions_json: "{}".to_string(),
        }
    }

    fn file(id: &str, created_ts: i64) -> FileRecord {
        FileRecord {
            id: id.to_string(),
            workspace_id: "ws1".to_string(),
            user_id: "u1".to_string(),
            name: "notes.txt".to_string(),
            size: 5000,
            mimetype: "text/plain".to_string(),
            created_ts,
            channel_id: "c1".to_string(),
            message_id: None,
            url: "https://files.example.com/abc".to_string(),
        }
    }

    fn open_store(dir: &TempDir) -> Store {
        let mut store = Store::open(dir.path().join("test.db")).expect("open");
        store
            .insert_workspace(&workspace(), ConflictMode::Strict)
            .expect("workspace");
        store
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = TempDir::new().expect("tempdir");
        let nested = dir.path().join("a/b/test.db");
        Store::open(&nested).expect("open");
        assert!(nested.exists());
    }

    #[test]
    fn test_read_only_requires_existing_file() {
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("missing.db");
        assert!(matches!(
            Store::open_read_only(&missing),
            Err(StoreError::DatabaseMissing(_))
        ));
        assert!(!missing.exists());
    }

    #[test]
    fn test_workspace_round_trip() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let loaded = store.get_workspace("ws1").expect("get").expect("some");
        assert_eq!(loaded, workspace());
        assert_eq!(
            store.latest_workspace_id().expect("latest"),
            Some("ws1".to_string())
        );
        assert!(store.get_workspace("nope").expect("get").is_none());
    }

    #[test]
    fn test_meta_round_trip() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = open_store(&dir);
        let mut meta = serde_json::Map::new();
        meta.insert("seed".to_string(), serde_json::json!(42));
        meta.insert("generator".to_string(), serde_json::json!("workspace-synth"));
        store.set_workspace_meta("ws1", &meta).expect("set");

        let loaded = store.get_workspace_meta("ws1").expect("get");
        assert_eq!(loaded.get("seed"), Some(&serde_json::json!(42)));
        assert_eq!(
            loaded.get("generator"),
            Some(&serde_json::json!("workspace-synth"))
        );

        // Upsert replaces only the given keys.
        let mut update = serde_json::Map::new();
        update.insert("generation_complete".to_string(), serde_json::json!(true));
        store.set_workspace_meta("ws1", &update).expect("update");
        let loaded = store.get_workspace_meta("ws1").expect("get");
        assert_eq!(loaded.get("seed"), Some(&serde_json::json!(42)));
        assert_eq!(
            loaded.get("generation_complete"),
            Some(&serde_json::json!(true))
        );
    }

    #[test]
    fn test_user_page_walk_visits_each_row_once() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = open_store(&dir);
        let users: Vec<User> = (0..7).map(|i| user(&format!("u{i}"), 1_700_000_000 + i)).collect();
        store.insert_users(&users, ConflictMode::Strict).expect("insert");

        let mut seen = Vec::new();
        let mut request = PageRequest::first(3);
        loop {
            let page = store.list_users_page("ws1", &request).expect("page");
            assert!(page.rows.len() <= 3);
            seen.extend(page.rows.iter().map(|u| u.id.clone()));
            match page.next_cursor {
                Some(cursor) => request = PageRequest::after(3, cursor),
                None => break,
            }
        }
        assert_eq!(seen.len(), 7);
        let mut unique = seen.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 7);
    }

    #[test]
    fn test_user_page_ties_break_on_id() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = open_store(&dir);
        // Same created_at for everyone forces the id tiebreak.
        let users: Vec<User> = (0..5).map(|i| user(&format!("u{i}"), 1_700_000_000)).collect();
        store.insert_users(&users, ConflictMode::Strict).expect("insert");

        let first = store
            .list_users_page("ws1", &PageRequest::first(2))
            .expect("page");
        assert_eq!(first.rows[0].id, "u0");
        assert_eq!(first.rows[1].id, "u1");
        let cursor = first.next_cursor.expect("cursor");
        let second = store
            .list_users_page("ws1", &PageRequest::after(2, cursor))
            .expect("page");
        assert_eq!(second.rows[0].id, "u2");
    }

    #[test]
    fn test_exact_page_boundary_has_no_next_cursor() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = open_store(&dir);
        let users: Vec<User> = (0..4).map(|i| user(&format!("u{i}"), 1_700_000_000 + i)).collect();
        store.insert_users(&users, ConflictMode::Strict).expect("insert");

        let page = store
            .list_users_page("ws1", &PageRequest::first(4))
            .expect("page");
        assert_eq!(page.rows.len(), 4);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn test_malformed_cursor_is_usage_error() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let result = store.list_users_page("ws1", &PageRequest::after(3, "garbage!"));
        assert!(matches!(result, Err(StoreError::InvalidCursor)));
    }

    #[test]
    fn test_channel_type_filter() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = open_store(&dir);
        let channels = vec![
            channel("c1", ChannelType::Public, 1),
            channel("c2", ChannelType::Private, 2),
            channel("c3", ChannelType::Im, 3),
            channel("c4", ChannelType::Im, 4),
        ];
        store
            .insert_channels(&channels, ConflictMode::Strict)
            .expect("insert");

        let ims = store
            .list_channels_page("ws1", &PageRequest::first(10), Some(ChannelType::Im))
            .expect("page");
        assert_eq!(ims.rows.len(), 2);
        assert!(ims.rows.iter().all(|c| c.channel_type == ChannelType::Im));

        let counts = store.channel_type_counts("ws1").expect("counts");
        assert_eq!(counts.get("im"), Some(&2));
        assert_eq!(counts.get("public"), Some(&1));
    }

    #[test]
    fn test_member_page_walk_with_channel_filter() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = open_store(&dir);
        let members = vec![
            member("c1", "u1"),
            member("c1", "u2"),
            member("c1", "u3"),
            member("c2", "u1"),
        ];
        store
            .insert_channel_members(&members, ConflictMode::Strict)
            .expect("insert");

        let mut seen = Vec::new();
        let mut request = PageRequest::first(2);
        loop {
            let page = store
                .list_channel_members_page("ws1", &request, Some("c1"))
                .expect("page");
            seen.extend(page.rows.iter().map(|m| m.user_id.clone()));
            match page.next_cursor {
                Some(cursor) => request = PageRequest::after(2, cursor),
                None => break,
            }
        }
        assert_eq!(seen, ["u1", "u2", "u3"]);
    }

    #[test]
    fn test_message_page_filters_and_ascending_order() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = open_store(&dir);
        let messages = vec![
            message("m1", "c1", 100),
            message("m2", "c1", 200),
            message("m3", "c2", 300),
            message("m4", "c1", 400),
        ];
        store
            .insert_messages(&messages, ConflictMode::Strict)
            .expect("insert");

        let filter = ContentFilter {
            channel_id: Some("c1".to_string()),
            after_ts: Some(100),
            ..Default::default()
        };
        let page = store
            .list_messages_page("ws1", &PageRequest::first(10), &filter)
            .expect("page");
        let ids: Vec<&str> = page.rows.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m2", "m4"]);
        assert!(page.rows.windows(2).all(|w| w[0].ts <= w[1].ts));
    }

    #[test]
    fn test_file_page_before_filter() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = open_store(&dir);
        let files = vec![file("f1", 100), file("f2", 200), file("f3", 300)];
        store.insert_files(&files, ConflictMode::Strict).expect("insert");

        let filter = ContentFilter {
            before_ts: Some(300),
            ..Default::default()
        };
        let page = store
            .list_files_page("ws1", &PageRequest::first(10), &filter)
            .expect("page");
        let ids: Vec<&str> = page.rows.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["f1", "f2"]);
    }

    #[test]
    fn test_first_write_wins_skips_duplicates() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = open_store(&dir);
        let initial = vec![user("u1", 1), user("u2", 2)];
        assert_eq!(
            store.insert_users(&initial, ConflictMode::Strict).expect("insert"),
            2
        );

        let mut changed = user("u1", 1);
        changed.name = "Changed".to_string();
        let mixed = vec![changed, user("u3", 3)];
        assert_eq!(
            store
                .insert_users(&mixed, ConflictMode::FirstWriteWins)
                .expect("append"),
            1
        );

        // The original row survives.
        let rows = store.list_users("ws1", 10, 0).expect("list");
        let u1 = rows.iter().find(|u| u.id == "u1").expect("u1");
        assert_eq!(u1.name, "User u1");
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_strict_duplicate_fails() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = open_store(&dir);
        store
            .insert_users(&[user("u1", 1)], ConflictMode::Strict)
            .expect("insert");
        assert!(store
            .insert_users(&[user("u1", 1)], ConflictMode::Strict)
            .is_err());
    }

    #[test]
    fn test_stats_and_summary() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = open_store(&dir);
        store
            .insert_users(&[user("u1", 1), user("u2", 2)], ConflictMode::Strict)
            .expect("users");
        store
            .insert_channels(&[channel("c1", ChannelType::Public, 1)], ConflictMode::Strict)
            .expect("channels");
        store
            .insert_channel_members(&[member("c1", "u1")], ConflictMode::Strict)
            .expect("members");
        store
            .insert_messages(&[message("m1", "c1", 500)], ConflictMode::Strict)
            .expect("messages");
        store
            .insert_files(&[file("f1", 900)], ConflictMode::Strict)
            .expect("files");

        let summary = store.export_summary("ws1").expect("summary");
        assert_eq!(summary.counts.users, 2);
        assert_eq!(summary.counts.channels, 1);
        assert_eq!(summary.counts.channel_members, 1);
        assert_eq!(summary.counts.messages, 1);
        assert_eq!(summary.counts.files, 1);
        assert_eq!(summary.max.messages_max_ts, Some(500));
        assert_eq!(summary.max.files_max_ts, Some(900));
        assert_eq!(summary.workspace.id, "ws1");
    }

    #[test]
    fn test_summary_for_unknown_workspace_fails() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        assert!(matches!(
            store.export_summary("nope"),
            Err(StoreError::WorkspaceNotFound(_))
        ));
    }

    #[test]
    fn test_for_each_message_respects_watermark() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = open_store(&dir);
        let messages = vec![message("m1", "c1", 100), message("m2", "c1", 200)];
        store
            .insert_messages(&messages, ConflictMode::Strict)
            .expect("insert");

        let mut seen = Vec::new();
        let count: u64 = store
            .for_each_message::<StoreError, _>("ws1", Some(100), |m| {
                seen.push(m.id);
                Ok(())
            })
            .expect("visit");
        assert_eq!(count, 1);
        assert_eq!(seen, ["m2"]);
    }
}
