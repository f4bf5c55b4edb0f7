//! Read-only HTTP projection over a dataset store.
//!
//! Every request opens the database file read-only, so a missing or
//! deleted file surfaces as a client error instead of a freshly created
//! empty schema. Listing endpoints accept either a keyset `cursor` or a
//! legacy `offset`, never both at once.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use synth_core::{ChannelType, FileRecord, Message, User, Workspace};
use synth_store::{ContentFilter, Page, PageRequest, Store, StoreError, WorkspaceSummary};

/// Rows returned when no limit is given.
pub const DEFAULT_PAGE_LIMIT: usize = 100;
/// Hard cap on requested page sizes.
pub const MAX_PAGE_LIMIT: usize = 1000;

/// Shared handler state: the database path, opened per request.
#[derive(Clone)]
pub struct AppState {
    db_path: Arc<PathBuf>,
}

impl AppState {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Arc::new(db_path.into()),
        }
    }

    fn open(&self) -> Result<Store, ApiError> {
        Ok(Store::open_read_only(self.db_path.as_ref())?)
    }
}

/// The full route table of the projection.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/workspaces", get(list_workspaces))
        .route("/workspaces/{id}", get(workspace_summary))
        .route("/workspaces/{id}/users", get(list_users))
        .route("/workspaces/{id}/channels", get(list_channels))
        .route("/workspaces/{id}/messages", get(list_messages))
        .route("/workspaces/{id}/files", get(list_files))
        .with_state(state)
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = match &err {
            StoreError::DatabaseMissing(_)
            | StoreError::InvalidCursor
            | StoreError::CursorWithOffset => StatusCode::BAD_REQUEST,
            StoreError::WorkspaceNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    limit: Option<usize>,
    offset: Option<usize>,
    cursor: Option<String>,
    channel_type: Option<String>,
    channel_id: Option<String>,
    user_id: Option<String>,
    before_ts: Option<i64>,
    after_ts: Option<i64>,
}

enum Pagination {
    Keyset(PageRequest),
    Offset { limit: usize, offset: usize },
}

impl ListQuery {
    fn pagination(&self) -> Result<Pagination, ApiError> {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT);
        // An empty cursor string means the first keyset page.
        let cursor = self.cursor.as_deref().filter(|token| !token.is_empty());
        match (cursor, self.offset) {
            (Some(_), Some(_)) => Err(StoreError::CursorWithOffset.into()),
            (None, Some(offset)) => Ok(Pagination::Offset { limit, offset }),
            (Some(token), None) => Ok(Pagination::Keyset(PageRequest::after(limit, token))),
            (None, None) => Ok(Pagination::Keyset(PageRequest::first(limit))),
        }
    }

    fn channel_type(&self) -> Result<Option<ChannelType>, ApiError> {
        self.channel_type
            .as_deref()
            .map(|raw| {
                raw.parse::<ChannelType>()
                    .map_err(|err| ApiError::bad_request(err.to_string()))
            })
            .transpose()
    }

    fn content_filter(&self) -> ContentFilter {
        ContentFilter {
            channel_id: self.channel_id.clone(),
            user_id: self.user_id.clone(),
            before_ts: self.before_ts,
            after_ts: self.after_ts,
        }
    }

    /// The legacy offset lists predate content filters; combining them
    /// would silently drop the filter, so it is rejected instead.
    fn reject_content_filters(&self) -> Result<(), ApiError> {
        if self.channel_id.is_some()
            || self.user_id.is_some()
            || self.before_ts.is_some()
            || self.after_ts.is_some()
        {
            return Err(ApiError::bad_request(
                "content filters require cursor pagination",
            ));
        }
        Ok(())
    }
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_workspaces(State(state): State<AppState>) -> Result<Json<Vec<Workspace>>, ApiError> {
    blocking(move || {
        let store = state.open()?;
        Ok(Json(store.list_workspaces()?))
    })
    .await
}

async fn workspace_summary(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
) -> Result<Json<WorkspaceSummary>, ApiError> {
    blocking(move || {
        let store = state.open()?;
        Ok(Json(store.export_summary(&workspace_id)?))
    })
    .await
}

async fn list_users(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<User>>, ApiError> {
    blocking(move || {
        let store = state.open()?;
        require_workspace(&store, &workspace_id)?;
        let page = match query.pagination()? {
            Pagination::Keyset(page) => store.list_users_page(&workspace_id, &page)?,
            Pagination::Offset { limit, offset } => {
                offset_page(store.list_users(&workspace_id, limit, offset)?)
            }
        };
        Ok(Json(page))
    })
    .await
}

async fn list_channels(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<synth_core::Channel>>, ApiError> {
    blocking(move || {
        let store = state.open()?;
        require_workspace(&store, &workspace_id)?;
        let channel_type = query.channel_type()?;
        let page = match query.pagination()? {
            Pagination::Keyset(page) => {
                store.list_channels_page(&workspace_id, &page, channel_type)?
            }
            Pagination::Offset { limit, offset } => {
                offset_page(store.list_channels(&workspace_id, limit, offset, channel_type)?)
            }
        };
        Ok(Json(page))
    })
    .await
}

async fn list_messages(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Message>>, ApiError> {
    blocking(move || {
        let store = state.open()?;
        require_workspace(&store, &workspace_id)?;
        let page = match query.pagination()? {
            Pagination::Keyset(page) => {
                store.list_messages_page(&workspace_id, &page, &query.content_filter())?
            }
            Pagination::Offset { limit, offset } => {
                query.reject_content_filters()?;
                offset_page(store.list_messages(&workspace_id, limit, offset)?)
            }
        };
        Ok(Json(page))
    })
    .await
}

async fn list_files(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<FileRecord>>, ApiError> {
    blocking(move || {
        let store = state.open()?;
        require_workspace(&store, &workspace_id)?;
        let page = match query.pagination()? {
            Pagination::Keyset(page) => {
                store.list_files_page(&workspace_id, &page, &query.content_filter())?
            }
            Pagination::Offset { limit, offset } => {
                query.reject_content_filters()?;
                offset_page(store.list_files(&workspace_id, limit, offset)?)
            }
        };
        Ok(Json(page))
    })
    .await
}

fn require_workspace(store: &Store, workspace_id: &str) -> Result<(), ApiError> {
    match store.get_workspace(workspace_id)? {
        Some(_) => Ok(()),
        None => Err(StoreError::WorkspaceNotFound(workspace_id.to_string()).into()),
    }
}

fn offset_page<T>(rows: Vec<T>) -> Page<T> {
    Page {
        rows,
        next_cursor: None,
    }
}

/// SQLite calls are synchronous; run them off the async worker threads.
async fn blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(result) => result,
        Err(err) => Err(ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("worker task failed: {err}"),
        }),
    }
}
