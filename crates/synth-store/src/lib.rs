//! Embedded SQLite storage for workspace-synth datasets.
//!
//! A [`Store`] wraps one SQLite database holding any number of generated
//! workspaces. Writers get batched insert transactions; readers get
//! offset lists, keyset-paginated views with opaque cursors, streaming
//! visitors for export, and summary queries. [`validate_store`] produces
//! a read-only compatibility report for foreign database files.

pub mod cursor;
pub mod error;
pub mod schema;
pub mod store;
pub mod validate;

pub use cursor::{
    decode_cursor, decode_member_cursor, encode_cursor, encode_member_cursor, MemberCursor,
    TimestampCursor,
};
pub use error::StoreError;
pub use schema::SCHEMA_VERSION;
pub use store::{
    ConflictMode, ContentFilter, MaxTimestamps, Page, PageRequest, Store, TableCounts,
    WorkspaceSummary,
};
pub use validate::{validate_store, ValidateOptions, ValidationReport};
