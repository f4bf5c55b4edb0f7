//! Opaque pagination cursors.
//!
//! A cursor encodes the sort key of the last row on a page as compact
//! JSON wrapped in URL-safe unpadded base64. Clients must treat tokens
//! as opaque; any token that does not decode back to the expected shape
//! is rejected as a usage error.

use crate::error::StoreError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Sort key for timestamped entities (users, channels, messages, files).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampCursor {
    pub ts: i64,
    pub id: String,
}

/// Sort key for membership edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberCursor {
    pub channel_id: String,
    pub user_id: String,
}

pub fn encode_cursor(cursor: &TimestampCursor) -> Result<String, StoreError> {
    encode(cursor)
}

pub fn decode_cursor(token: &str) -> Result<TimestampCursor, StoreError> {
    decode(token)
}

pub fn encode_member_cursor(cursor: &MemberCursor) -> Result<String, StoreError> {
    encode(cursor)
}

pub fn decode_member_cursor(token: &str) -> Result<MemberCursor, StoreError> {
    decode(token)
}

fn encode<T: Serialize>(payload: &T) -> Result<String, StoreError> {
    let json = serde_json::to_vec(payload)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode<T: for<'de> Deserialize<'de>>(token: &str) -> Result<T, StoreError> {
    let raw = URL_SAFE_NO_PAD
        .decode(token.as_bytes())
        .map_err(|_| StoreError::InvalidCursor)?;
    serde_json::from_slice(&raw).map_err(|_| StoreError::InvalidCursor)
}
