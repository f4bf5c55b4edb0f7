//! Entity models for generated workspace datasets.
//!
//! Field sets mirror the store schema one-to-one; the same structs are
//! serialized into JSONL export artifacts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A generated workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    /// Unix seconds.
    pub created_at: i64,
}

/// A workspace member account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    pub email: String,
    pub title: String,
    pub is_bot: bool,
    /// Unix seconds.
    pub created_at: i64,
}

/// Channel classification. Conversation privacy is implied by the type;
/// there is no separate privacy flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    /// Named channel anyone can join.
    Public,
    /// Named invite-only channel.
    Private,
    /// Direct conversation between exactly two users.
    Im,
    /// Group direct conversation (three or more users).
    Mpim,
}

impl ChannelType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelType::Public => "public",
            ChannelType::Private => "private",
            ChannelType::Im => "im",
            ChannelType::Mpim => "mpim",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for channel type strings outside the known set.
#[derive(Debug, thiserror::Error)]
#[error("unknown channel type: {0}")]
pub struct UnknownChannelType(pub String);

impl FromStr for ChannelType {
    type Err = UnknownChannelType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(ChannelType::Public),
            "private" => Ok(ChannelType::Private),
            "im" => Ok(ChannelType::Im),
            "mpim" => Ok(ChannelType::Mpim),
            other => Err(UnknownChannelType(other.to_string())),
        }
    }
}

/// A channel of any type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    pub channel_type: ChannelType,
    pub topic: String,
    /// Unix seconds.
    pub created_at: i64,
}

/// Membership edge between a channel and a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMember {
    pub channel_id: String,
    pub workspace_id: String,
    pub user_id: String,
    /// Unix seconds.
    pub created_at: i64,
}

/// A message posted to a channel by one of its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub workspace_id: String,
    pub channel_id: String,
    pub user_id: String,
    /// Unix seconds; non-decreasing within a channel.
    pub ts: i64,
    pub text: String,
    /// Timestamp of the thread parent, when this is a reply.
    pub thread_ts: Option<i64>,
    pub reply_count: u32,
    /// Reaction tallies as a JSON object string.
    pub reactions_json: String,
}

/// A file shared into a channel by one of its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub workspace_id: String,
    pub user_id: String,
    pub name: String,
    pub size: i64,
    pub mimetype: String,
    /// Unix seconds.
    pub created_ts: i64,
    pub channel_id: String,
    /// Message the file was attached to, when any.
    pub message_id: Option<String>,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_type_round_trip() {
        for ty in [
            ChannelType::Public,
            ChannelType::Private,
            ChannelType::Im,
            ChannelType::Mpim,
        ] {
            assert_eq!(ty.as_str().parse::<ChannelType>().ok(), Some(ty));
        }
    }

    #[test]
    fn test_channel_type_rejects_unknown() {
        assert!("group".parse::<ChannelType>().is_err());
    }

    #[test]
    fn test_channel_type_serializes_lowercase() {
        let json = serde_json::to_string(&ChannelType::Mpim).expect("serialize");
        assert_eq!(json, "\"mpim\"");
    }

    #[test]
    fn test_message_json_shape() {
        let message = Message {
            id: "m1".to_string(),
            workspace_id: "w1".to_string(),
            channel_id: "c1".to_string(),
            user_id: "u1".to_string(),
            ts: 1_700_000_100,
            text: "hello".to_string(),
            thread_ts: None,
            reply_count: 0,
            reactions_json: "{}".to_string(),
        };
        let value = serde_json::to_value(&message).expect("serialize");
        assert_eq!(value["ts"], 1_700_000_100);
        assert!(value["thread_ts"].is_null());
    }
}
