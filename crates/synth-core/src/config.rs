//! Generation configuration and validation.

use serde::{Deserialize, Serialize};

/// Default insert batch size for store writes.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Errors for configurations that cannot produce a coherent dataset.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Workspace name is empty or whitespace.
    #[error("workspace name must not be empty")]
    EmptyWorkspaceName,

    /// No users requested.
    #[error("users must be > 0")]
    NoUsers,

    /// Batch size of zero would never flush.
    #[error("batch-size must be >= 1")]
    InvalidBatchSize,

    /// Channel membership bounds are inverted or start below one.
    #[error("channel-members-min must be <= channel-members-max and >= 1")]
    InvalidMemberBounds,

    /// Group conversation size range is inverted or starts below three.
    #[error("mpim-members-min must be <= mpim-members-max and >= 3")]
    InvalidMpimBounds,

    /// Messages or files requested with no channels of any type.
    #[error("{0} requested but no channels of any type configured")]
    NoChannelsForContent(&'static str),

    /// Plugin name did not resolve to a known hook set.
    #[error("unknown plugin: {0}")]
    UnknownPlugin(String),
}

/// Shape of one generation run.
///
/// All counts are requested targets. Conversation channels (im/mpim) may
/// come up short when the user pool cannot supply enough distinct member
/// sets; every other count is exact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Workspace display name.
    pub workspace_name: String,
    /// Random seed. Together with the name and counts it fixes every value.
    pub seed: u64,
    /// Number of users.
    pub users: u64,
    /// Number of named channels (public/private).
    pub channels: u64,
    /// Number of two-person direct conversations.
    pub im_channels: u64,
    /// Number of group direct conversations.
    pub mpim_channels: u64,
    /// Number of messages across all channels.
    pub messages: u64,
    /// Number of file records.
    pub files: u64,
    /// Minimum members per named channel.
    pub channel_members_min: u32,
    /// Maximum members per named channel.
    pub channel_members_max: u32,
    /// Minimum members per group conversation.
    pub mpim_members_min: u32,
    /// Maximum members per group conversation.
    pub mpim_members_max: u32,
    /// Rows per store write transaction.
    pub batch_size: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            workspace_name: "Synth Workspace".to_string(),
            seed: 42,
            users: 2000,
            channels: 80,
            im_channels: 0,
            mpim_channels: 0,
            messages: 120_000,
            files: 5000,
            channel_members_min: 8,
            channel_members_max: 120,
            mpim_members_min: 3,
            mpim_members_max: 7,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl GenerationConfig {
    /// Check the configuration before any generation or store write.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workspace_name.trim().is_empty() {
            return Err(ConfigError::EmptyWorkspaceName);
        }
        if self.users == 0 {
            return Err(ConfigError::NoUsers);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        if self.channel_members_min < 1 || self.channel_members_min > self.channel_members_max {
            return Err(ConfigError::InvalidMemberBounds);
        }
        if self.mpim_members_min < 3 || self.mpim_members_min > self.mpim_members_max {
            return Err(ConfigError::InvalidMpimBounds);
        }
        if self.total_channels() == 0 {
            if self.messages > 0 {
                return Err(ConfigError::NoChannelsForContent("messages"));
            }
            if self.files > 0 {
                return Err(ConfigError::NoChannelsForContent("files"));
            }
        }
        Ok(())
    }

    /// Total channels of every type requested.
    pub fn total_channels(&self) -> u64 {
        self.channels + self.im_channels + self.mpim_channels
    }
}
