//! workspace-synth
//!
//! A deterministic synthesizer for team-workspace datasets: users,
//! channels, direct and group conversations, threaded messages, and file
//! records, written into an embedded SQLite store that can be queried,
//! exported, imported, and served over HTTP.
//!
//! # Features
//!
//! - Deterministic generation: one seed plus the requested counts fixes
//!   every identifier, name, and timestamp
//! - Embedded storage: batched writes, keyset pagination, summaries
//! - Streaming JSONL export/import with incremental watermarks
//! - Built-in record hooks for customizing entities during generation
//! - Read-only HTTP projection of any generated dataset
//!
//! # CLI Usage
//!
//! ```bash
//! # Generate a deterministic dataset
//! workspace-synth generate --db demo.db --seed 7 --users 200 --channels 12 \
//!   --im-channels 40 --messages 5000 --files 300
//!
//! # Export it as JSONL artifacts
//! workspace-synth export --db demo.db --out exports/ --compress
//!
//! # Import into a fresh database
//! workspace-synth import --db copy.db --source exports/ --mode fresh
//!
//! # Inspect and validate
//! workspace-synth stats --db demo.db
//! workspace-synth validate --db demo.db
//!
//! # Serve the read-only HTTP projection
//! workspace-synth serve --db demo.db --bind 127.0.0.1:8080
//! ```

use clap::Parser;
use synth_core::GenerationConfig;

pub mod api;

/// Database location shared by every subcommand.
#[derive(Parser, Clone)]
pub struct StoreOpts {
    /// Path to the dataset database file
    #[arg(
        long,
        default_value = "workspace-synth.db",
        env = "WORKSPACE_SYNTH_DB"
    )]
    pub db: std::path::PathBuf,
}

/// Generation knobs, one flag per configuration field.
#[derive(Parser, Clone)]
pub struct GenerateOpts {
    /// Workspace display name
    #[arg(long, default_value = "Synth Workspace")]
    pub workspace_name: String,

    /// Random seed; with the name and counts it fixes every generated value
    #[arg(long, default_value = "42", env = "WORKSPACE_SYNTH_SEED")]
    pub seed: u64,

    /// Number of users
    #[arg(long, default_value = "2000")]
    pub users: u64,

    /// Number of named channels (public/private)
    #[arg(long, default_value = "80")]
    pub channels: u64,

    /// Number of two-person direct conversations
    #[arg(long, default_value = "0")]
    pub im_channels: u64,

    /// Number of group direct conversations
    #[arg(long, default_value = "0")]
    pub mpim_channels: u64,

    /// Number of messages across all channels
    #[arg(long, default_value = "120000")]
    pub messages: u64,

    /// Number of file records
    #[arg(long, default_value = "5000")]
    pub files: u64,

    /// Minimum members per named channel
    #[arg(long, default_value = "8")]
    pub channel_members_min: u32,

    /// Maximum members per named channel
    #[arg(long, default_value = "120")]
    pub channel_members_max: u32,

    /// Minimum members per group conversation
    #[arg(long, default_value = "3")]
    pub mpim_members_min: u32,

    /// Maximum members per group conversation
    #[arg(long, default_value = "7")]
    pub mpim_members_max: u32,

    /// Rows per store write transaction
    #[arg(long, default_value = "500")]
    pub batch_size: usize,
}

impl GenerateOpts {
    pub fn to_config(&self) -> GenerationConfig {
        GenerationConfig {
            workspace_name: self.workspace_name.clone(),
            seed: self.seed,
            users: self.users,
            channels: self.channels,
            im_channels: self.im_channels,
            mpim_channels: self.mpim_channels,
            messages: self.messages,
            files: self.files,
            channel_members_min: self.channel_members_min,
            channel_members_max: self.channel_members_max,
            mpim_members_min: self.mpim_members_min,
            mpim_members_max: self.mpim_members_max,
            batch_size: self.batch_size,
        }
    }
}
