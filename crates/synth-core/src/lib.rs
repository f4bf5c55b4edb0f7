//! Core types for the workspace-synth dataset synthesizer.
//!
//! This crate holds the pieces every other workspace-synth crate builds on:
//! the generation configuration with its up-front validation, the workspace
//! fingerprint that gives each dataset a stable identity, deterministic
//! identifier allocation, the entity models, and the typed hook registry
//! used to customize records during generation.
//!
//! Nothing in here performs I/O.

pub mod config;
pub mod fingerprint;
pub mod hooks;
pub mod ident;
pub mod model;

/// Name written into workspace metadata by the generator and checked by
/// dataset validation.
pub const GENERATOR_NAME: &str = "workspace-synth";

pub use config::{ConfigError, GenerationConfig, DEFAULT_BATCH_SIZE};
pub use fingerprint::WorkspaceFingerprint;
pub use hooks::{FnHook, HookError, HookRegistry, RecordHook};
pub use ident::{EntityKind, IdAllocator};
pub use model::{
    Channel, ChannelMember, ChannelType, FileRecord, Message, UnknownChannelType, User, Workspace,
};
