//! Deterministic workspace dataset generation.
//!
//! Generation is staged: workspace, then users, then channels of every
//! type, then channel membership, then messages, then files. Later stages
//! only reference entities finalized by earlier ones, so every message
//! author and file uploader is a member of its channel.
//!
//! Every random draw comes from a named stream seeded off the workspace
//! fingerprint. Changing one requested count re-seeds only the affected
//! streams; re-running an identical configuration reproduces the dataset
//! byte for byte.

pub mod context;
pub mod entities;
pub mod membership;
pub mod orchestrator;
pub mod plugins;
pub mod text;

pub use context::GenerationContext;
pub use membership::{plan_membership, MembershipPlan};
pub use orchestrator::{generate_dataset, GenerationError, RunSummary};
pub use plugins::{build_registry, BUILTIN_PLUGINS};
