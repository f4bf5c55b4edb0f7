//! Builders for workspace, user and channel records.
//!
//! Builders draw from their own named streams and are driven by explicit
//! sequence numbers, so identifier allocation stays a pure function of
//! the fingerprint.

use crate::context::{GenerationContext, DAY};
use crate::text;
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashSet;
use synth_core::{Channel, ChannelType, EntityKind, User, Workspace};

/// The workspace row itself. Created one year before the dataset anchor
/// so every other record fits inside its lifetime.
pub fn build_workspace(ctx: &GenerationContext) -> Workspace {
    Workspace {
        id: ctx.ids().allocate(EntityKind::Workspace, 0),
        name: ctx.config().workspace_name.clone(),
        created_at: ctx.base_ts() - 365 * DAY,
    }
}

pub struct UserBuilder {
    rng: StdRng,
}

impl UserBuilder {
    pub fn new(ctx: &GenerationContext) -> Self {
        Self {
            rng: ctx.rng("users"),
        }
    }

    pub fn build(&mut self, ctx: &GenerationContext, workspace: &Workspace, index: u64) -> User {
        let (first, last) = text::person_name(&mut self.rng);
        let is_bot = self.rng.gen_bool(0.02);
        let title = if is_bot {
            "Bot".to_string()
        } else {
            text::job_title(&mut self.rng).to_string()
        };
        let name = if is_bot {
            format!("{first} Bot")
        } else {
            format!("{first} {last}")
        };
        User {
            id: ctx.ids().allocate(EntityKind::User, index),
            workspace_id: workspace.id.clone(),
            name,
            email: text::email(first, last, index),
            title,
            is_bot,
            created_at: self.rng.gen_range(workspace.created_at..=ctx.base_ts()),
        }
    }
}

/// Builds channel rows of every type. Named channels get deduplicated
/// human-readable names; conversation channels get ordinal names.
pub struct ChannelBuilder {
    rng: StdRng,
    used_names: HashSet<String>,
}

impl ChannelBuilder {
    pub fn new(ctx: &GenerationContext) -> Self {
        Self {
            rng: ctx.rng("channels"),
            used_names: HashSet::new(),
        }
    }

    /// A public or private named channel. `sequence` is the global channel
    /// id sequence shared with conversation channels.
    pub fn build_named(
        &mut self,
        ctx: &GenerationContext,
        workspace: &Workspace,
        sequence: u64,
    ) -> Channel {
        let channel_type = if self.rng.gen_bool(0.15) {
            ChannelType::Private
        } else {
            ChannelType::Public
        };
        let base = text::channel_name(&mut self.rng);
        let name = self.dedupe(base);
        Channel {
            id: ctx.ids().allocate(EntityKind::Channel, sequence),
            workspace_id: workspace.id.clone(),
            name,
            channel_type,
            topic: text::channel_topic(&mut self.rng).to_string(),
            created_at: self.rng.gen_range(workspace.created_at..=ctx.base_ts()),
        }
    }

    /// A two-person direct conversation. `ordinal` counts ims only.
    pub fn build_im(
        &mut self,
        ctx: &GenerationContext,
        workspace: &Workspace,
        sequence: u64,
        ordinal: u64,
    ) -> Channel {
        Channel {
            id: ctx.ids().allocate(EntityKind::Channel, sequence),
            workspace_id: workspace.id.clone(),
            name: format!("dm-{ordinal:04}"),
            channel_type: ChannelType::Im,
            topic: "Direct message".to_string(),
            created_at: self.rng.gen_range(workspace.created_at..=ctx.base_ts()),
        }
    }

    /// A group direct conversation. `ordinal` counts mpims only.
    pub fn build_mpim(
        &mut self,
        ctx: &GenerationContext,
        workspace: &Workspace,
        sequence: u64,
        ordinal: u64,
    ) -> Channel {
        Channel {
            id: ctx.ids().allocate(EntityKind::Channel, sequence),
            workspace_id: workspace.id.clone(),
            name: format!("mpdm-{ordinal:04}"),
            channel_type: ChannelType::Mpim,
            topic: "Multi-party direct message".to_string(),
            created_at: self.rng.gen_range(workspace.created_at..=ctx.base_ts()),
        }
    }

    fn dedupe(&mut self, base: String) -> String {
        if self.used_names.insert(base.clone()) {
            return base;
        }
        let mut n = 2u32;
        loop {
            let candidate = format!("{base}-{n}");
            if self.used_names.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synth_core::GenerationConfig;

    fn ctx() -> GenerationContext {
        GenerationContext::new(GenerationConfig::default())
    }

    #[test]
    fn test_workspace_is_deterministic() {
        let ctx = ctx();
        let a = build_workspace(&ctx);
        let b = build_workspace(&ctx);
        assert_eq!(a, b);
        assert_eq!(a.name, "Synth Workspace");
        assert!(a.created_at < ctx.base_ts());
    }

    #[test]
    fn test_user_emails_are_unique() {
        let ctx = ctx();
        let workspace = build_workspace(&ctx);
        let mut builder = UserBuilder::new(&ctx);
        let mut emails = HashSet::new();
        for index in 0..200 {
            let user = builder.build(&ctx, &workspace, index);
            assert!(emails.insert(user.email.clone()), "duplicate {}", user.email);
            assert_eq!(user.workspace_id, workspace.id);
            assert!(user.created_at >= workspace.created_at);
            assert!(user.created_at <= ctx.base_ts());
        }
    }

    #[test]
    fn test_bots_are_labeled() {
        let ctx = ctx();
        let workspace = build_workspace(&ctx);
        let mut builder = UserBuilder::new(&ctx);
        for index in 0..300 {
            let user = builder.build(&ctx, &workspace, index);
            if user.is_bot {
                assert_eq!(user.title, "Bot");
                assert!(user.name.ends_with(" Bot"));
            }
        }
    }

    #[test]
    fn test_named_channel_names_are_unique() {
        let ctx = ctx();
        let workspace = build_workspace(&ctx);
        let mut builder = ChannelBuilder::new(&ctx);
        let mut names = HashSet::new();
        for sequence in 0..500 {
            let channel = builder.build_named(&ctx, &workspace, sequence);
            assert!(names.insert(channel.name.clone()), "duplicate {}", channel.name);
            assert!(matches!(
                channel.channel_type,
                ChannelType::Public | ChannelType::Private
            ));
        }
    }

    #[test]
    fn test_conversation_channel_shapes() {
        let ctx = ctx();
        let workspace = build_workspace(&ctx);
        let mut builder = ChannelBuilder::new(&ctx);
        let im = builder.build_im(&ctx, &workspace, 10, 3);
        assert_eq!(im.name, "dm-0003");
        assert_eq!(im.channel_type, ChannelType::Im);
        let mpim = builder.build_mpim(&ctx, &workspace, 11, 0);
        assert_eq!(mpim.name, "mpdm-0000");
        assert_eq!(mpim.channel_type, ChannelType::Mpim);
        assert_ne!(im.id, mpim.id);
    }
}
