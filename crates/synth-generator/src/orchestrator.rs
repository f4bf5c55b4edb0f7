//! Staged generation runs.
//!
//! A run writes one workspace into a store: workspace row and provenance
//! metadata first, then users, channels, membership, messages and files,
//! each flushed in configured batches. The completion flag is written
//! only after every stage finished, so interrupted runs are detectable.

use crate::context::{GenerationContext, DAY};
use crate::entities::{build_workspace, ChannelBuilder, UserBuilder};
use crate::membership::plan_membership;
use crate::text;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use serde_json::json;
use std::time::Instant;
use synth_core::{
    Channel, ChannelMember, ConfigError, EntityKind, FileRecord, GenerationConfig, HookError,
    HookRegistry, Message, GENERATOR_NAME,
};
use synth_store::{ConflictMode, Store, StoreError, SCHEMA_VERSION};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Hook(#[from] HookError),
}

/// What one generation run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub workspace_id: String,
    pub fingerprint: String,
    pub users: u64,
    pub channels: u64,
    pub im_channels: u64,
    pub im_shortfall: u64,
    pub mpim_channels: u64,
    pub mpim_shortfall: u64,
    pub channel_members: u64,
    pub messages: u64,
    pub files: u64,
    pub elapsed_ms: u64,
}

/// Generate one complete workspace dataset into `store`.
pub fn generate_dataset(
    store: &mut Store,
    config: &GenerationConfig,
    registry: &HookRegistry,
) -> Result<RunSummary, GenerationError> {
    config.validate()?;
    let start = Instant::now();
    let ctx = GenerationContext::new(config.clone());
    info!(
        "Generating workspace '{}' (seed {}, fingerprint {})",
        config.workspace_name,
        config.seed,
        &ctx.fingerprint().to_hex()[..12]
    );

    let workspace = registry.apply_workspace(build_workspace(&ctx))?;
    store.insert_workspace(&workspace, ConflictMode::Strict)?;
    store.set_workspace_meta(&workspace.id, &run_meta(&ctx, registry))?;

    let mut summary = RunSummary {
        workspace_id: workspace.id.clone(),
        fingerprint: ctx.fingerprint().to_hex(),
        users: 0,
        channels: 0,
        im_channels: 0,
        im_shortfall: 0,
        mpim_channels: 0,
        mpim_shortfall: 0,
        channel_members: 0,
        messages: 0,
        files: 0,
        elapsed_ms: 0,
    };

    // Users. Join timestamps are kept for membership edges below.
    let mut user_created: Vec<i64> = Vec::with_capacity(config.users as usize);
    {
        let mut builder = UserBuilder::new(&ctx);
        let mut batch = Vec::with_capacity(config.batch_size);
        for index in 0..config.users {
            let user = registry.apply_user(builder.build(&ctx, &workspace, index))?;
            user_created.push(user.created_at);
            batch.push(user);
            if batch.len() == config.batch_size {
                summary.users += store.insert_users(&batch, ConflictMode::Strict)? as u64;
                batch.clear();
                if summary.users % 10_000 == 0 {
                    debug!("Inserted {} users", summary.users);
                }
            }
        }
        if !batch.is_empty() {
            summary.users += store.insert_users(&batch, ConflictMode::Strict)? as u64;
        }
    }
    info!("Generated {} users", summary.users);

    // Membership is planned before channel rows exist because the number
    // of distinct pairs and groups decides how many conversation
    // channels are actually created.
    let plan = plan_membership(&ctx);
    summary.im_shortfall = plan.im_shortfall;
    summary.mpim_shortfall = plan.mpim_shortfall;
    if plan.im_shortfall > 0 {
        warn!(
            "Created {} of {} requested ims; the user pool has no more distinct pairs",
            plan.im_pairs.len(),
            config.im_channels
        );
    }
    if plan.mpim_shortfall > 0 {
        warn!(
            "Created {} of {} requested mpims; not enough distinct member groups",
            plan.mpim_groups.len(),
            config.mpim_channels
        );
    }

    // Channels of every type, in id-sequence order.
    let mut channels: Vec<Channel> =
        Vec::with_capacity(plan.named.len() + plan.im_pairs.len() + plan.mpim_groups.len());
    {
        let mut builder = ChannelBuilder::new(&ctx);
        let mut sequence = 0u64;
        for _ in 0..config.channels {
            channels.push(registry.apply_channel(builder.build_named(&ctx, &workspace, sequence))?);
            sequence += 1;
        }
        for ordinal in 0..plan.im_pairs.len() as u64 {
            channels.push(
                registry.apply_channel(builder.build_im(&ctx, &workspace, sequence, ordinal))?,
            );
            sequence += 1;
        }
        for ordinal in 0..plan.mpim_groups.len() as u64 {
            channels.push(
                registry.apply_channel(builder.build_mpim(&ctx, &workspace, sequence, ordinal))?,
            );
            sequence += 1;
        }
    }
    summary.channels = plan.named.len() as u64;
    summary.im_channels = plan.im_pairs.len() as u64;
    summary.mpim_channels = plan.mpim_groups.len() as u64;
    for chunk in channels.chunks(config.batch_size) {
        store.insert_channels(chunk, ConflictMode::Strict)?;
    }

    // Membership edges.
    let channel_members = plan.into_channel_members();
    {
        let mut batch = Vec::with_capacity(config.batch_size);
        for (channel, members) in channels.iter().zip(&channel_members) {
            for &user_index in members {
                batch.push(ChannelMember {
                    channel_id: channel.id.clone(),
                    workspace_id: workspace.id.clone(),
                    user_id: ctx.ids().allocate(EntityKind::User, user_index as u64),
                    created_at: channel.created_at.max(user_created[user_index as usize]),
                });
                if batch.len() == config.batch_size {
                    summary.channel_members +=
                        store.insert_channel_members(&batch, ConflictMode::Strict)? as u64;
                    batch.clear();
                }
            }
        }
        if !batch.is_empty() {
            summary.channel_members +=
                store.insert_channel_members(&batch, ConflictMode::Strict)? as u64;
        }
    }
    info!(
        "Generated {} channels and {} membership edges",
        channels.len(),
        summary.channel_members
    );

    // Messages. Authors come from the channel's member list; timestamps
    // advance monotonically per channel from its creation time.
    let mut message_channels: Vec<u32> = Vec::new();
    if config.messages > 0 && channels.is_empty() {
        warn!("No channels were created; skipping the message stage");
    } else if config.messages > 0 {
        let mut rng = ctx.rng("messages");
        let mut last_ts: Vec<i64> = channels.iter().map(|c| c.created_at).collect();
        let mut last_root: Vec<Option<i64>> = vec![None; channels.len()];
        message_channels.reserve(config.messages as usize);
        let mut batch = Vec::with_capacity(config.batch_size);
        for sequence in 0..config.messages {
            let channel_index = rng.gen_range(0..channels.len());
            let members = &channel_members[channel_index];
            let author = *members.choose(&mut rng).unwrap_or(&0);

            let ts = last_ts[channel_index] + rng.gen_range(1..=900);
            last_ts[channel_index] = ts;
            let thread_ts = if rng.gen_bool(0.25) {
                last_root[channel_index]
            } else {
                None
            };
            let reply_count = if thread_ts.is_none() {
                rng.gen_range(0..=6)
            } else {
                0
            };
            if thread_ts.is_none() {
                last_root[channel_index] = Some(ts);
            }
            let reactions_json = match rng.gen_range(0..=5u32) {
                0 => "{}".to_string(),
                n => format!(r#"{{"thumbsup":{n}}}"#),
            };

            let message = Message {
                id: ctx.ids().allocate(EntityKind::Message, sequence),
                workspace_id: workspace.id.clone(),
                channel_id: channels[channel_index].id.clone(),
                user_id: ctx.ids().allocate(EntityKind::User, author as u64),
                ts,
                text: text::sentence(&mut rng),
                thread_ts,
                reply_count,
                reactions_json,
            };
            message_channels.push(channel_index as u32);
            batch.push(registry.apply_message(message)?);
            if batch.len() == config.batch_size {
                summary.messages += store.insert_messages(&batch, ConflictMode::Strict)? as u64;
                batch.clear();
                if summary.messages % 10_000 == 0 {
                    debug!("Inserted {} messages", summary.messages);
                }
            }
        }
        if !batch.is_empty() {
            summary.messages += store.insert_messages(&batch, ConflictMode::Strict)? as u64;
        }
    }
    info!("Generated {} messages", summary.messages);

    // Files. Roughly a third attach to an existing message and inherit
    // its channel.
    if config.files > 0 && channels.is_empty() {
        warn!("No channels were created; skipping the file stage");
    } else if config.files > 0 {
        let mut rng = ctx.rng("files");
        let window_start = ctx.base_ts() - 30 * DAY;
        let mut batch = Vec::with_capacity(config.batch_size);
        for sequence in 0..config.files {
            let attached = !message_channels.is_empty() && rng.gen_bool(0.3);
            let (channel_index, message_id) = if attached {
                let message_seq = rng.gen_range(0..message_channels.len());
                (
                    message_channels[message_seq] as usize,
                    Some(ctx.ids().allocate(EntityKind::Message, message_seq as u64)),
                )
            } else {
                (rng.gen_range(0..channels.len()), None)
            };
            let members = &channel_members[channel_index];
            let uploader = *members.choose(&mut rng).unwrap_or(&0);
            let (name, mimetype) = text::file_name(&mut rng);
            let id = ctx.ids().allocate(EntityKind::File, sequence);
            let url = format!("https://files.example.com/{id}");

            let file = FileRecord {
                id,
                workspace_id: workspace.id.clone(),
                user_id: ctx.ids().allocate(EntityKind::User, uploader as u64),
                name,
                size: rng.gen_range(5_000..=5_000_000),
                mimetype: mimetype.to_string(),
                created_ts: rng.gen_range(window_start..=ctx.base_ts()),
                channel_id: channels[channel_index].id.clone(),
                message_id,
                url,
            };
            batch.push(registry.apply_file(file)?);
            if batch.len() == config.batch_size {
                summary.files += store.insert_files(&batch, ConflictMode::Strict)? as u64;
                batch.clear();
            }
        }
        if !batch.is_empty() {
            summary.files += store.insert_files(&batch, ConflictMode::Strict)? as u64;
        }
    }
    info!("Generated {} files", summary.files);

    // Written last; its absence marks a partial dataset.
    let mut done = serde_json::Map::new();
    done.insert("generation_complete".to_string(), serde_json::Value::Bool(true));
    store.set_workspace_meta(&workspace.id, &done)?;

    summary.elapsed_ms = start.elapsed().as_millis() as u64;
    info!(
        "Generation complete for workspace {} in {} ms",
        workspace.id, summary.elapsed_ms
    );
    Ok(summary)
}

fn run_meta(
    ctx: &GenerationContext,
    registry: &HookRegistry,
) -> serde_json::Map<String, serde_json::Value> {
    let config = ctx.config();
    let mut meta = serde_json::Map::new();
    meta.insert("generator".to_string(), json!(GENERATOR_NAME));
    meta.insert(
        "generator_version".to_string(),
        json!(env!("CARGO_PKG_VERSION")),
    );
    meta.insert("schema_version".to_string(), json!(SCHEMA_VERSION));
    meta.insert("seed".to_string(), json!(config.seed));
    meta.insert("fingerprint".to_string(), json!(ctx.fingerprint().to_hex()));
    meta.insert(
        "requested".to_string(),
        json!({
            "users": config.users,
            "channels": config.channels,
            "im_channels": config.im_channels,
            "mpim_channels": config.mpim_channels,
            "messages": config.messages,
            "files": config.files,
            "batch_size": config.batch_size,
            "workspace_name": config.workspace_name,
        }),
    );
    meta.insert("plugins".to_string(), json!(registry.plugin_identifiers()));
    meta
}
