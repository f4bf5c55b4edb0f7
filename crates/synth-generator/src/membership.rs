//! Channel membership planning.
//!
//! Membership is decided for every channel before any message or file is
//! generated, so content stages can restrict authors and uploaders to
//! actual members. Users are referred to by index into the user sequence;
//! the resulting ids are recovered through the pure id allocator.

use crate::context::GenerationContext;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Above this many possible pairs, direct-conversation sampling switches
/// from enumerate-and-shuffle to rejection sampling.
const DENSE_PAIR_LIMIT: u64 = 2_000_000;

/// Planned member sets for every channel of the run, in channel creation
/// order: named channels first, then ims, then mpims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipPlan {
    /// Member indices per named channel.
    pub named: Vec<Vec<u32>>,
    /// One distinct user pair per created im.
    pub im_pairs: Vec<[u32; 2]>,
    /// Ims requested but not created for lack of distinct pairs.
    pub im_shortfall: u64,
    /// Member indices per created mpim.
    pub mpim_groups: Vec<Vec<u32>>,
    /// Mpims requested but not created.
    pub mpim_shortfall: u64,
}

impl MembershipPlan {
    /// Total membership edges across every channel.
    pub fn total_edges(&self) -> u64 {
        self.named.iter().map(|m| m.len() as u64).sum::<u64>()
            + self.im_pairs.len() as u64 * 2
            + self.mpim_groups.iter().map(|m| m.len() as u64).sum::<u64>()
    }

    /// Member lists for all channels in creation order.
    pub fn into_channel_members(self) -> Vec<Vec<u32>> {
        let mut all = self.named;
        all.extend(self.im_pairs.iter().map(|pair| pair.to_vec()));
        all.extend(self.mpim_groups);
        all
    }
}

/// Plan membership for every channel the configuration requests.
///
/// Named channels always hit their sampled size, clamped to the user
/// pool. Conversation channels are clamped to the number of distinct
/// member sets the pool can supply; the shortfall is reported, never an
/// error.
pub fn plan_membership(ctx: &GenerationContext) -> MembershipPlan {
    let config = ctx.config();
    let users = config.users;
    let mut rng = ctx.rng("membership");

    let mut named = Vec::with_capacity(config.channels as usize);
    for _ in 0..config.channels {
        let span = rng.gen_range(config.channel_members_min..=config.channel_members_max) as u64;
        let size = span.min(users) as usize;
        let mut members = sample_distinct(&mut rng, users, size);
        members.sort_unstable();
        named.push(members);
    }

    let capacity = pair_capacity(users);
    let im_target = config.im_channels.min(capacity);
    let im_pairs = if capacity <= DENSE_PAIR_LIMIT {
        sample_pairs_dense(&mut rng, users as u32, im_target as usize)
    } else {
        sample_pairs_sparse(&mut rng, users as u32, im_target as usize)
    };
    let im_shortfall = config.im_channels - im_pairs.len() as u64;

    let mut mpim_groups: Vec<Vec<u32>> = Vec::new();
    let mut mpim_shortfall = config.mpim_channels;
    if users >= 3 && config.mpim_channels > 0 {
        let mut seen: HashSet<Vec<u32>> = HashSet::new();
        let mut attempts = config.mpim_channels.saturating_mul(20).saturating_add(200);
        while (mpim_groups.len() as u64) < config.mpim_channels && attempts > 0 {
            attempts -= 1;
            let span = rng.gen_range(config.mpim_members_min..=config.mpim_members_max) as u64;
            let size = span.min(users) as usize;
            let mut members = sample_distinct(&mut rng, users, size);
            members.sort_unstable();
            if seen.insert(members.clone()) {
                mpim_groups.push(members);
            }
        }
        mpim_shortfall = config.mpim_channels - mpim_groups.len() as u64;
    }

    MembershipPlan {
        named,
        im_pairs,
        im_shortfall,
        mpim_groups,
        mpim_shortfall,
    }
}

fn sample_distinct<R: Rng>(rng: &mut R, population: u64, amount: usize) -> Vec<u32> {
    rand::seq::index::sample(rng, population as usize, amount)
        .into_iter()
        .map(|i| i as u32)
        .collect()
}

fn pair_capacity(users: u64) -> u64 {
    let n = users as u128;
    let pairs = n * n.saturating_sub(1) / 2;
    pairs.min(u64::MAX as u128) as u64
}

fn sample_pairs_dense<R: Rng>(rng: &mut R, users: u32, amount: usize) -> Vec<[u32; 2]> {
    let mut all = Vec::new();
    for a in 0..users {
        for b in (a + 1)..users {
            all.push([a, b]);
        }
    }
    all.shuffle(rng);
    all.truncate(amount);
    all
}

fn sample_pairs_sparse<R: Rng>(rng: &mut R, users: u32, amount: usize) -> Vec<[u32; 2]> {
    let mut seen = HashSet::with_capacity(amount);
    let mut pairs = Vec::with_capacity(amount);
    while pairs.len() < amount {
        let a = rng.gen_range(0..users);
        let b = rng.gen_range(0..users);
        if a == b {
            continue;
        }
        let pair = [a.min(b), a.max(b)];
        if seen.insert(pair) {
            pairs.push(pair);
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use synth_core::GenerationConfig;

    fn ctx_with(config: GenerationConfig) -> GenerationContext {
        GenerationContext::new(config)
    }

    #[test]
    fn test_named_sizes_respect_bounds() {
        let ctx = ctx_with(GenerationConfig {
            users: 50,
            channels: 30,
            channel_members_min: 5,
            channel_members_max: 12,
            ..Default::default()
        });
        let plan = plan_membership(&ctx);
        assert_eq!(plan.named.len(), 30);
        for members in &plan.named {
            assert!((5..=12).contains(&members.len()));
            assert!(members.windows(2).all(|w| w[0] < w[1]), "sorted unique");
            assert!(members.iter().all(|&m| m < 50));
        }
    }

    #[test]
    fn test_named_sizes_clamp_to_user_pool() {
        let ctx = ctx_with(GenerationConfig {
            users: 3,
            channels: 4,
            ..Default::default()
        });
        let plan = plan_membership(&ctx);
        for members in &plan.named {
            assert_eq!(members.len(), 3);
        }
    }

    #[test]
    fn test_im_pairs_clamp_to_capacity() {
        // 20 users allow 190 distinct pairs.
        let ctx = ctx_with(GenerationConfig {
            users: 20,
            im_channels: 500,
            ..Default::default()
        });
        let plan = plan_membership(&ctx);
        assert_eq!(plan.im_pairs.len(), 190);
        assert_eq!(plan.im_shortfall, 310);

        let unique: HashSet<[u32; 2]> = plan.im_pairs.iter().copied().collect();
        assert_eq!(unique.len(), 190);
        assert!(plan.im_pairs.iter().all(|p| p[0] < p[1]));
    }

    #[test]
    fn test_im_pairs_sparse_path_is_distinct() {
        // Capacity far above the dense limit forces rejection sampling.
        let ctx = ctx_with(GenerationConfig {
            users: 10_000,
            im_channels: 250,
            ..Default::default()
        });
        let plan = plan_membership(&ctx);
        assert_eq!(plan.im_pairs.len(), 250);
        assert_eq!(plan.im_shortfall, 0);
        let unique: HashSet<[u32; 2]> = plan.im_pairs.iter().copied().collect();
        assert_eq!(unique.len(), 250);
    }

    #[test]
    fn test_mpim_needs_three_users() {
        let ctx = ctx_with(GenerationConfig {
            users: 2,
            mpim_channels: 8,
            ..Default::default()
        });
        let plan = plan_membership(&ctx);
        assert!(plan.mpim_groups.is_empty());
        assert_eq!(plan.mpim_shortfall, 8);
    }

    #[test]
    fn test_mpim_groups_are_distinct_sets() {
        // 4 users can form at most 5 distinct groups of size >= 3.
        let ctx = ctx_with(GenerationConfig {
            users: 4,
            mpim_channels: 20,
            ..Default::default()
        });
        let plan = plan_membership(&ctx);
        assert!(!plan.mpim_groups.is_empty());
        assert!(plan.mpim_groups.len() <= 5);
        assert_eq!(
            plan.mpim_groups.len() as u64 + plan.mpim_shortfall,
            20
        );
        let unique: HashSet<Vec<u32>> = plan.mpim_groups.iter().cloned().collect();
        assert_eq!(unique.len(), plan.mpim_groups.len());
        for group in &plan.mpim_groups {
            assert!(group.len() >= 3);
        }
    }

    #[test]
    fn test_plan_is_deterministic() {
        let config = GenerationConfig {
            users: 40,
            channels: 10,
            im_channels: 15,
            mpim_channels: 5,
            ..Default::default()
        };
        let a = plan_membership(&ctx_with(config.clone()));
        let b = plan_membership(&ctx_with(config));
        assert_eq!(a, b);
    }

    #[test]
    fn test_edge_count_matches_lists() {
        let ctx = ctx_with(GenerationConfig {
            users: 30,
            channels: 6,
            im_channels: 10,
            mpim_channels: 3,
            ..Default::default()
        });
        let plan = plan_membership(&ctx);
        let total = plan.total_edges();
        let flattened: u64 = plan
            .clone()
            .into_channel_members()
            .iter()
            .map(|m| m.len() as u64)
            .sum();
        assert_eq!(total, flattened);
    }
}
