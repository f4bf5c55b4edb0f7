//! Shared generation state.

use rand::rngs::StdRng;
use rand::SeedableRng;
use synth_core::{GenerationConfig, IdAllocator, WorkspaceFingerprint};

/// Seconds in one day.
pub const DAY: i64 = 86_400;

/// Everything the generation stages share: the validated configuration,
/// the derived fingerprint, the identifier allocator and the dataset
/// time anchor.
pub struct GenerationContext {
    config: GenerationConfig,
    fingerprint: WorkspaceFingerprint,
    ids: IdAllocator,
    base_ts: i64,
}

impl GenerationContext {
    pub fn new(config: GenerationConfig) -> Self {
        let fingerprint = WorkspaceFingerprint::derive(&config);
        let ids = IdAllocator::new(fingerprint.clone());
        // Anchor the dataset timeline off the seed instead of the wall
        // clock so identical runs agree on every timestamp.
        let base_ts = 1_700_000_000 + (config.seed % 10_000) as i64 * 100;
        Self {
            config,
            fingerprint,
            ids,
            base_ts,
        }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn fingerprint(&self) -> &WorkspaceFingerprint {
        &self.fingerprint
    }

    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    /// Newest instant of the dataset timeline, in unix seconds.
    pub fn base_ts(&self) -> i64 {
        self.base_ts
    }

    /// Fresh RNG for a named value stream.
    pub fn rng(&self, stream: &str) -> StdRng {
        StdRng::seed_from_u64(self.fingerprint.substream_seed(stream))
    }
}
