//! Deterministic RNG utilities for reproducible tests.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use armkit_core::types::Configuration;
use armkit_ik::LinkChain;

/// Create a deterministic `ChaCha8Rng` from a seed.
///
/// All test randomization should go through this to ensure reproducibility.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// A configuration drawn uniformly from the chain's joint limits.
pub fn random_configuration<R: Rng>(chain: &LinkChain, rng: &mut R) -> Configuration {
    chain
        .links()
        .iter()
        .map(|link| rng.gen_range(link.limits.lower..=link.limits.upper))
        .collect::<Vec<_>>()
        .into()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
