//! Shared test fixtures and utilities for armkit crates.
//!
//! Provides the reference arms used across the test suites and
//! deterministic RNG setup.

pub mod fixtures;
pub mod rng;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use fixtures::{jcb_arm, spatial_arm, three_link_chain, two_link_chain};
pub use rng::{random_configuration, seeded_rng};
