//! Workspace analysis for serial link arms.
//!
//! - [`WorkspaceSampler`] evaluates forward kinematics on a regular joint
//!   grid and collects a [`WorkspaceMap`].
//! - [`manipulability`] measures how well-conditioned a configuration is.
//! - [`ReachBounds`] and [`BoundaryAnalysis`] compare theoretical and sampled
//!   reach.
//! - [`ReachabilityGrid`] marks which Cartesian grid points IK can reach.
//! - [`WorkspaceStatistics`] summarizes a map.
//!
//! With the `parallel` feature, sampling and grid evaluation fan out over
//! rayon's thread pool. Results are identical to the serial path.

pub mod boundary;
pub mod grid;
pub mod manipulability;
pub mod sampler;
pub mod stats;

pub use boundary::{BoundaryAnalysis, ReachBounds};
pub use grid::ReachabilityGrid;
pub use manipulability::{check_singularity, manipulability, singularity};
pub use sampler::{WorkspaceMap, WorkspaceSample, WorkspaceSampler};
pub use stats::{QuadrantCounts, Summary, WorkspaceStatistics};

/// Evaluate `f` for every index in `0..count`, in index order.
#[cfg(feature = "parallel")]
pub(crate) fn map_indices<T, E, F>(count: usize, f: F) -> Result<Vec<T>, E>
where
    T: Send,
    E: Send,
    F: Fn(usize) -> Result<T, E> + Sync + Send,
{
    use rayon::prelude::*;
    (0..count).into_par_iter().map(f).collect()
}

/// Evaluate `f` for every index in `0..count`, in index order.
#[cfg(not(feature = "parallel"))]
pub(crate) fn map_indices<T, E, F>(count: usize, f: F) -> Result<Vec<T>, E>
where
    F: Fn(usize) -> Result<T, E>,
{
    (0..count).map(f).collect()
}
