//! Cartesian reachability grid.
//!
//! Every point of a regular XY grid (at the base's height) is handed to the
//! IK solver; a cell is reachable when a solution exists.

use serde::Serialize;
use tracing::debug;

use armkit_core::error::{KinematicsError, WorkspaceError};
use armkit_core::types::Pose;
use armkit_ik::{IkSolver, LinkChain};

/// Largest grid [`ReachabilityGrid::compute`] accepts.
pub const MAX_CELLS: u64 = 4_000_000;

/// Row-major reachability flags: row `r` is `ys[r]`, column `c` is `xs[c]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReachabilityGrid {
    xs: Vec<f64>,
    ys: Vec<f64>,
    reachable: Vec<bool>,
}

impl ReachabilityGrid {
    /// Evaluate `x_range x y_range` every `spacing` units, both ends
    /// included when they fall on the grid.
    pub fn compute(
        chain: &LinkChain,
        solver: &IkSolver,
        x_range: (f64, f64),
        y_range: (f64, f64),
        spacing: f64,
    ) -> Result<Self, WorkspaceError> {
        let xs = axis_values(x_range, spacing)?;
        let ys = axis_values(y_range, spacing)?;

        let requested = (xs.len() as u128) * (ys.len() as u128);
        if requested > u128::from(MAX_CELLS) {
            return Err(WorkspaceError::TooManySamples {
                requested,
                limit: MAX_CELLS,
            });
        }

        let z = chain.base().z;
        let reachable = crate::map_indices(xs.len() * ys.len(), |index| {
            let target = Pose::new(xs[index % xs.len()], ys[index / xs.len()], z);
            match solver.solve(chain, &target, None) {
                Ok(_) => Ok(true),
                Err(KinematicsError::Unreachable(_)) => Ok(false),
                Err(KinematicsError::InvalidConfiguration(e)) => {
                    Err(WorkspaceError::InvalidConfiguration(e))
                }
            }
        })?;

        let grid = Self { xs, ys, reachable };
        debug!(
            cells = grid.len(),
            reachable = grid.reachable_count(),
            "reachability grid computed"
        );
        Ok(grid)
    }

    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    pub fn len(&self) -> usize {
        self.reachable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reachable.is_empty()
    }

    pub fn is_reachable(&self, row: usize, col: usize) -> Option<bool> {
        if col >= self.xs.len() {
            return None;
        }
        self.reachable.get(row * self.xs.len() + col).copied()
    }

    pub fn reachable_count(&self) -> usize {
        self.reachable.iter().filter(|&&r| r).count()
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn reachable_fraction(&self) -> f64 {
        self.reachable_count() as f64 / self.len() as f64
    }

    /// `(x, y, reachable)` for every cell, row by row.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, bool)> + '_ {
        self.reachable
            .iter()
            .enumerate()
            .map(|(i, &r)| (self.xs[i % self.xs.len()], self.ys[i / self.xs.len()], r))
    }
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn axis_values((min, max): (f64, f64), spacing: f64) -> Result<Vec<f64>, WorkspaceError> {
    let valid = min.is_finite()
        && max.is_finite()
        && min <= max
        && spacing.is_finite()
        && spacing > 0.0;
    if !valid {
        return Err(WorkspaceError::InvalidGrid { min, max, spacing });
    }
    let steps = ((max - min) / spacing + 1e-9).floor();
    if steps > MAX_CELLS as f64 {
        return Err(WorkspaceError::TooManySamples {
            requested: steps as u128 + 1,
            limit: MAX_CELLS,
        });
    }
    Ok((0..=steps as usize)
        .map(|k| min + spacing * k as f64)
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
