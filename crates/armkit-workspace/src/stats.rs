//! Summary statistics over a sampled workspace.

use serde::Serialize;
use tracing::debug;

use armkit_core::error::WorkspaceError;
use armkit_ik::{LinkChain, manipulability_index};
use nalgebra::Vector3;

use crate::boundary::ReachBounds;
use crate::sampler::WorkspaceMap;

/// Mean, population standard deviation and extremes of a set of values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    /// `None` for an empty input.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        let values: Vec<f64> = values.into_iter().collect();
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        Some(Self {
            mean,
            std: variance.sqrt(),
            min,
            max,
        })
    }
}

/// End-effector positions per XY quadrant around the base. Points on an
/// axis count toward the quadrant on the non-negative side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QuadrantCounts {
    pub q1: usize,
    pub q2: usize,
    pub q3: usize,
    pub q4: usize,
}

impl QuadrantCounts {
    /// Quadrant (1 to 4) of an offset from the base.
    pub fn classify(offset: &Vector3<f64>) -> u8 {
        match (offset.x >= 0.0, offset.y >= 0.0) {
            (true, true) => 1,
            (false, true) => 2,
            (false, false) => 3,
            (true, false) => 4,
        }
    }

    pub fn record(&mut self, offset: &Vector3<f64>) {
        match Self::classify(offset) {
            1 => self.q1 += 1,
            2 => self.q2 += 1,
            3 => self.q3 += 1,
            _ => self.q4 += 1,
        }
    }

    pub const fn total(&self) -> usize {
        self.q1 + self.q2 + self.q3 + self.q4
    }
}

/// Aggregate view of a [`WorkspaceMap`]. Everything except `sample_count`
/// is computed over within-limit samples only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceStatistics {
    pub sample_count: usize,
    pub within_limits_count: usize,
    /// Distance from the base to the end effector.
    pub distance: Option<Summary>,
    pub manipulability: Option<Summary>,
    /// Planar area of the theoretical reach annulus.
    pub theoretical_area: f64,
    pub quadrants: QuadrantCounts,
}

impl WorkspaceStatistics {
    pub fn from_map(chain: &LinkChain, map: &WorkspaceMap) -> Result<Self, WorkspaceError> {
        let mut distances = Vec::new();
        let mut manipulability = Vec::new();
        let mut quadrants = QuadrantCounts::default();

        for sample in map.within_limits() {
            let offset = sample.pose.position - chain.base();
            distances.push(offset.norm());
            quadrants.record(&offset);
            manipulability.push(manipulability_index(&chain.jacobian(&sample.configuration)?));
        }

        let stats = Self {
            sample_count: map.len(),
            within_limits_count: distances.len(),
            distance: Summary::from_values(distances),
            manipulability: Summary::from_values(manipulability),
            theoretical_area: ReachBounds::theoretical(chain).area(),
            quadrants,
        };
        debug!(
            samples = stats.sample_count,
            within_limits = stats.within_limits_count,
            "workspace statistics computed"
        );
        Ok(stats)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
