//! Theoretical and sampled reach.

use std::f64::consts::PI;

use serde::Serialize;

use armkit_ik::LinkChain;

use crate::sampler::WorkspaceMap;

/// Annulus of end-effector distances from the base.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReachBounds {
    pub min: f64,
    pub max: f64,
}

impl ReachBounds {
    /// Bounds implied by the link geometry alone (see
    /// [`LinkChain::max_reach`] and [`LinkChain::min_reach`]); `[|l1 - l2|,
    /// l1 + l2]` for two revolute links.
    pub fn theoretical(chain: &LinkChain) -> Self {
        Self {
            min: chain.min_reach(),
            max: chain.max_reach(),
        }
    }

    /// Smallest annulus containing every within-limit sample of `map`.
    pub fn sampled(chain: &LinkChain, map: &WorkspaceMap) -> Option<Self> {
        map.within_limits()
            .map(|s| (s.pose.position - chain.base()).norm())
            .fold(None, |acc, d| match acc {
                None => Some(Self { min: d, max: d }),
                Some(b) => Some(Self {
                    min: b.min.min(d),
                    max: b.max.max(d),
                }),
            })
    }

    pub fn contains(&self, distance: f64) -> bool {
        distance >= self.min && distance <= self.max
    }

    /// Planar area of the annulus, `pi * (max^2 - min^2)`.
    pub fn area(&self) -> f64 {
        PI * (self.max * self.max - self.min * self.min)
    }
}

/// How closely a sampled map approaches the theoretical bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundaryAnalysis {
    pub theoretical: ReachBounds,
    /// `None` when the map has no within-limit samples.
    pub sampled: Option<ReachBounds>,
}

impl BoundaryAnalysis {
    pub fn compare(chain: &LinkChain, map: &WorkspaceMap) -> Self {
        Self {
            theoretical: ReachBounds::theoretical(chain),
            sampled: ReachBounds::sampled(chain, map),
        }
    }

    /// `|sampled.min - theoretical.min|`.
    pub fn min_error(&self) -> Option<f64> {
        self.sampled.map(|s| (s.min - self.theoretical.min).abs())
    }

    /// `|sampled.max - theoretical.max|`.
    pub fn max_error(&self) -> Option<f64> {
        self.sampled.map(|s| (s.max - self.theoretical.max).abs())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
