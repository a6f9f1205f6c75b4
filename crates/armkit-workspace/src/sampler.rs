//! Joint-space sampling of the reachable workspace.
//!
//! Each joint's range is split into `resolution` evenly spaced values
//! (endpoints included) and the Cartesian product is walked in odometer
//! order, first joint slowest. Sample `i` decodes to the same configuration
//! whether evaluated serially or in parallel, so the resulting map is
//! identical either way.

use std::f64::consts::PI;

use serde::Serialize;
use tracing::debug;

use armkit_core::config::{SamplerConfig, SamplingDomain};
use armkit_core::error::WorkspaceError;
use armkit_core::types::{Configuration, JointType, Pose};
use armkit_ik::LinkChain;

/// One evaluated configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceSample {
    pub configuration: Configuration,
    pub pose: Pose,
    /// False only for full-range samples outside the chain's limits.
    pub within_limits: bool,
}

/// Immutable result of a sampling run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceMap {
    resolution: usize,
    domain: SamplingDomain,
    samples: Vec<WorkspaceSample>,
}

impl WorkspaceMap {
    pub const fn resolution(&self) -> usize {
        self.resolution
    }

    pub const fn domain(&self) -> SamplingDomain {
        self.domain
    }

    pub fn samples(&self) -> &[WorkspaceSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples the chain can actually reach.
    pub fn within_limits(&self) -> impl Iterator<Item = &WorkspaceSample> {
        self.samples.iter().filter(|s| s.within_limits)
    }
}

/// Samples a chain's workspace on a regular joint grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkspaceSampler {
    domain: SamplingDomain,
    max_samples: u64,
}

impl Default for WorkspaceSampler {
    fn default() -> Self {
        Self::from_config(&SamplerConfig::default())
    }
}

impl WorkspaceSampler {
    pub const fn new(domain: SamplingDomain, max_samples: u64) -> Self {
        Self {
            domain,
            max_samples,
        }
    }

    pub const fn from_config(config: &SamplerConfig) -> Self {
        Self::new(config.domain, config.max_samples)
    }

    pub const fn domain(&self) -> SamplingDomain {
        self.domain
    }

    /// Evaluate `resolution ^ dof` configurations.
    ///
    /// Rejects `resolution < 2` and requests above the sample limit before
    /// doing any work.
    pub fn sample(
        &self,
        chain: &LinkChain,
        resolution: usize,
    ) -> Result<WorkspaceMap, WorkspaceError> {
        if resolution < 2 {
            return Err(WorkspaceError::InvalidResolution(resolution));
        }
        let requested = u32::try_from(chain.dof())
            .ok()
            .and_then(|dof| (resolution as u128).checked_pow(dof))
            .unwrap_or(u128::MAX);
        let too_many = WorkspaceError::TooManySamples {
            requested,
            limit: self.max_samples,
        };
        if requested > u128::from(self.max_samples) {
            return Err(too_many);
        }
        let count = usize::try_from(requested).map_err(|_| too_many)?;

        let ranges = self.joint_ranges(chain);
        let samples = crate::map_indices(count, |index| -> Result<_, WorkspaceError> {
            let configuration = decode(index, resolution, &ranges);
            let frames = chain.joint_frames(&configuration)?;
            Ok(WorkspaceSample {
                within_limits: chain.validate(&configuration).is_ok(),
                pose: Pose::from_isometry(&frames.end_effector),
                configuration,
            })
        })?;

        debug!(resolution, samples = samples.len(), "workspace sampled");
        Ok(WorkspaceMap {
            resolution,
            domain: self.domain,
            samples,
        })
    }

    fn joint_ranges(&self, chain: &LinkChain) -> Vec<(f64, f64)> {
        chain
            .links()
            .iter()
            .map(|link| match (self.domain, link.joint_type) {
                (SamplingDomain::FullRange, JointType::Revolute) => (-PI, PI),
                _ => (link.limits.lower, link.limits.upper),
            })
            .collect()
    }
}

/// Configuration number `index` of the odometer walk.
#[allow(clippy::cast_precision_loss)]
fn decode(index: usize, resolution: usize, ranges: &[(f64, f64)]) -> Configuration {
    let last = resolution - 1;
    let mut values = vec![0.0; ranges.len()];
    let mut rest = index;
    for (value, &(lo, hi)) in values.iter_mut().zip(ranges).rev() {
        let k = rest % resolution;
        rest /= resolution;
        *value = if k == last {
            hi
        } else {
            lo + (hi - lo) * k as f64 / last as f64
        };
    }
    values.into()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use armkit_core::types::{JointLimits, Link};

    fn two_link() -> LinkChain {
        LinkChain::new(vec![Link::revolute(3.0), Link::revolute(2.0)]).unwrap()
    }

    #[test]
    fn sample_count_is_resolution_pow_dof() {
        let map = WorkspaceSampler::default().sample(&two_link(), 7).unwrap();
        assert_eq!(map.len(), 49);
        assert_eq!(map.resolution(), 7);
        assert_eq!(map.domain(), SamplingDomain::JointLimits);
    }

    #[test]
    fn odometer_order_first_joint_slowest() {
        let map = WorkspaceSampler::default().sample(&two_link(), 3).unwrap();
        let q: Vec<Vec<f64>> = map
            .samples()
            .iter()
            .map(|s| s.configuration.as_slice().to_vec())
            .collect();
        assert_eq!(q[0], vec![-PI, -PI]);
        assert_eq!(q[1], vec![-PI, 0.0]);
        assert_eq!(q[2], vec![-PI, PI]);
        assert_eq!(q[3], vec![0.0, -PI]);
        assert_eq!(q[8], vec![PI, PI]);
    }

    #[test]
    fn poses_match_forward_kinematics() {
        let chain = two_link();
        let map = WorkspaceSampler::default().sample(&chain, 5).unwrap();
        for sample in map.samples() {
            let pose = chain.forward_kinematics(&sample.configuration).unwrap();
            assert_relative_eq!(sample.pose.position, pose.position, epsilon = 1e-12);
        }
    }

    #[test]
    fn resolution_below_two_rejected() {
        let sampler = WorkspaceSampler::default();
        assert_eq!(
            sampler.sample(&two_link(), 1),
            Err(WorkspaceError::InvalidResolution(1))
        );
        assert_eq!(
            sampler.sample(&two_link(), 0),
            Err(WorkspaceError::InvalidResolution(0))
        );
    }

    #[test]
    fn oversized_request_rejected() {
        let sampler = WorkspaceSampler::new(SamplingDomain::JointLimits, 1000);
        assert_eq!(
            sampler.sample(&two_link(), 32),
            Err(WorkspaceError::TooManySamples {
                requested: 1024,
                limit: 1000
            })
        );
        assert!(sampler.sample(&two_link(), 31).is_ok());
    }

    #[test]
    fn full_range_flags_samples_outside_limits() {
        let chain = LinkChain::new(vec![
            Link::revolute(3.0).with_limits(-1.0, 1.0),
            Link::revolute(2.0),
        ])
        .unwrap();
        let limited = WorkspaceSampler::default().sample(&chain, 5).unwrap();
        assert!(limited.samples().iter().all(|s| s.within_limits));

        let full = WorkspaceSampler::new(SamplingDomain::FullRange, 1_000)
            .sample(&chain, 5)
            .unwrap();
        assert_eq!(full.len(), 25);
        // First joint at -pi, -pi/2, 0, pi/2, pi: only 0 is inside [-1, 1].
        assert_eq!(full.within_limits().count(), 5);
    }

    #[test]
    fn prismatic_joint_sampled_over_limits_in_full_range() {
        let chain = LinkChain::new(vec![
            Link::revolute(1.0),
            Link::prismatic(1.0, JointLimits::new(0.0, 0.5)),
        ])
        .unwrap();
        let map = WorkspaceSampler::new(SamplingDomain::FullRange, 100)
            .sample(&chain, 3)
            .unwrap();
        assert!(map.samples().iter().all(|s| s.within_limits));
        assert_relative_eq!(map.samples()[2].configuration[1], 0.5);
    }
}
