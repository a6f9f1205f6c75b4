//! Joint-space trajectory planning.
//!
//! Every joint moves independently from its start to its end value along a
//! shared time-scaling profile `s(t)`, `t` in `[0, 1]`:
//!
//! ```text
//! q_i(t) = a_i + (b_i - a_i) * s(t)
//! ```
//!
//! Trajectories are finite lists of configurations; entry `k` of an
//! `n`-entry trajectory sits at normalized time `k / (n - 1)`.

use std::f64::consts::PI;

use serde::Serialize;

use armkit_core::config::{PlannerConfig, Profile};
use armkit_core::error::{ConfigurationError, PlanError};
use armkit_core::types::Configuration;
use armkit_ik::LinkChain;

/// Evaluate the profile at normalized time `t`.
fn profile_value(profile: Profile, t: f64) -> f64 {
    match profile {
        Profile::Cosine => 0.5 * (1.0 - (PI * t).cos()),
        Profile::Linear => t,
        Profile::Cubic => t * t * (3.0 - 2.0 * t),
    }
}

// ---------------------------------------------------------------------------
// Trajectory
// ---------------------------------------------------------------------------

/// Ordered configurations from start to end (at least two).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Trajectory {
    configurations: Vec<Configuration>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    /// Always `false`; kept alongside [`len`](Self::len).
    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Configuration> {
        self.configurations.get(index)
    }

    pub fn first(&self) -> &Configuration {
        &self.configurations[0]
    }

    pub fn last(&self) -> &Configuration {
        &self.configurations[self.configurations.len() - 1]
    }

    pub fn configurations(&self) -> &[Configuration] {
        &self.configurations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Configuration> {
        self.configurations.iter()
    }

    /// Normalized time of entry `index`.
    #[allow(clippy::cast_precision_loss)]
    pub fn time_at(&self, index: usize) -> Option<f64> {
        (index < self.len()).then(|| index as f64 / (self.len() - 1) as f64)
    }

    /// Configuration at normalized time `t` (clamped to `[0, 1]`), linearly
    /// interpolated between neighbouring entries.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn sample(&self, t: f64) -> Configuration {
        let segments = (self.len() - 1) as f64;
        let position = t.clamp(0.0, 1.0) * segments;
        let lower = (position.floor() as usize).min(self.len() - 2);
        let frac = position - lower as f64;

        let a = &self.configurations[lower];
        let b = &self.configurations[lower + 1];
        a.iter()
            .zip(b)
            .map(|(x, y)| x + (y - x) * frac)
            .collect::<Vec<_>>()
            .into()
    }

    /// Consume the trajectory one configuration at a time.
    pub fn into_cursor(self) -> TrajectoryCursor {
        TrajectoryCursor {
            trajectory: self,
            next: 0,
        }
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a Configuration;
    type IntoIter = std::slice::Iter<'a, Configuration>;
    fn into_iter(self) -> Self::IntoIter {
        self.configurations.iter()
    }
}

// ---------------------------------------------------------------------------
// TrajectoryCursor
// ---------------------------------------------------------------------------

/// Position within a trajectory that is being executed.
#[derive(Debug, Clone)]
pub struct TrajectoryCursor {
    trajectory: Trajectory,
    next: usize,
}

impl TrajectoryCursor {
    pub const fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// Configurations consumed so far.
    pub const fn consumed(&self) -> usize {
        self.next
    }

    pub fn remaining(&self) -> usize {
        self.trajectory.len() - self.next
    }

    /// True once the final configuration has been consumed.
    pub fn is_complete(&self) -> bool {
        self.next >= self.trajectory.len()
    }
}

impl Iterator for TrajectoryCursor {
    type Item = Configuration;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.trajectory.get(self.next).cloned()?;
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining(), Some(self.remaining()))
    }
}

impl ExactSizeIterator for TrajectoryCursor {}

// ---------------------------------------------------------------------------
// TrajectoryPlanner
// ---------------------------------------------------------------------------

/// Builds joint-space trajectories with a fixed profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrajectoryPlanner {
    profile: Profile,
}

impl TrajectoryPlanner {
    pub const fn new(profile: Profile) -> Self {
        Self { profile }
    }

    pub const fn from_config(config: &PlannerConfig) -> Self {
        Self::new(config.profile)
    }

    pub const fn profile(&self) -> Profile {
        self.profile
    }

    /// Plan `steps` configurations from `start` to `end`.
    ///
    /// The first entry equals `start` and the last equals `end` exactly;
    /// intermediate values never leave `[min(a, b), max(a, b)]` per joint.
    #[allow(clippy::cast_precision_loss)]
    pub fn plan(
        &self,
        start: &Configuration,
        end: &Configuration,
        steps: usize,
    ) -> Result<Trajectory, PlanError> {
        if steps < 2 {
            return Err(PlanError::InvalidStepCount(steps));
        }
        if start.len() != end.len() {
            return Err(ConfigurationError::LengthMismatch {
                expected: start.len(),
                got: end.len(),
            }
            .into());
        }
        if let Some(joint) = start.first_non_finite().or_else(|| end.first_non_finite()) {
            return Err(ConfigurationError::NonFinite { joint }.into());
        }

        let last = steps - 1;
        let configurations = (0..steps)
            .map(|k| {
                if k == 0 {
                    return start.clone();
                }
                if k == last {
                    return end.clone();
                }
                let s = profile_value(self.profile, k as f64 / last as f64);
                start
                    .iter()
                    .zip(end)
                    .map(|(&a, &b)| (a + (b - a) * s).clamp(a.min(b), a.max(b)))
                    .collect::<Vec<_>>()
                    .into()
            })
            .collect();
        Ok(Trajectory { configurations })
    }

    /// [`plan`](Self::plan) after checking both endpoints against `chain`.
    pub fn plan_checked(
        &self,
        chain: &LinkChain,
        start: &Configuration,
        end: &Configuration,
        steps: usize,
    ) -> Result<Trajectory, PlanError> {
        chain.validate(start)?;
        chain.validate(end)?;
        self.plan(start, end, steps)
    }

    /// Chain segments through `waypoints`, `steps_per_segment` entries each.
    /// The shared configuration at each junction appears once.
    pub fn plan_waypoints(
        &self,
        waypoints: &[Configuration],
        steps_per_segment: usize,
    ) -> Result<Trajectory, PlanError> {
        if waypoints.len() < 2 {
            return Err(PlanError::TooFewWaypoints(waypoints.len()));
        }
        let mut configurations = Vec::new();
        for pair in waypoints.windows(2) {
            let segment = self.plan(&pair[0], &pair[1], steps_per_segment)?;
            let skip = usize::from(!configurations.is_empty());
            configurations.extend(segment.configurations.into_iter().skip(skip));
        }
        Ok(Trajectory { configurations })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use super::*;
    use approx::assert_relative_eq;
    use armkit_core::types::Link;

    fn quarter_turn() -> (Configuration, Configuration) {
        (
            Configuration::from([0.0, 0.0]),
            Configuration::from([FRAC_PI_2, -FRAC_PI_2]),
        )
    }

    #[test]
    fn ten_step_plan_has_exact_endpoints() {
        let (start, end) = quarter_turn();
        let traj = TrajectoryPlanner::default().plan(&start, &end, 10).unwrap();
        assert_eq!(traj.len(), 10);
        assert_eq!(traj.first(), &start);
        assert_eq!(traj.last(), &end);
    }

    #[test]
    fn joints_move_monotonically() {
        let (start, end) = quarter_turn();
        for profile in [Profile::Cosine, Profile::Linear, Profile::Cubic] {
            let traj = TrajectoryPlanner::new(profile).plan(&start, &end, 10).unwrap();
            for pair in traj.configurations().windows(2) {
                assert!(pair[1][0] >= pair[0][0], "{profile:?}");
                assert!(pair[1][1] <= pair[0][1], "{profile:?}");
            }
        }
    }

    #[test]
    fn cosine_profile_midpoint_and_ends() {
        assert_relative_eq!(profile_value(Profile::Cosine, 0.0), 0.0);
        assert_relative_eq!(profile_value(Profile::Cosine, 0.5), 0.5, epsilon = 1e-12);
        assert_relative_eq!(profile_value(Profile::Cosine, 1.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(profile_value(Profile::Cubic, 0.5), 0.5);
        assert_relative_eq!(profile_value(Profile::Linear, 0.25), 0.25);
    }

    #[test]
    fn linear_profile_is_evenly_spaced() {
        let traj = TrajectoryPlanner::new(Profile::Linear)
            .plan(&[0.0].into(), &[3.0].into(), 4)
            .unwrap();
        for (q, expected) in traj.iter().zip([0.0, 1.0, 2.0, 3.0]) {
            assert_relative_eq!(q[0], expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn invalid_step_count() {
        let (start, end) = quarter_turn();
        let planner = TrajectoryPlanner::default();
        assert_eq!(
            planner.plan(&start, &end, 1),
            Err(PlanError::InvalidStepCount(1))
        );
        assert_eq!(
            planner.plan(&start, &end, 0),
            Err(PlanError::InvalidStepCount(0))
        );
    }

    #[test]
    fn mismatched_lengths_rejected() {
        let err = TrajectoryPlanner::default()
            .plan(&Configuration::zeros(2), &Configuration::zeros(3), 5)
            .unwrap_err();
        assert_eq!(
            err,
            PlanError::InvalidConfiguration(ConfigurationError::LengthMismatch {
                expected: 2,
                got: 3
            })
        );
    }

    #[test]
    fn non_finite_rejected() {
        let err = TrajectoryPlanner::default()
            .plan(&Configuration::zeros(2), &[0.0, f64::NAN].into(), 5)
            .unwrap_err();
        assert_eq!(
            err,
            PlanError::InvalidConfiguration(ConfigurationError::NonFinite { joint: 1 })
        );
    }

    #[test]
    fn plan_checked_validates_limits() {
        let chain = LinkChain::new(vec![Link::revolute(1.0).with_limits(-1.0, 1.0)]).unwrap();
        let planner = TrajectoryPlanner::default();
        assert!(planner.plan_checked(&chain, &[0.0].into(), &[1.0].into(), 5).is_ok());
        assert!(matches!(
            planner.plan_checked(&chain, &[0.0].into(), &[2.0].into(), 5),
            Err(PlanError::InvalidConfiguration(ConfigurationError::OutOfLimits { .. }))
        ));
    }

    #[test]
    fn identical_endpoints_stay_put() {
        let q = Configuration::from([0.3, -0.2]);
        let traj = TrajectoryPlanner::default().plan(&q, &q, 5).unwrap();
        assert!(traj.iter().all(|c| c == &q));
    }

    #[test]
    fn time_and_sample() {
        let traj = TrajectoryPlanner::new(Profile::Linear)
            .plan(&[0.0].into(), &[2.0].into(), 3)
            .unwrap();
        assert_eq!(traj.time_at(0), Some(0.0));
        assert_eq!(traj.time_at(1), Some(0.5));
        assert_eq!(traj.time_at(2), Some(1.0));
        assert_eq!(traj.time_at(3), None);
        assert_relative_eq!(traj.sample(0.25)[0], 0.5);
        assert_relative_eq!(traj.sample(1.0)[0], 2.0);
        assert_relative_eq!(traj.sample(-1.0)[0], 0.0);
    }

    #[test]
    fn waypoints_drop_duplicate_junctions() {
        let waypoints = [
            Configuration::from([0.0]),
            Configuration::from([1.0]),
            Configuration::from([-1.0]),
        ];
        let traj = TrajectoryPlanner::new(Profile::Linear)
            .plan_waypoints(&waypoints, 3)
            .unwrap();
        let values: Vec<f64> = traj.iter().map(|q| q[0]).collect();
        assert_eq!(values, vec![0.0, 0.5, 1.0, 0.0, -1.0]);

        assert_eq!(
            TrajectoryPlanner::default().plan_waypoints(&waypoints[..1], 3),
            Err(PlanError::TooFewWaypoints(1))
        );
    }

    #[test]
    fn cursor_consumes_in_order() {
        let traj = TrajectoryPlanner::new(Profile::Linear)
            .plan(&[0.0].into(), &[1.0].into(), 3)
            .unwrap();
        let mut cursor = traj.into_cursor();
        assert_eq!(cursor.len(), 3);
        assert!(!cursor.is_complete());
        assert_eq!(cursor.next(), Some(Configuration::from([0.0])));
        assert_eq!(cursor.next(), Some(Configuration::from([0.5])));
        assert!(!cursor.is_complete());
        assert_eq!(cursor.next(), Some(Configuration::from([1.0])));
        assert!(cursor.is_complete());
        assert_eq!(cursor.next(), None);
        assert_eq!(cursor.consumed(), 3);
    }
}
