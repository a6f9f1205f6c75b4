//! Closed-form inverse kinematics for planar two-link revolute arms.

use std::f64::consts::TAU;

use armkit_core::config::ElbowPreference;
use armkit_core::error::{Unreachable, UnreachableReason};
use armkit_core::types::{Configuration, JointLimits, JointType, Pose};

use crate::chain::LinkChain;

/// Slack on the reach annulus so boundary targets stay reachable.
const REACH_TOLERANCE: f64 = 1e-9;

/// `|sin(theta2)|` below which the two elbow solutions coincide.
const DEGENERATE_EPS: f64 = 1e-12;

/// Geometric solutions for one target, before limits are applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoLinkSolutions {
    /// Elbow angle >= 0.
    pub up: [f64; 2],
    /// Elbow angle <= 0. `None` when the arm is fully stretched or folded.
    pub down: Option<[f64; 2]>,
}

/// Whether the closed form covers `chain`: two revolute joints turning about
/// +Z.
pub fn applies(chain: &LinkChain) -> bool {
    chain.dof() == 2
        && chain
            .links()
            .iter()
            .all(|l| l.joint_type == JointType::Revolute && l.axis.z > 1.0 - 1e-9)
}

/// Both elbow solutions for `target`, ignoring joint limits.
pub fn solutions(chain: &LinkChain, target: &Pose) -> Result<TwoLinkSolutions, Unreachable> {
    let (l1, l2) = (chain.links()[0].length, chain.links()[1].length);
    let x = target.x() - chain.base().x;
    let y = target.y() - chain.base().y;
    let distance = x.hypot(y);

    let min_reach = (l1 - l2).abs();
    let max_reach = l1 + l2;
    if !distance.is_finite()
        || distance > max_reach + REACH_TOLERANCE
        || distance < min_reach - REACH_TOLERANCE
    {
        return Err(Unreachable::new(
            *target,
            UnreachableReason::OutsideWorkspace {
                distance,
                min_reach,
                max_reach,
            },
        ));
    }

    let cos_elbow = ((distance * distance - l1 * l1 - l2 * l2) / (2.0 * l1 * l2)).clamp(-1.0, 1.0);
    let elbow = cos_elbow.acos();
    let shoulder = |theta2: f64| y.atan2(x) - (l2 * theta2.sin()).atan2(l1 + l2 * theta2.cos());

    let up = [shoulder(elbow), elbow];
    let down = (elbow.sin().abs() > DEGENERATE_EPS).then(|| [shoulder(-elbow), -elbow]);
    Ok(TwoLinkSolutions { up, down })
}

/// Solve `target`, honouring joint limits and the elbow preference.
///
/// `seed` is only consulted for [`ElbowPreference::NearestToSeed`]; ties go
/// to the elbow-up solution.
pub fn solve(
    chain: &LinkChain,
    target: &Pose,
    elbow: ElbowPreference,
    seed: &Configuration,
) -> Result<Configuration, Unreachable> {
    let solutions = solutions(chain, target)?;
    let limits = [chain.links()[0].limits, chain.links()[1].limits];

    let up = fit(solutions.up, &limits);
    let down = solutions.down.and_then(|d| fit(d, &limits));

    let chosen = match (up, down) {
        (Some(u), Some(d)) => match elbow {
            ElbowPreference::Up => u,
            ElbowPreference::Down => d,
            ElbowPreference::NearestToSeed => {
                if distance_sq(&d, seed) < distance_sq(&u, seed) {
                    d
                } else {
                    u
                }
            }
        },
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => {
            return Err(Unreachable::new(*target, UnreachableReason::JointLimits));
        }
    };
    Ok(Configuration::from(chosen))
}

/// Map both angles into their limits, if an equivalent angle fits.
fn fit(angles: [f64; 2], limits: &[JointLimits; 2]) -> Option<[f64; 2]> {
    Some([fit_angle(angles[0], &limits[0])?, fit_angle(angles[1], &limits[1])?])
}

fn fit_angle(angle: f64, limits: &JointLimits) -> Option<f64> {
    if limits.contains(angle) {
        return Some(angle);
    }
    let wrapped = limits.lower + (angle - limits.lower).rem_euclid(TAU);
    limits.contains(wrapped).then_some(wrapped)
}

fn distance_sq(candidate: &[f64; 2], seed: &Configuration) -> f64 {
    candidate
        .iter()
        .zip(seed)
        .map(|(a, b)| (a - b) * (a - b))
        .sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
