//! Iterative IK: damped least squares (Levenberg-Marquardt) or Jacobian
//! transpose.
//!
//! Iteratively moves the joints so the end effector approaches a target,
//! using the position Jacobian of the chain (plus orientation rows for
//! full-pose targets).

use std::f64::consts::{PI, TAU};

use nalgebra::{DMatrix, DVector, UnitQuaternion, Vector3};
use tracing::trace;

use armkit_core::config::{IkMethod, SolverConfig};
use armkit_core::types::{Configuration, JointType, Pose};

use crate::chain::{JointFrames, LinkChain};

/// Orientation tolerance (radians) for full-pose targets.
const ANGLE_TOLERANCE: f64 = 1e-3;

/// Largest joint change below which an iteration counts as stalled.
const STALL_EPS: f64 = 1e-12;

/// What the solver should target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IkTarget {
    /// End-effector position only.
    Position(Vector3<f64>),
    /// Position and orientation. Planar chains only control yaw.
    Pose(Pose),
}

impl IkTarget {
    pub const fn position(&self) -> &Vector3<f64> {
        match self {
            Self::Position(p) => p,
            Self::Pose(pose) => &pose.position,
        }
    }

    /// The target as a pose (identity orientation for position targets).
    pub fn pose(&self) -> Pose {
        match self {
            Self::Position(p) => Pose::from_position(*p),
            Self::Pose(pose) => *pose,
        }
    }
}

impl From<Pose> for IkTarget {
    fn from(pose: Pose) -> Self {
        Self::Position(pose.position)
    }
}

/// Outcome of an iterative solve.
#[derive(Debug, Clone)]
pub struct IterativeResult {
    /// Final joint values; the best iterate seen when not converged.
    pub configuration: Configuration,
    /// Whether the solver converged within tolerance.
    pub converged: bool,
    /// Number of iterations used.
    pub iterations: u32,
    /// Position error of `configuration`.
    pub position_error: f64,
    /// Orientation error of `configuration` (radians). Zero for position
    /// targets.
    pub orientation_error: f64,
}

/// Numerical solver for chains without a closed form.
#[derive(Debug, Clone)]
pub struct IterativeSolver {
    config: SolverConfig,
}

impl IterativeSolver {
    pub const fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(SolverConfig::default())
    }

    pub const fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve from `seed`, which must have one finite value per joint.
    ///
    /// Every step is scaled so no joint moves more than `max_step`, then
    /// projected back into the limits. A step that leaves the joints where
    /// they are is replaced by one fixed nudge; a second stall in a row ends
    /// the solve early.
    pub fn solve(&self, chain: &LinkChain, target: &IkTarget, seed: &[f64]) -> IterativeResult {
        let mut q = seed.to_vec();
        chain.project(&mut q);

        let mut best = Evaluation::new(chain, &q, target);
        let mut best_q = q.clone();
        let mut iterations = self.config.max_iterations;
        let mut nudged = false;

        for iteration in 0..self.config.max_iterations {
            let eval = Evaluation::new(chain, &q, target);
            trace!(
                iteration,
                position_error = eval.position_error,
                orientation_error = eval.orientation_error,
                "ik iteration"
            );

            if eval.residual() < best.residual() {
                best = eval.clone();
                best_q.clone_from(&q);
            }
            if self.converged(&eval, target) {
                return IterativeResult {
                    configuration: q.into(),
                    converged: true,
                    iterations: iteration,
                    position_error: eval.position_error,
                    orientation_error: eval.orientation_error,
                };
            }

            let jacobian = task_jacobian(chain, &eval.frames, target);
            let mut next = q.clone();
            if let Some(mut dq) = self.step(&jacobian, &eval.error) {
                let largest = dq.amax();
                if largest > self.config.max_step {
                    dq *= self.config.max_step / largest;
                }
                for (v, d) in next.iter_mut().zip(dq.iter()) {
                    *v += d;
                }
                chain.project(&mut next);
            }

            if max_change(&q, &next) < STALL_EPS {
                // Singular configuration whose gradient vanishes, or every
                // joint pinned at a limit. Nudge once; stop if that was tried.
                if nudged {
                    iterations = iteration + 1;
                    break;
                }
                nudged = true;
                next.clone_from(&q);
                self.nudge(&mut next);
                chain.project(&mut next);
            } else {
                nudged = false;
            }
            q = next;
        }

        let last = Evaluation::new(chain, &q, target);
        if last.residual() < best.residual() {
            best = last;
            best_q = q;
        }
        let converged = self.converged(&best, target);
        IterativeResult {
            configuration: best_q.into(),
            converged,
            iterations,
            position_error: best.position_error,
            orientation_error: best.orientation_error,
        }
    }

    /// Fixed alternating offset of `max_step` per joint, enough to leave a
    /// stretched or folded singularity.
    fn nudge(&self, q: &mut [f64]) {
        for (i, v) in q.iter_mut().enumerate() {
            if i % 2 == 0 {
                *v += self.config.max_step;
            } else {
                *v -= self.config.max_step;
            }
        }
    }

    fn converged(&self, eval: &Evaluation, target: &IkTarget) -> bool {
        match target {
            IkTarget::Position(_) => eval.position_error < self.config.tolerance,
            IkTarget::Pose(_) => {
                eval.position_error < self.config.tolerance
                    && eval.orientation_error < ANGLE_TOLERANCE
            }
        }
    }

    fn step(&self, jacobian: &DMatrix<f64>, error: &DVector<f64>) -> Option<DVector<f64>> {
        match self.config.method {
            IkMethod::DampedLeastSquares => {
                // dq = J^T (J J^T + lambda^2 I)^-1 e
                let m = jacobian.nrows();
                let lambda_sq = self.config.damping * self.config.damping;
                let damped = jacobian * jacobian.transpose() + DMatrix::identity(m, m) * lambda_sq;
                let damped_inv = damped.try_inverse()?;
                Some(jacobian.transpose() * damped_inv * error)
            }
            IkMethod::JacobianTranspose => {
                // dq = alpha J^T e, alpha = <e, J J^T e> / |J J^T e|^2
                let gradient = jacobian.transpose() * error;
                let jjte = jacobian * &gradient;
                let denom = jjte.norm_squared();
                if denom <= f64::EPSILON {
                    return None;
                }
                let alpha = error.dot(&jjte) / denom;
                Some(gradient * alpha)
            }
        }
    }
}

/// Current end-effector error against the target.
#[derive(Debug, Clone)]
struct Evaluation {
    frames: JointFrames,
    error: DVector<f64>,
    position_error: f64,
    orientation_error: f64,
}

impl Evaluation {
    fn new(chain: &LinkChain, q: &[f64], target: &IkTarget) -> Self {
        let frames = chain.frames(q);
        let ee = &frames.end_effector;
        let position = chain.task_vector(&(target.position() - ee.translation.vector));
        let position_error = position.norm();

        let (error, orientation_error) = match target {
            IkTarget::Position(_) => (position, 0.0),
            IkTarget::Pose(pose) => {
                let rotation = pose.orientation * ee.rotation.inverse();
                let rows: Vec<f64> = if chain.is_planar() {
                    vec![wrap_angle(pose.yaw() - Pose::from_isometry(ee).yaw())]
                } else {
                    orientation_error(&rotation).as_slice().to_vec()
                };
                let orientation_error = rows.iter().map(|r| r * r).sum::<f64>().sqrt();
                let error = DVector::from_iterator(
                    position.len() + rows.len(),
                    position.iter().copied().chain(rows),
                );
                (error, orientation_error)
            }
        };

        Self {
            frames,
            error,
            position_error,
            orientation_error,
        }
    }

    fn residual(&self) -> f64 {
        self.error.norm()
    }
}

fn max_change(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)
}

/// Orientation error as a 3-vector (axis * angle).
fn orientation_error(q: &UnitQuaternion<f64>) -> Vector3<f64> {
    q.axis().map_or_else(Vector3::zeros, |axis| axis.into_inner() * q.angle())
}

/// Angle mapped into `(-pi, pi]`.
fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

/// Position rows, plus orientation rows for pose targets: one yaw row for
/// planar chains, three angular rows otherwise.
fn task_jacobian(chain: &LinkChain, frames: &JointFrames, target: &IkTarget) -> DMatrix<f64> {
    let position = chain.position_jacobian(frames);
    let IkTarget::Pose(_) = target else {
        return position;
    };

    let angular_rows = if chain.is_planar() { 1 } else { 3 };
    let rows = position.nrows();
    let mut jacobian = position.resize_vertically(rows + angular_rows, 0.0);
    for (i, link) in chain.links().iter().enumerate() {
        if link.joint_type != JointType::Revolute {
            continue;
        }
        let axis = &frames.axes[i];
        if angular_rows == 1 {
            jacobian[(rows, i)] = axis.z;
        } else {
            for r in 0..3 {
                jacobian[(rows + r, i)] = axis[r];
            }
        }
    }
    jacobian
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use super::*;
    use approx::assert_relative_eq;
    use armkit_core::types::{JointLimits, Link};

    fn three_link() -> LinkChain {
        LinkChain::new(vec![Link::revolute(3.0), Link::revolute(2.5), Link::revolute(1.5)])
            .unwrap()
    }

    fn spatial() -> LinkChain {
        LinkChain::new(vec![
            Link::revolute(0.5),
            Link::revolute(2.0)
                .with_axis(Vector3::y())
                .with_limits(-FRAC_PI_2, FRAC_PI_2),
            Link::revolute(1.5)
                .with_axis(Vector3::y())
                .with_limits(-2.5, 2.5),
        ])
        .unwrap()
    }

    #[test]
    fn dls_three_link_reaches_target() {
        let chain = three_link();
        let target = IkTarget::Position(Vector3::new(4.0, 2.0, 0.0));
        let result = IterativeSolver::with_defaults().solve(&chain, &target, &[0.0; 3]);

        assert!(result.converged, "pos_err={}", result.position_error);
        let pose = chain.forward_kinematics(&result.configuration).unwrap();
        assert_relative_eq!(pose.x(), 4.0, epsilon = 1e-3);
        assert_relative_eq!(pose.y(), 2.0, epsilon = 1e-3);
    }

    #[test]
    fn jacobian_transpose_three_link_reaches_target() {
        let chain = three_link();
        let target = IkTarget::Position(Vector3::new(4.0, 2.0, 0.0));
        let solver = IterativeSolver::new(SolverConfig {
            method: IkMethod::JacobianTranspose,
            ..SolverConfig::default()
        });
        let result = solver.solve(&chain, &target, &[0.0; 3]);
        assert!(result.converged, "pos_err={}", result.position_error);
        assert!(result.position_error < 1e-2);
    }

    #[test]
    fn dls_spatial_reaches_target() {
        let chain = spatial();
        let target = IkTarget::Position(Vector3::new(1.0, 1.0, 1.0));
        let result = IterativeSolver::with_defaults().solve(&chain, &target, &[0.0; 3]);

        assert!(result.converged, "pos_err={}", result.position_error);
        let pose = chain.forward_kinematics(&result.configuration).unwrap();
        assert_relative_eq!(pose.position, Vector3::new(1.0, 1.0, 1.0), epsilon = 1e-3);
    }

    #[test]
    fn unreachable_target_does_not_converge() {
        let chain = three_link();
        let target = IkTarget::Position(Vector3::new(10.0, 0.0, 0.0));
        let solver = IterativeSolver::new(SolverConfig {
            max_iterations: 50,
            ..SolverConfig::default()
        });
        let result = solver.solve(&chain, &target, &[0.3, 0.2, 0.1]);

        assert!(!result.converged);
        assert_eq!(result.iterations, 50);
        // Best effort leans toward the target but cannot close the gap.
        assert!(result.position_error >= 3.0 - 1e-9);
        assert!(result.position_error < 3.5);
    }

    #[test]
    fn warm_start_converges_immediately() {
        let chain = three_link();
        let target = IkTarget::Position(Vector3::new(4.0, 2.0, 0.0));
        let solver = IterativeSolver::with_defaults();

        let cold = solver.solve(&chain, &target, &[0.0; 3]);
        assert!(cold.converged);
        let warm = solver.solve(&chain, &target, cold.configuration.as_slice());
        assert!(warm.converged);
        assert_eq!(warm.iterations, 0);
    }

    #[test]
    fn step_is_limited() {
        let chain = three_link();
        let target = IkTarget::Position(Vector3::new(-4.0, 2.0, 0.0));
        let solver = IterativeSolver::new(SolverConfig {
            max_iterations: 1,
            max_step: 0.1,
            ..SolverConfig::default()
        });
        let result = solver.solve(&chain, &target, &[0.0, 0.5, 0.5]);
        for (after, before) in result.configuration.iter().zip([0.0, 0.5, 0.5]) {
            assert!((after - before).abs() <= 0.1 + 1e-12);
        }
    }

    #[test]
    fn respects_joint_limits() {
        let chain = LinkChain::new(vec![
            Link::revolute(3.0).with_limits(-0.5, 0.5),
            Link::revolute(2.5).with_limits(-0.5, 0.5),
            Link::revolute(1.5).with_limits(-0.5, 0.5),
        ])
        .unwrap();
        let target = IkTarget::Position(Vector3::new(-3.0, 1.0, 0.0));
        let result = IterativeSolver::with_defaults().solve(&chain, &target, &[0.0; 3]);

        assert!(!result.converged);
        assert!(chain.validate(&result.configuration).is_ok());
    }

    #[test]
    fn stretched_seed_leaves_singularity() {
        // At q = 0 every joint only moves the tip along Y, so the raw step
        // toward a target on the X axis is zero.
        let chain = three_link();
        let solver = IterativeSolver::with_defaults();
        for x in [4.0, -1.0, 0.5] {
            let target = IkTarget::Position(Vector3::new(x, 0.0, 0.0));
            let result = solver.solve(&chain, &target, &[0.0; 3]);
            assert!(result.converged, "x={x} pos_err={}", result.position_error);
            let pose = chain.forward_kinematics(&result.configuration).unwrap();
            assert_relative_eq!(pose.x(), x, epsilon = 1e-3);
            assert_relative_eq!(pose.y(), 0.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn pinned_joints_stop_early() {
        let chain =
            LinkChain::new(vec![Link::prismatic(1.0, JointLimits::new(0.0, 1.0))]).unwrap();
        let target = IkTarget::Position(Vector3::new(5.0, 0.0, 0.0));
        let result = IterativeSolver::with_defaults().solve(&chain, &target, &[1.0]);

        assert!(!result.converged);
        assert_eq!(result.iterations, 2);
        assert_relative_eq!(result.position_error, 3.0, epsilon = 1e-12);
        assert_relative_eq!(result.configuration[0], 1.0);
    }

    #[test]
    fn planar_pose_target_matches_yaw() {
        let chain = three_link();
        let goal = chain
            .forward_kinematics(&[0.4, -0.8, 1.1].into())
            .unwrap();
        let target = IkTarget::Pose(goal);
        let result = IterativeSolver::with_defaults().solve(&chain, &target, &[0.0, 0.5, 0.5]);

        assert!(
            result.converged,
            "pos_err={} ori_err={}",
            result.position_error,
            result.orientation_error
        );
        let pose = chain.forward_kinematics(&result.configuration).unwrap();
        assert_relative_eq!(pose.x(), goal.x(), epsilon = 1e-3);
        assert_relative_eq!(pose.y(), goal.y(), epsilon = 1e-3);
        assert_relative_eq!(wrap_angle(pose.yaw() - goal.yaw()), 0.0, epsilon = 1e-2);
    }

    #[test]
    fn wrap_angle_range() {
        assert_relative_eq!(wrap_angle(3.0 * PI / 2.0), -FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(-PI), PI, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(0.25), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn target_from_pose_is_position() {
        let target = IkTarget::from(Pose::planar(1.0, 2.0));
        assert!(matches!(target, IkTarget::Position(_)));
        assert_relative_eq!(*target.position(), Vector3::new(1.0, 2.0, 0.0));
    }
}
