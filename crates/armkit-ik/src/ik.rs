//! Inverse kinematics front end.
//!
//! [`IkSolver`] picks the closed form for planar two-link arms and the
//! iterative solver for everything else, and reports every solution with its
//! manipulability.

use nalgebra::DMatrix;
use serde::Serialize;
use tracing::{debug, warn};

use armkit_core::config::{IkMethod, SolverConfig};
use armkit_core::error::{KinematicsError, SingularityWarning, Unreachable, UnreachableReason};
use armkit_core::types::{Configuration, Pose};

use crate::analytic;
use crate::chain::LinkChain;
use crate::solver::{IkTarget, IterativeSolver};

/// How a solution was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveMethod {
    ClosedForm,
    Iterative(IkMethod),
}

/// A configuration that places the end effector on the target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IkSolution {
    pub configuration: Configuration,
    /// Pose actually reached.
    pub pose: Pose,
    pub method: SolveMethod,
    /// Iterations used (0 for the closed form).
    pub iterations: u32,
    /// Remaining position error.
    pub residual: f64,
    /// Yoshikawa manipulability at `configuration`.
    pub manipulability: f64,
    /// Present when `manipulability` is below the configured threshold.
    pub singularity: Option<SingularityWarning>,
}

impl IkSolution {
    pub const fn is_near_singular(&self) -> bool {
        self.singularity.is_some()
    }
}

/// `sqrt(det(J J^T))`, or `sqrt(det(J^T J))` when `J` has fewer columns than
/// rows. Negative determinants from round-off count as zero.
pub fn manipulability_index(jacobian: &DMatrix<f64>) -> f64 {
    let gram = if jacobian.ncols() < jacobian.nrows() {
        jacobian.transpose() * jacobian
    } else {
        jacobian * jacobian.transpose()
    };
    gram.determinant().max(0.0).sqrt()
}

/// `Some` warning when `manipulability` is below `threshold`.
pub fn check_singularity(manipulability: f64, threshold: f64) -> Option<SingularityWarning> {
    (manipulability < threshold).then_some(SingularityWarning {
        manipulability,
        threshold,
    })
}

/// Inverse kinematics for any [`LinkChain`].
#[derive(Debug, Clone)]
pub struct IkSolver {
    config: SolverConfig,
}

impl Default for IkSolver {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl IkSolver {
    pub const fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Joint values placing the end effector at `target`'s position.
    ///
    /// `seed` (clamped into the limits) starts the iterative solver and
    /// breaks nearest-to-seed elbow choices; the chain's mid configuration is
    /// used when absent.
    pub fn solve(
        &self,
        chain: &LinkChain,
        target: &Pose,
        seed: Option<&Configuration>,
    ) -> Result<IkSolution, KinematicsError> {
        self.solve_target(chain, &IkTarget::from(*target), seed)
    }

    /// Like [`solve`](Self::solve) for any [`IkTarget`]. Pose targets always
    /// go through the iterative solver.
    pub fn solve_target(
        &self,
        chain: &LinkChain,
        target: &IkTarget,
        seed: Option<&Configuration>,
    ) -> Result<IkSolution, KinematicsError> {
        let seed = match seed {
            Some(s) => chain.clamp(s)?,
            None => chain.mid_configuration(),
        };
        let goal = target.pose();

        if let Err(reason) = precheck(chain, &goal) {
            debug!(?reason, "ik target rejected");
            return Err(Unreachable::new(goal, reason).into());
        }

        let (configuration, method, iterations) =
            if analytic::applies(chain) && matches!(target, IkTarget::Position(_)) {
                let q = analytic::solve(chain, &goal, self.config.elbow, &seed)?;
                (q, SolveMethod::ClosedForm, 0)
            } else {
                let result =
                    IterativeSolver::new(self.config).solve(chain, target, seed.as_slice());
                if !result.converged {
                    debug!(
                        iterations = result.iterations,
                        residual = result.position_error,
                        "ik did not converge"
                    );
                    let reason = UnreachableReason::NotConverged {
                        iterations: result.iterations,
                        residual: result.position_error,
                    };
                    return Err(Unreachable::new(goal, reason)
                        .with_best_effort(result.configuration)
                        .into());
                }
                (
                    result.configuration,
                    SolveMethod::Iterative(self.config.method),
                    result.iterations,
                )
            };

        let pose = chain.forward_kinematics_clamped(&configuration)?;
        let residual = chain
            .task_vector(&(goal.position - pose.position))
            .norm();
        let manipulability = manipulability_index(&chain.jacobian(&configuration)?);
        let singularity = check_singularity(manipulability, self.config.singularity_threshold);
        if let Some(w) = &singularity {
            warn!(%w, "ik solution near singularity");
        }
        debug!(?method, iterations, residual, "ik solved");

        Ok(IkSolution {
            configuration,
            pose,
            method,
            iterations,
            residual,
            manipulability,
            singularity,
        })
    }
}

/// Reject targets no configuration can reach before running a solver.
fn precheck(chain: &LinkChain, target: &Pose) -> Result<(), UnreachableReason> {
    let offset = target.position - chain.base();
    if chain.is_planar() && offset.z.abs() > 1e-9 {
        return Err(UnreachableReason::OutOfPlane { offset: offset.z });
    }
    let distance = offset.norm();
    let max_reach = chain.max_reach();
    if !distance.is_finite() || distance > max_reach + 1e-9 {
        return Err(UnreachableReason::OutsideWorkspace {
            distance,
            min_reach: chain.min_reach(),
            max_reach,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
