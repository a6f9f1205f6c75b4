use serde::Serialize;
use thiserror::Error;

use crate::types::{Configuration, Pose};

/// Top-level error type for armkit.
#[derive(Debug, Error)]
pub enum ArmError {
    #[error("Configuration file error: {0}")]
    Config(#[from] ConfigError),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Kinematics error: {0}")]
    Kinematics(#[from] KinematicsError),

    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),
}

impl From<ConfigurationError> for ArmError {
    fn from(err: ConfigurationError) -> Self {
        Self::Kinematics(KinematicsError::InvalidConfiguration(err))
    }
}

/// Errors loading an [`ArmConfig`](crate::config::ArmConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid chain: {0}")]
    Chain(#[from] ChainError),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Rejected link-chain descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ChainError {
    #[error("chain has no links")]
    Empty,

    #[error("link {index} has invalid length {length} (must be finite and > 0)")]
    InvalidLength { index: usize, length: f64 },

    #[error("link {index} has invalid limits [{lower}, {upper}]")]
    InvalidLimits { index: usize, lower: f64, upper: f64 },

    #[error("link {index} has a zero joint axis")]
    ZeroAxis { index: usize },
}

/// A configuration that does not fit the chain it was applied to.
///
/// Always an input error; never recovered inside the core.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("configuration length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("joint {joint} value is not finite")]
    NonFinite { joint: usize },

    #[error("joint {joint} value {value} outside limits [{lower}, {upper}]")]
    OutOfLimits {
        joint: usize,
        value: f64,
        lower: f64,
        upper: f64,
    },
}

/// Why a target could not be reached.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum UnreachableReason {
    #[error("distance {distance:.4} outside reach annulus [{min_reach:.4}, {max_reach:.4}]")]
    OutsideWorkspace {
        distance: f64,
        min_reach: f64,
        max_reach: f64,
    },

    #[error("every geometric solution violates joint limits")]
    JointLimits,

    #[error("target lies {offset:.4} off the plane of a planar chain")]
    OutOfPlane { offset: f64 },

    #[error("solver did not converge after {iterations} iterations (residual {residual:.3e})")]
    NotConverged { iterations: u32, residual: f64 },
}

/// An IK target outside the workspace, or one the solver failed to reach.
///
/// Recoverable: the caller may re-seed, change the elbow preference, or
/// abort. `best_effort` carries the closest configuration found, if any.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "target ({:.3}, {:.3}, {:.3}) unreachable: {reason}",
    .target.position.x,
    .target.position.y,
    .target.position.z
)]
pub struct Unreachable {
    pub target: Pose,
    pub reason: UnreachableReason,
    pub best_effort: Option<Configuration>,
}

impl Unreachable {
    pub const fn new(target: Pose, reason: UnreachableReason) -> Self {
        Self {
            target,
            reason,
            best_effort: None,
        }
    }

    #[must_use]
    pub fn with_best_effort(mut self, configuration: Configuration) -> Self {
        self.best_effort = Some(configuration);
        self
    }
}

/// Errors from forward and inverse kinematics.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KinematicsError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigurationError),

    #[error("{0}")]
    Unreachable(Box<Unreachable>),
}

impl From<Unreachable> for KinematicsError {
    fn from(err: Unreachable) -> Self {
        Self::Unreachable(Box::new(err))
    }
}

impl KinematicsError {
    /// The unreachable payload, if this is an [`Unreachable`] error.
    pub fn as_unreachable(&self) -> Option<&Unreachable> {
        match self {
            Self::Unreachable(u) => Some(u),
            Self::InvalidConfiguration(_) => None,
        }
    }
}

/// Trajectory planner misuse.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum PlanError {
    #[error("invalid step count {0} (must be >= 2)")]
    InvalidStepCount(usize),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigurationError),

    #[error("waypoint plan needs at least two waypoints, got {0}")]
    TooFewWaypoints(usize),
}

/// Workspace analysis errors.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum WorkspaceError {
    #[error("invalid resolution {0} (must be >= 2)")]
    InvalidResolution(usize),

    #[error("sampling would evaluate {requested} configurations (limit {limit})")]
    TooManySamples { requested: u128, limit: u64 },

    #[error("invalid grid: spacing {spacing} over [{min}, {max}]")]
    InvalidGrid { min: f64, max: f64, spacing: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigurationError),
}

/// Advisory: a result is valid but sits close to a kinematic singularity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Error)]
#[error("near-singular configuration: manipulability {manipulability:.3e} below {threshold:.3e}")]
pub struct SingularityWarning {
    pub manipulability: f64,
    pub threshold: f64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
