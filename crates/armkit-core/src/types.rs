use std::f64::consts::PI;

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{ChainError, ConfigurationError};

// ---------------------------------------------------------------------------
// JointType
// ---------------------------------------------------------------------------

/// Kind of motion a joint contributes to the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointType {
    /// Rotation about the joint axis (radians).
    Revolute,
    /// Translation along the joint axis (length units).
    Prismatic,
}

impl JointType {
    /// Axis used when a link does not specify one.
    ///
    /// Revolute joints turn about +Z, prismatic joints slide along +X (the
    /// link direction), which keeps a chain of defaults planar.
    pub fn default_axis(self) -> Vector3<f64> {
        match self {
            Self::Revolute => Vector3::z(),
            Self::Prismatic => Vector3::x(),
        }
    }

    pub const fn is_revolute(self) -> bool {
        matches!(self, Self::Revolute)
    }
}

// ---------------------------------------------------------------------------
// JointLimits
// ---------------------------------------------------------------------------

/// Closed interval of admissible joint values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    /// Lower position limit (rad or length units).
    pub lower: f64,
    /// Upper position limit (rad or length units).
    pub upper: f64,
}

impl JointLimits {
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Full revolution, `[-PI, PI]`.
    pub const fn full_circle() -> Self {
        Self::new(-PI, PI)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.lower, self.upper)
    }

    pub fn span(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn midpoint(&self) -> f64 {
        0.5 * (self.lower + self.upper)
    }

    /// Whether the interval covers a whole turn, so any angle has an
    /// equivalent representative inside it.
    pub fn covers_full_turn(&self) -> bool {
        self.span() >= 2.0 * PI - 1e-9
    }

    fn is_valid(&self) -> bool {
        self.lower.is_finite() && self.upper.is_finite() && self.lower <= self.upper
    }
}

impl Default for JointLimits {
    fn default() -> Self {
        Self::full_circle()
    }
}

// ---------------------------------------------------------------------------
// Link
// ---------------------------------------------------------------------------

/// One rigid link of a serial chain together with the joint that drives it.
///
/// The joint moves first (rotation about / translation along `axis`), then
/// the link extends `length` along its local +X axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub length: f64,
    pub joint_type: JointType,
    pub limits: JointLimits,
    /// Joint axis in the link's parent frame. Normalized on validation.
    pub axis: Vector3<f64>,
}

impl Link {
    /// Revolute link about +Z with full-circle limits.
    pub fn revolute(length: f64) -> Self {
        Self {
            length,
            joint_type: JointType::Revolute,
            limits: JointLimits::full_circle(),
            axis: JointType::Revolute.default_axis(),
        }
    }

    /// Prismatic link sliding along +X within `limits`.
    pub fn prismatic(length: f64, limits: JointLimits) -> Self {
        Self {
            length,
            joint_type: JointType::Prismatic,
            limits,
            axis: JointType::Prismatic.default_axis(),
        }
    }

    #[must_use]
    pub const fn with_limits(mut self, lower: f64, upper: f64) -> Self {
        self.limits = JointLimits::new(lower, upper);
        self
    }

    #[must_use]
    pub const fn with_axis(mut self, axis: Vector3<f64>) -> Self {
        self.axis = axis;
        self
    }

    /// Check the link parameters. `index` is only used for error reporting.
    pub fn validate(&self, index: usize) -> Result<(), ChainError> {
        if !(self.length.is_finite() && self.length > 0.0) {
            return Err(ChainError::InvalidLength {
                index,
                length: self.length,
            });
        }
        if !self.limits.is_valid() {
            return Err(ChainError::InvalidLimits {
                index,
                lower: self.limits.lower,
                upper: self.limits.upper,
            });
        }
        let norm = self.axis.norm();
        if !(norm.is_finite() && norm > 1e-12) {
            return Err(ChainError::ZeroAxis { index });
        }
        Ok(())
    }

    /// Local transform contributed by the joint at `value`.
    pub fn joint_transform(&self, value: f64) -> Isometry3<f64> {
        let axis = self.axis.normalize();
        match self.joint_type {
            JointType::Revolute => Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_scaled_axis(axis * value),
            ),
            JointType::Prismatic => Isometry3::from_parts(
                Translation3::from(axis * value),
                UnitQuaternion::identity(),
            ),
        }
    }

    /// Local transform of the rigid link body (translation along +X).
    pub fn link_transform(&self) -> Isometry3<f64> {
        Isometry3::translation(self.length, 0.0, 0.0)
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Joint values of a chain, one per link, in chain order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    values: Vec<f64>,
}

impl Configuration {
    pub const fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn zeros(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
        }
    }

    pub const fn len(&self) -> usize {
        self.values.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.values.iter()
    }

    /// Euclidean distance in joint space.
    pub fn distance(&self, other: &Self) -> Result<f64, ConfigurationError> {
        if self.len() != other.len() {
            return Err(ConfigurationError::LengthMismatch {
                expected: self.len(),
                got: other.len(),
            });
        }
        Ok(self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt())
    }

    /// Index of the first non-finite value, if any.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.values.iter().position(|v| !v.is_finite())
    }
}

impl std::ops::Index<usize> for Configuration {
    type Output = f64;
    fn index(&self, i: usize) -> &f64 {
        &self.values[i]
    }
}

impl From<Vec<f64>> for Configuration {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl<const N: usize> From<[f64; N]> for Configuration {
    fn from(values: [f64; N]) -> Self {
        Self::new(values.to_vec())
    }
}

impl<'a> IntoIterator for &'a Configuration {
    type Item = &'a f64;
    type IntoIter = std::slice::Iter<'a, f64>;
    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

// ---------------------------------------------------------------------------
// Pose
// ---------------------------------------------------------------------------

/// End-effector position and orientation in the chain's base frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl Pose {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self::from_position(Vector3::new(x, y, z))
    }

    /// Point in the XY plane with identity orientation.
    pub fn planar(x: f64, y: f64) -> Self {
        Self::new(x, y, 0.0)
    }

    pub fn from_position(position: Vector3<f64>) -> Self {
        Self {
            position,
            orientation: UnitQuaternion::identity(),
        }
    }

    pub fn from_isometry(iso: &Isometry3<f64>) -> Self {
        Self {
            position: iso.translation.vector,
            orientation: iso.rotation,
        }
    }

    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.position), self.orientation)
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    pub fn z(&self) -> f64 {
        self.position.z
    }

    /// Rotation about +Z, the only orientation a planar chain controls.
    pub fn yaw(&self) -> f64 {
        self.orientation.euler_angles().2
    }

    /// Euclidean distance between the two positions.
    pub fn distance_to(&self, other: &Self) -> f64 {
        (self.position - other.position).norm()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
