//! Serial link chain: forward kinematics, joint frames and the position
//! Jacobian.
//!
//! A [`LinkChain`] is an ordered list of [`Link`]s starting at a base
//! translation. Each link applies its joint motion (rotation about, or
//! translation along, the joint axis) followed by its length along local +X.

use std::f64::consts::TAU;

use nalgebra::{DMatrix, DVector, Isometry3, Vector3};

use armkit_core::config::ArmConfig;
use armkit_core::error::{ChainError, ConfigError, ConfigurationError};
use armkit_core::types::{Configuration, JointType, Link, Pose};

/// Axis components below this are treated as zero when classifying a chain.
const PLANAR_EPS: f64 = 1e-9;

/// Joint origins and axes in the base frame, plus the end-effector frame.
#[derive(Debug, Clone)]
pub struct JointFrames {
    /// Origin of every joint, base first.
    pub origins: Vec<Vector3<f64>>,
    /// Unit joint axis of every joint, expressed in the base frame.
    pub axes: Vec<Vector3<f64>>,
    /// End-effector frame.
    pub end_effector: Isometry3<f64>,
}

/// An ordered, validated serial chain.
///
/// Immutable once built; share it by reference (or `Arc`) between solvers,
/// planners and analyzers.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkChain {
    links: Vec<Link>,
    base: Vector3<f64>,
}

impl LinkChain {
    /// Chain rooted at the origin.
    pub fn new(links: Vec<Link>) -> Result<Self, ChainError> {
        Self::with_base(links, Vector3::zeros())
    }

    /// Chain rooted at `base`. Every link is validated and its axis
    /// normalized.
    pub fn with_base(links: Vec<Link>, base: Vector3<f64>) -> Result<Self, ChainError> {
        if links.is_empty() {
            return Err(ChainError::Empty);
        }
        let links = links
            .into_iter()
            .enumerate()
            .map(|(i, mut link)| {
                link.validate(i)?;
                link.axis = link.axis.normalize();
                Ok(link)
            })
            .collect::<Result<Vec<_>, ChainError>>()?;
        Ok(Self { links, base })
    }

    /// Build the chain described by an [`ArmConfig`].
    pub fn from_config(config: &ArmConfig) -> Result<Self, ConfigError> {
        let base = config.base_offset();
        if base.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::InvalidValue {
                field: "base".into(),
                message: "must be finite".into(),
            });
        }
        Ok(Self::with_base(config.to_links()?, base)?)
    }

    /// Number of joints.
    pub fn dof(&self) -> usize {
        self.links.len()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link(&self, index: usize) -> Option<&Link> {
        self.links.get(index)
    }

    pub const fn base(&self) -> &Vector3<f64> {
        &self.base
    }

    /// Sum of link lengths.
    pub fn total_length(&self) -> f64 {
        self.links.iter().map(|l| l.length).sum()
    }

    /// Shortest and longest span of one link: the distance between its joint
    /// origin and the next one. Revolute links always span their length; a
    /// prismatic link spans `|d * axis + length * x|` for `d` within its
    /// travel.
    fn span(link: &Link) -> (f64, f64) {
        match link.joint_type {
            JointType::Revolute => (link.length, link.length),
            JointType::Prismatic => {
                let along = |d: f64| (link.axis * d + Vector3::x() * link.length).norm();
                let (lower, upper) = (link.limits.lower, link.limits.upper);
                let nearest = (-link.length * link.axis.x).clamp(lower, upper);
                (along(nearest), along(lower).max(along(upper)))
            }
        }
    }

    /// Upper bound on the base-to-end-effector distance: the sum of every
    /// link's longest span.
    pub fn max_reach(&self) -> f64 {
        self.links.iter().map(|l| Self::span(l).1).sum()
    }

    /// Lower bound on the base-to-end-effector distance when joints rotate
    /// freely: the largest shortest span minus the longest spans of all other
    /// links, floored at zero. Equals `|l1 - l2|` for two revolute links.
    pub fn min_reach(&self) -> f64 {
        let total = self.max_reach();
        self.links
            .iter()
            .map(|l| {
                let (shortest, longest) = Self::span(l);
                shortest - (total - longest)
            })
            .fold(0.0, f64::max)
    }

    /// Whether the chain moves only in the XY plane of its base: every
    /// revolute axis is parallel to Z and every prismatic axis is
    /// perpendicular to it.
    pub fn is_planar(&self) -> bool {
        self.links.iter().all(|link| match link.joint_type {
            JointType::Revolute => {
                link.axis.x.abs() < PLANAR_EPS && link.axis.y.abs() < PLANAR_EPS
            }
            JointType::Prismatic => link.axis.z.abs() < PLANAR_EPS,
        })
    }

    /// Rows of the task-space position vector: 2 (x, y) for planar chains,
    /// 3 otherwise.
    pub fn task_dim(&self) -> usize {
        if self.is_planar() { 2 } else { 3 }
    }

    /// Project a base-frame position onto the task-space coordinates.
    pub fn task_vector(&self, v: &Vector3<f64>) -> DVector<f64> {
        DVector::from_row_slice(&v.as_slice()[..self.task_dim()])
    }

    /// Midpoint of every joint interval.
    pub fn mid_configuration(&self) -> Configuration {
        self.links.iter().map(|l| l.limits.midpoint()).collect::<Vec<_>>().into()
    }

    // -----------------------------------------------------------------------
    // Configuration checks
    // -----------------------------------------------------------------------

    /// Length and finiteness only.
    fn check_shape(&self, q: &Configuration) -> Result<(), ConfigurationError> {
        if q.len() != self.dof() {
            return Err(ConfigurationError::LengthMismatch {
                expected: self.dof(),
                got: q.len(),
            });
        }
        match q.first_non_finite() {
            Some(joint) => Err(ConfigurationError::NonFinite { joint }),
            None => Ok(()),
        }
    }

    /// Check length, finiteness and joint limits.
    pub fn validate(&self, q: &Configuration) -> Result<(), ConfigurationError> {
        self.check_shape(q)?;
        for (joint, (link, &value)) in self.links.iter().zip(q).enumerate() {
            if !link.limits.contains(value) {
                return Err(ConfigurationError::OutOfLimits {
                    joint,
                    value,
                    lower: link.limits.lower,
                    upper: link.limits.upper,
                });
            }
        }
        Ok(())
    }

    /// Copy of `q` with every value clamped into its limits.
    pub fn clamp(&self, q: &Configuration) -> Result<Configuration, ConfigurationError> {
        self.check_shape(q)?;
        Ok(self
            .links
            .iter()
            .zip(q)
            .map(|(link, &v)| link.limits.clamp(v))
            .collect::<Vec<_>>()
            .into())
    }

    /// Bring raw joint values into their limits in place. Revolute joints
    /// whose interval covers a full turn are wrapped; all others clamped.
    pub fn project(&self, q: &mut [f64]) {
        for (link, v) in self.links.iter().zip(q.iter_mut()) {
            *v = if link.joint_type.is_revolute() && link.limits.covers_full_turn() {
                let wrapped = link.limits.lower + (*v - link.limits.lower).rem_euclid(TAU);
                link.limits.clamp(wrapped)
            } else {
                link.limits.clamp(*v)
            };
        }
    }

    // -----------------------------------------------------------------------
    // Forward kinematics
    // -----------------------------------------------------------------------

    /// End-effector pose. Fails if `q` is malformed or outside the limits.
    pub fn forward_kinematics(&self, q: &Configuration) -> Result<Pose, ConfigurationError> {
        self.validate(q)?;
        Ok(Pose::from_isometry(&self.end_effector(q.as_slice())))
    }

    /// End-effector pose after clamping `q` into the limits.
    pub fn forward_kinematics_clamped(
        &self,
        q: &Configuration,
    ) -> Result<Pose, ConfigurationError> {
        let clamped = self.clamp(q)?;
        Ok(Pose::from_isometry(&self.end_effector(clamped.as_slice())))
    }

    /// Base, every intermediate joint origin, and the end effector, in chain
    /// order (`dof + 1` points). Values are used as given, limits are not
    /// checked.
    pub fn joint_positions(
        &self,
        q: &Configuration,
    ) -> Result<Vec<Vector3<f64>>, ConfigurationError> {
        let frames = self.joint_frames(q)?;
        let mut points = frames.origins;
        points.push(frames.end_effector.translation.vector);
        Ok(points)
    }

    /// Joint frames at `q`. Values are used as given, limits are not checked.
    pub fn joint_frames(&self, q: &Configuration) -> Result<JointFrames, ConfigurationError> {
        self.check_shape(q)?;
        Ok(self.frames(q.as_slice()))
    }

    pub(crate) fn end_effector(&self, q: &[f64]) -> Isometry3<f64> {
        self.links
            .iter()
            .zip(q)
            .fold(self.base_transform(), |transform, (link, &value)| {
                transform * link.joint_transform(value) * link.link_transform()
            })
    }

    pub(crate) fn frames(&self, q: &[f64]) -> JointFrames {
        let mut transform = self.base_transform();
        let mut origins = Vec::with_capacity(self.dof());
        let mut axes = Vec::with_capacity(self.dof());

        for (link, &value) in self.links.iter().zip(q) {
            // Joint origin and axis are taken before the joint moves.
            origins.push(transform.translation.vector);
            axes.push(transform.rotation * link.axis);

            transform *= link.joint_transform(value);
            transform *= link.link_transform();
        }

        JointFrames {
            origins,
            axes,
            end_effector: transform,
        }
    }

    fn base_transform(&self) -> Isometry3<f64> {
        Isometry3::translation(self.base.x, self.base.y, self.base.z)
    }

    // -----------------------------------------------------------------------
    // Jacobian
    // -----------------------------------------------------------------------

    /// Position Jacobian at `q`: `task_dim() x dof()`.
    pub fn jacobian(&self, q: &Configuration) -> Result<DMatrix<f64>, ConfigurationError> {
        self.check_shape(q)?;
        Ok(self.position_jacobian(&self.frames(q.as_slice())))
    }

    /// Columns are `axis x (p_ee - o_i)` for revolute joints and `axis` for
    /// prismatic joints, truncated to the task rows.
    pub(crate) fn position_jacobian(&self, frames: &JointFrames) -> DMatrix<f64> {
        let rows = self.task_dim();
        let ee = frames.end_effector.translation.vector;
        let mut jacobian = DMatrix::zeros(rows, self.dof());

        for (i, link) in self.links.iter().enumerate() {
            let axis = &frames.axes[i];
            let column = match link.joint_type {
                JointType::Revolute => axis.cross(&(ee - frames.origins[i])),
                JointType::Prismatic => *axis,
            };
            for r in 0..rows {
                jacobian[(r, i)] = column[r];
            }
        }
        jacobian
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
