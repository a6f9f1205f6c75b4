use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{ChainError, ConfigError};
use crate::types::{JointLimits, JointType, Link, Pose};

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_joint_type() -> JointType {
    JointType::Revolute
}
const fn default_max_iterations() -> u32 {
    200
}
const fn default_tolerance() -> f64 {
    1e-4
}
const fn default_damping() -> f64 {
    0.05
}
const fn default_max_step() -> f64 {
    0.5
}
const fn default_singularity_threshold() -> f64 {
    1e-3
}
const fn default_steps() -> usize {
    50
}
const fn default_resolution() -> usize {
    50
}
const fn default_max_samples() -> u64 {
    2_000_000
}
const fn default_pick() -> [f64; 2] {
    [4.0, 1.0]
}
const fn default_place() -> [f64; 2] {
    [-3.0, 2.0]
}
const fn default_home() -> [f64; 2] {
    [2.0, 3.0]
}
fn default_links() -> Vec<LinkConfig> {
    vec![LinkConfig::revolute(3.0), LinkConfig::revolute(2.0)]
}

// ---------------------------------------------------------------------------
// LinkConfig
// ---------------------------------------------------------------------------

/// One link as written in a TOML description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    pub length: f64,

    #[serde(default = "default_joint_type")]
    pub joint: JointType,

    /// `[lower, upper]`. Revolute joints default to a full turn; prismatic
    /// joints must state their travel.
    #[serde(default)]
    pub limits: Option<[f64; 2]>,

    /// Joint axis. Defaults per joint type (see [`JointType::default_axis`]).
    #[serde(default)]
    pub axis: Option<[f64; 3]>,
}

impl LinkConfig {
    pub const fn revolute(length: f64) -> Self {
        Self {
            length,
            joint: JointType::Revolute,
            limits: None,
            axis: None,
        }
    }

    /// Convert to a [`Link`], validating it. `index` is used for errors.
    pub fn to_link(&self, index: usize) -> Result<Link, ConfigError> {
        let limits = match (self.limits, self.joint) {
            (Some([lower, upper]), _) => JointLimits::new(lower, upper),
            (None, JointType::Revolute) => JointLimits::full_circle(),
            (None, JointType::Prismatic) => {
                return Err(ConfigError::InvalidValue {
                    field: format!("links[{index}].limits"),
                    message: "prismatic joints require explicit limits".into(),
                });
            }
        };
        let axis = self
            .axis
            .map_or_else(|| self.joint.default_axis(), |[x, y, z]| Vector3::new(x, y, z));
        let link = Link {
            length: self.length,
            joint_type: self.joint,
            limits,
            axis,
        };
        link.validate(index)?;
        Ok(link)
    }
}

// ---------------------------------------------------------------------------
// Solver configuration
// ---------------------------------------------------------------------------

/// Update rule used by the iterative IK solver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IkMethod {
    /// `dq = J^T (J J^T + lambda^2 I)^-1 e`.
    #[default]
    DampedLeastSquares,
    /// `dq = alpha J^T e` with the error-optimal step length.
    JacobianTranspose,
}

/// Which closed-form two-link solution to prefer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElbowPreference {
    /// Elbow angle >= 0.
    Up,
    /// Elbow angle <= 0.
    Down,
    /// Closest to the seed in joint space; ties go to [`Up`](Self::Up).
    #[default]
    NearestToSeed,
}

/// Inverse kinematics solver settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default)]
    pub method: IkMethod,

    /// Maximum iterations of the numerical solver.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Position error tolerance (length units).
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Damping factor (lambda). Higher is more robust near singularities but
    /// converges slower.
    #[serde(default = "default_damping")]
    pub damping: f64,

    /// Largest change of any single joint per iteration.
    #[serde(default = "default_max_step")]
    pub max_step: f64,

    #[serde(default)]
    pub elbow: ElbowPreference,

    /// Manipulability below which a solution carries a singularity warning.
    #[serde(default = "default_singularity_threshold")]
    pub singularity_threshold: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            method: IkMethod::default(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            damping: default_damping(),
            max_step: default_max_step(),
            elbow: ElbowPreference::default(),
            singularity_threshold: default_singularity_threshold(),
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(invalid("solver.max_iterations", "must be > 0"));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(invalid("solver.tolerance", "must be finite and > 0"));
        }
        if !(self.damping.is_finite() && self.damping >= 0.0) {
            return Err(invalid("solver.damping", "must be finite and >= 0"));
        }
        if !(self.max_step.is_finite() && self.max_step > 0.0) {
            return Err(invalid("solver.max_step", "must be finite and > 0"));
        }
        if !(self.singularity_threshold.is_finite() && self.singularity_threshold >= 0.0) {
            return Err(invalid(
                "solver.singularity_threshold",
                "must be finite and >= 0",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Planner configuration
// ---------------------------------------------------------------------------

/// Time-scaling profile applied to every joint of a trajectory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// `(1 - cos(pi t)) / 2`, zero velocity at both ends.
    #[default]
    Cosine,
    /// Constant velocity.
    Linear,
    /// `3t^2 - 2t^3`, zero velocity at both ends.
    Cubic,
}

/// Trajectory planner settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Configurations per planned motion (>= 2).
    #[serde(default = "default_steps")]
    pub steps: usize,

    #[serde(default)]
    pub profile: Profile,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            profile: Profile::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Task configuration
// ---------------------------------------------------------------------------

/// Pick, place and home points of a pick-and-place run (XY plane).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    #[serde(default = "default_pick")]
    pub pick: [f64; 2],
    #[serde(default = "default_place")]
    pub place: [f64; 2],
    #[serde(default = "default_home")]
    pub home: [f64; 2],
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            pick: default_pick(),
            place: default_place(),
            home: default_home(),
        }
    }
}

impl TaskConfig {
    pub fn pick_pose(&self) -> Pose {
        Pose::planar(self.pick[0], self.pick[1])
    }

    pub fn place_pose(&self) -> Pose {
        Pose::planar(self.place[0], self.place[1])
    }

    pub fn home_pose(&self) -> Pose {
        Pose::planar(self.home[0], self.home[1])
    }
}

// ---------------------------------------------------------------------------
// Sampler configuration
// ---------------------------------------------------------------------------

/// Joint ranges covered by workspace sampling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingDomain {
    /// Each joint over its own limits.
    #[default]
    JointLimits,
    /// Revolute joints over a full turn regardless of limits; samples outside
    /// the limits are kept and flagged.
    FullRange,
}

/// Workspace sampling settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Samples per joint (>= 2, endpoints included).
    #[serde(default = "default_resolution")]
    pub resolution: usize,

    #[serde(default)]
    pub domain: SamplingDomain,

    /// Upper bound on `resolution ^ dof`.
    #[serde(default = "default_max_samples")]
    pub max_samples: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            domain: SamplingDomain::default(),
            max_samples: default_max_samples(),
        }
    }
}

// ---------------------------------------------------------------------------
// ArmConfig
// ---------------------------------------------------------------------------

/// Complete description of an arm and the settings of every component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmConfig {
    #[serde(default = "default_links")]
    pub links: Vec<LinkConfig>,

    /// Translation of the chain's base.
    #[serde(default)]
    pub base: [f64; 3],

    #[serde(default)]
    pub solver: SolverConfig,

    #[serde(default)]
    pub planner: PlannerConfig,

    #[serde(default)]
    pub task: TaskConfig,

    #[serde(default)]
    pub workspace: SamplerConfig,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            links: default_links(),
            base: [0.0; 3],
            solver: SolverConfig::default(),
            planner: PlannerConfig::default(),
            task: TaskConfig::default(),
            workspace: SamplerConfig::default(),
        }
    }
}

impl ArmConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.to_links()?;
        if self.base.iter().any(|v| !v.is_finite()) {
            return Err(invalid("base", "must be finite"));
        }
        self.solver.validate()?;
        if self.planner.steps < 2 {
            return Err(invalid("planner.steps", "must be >= 2"));
        }
        if self.workspace.resolution < 2 {
            return Err(invalid("workspace.resolution", "must be >= 2"));
        }
        let points = [
            ("task.pick", self.task.pick),
            ("task.place", self.task.place),
            ("task.home", self.task.home),
        ];
        for (field, point) in points {
            if point.iter().any(|v| !v.is_finite()) {
                return Err(invalid(field, "must be finite"));
            }
        }
        Ok(())
    }

    /// Validated links in chain order.
    pub fn to_links(&self) -> Result<Vec<Link>, ConfigError> {
        if self.links.is_empty() {
            return Err(ChainError::Empty.into());
        }
        self.links
            .iter()
            .enumerate()
            .map(|(i, link)| link.to_link(i))
            .collect()
    }

    pub fn base_offset(&self) -> Vector3<f64> {
        Vector3::from(self.base)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ---- defaults ----

    #[test]
    fn arm_config_default_values() {
        let cfg = ArmConfig::default();
        assert_eq!(cfg.links.len(), 2);
        assert_relative_eq!(cfg.links[0].length, 3.0);
        assert_relative_eq!(cfg.links[1].length, 2.0);
        assert_eq!(cfg.base, [0.0; 3]);
        assert_eq!(cfg.planner.steps, 50);
        assert_eq!(cfg.planner.profile, Profile::Cosine);
        assert_eq!(cfg.task.pick, [4.0, 1.0]);
        assert_eq!(cfg.task.place, [-3.0, 2.0]);
        assert_eq!(cfg.task.home, [2.0, 3.0]);
        assert_eq!(cfg.solver.elbow, ElbowPreference::NearestToSeed);
        assert_eq!(cfg.solver.method, IkMethod::DampedLeastSquares);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let cfg = ArmConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, ArmConfig::default());
    }

    // ---- parsing ----

    #[test]
    fn parse_full_description() {
        let cfg = ArmConfig::from_toml_str(
            r#"
            base = [0.0, 2.0, 0.0]

            [[links]]
            length = 3.5
            limits = [-1.57, 1.57]

            [[links]]
            length = 2.8
            limits = [-2.5, 0.5]

            [[links]]
            length = 1.5
            joint = "prismatic"
            limits = [0.0, 0.4]

            [solver]
            method = "jacobian_transpose"
            max_iterations = 500
            elbow = "down"

            [planner]
            steps = 20
            profile = "linear"

            [task]
            pick = [3.0, 1.0]

            [workspace]
            resolution = 10
            domain = "full_range"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.links.len(), 3);
        assert_eq!(cfg.links[2].joint, JointType::Prismatic);
        assert_eq!(cfg.solver.method, IkMethod::JacobianTranspose);
        assert_eq!(cfg.solver.max_iterations, 500);
        assert_eq!(cfg.solver.elbow, ElbowPreference::Down);
        assert_relative_eq!(cfg.solver.tolerance, 1e-4);
        assert_eq!(cfg.planner.profile, Profile::Linear);
        assert_eq!(cfg.task.pick, [3.0, 1.0]);
        assert_eq!(cfg.task.home, [2.0, 3.0]);
        assert_eq!(cfg.workspace.domain, SamplingDomain::FullRange);

        let links = cfg.to_links().unwrap();
        assert_relative_eq!(links[0].limits.upper, 1.57);
        assert_relative_eq!(links[2].axis, Vector3::x());
        assert_relative_eq!(cfg.base_offset(), Vector3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn revolute_defaults_to_full_circle() {
        let link = LinkConfig::revolute(1.0).to_link(0).unwrap();
        assert_eq!(link.limits, JointLimits::full_circle());
        assert_relative_eq!(link.axis, Vector3::z());
    }

    // ---- validation ----

    #[test]
    fn prismatic_without_limits_is_rejected() {
        let link = LinkConfig {
            joint: JointType::Prismatic,
            ..LinkConfig::revolute(1.0)
        };
        let err = link.to_link(3).unwrap_err();
        assert!(err.to_string().contains("links[3].limits"));
    }

    #[test]
    fn empty_chain_is_rejected() {
        let cfg = ArmConfig {
            links: Vec::new(),
            ..ArmConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Chain(ChainError::Empty))
        ));
    }

    #[test]
    fn negative_length_is_rejected() {
        let err = ArmConfig::from_toml_str("[[links]]\nlength = -1.0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Chain(ChainError::InvalidLength { index: 0, .. })
        ));
    }

    #[test]
    fn planner_steps_below_two_rejected() {
        let cfg = ArmConfig {
            planner: PlannerConfig {
                steps: 1,
                ..PlannerConfig::default()
            },
            ..ArmConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value for planner.steps: must be >= 2"
        );
    }

    #[test]
    fn solver_tolerance_must_be_positive() {
        let cfg = SolverConfig {
            tolerance: 0.0,
            ..SolverConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bad_toml_reports_parse_error() {
        let err = ArmConfig::from_toml_str("links = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = ArmConfig::from_file("/nonexistent/armkit.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn task_poses_are_planar() {
        let task = TaskConfig::default();
        assert_relative_eq!(task.pick_pose().x(), 4.0);
        assert_relative_eq!(task.place_pose().y(), 2.0);
        assert_relative_eq!(task.home_pose().z(), 0.0);
    }

    #[test]
    fn bundled_jcb_description_loads() {
        let config = ArmConfig::from_toml_str(include_str!("../../../configs/jcb.toml")).unwrap();
        assert_eq!(config.links.len(), 3);
        assert_eq!(config.base, [0.0, 2.0, 0.0]);
        assert_eq!(config.planner.profile, Profile::Cubic);
        assert_eq!(config.workspace.resolution, 31);
        let links = config.to_links().unwrap();
        assert_relative_eq!(links[1].limits.lower, -2.5);
    }
}
