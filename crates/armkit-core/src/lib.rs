//! armkit-core: value types, errors and configuration shared by the armkit crates.

pub mod config;
pub mod error;
pub mod types;

pub mod prelude {
    pub use crate::config::{
        ArmConfig, ElbowPreference, IkMethod, LinkConfig, PlannerConfig, Profile, SamplerConfig,
        SamplingDomain, SolverConfig, TaskConfig,
    };
    pub use crate::error::{
        ArmError, ChainError, ConfigError, ConfigurationError, KinematicsError, PlanError,
        SingularityWarning, Unreachable, UnreachableReason, WorkspaceError,
    };
    pub use crate::types::{Configuration, JointLimits, JointType, Link, Pose};
}
