//! Kinematics for serial link arms.
//!
//! Provides forward kinematics, the position Jacobian, and inverse
//! kinematics for chains described by [`Link`](armkit_core::types::Link)s.
//!
//! # Architecture
//!
//! ```text
//! Vec<Link> ──► LinkChain ──► IkSolver ──► Configuration
//!                               ├─ analytic (planar two-link)
//!                               └─ solver   (DLS / Jacobian transpose)
//! ```
//!
//! The [`LinkChain`] is built once and shared read-only. [`IkSolver`] takes
//! a target pose and an optional seed and returns an [`IkSolution`] or an
//! [`Unreachable`](armkit_core::error::Unreachable) explaining why not.

pub mod analytic;
pub mod chain;
pub mod ik;
pub mod solver;

pub use chain::{JointFrames, LinkChain};
pub use ik::{IkSolution, IkSolver, SolveMethod, check_singularity, manipulability_index};
pub use solver::{IkTarget, IterativeResult, IterativeSolver};
