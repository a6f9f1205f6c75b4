//! Pick-and-place task sequencer.
//!
//! [`PickPlaceSequencer`] walks an arm through
//!
//! ```text
//! Idle ─start─► MovingToPick ─► Grasping ─► MovingToPlace ─► Releasing ─► MovingHome ─► Done
//!                    │                            │                            │
//!                    └────────────── IK failure ──┴────────────────────────────┴──► Failed
//! ```
//!
//! The caller drives it: every [`advance`](PickPlaceSequencer::advance)
//! consumes one configuration of the active trajectory. The trajectory's
//! first entry is the configuration the arm already holds, so it is skipped
//! when a motion begins. There is no internal clock.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use armkit_core::config::ArmConfig;
use armkit_core::error::{
    ConfigurationError, KinematicsError, PlanError, SingularityWarning, Unreachable,
};
use armkit_core::types::{Configuration, Pose};
use armkit_ik::{IkSolver, LinkChain};

use crate::trajectory::{TrajectoryCursor, TrajectoryPlanner};

/// Configurations per motion when none are configured.
const DEFAULT_STEPS: usize = 50;

// ---------------------------------------------------------------------------
// Task description
// ---------------------------------------------------------------------------

/// Where the object is picked, where it is placed, and where the arm rests
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PickPlaceTask {
    pub pick: Pose,
    pub place: Pose,
    pub home: Pose,
}

impl PickPlaceTask {
    pub const fn new(pick: Pose, place: Pose, home: Pose) -> Self {
        Self { pick, place, home }
    }

    pub const fn pose(&self, target: TaskTarget) -> Pose {
        match target {
            TaskTarget::Pick => self.pick,
            TaskTarget::Place => self.place,
            TaskTarget::Home => self.home,
        }
    }
}

/// One of the three task poses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskTarget {
    Pick,
    Place,
    Home,
}

impl TaskTarget {
    const fn moving_state(self) -> SequencerState {
        match self {
            Self::Pick => SequencerState::MovingToPick,
            Self::Place => SequencerState::MovingToPlace,
            Self::Home => SequencerState::MovingHome,
        }
    }
}

impl fmt::Display for TaskTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pick => "pick",
            Self::Place => "place",
            Self::Home => "home",
        })
    }
}

// ---------------------------------------------------------------------------
// State and failures
// ---------------------------------------------------------------------------

/// Phase of a pick-and-place run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencerState {
    Idle,
    MovingToPick,
    Grasping,
    MovingToPlace,
    Releasing,
    MovingHome,
    Done,
    Failed,
}

impl SequencerState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub const fn is_moving(self) -> bool {
        matches!(
            self,
            Self::MovingToPick | Self::MovingToPlace | Self::MovingHome
        )
    }
}

impl fmt::Display for SequencerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Idle => "idle",
            Self::MovingToPick => "moving to pick",
            Self::Grasping => "grasping",
            Self::MovingToPlace => "moving to place",
            Self::Releasing => "releasing",
            Self::MovingHome => "moving home",
            Self::Done => "done",
            Self::Failed => "failed",
        })
    }
}

/// Why a motion could not be started.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    #[error(transparent)]
    Kinematics(#[from] KinematicsError),

    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// The target the sequencer failed to reach, and why.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot move to {target} pose: {error}")]
pub struct TaskFailure {
    pub target: TaskTarget,
    pub pose: Pose,
    pub error: TaskError,
}

impl TaskFailure {
    /// The unreachable-target details, if IK rejected the pose.
    pub fn unreachable(&self) -> Option<&Unreachable> {
        match &self.error {
            TaskError::Kinematics(e) => e.as_unreachable(),
            TaskError::Plan(_) => None,
        }
    }
}

/// Snapshot emitted after every [`advance`](PickPlaceSequencer::advance).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequencerStep {
    pub state: SequencerState,
    pub configuration: Configuration,
    pub object_attached: bool,
    pub object_pose: Pose,
    /// Set while the active motion ends near a singular configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub singularity: Option<SingularityWarning>,
}

// ---------------------------------------------------------------------------
// PickPlaceSequencer
// ---------------------------------------------------------------------------

/// Drives one pick-and-place run over a shared chain.
#[derive(Debug, Clone)]
pub struct PickPlaceSequencer {
    chain: Arc<LinkChain>,
    task: PickPlaceTask,
    solver: IkSolver,
    planner: TrajectoryPlanner,
    steps: usize,

    state: SequencerState,
    current: Configuration,
    cursor: Option<TrajectoryCursor>,
    object_attached: bool,
    object_pose: Pose,
    singularity: Option<SingularityWarning>,
    failure: Option<TaskFailure>,
}

impl PickPlaceSequencer {
    /// Sequencer with default solver and planner, starting at the chain's mid
    /// configuration.
    pub fn new(chain: Arc<LinkChain>, task: PickPlaceTask) -> Self {
        let current = chain.mid_configuration();
        Self {
            chain,
            task,
            solver: IkSolver::default(),
            planner: TrajectoryPlanner::default(),
            steps: DEFAULT_STEPS,
            state: SequencerState::Idle,
            current,
            cursor: None,
            object_attached: false,
            object_pose: task.pick,
            singularity: None,
            failure: None,
        }
    }

    /// Sequencer using the task, solver and planner settings of `config`.
    pub fn from_config(chain: Arc<LinkChain>, config: &ArmConfig) -> Result<Self, PlanError> {
        let task = PickPlaceTask::new(
            config.task.pick_pose(),
            config.task.place_pose(),
            config.task.home_pose(),
        );
        Self::new(chain, task)
            .with_solver(IkSolver::new(config.solver))
            .with_planner(
                TrajectoryPlanner::from_config(&config.planner),
                config.planner.steps,
            )
    }

    #[must_use]
    pub fn with_solver(mut self, solver: IkSolver) -> Self {
        self.solver = solver;
        self
    }

    /// Use `planner` with `steps` configurations per motion (>= 2).
    pub fn with_planner(
        mut self,
        planner: TrajectoryPlanner,
        steps: usize,
    ) -> Result<Self, PlanError> {
        if steps < 2 {
            return Err(PlanError::InvalidStepCount(steps));
        }
        self.planner = planner;
        self.steps = steps;
        Ok(self)
    }

    /// Start from `configuration` instead of the mid configuration.
    pub fn with_initial_configuration(
        mut self,
        configuration: Configuration,
    ) -> Result<Self, ConfigurationError> {
        self.chain.validate(&configuration)?;
        self.current = configuration;
        Ok(self)
    }

    pub const fn state(&self) -> SequencerState {
        self.state
    }

    pub const fn task(&self) -> &PickPlaceTask {
        &self.task
    }

    pub fn chain(&self) -> &LinkChain {
        &self.chain
    }

    pub const fn current_configuration(&self) -> &Configuration {
        &self.current
    }

    pub const fn object_attached(&self) -> bool {
        self.object_attached
    }

    /// Where the object is: at the pick pose until grasped, following the
    /// end effector while attached, at the place pose after release.
    pub const fn object_pose(&self) -> Pose {
        self.object_pose
    }

    /// Warning for the motion in progress, if its target solution is
    /// near-singular.
    pub const fn singularity(&self) -> Option<&SingularityWarning> {
        self.singularity.as_ref()
    }

    pub const fn failure(&self) -> Option<&TaskFailure> {
        self.failure.as_ref()
    }

    /// Configurations left in the active motion.
    pub fn remaining_steps(&self) -> usize {
        self.cursor.as_ref().map_or(0, TrajectoryCursor::remaining)
    }

    /// Solve the pick pose and begin moving toward it.
    ///
    /// Only acts in [`Idle`](SequencerState::Idle); otherwise returns the
    /// current state unchanged. If the pick pose cannot be reached the
    /// sequencer goes straight to [`Failed`](SequencerState::Failed).
    pub fn start(&mut self) -> Result<SequencerState, TaskFailure> {
        if self.state == SequencerState::Idle {
            self.begin_motion(TaskTarget::Pick);
        }
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(self.state),
        }
    }

    /// Consume one configuration of the active motion, or perform the
    /// grasp / release action. No-op in `Idle`, `Done` and `Failed`.
    pub fn advance(&mut self) -> SequencerStep {
        match self.state {
            SequencerState::Idle | SequencerState::Done | SequencerState::Failed => {}
            SequencerState::MovingToPick
            | SequencerState::MovingToPlace
            | SequencerState::MovingHome => self.advance_motion(),
            SequencerState::Grasping => {
                self.object_attached = true;
                self.follow_end_effector();
                debug!("object grasped");
                self.begin_motion(TaskTarget::Place);
            }
            SequencerState::Releasing => {
                self.object_attached = false;
                self.object_pose = self.task.place;
                debug!("object released");
                self.begin_motion(TaskTarget::Home);
            }
        }
        self.snapshot()
    }

    /// Start if idle, then advance until `Done` or `Failed`, collecting every
    /// emitted step.
    pub fn run_to_completion(&mut self) -> Result<Vec<SequencerStep>, TaskFailure> {
        self.start()?;
        let mut steps = Vec::new();
        while !self.state.is_terminal() {
            steps.push(self.advance());
        }
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(steps),
        }
    }

    /// Back to `Idle` at the current configuration, object at the pick pose.
    pub fn reset(&mut self) {
        self.state = SequencerState::Idle;
        self.cursor = None;
        self.object_attached = false;
        self.object_pose = self.task.pick;
        self.singularity = None;
        self.failure = None;
    }

    fn snapshot(&self) -> SequencerStep {
        SequencerStep {
            state: self.state,
            configuration: self.current.clone(),
            object_attached: self.object_attached,
            object_pose: self.object_pose,
            singularity: self.singularity,
        }
    }

    fn advance_motion(&mut self) {
        let complete = match &mut self.cursor {
            Some(cursor) => {
                if let Some(q) = cursor.next() {
                    self.current = q;
                }
                cursor.is_complete()
            }
            None => true,
        };
        if self.object_attached {
            self.follow_end_effector();
        }
        if complete {
            self.cursor = None;
            self.singularity = None;
            self.transition(match self.state {
                SequencerState::MovingToPick => SequencerState::Grasping,
                SequencerState::MovingToPlace => SequencerState::Releasing,
                _ => SequencerState::Done,
            });
        }
    }

    fn follow_end_effector(&mut self) {
        if let Ok(pose) = self.chain.forward_kinematics_clamped(&self.current) {
            self.object_pose = pose;
        }
    }

    /// Solve IK for `target` and plan the motion there, or fail.
    fn begin_motion(&mut self, target: TaskTarget) {
        let pose = self.task.pose(target);
        match self.plan_to(&pose) {
            Ok((cursor, singularity)) => {
                if let Some(w) = &singularity {
                    warn!(%target, %w, "motion target near singularity");
                }
                self.cursor = Some(cursor);
                self.singularity = singularity;
                self.transition(target.moving_state());
            }
            Err(error) => {
                let failure = TaskFailure {
                    target,
                    pose,
                    error,
                };
                warn!(%failure, "pick-and-place failed");
                self.cursor = None;
                self.singularity = None;
                self.failure = Some(failure);
                self.transition(SequencerState::Failed);
            }
        }
    }

    fn plan_to(
        &self,
        pose: &Pose,
    ) -> Result<(TrajectoryCursor, Option<SingularityWarning>), TaskError> {
        let solution = self.solver.solve(&self.chain, pose, Some(&self.current))?;
        let trajectory = self
            .planner
            .plan(&self.current, &solution.configuration, self.steps)?;
        let mut cursor = trajectory.into_cursor();
        // Entry 0 is the current configuration.
        cursor.next();
        Ok((cursor, solution.singularity))
    }

    fn transition(&mut self, next: SequencerState) {
        debug!(from = %self.state, to = %next, "sequencer transition");
        self.state = next;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
