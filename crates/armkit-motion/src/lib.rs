//! Joint-space motion for armkit: trajectory planning and the
//! pick-and-place sequencer built on top of it.

pub mod sequencer;
pub mod trajectory;

pub use sequencer::{
    PickPlaceSequencer, PickPlaceTask, SequencerState, SequencerStep, TaskError, TaskFailure,
    TaskTarget,
};
pub use trajectory::{Trajectory, TrajectoryCursor, TrajectoryPlanner};
