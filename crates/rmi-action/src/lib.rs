//! `rmi-action` – the joint-trajectory action.
//!
//! # Modules
//!
//! - [`joint_map`] – maps a goal's joint order onto the driver's and
//!   reorders every waypoint array.
//! - [`goal`] – [`GoalHandle`], the seam to the action-server framework,
//!   and the in-process [`BusGoalHandle`].
//! - [`trajectory_action`] – [`GoalCoordinator`], the goal lifecycle state
//!   machine.

pub mod goal;
pub mod joint_map;
pub mod trajectory_action;

pub use goal::{BusGoalHandle, GoalHandle};
pub use trajectory_action::{
    CANCEL_MESSAGE, DEFAULT_ABORT_GRACE, GoalCoordinator, PreparedGoal, SUPERSEDED_MESSAGE,
    TrajectoryActionConfig,
};
