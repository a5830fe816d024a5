//! `rmi-types` – shared message vocabulary of the RMI driver.
//!
//! Everything that crosses a crate boundary lives here: the structured
//! command request ([`CommandMsg`]), the dispatched [`CommandList`], the
//! asynchronous [`CommandResult`] notification, the trajectory goal types,
//! the bus envelope ([`Event`]) and the workspace-wide [`RmiError`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Result and error codes
// ─────────────────────────────────────────────────────────────────────────────

/// Status codes carried by a [`CommandResult`].
pub mod result_code {
    /// The command completed.
    pub const OK: i32 = 0;
    /// No registered handler matched the request.
    pub const FAILED_TO_FIND_HANDLER: i32 = 1;
    /// The transport could not reach the controller.
    pub const SOCKET_FAILED_TO_CONNECT: i32 = 2;
    /// The controller failed to abort.
    pub const ABORT_FAIL: i32 = 9998;
    /// The controller acknowledged an abort.
    pub const ABORT_OK: i32 = 9999;
}

/// Error codes reported when a trajectory goal is rejected or canceled.
pub mod goal_error_code {
    pub const SUCCESSFUL: i32 = 0;
    pub const INVALID_GOAL: i32 = -1;
    pub const INVALID_JOINTS: i32 = -2;
    /// Used for every abort/cancel resolution.
    pub const ABORTED: i32 = -100;
}

// ─────────────────────────────────────────────────────────────────────────────
// Structured command request
// ─────────────────────────────────────────────────────────────────────────────

/// A structured motion/setting request.
///
/// Every field is optional in the sense that an empty string or an empty
/// list means "not set".  The same shape doubles as a matching template
/// for command handlers, where only the populated fields are checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandMsg {
    /// Correlation id, echoed back in the matching [`CommandResult`].
    pub command_id: u32,
    /// Command verb, e.g. `"PTP"`, `"LIN"`, `"ABORT"`.
    pub command_type: String,
    pub pose_reference: String,
    /// e.g. `"JOINTS"`, `"QUATERNION"`.
    pub pose_type: String,
    pub pose: Vec<f32>,
    pub velocity_type: String,
    pub velocity: Vec<f32>,
    pub acceleration_type: String,
    pub acceleration: Vec<f32>,
    pub deceleration_type: String,
    pub deceleration: Vec<f32>,
    pub blending_type: String,
    pub blending: Vec<f32>,
    pub force_threshold_type: String,
    pub force_threshold: Vec<f32>,
    pub effort_type: String,
    pub effort: Vec<f32>,
    pub additional_parameters: Vec<String>,
    pub additional_values: Vec<f32>,
}

impl CommandMsg {
    /// Shorthand for a request that only carries a verb.
    pub fn with_type(command_type: impl Into<String>) -> Self {
        Self {
            command_type: command_type.into(),
            ..Self::default()
        }
    }
}

/// An ordered batch of requests sent to the driver in one message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandList {
    pub commands: Vec<CommandMsg>,
    /// When set, the receiver discards every queued-but-unsent command
    /// before accepting this list.
    pub replace_previous_commands: bool,
}

/// Correlation id carried by the ABORT request.  Trajectory commands never
/// use it, so an abort acknowledgement cannot be mistaken for a trajectory
/// command's completion.
pub const ABORT_COMMAND_ID: u32 = u32::MAX;

impl CommandList {
    /// The single-command list used to stop the controller.
    pub fn abort() -> Self {
        let mut abort = CommandMsg::with_type("ABORT");
        abort.command_id = ABORT_COMMAND_ID;
        Self {
            commands: vec![abort],
            replace_previous_commands: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Correlation id of the final command, if any.
    pub fn last_command_id(&self) -> Option<u32> {
        self.commands.last().map(|c| c.command_id)
    }
}

/// Asynchronous completion notification for one dispatched command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub command_id: u32,
    /// One of the [`result_code`] constants, or an application error.
    pub result_code: i32,
    #[serde(default)]
    pub additional_information: String,
}

impl CommandResult {
    pub fn new(command_id: u32, result_code: i32, info: impl Into<String>) -> Self {
        Self {
            command_id,
            result_code,
            additional_information: info.into(),
        }
    }

    /// `true` for [`result_code::OK`] and [`result_code::ABORT_OK`].
    pub fn is_ok(&self) -> bool {
        self.result_code == result_code::OK || self.result_code == result_code::ABORT_OK
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Trajectory goal
// ─────────────────────────────────────────────────────────────────────────────

/// One trajectory sample.  `positions` is required; the other arrays are
/// either empty or the same length as `positions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Waypoint {
    pub positions: Vec<f64>,
    pub velocities: Vec<f64>,
    pub accelerations: Vec<f64>,
    pub effort: Vec<f64>,
    /// Passed through untouched.
    pub time_from_start: Duration,
}

impl Waypoint {
    pub fn from_positions(positions: Vec<f64>) -> Self {
        Self {
            positions,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JointTrajectory {
    pub joint_names: Vec<String>,
    pub points: Vec<Waypoint>,
}

/// Identifier of a trajectory-following goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GoalId(pub Uuid);

impl GoalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GoalId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GoalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Resolution reported for a goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GoalStatus {
    Accepted,
    Rejected { code: i32, message: String },
    Succeeded,
    Canceled { code: i32, message: String },
}

impl GoalStatus {
    /// `true` for every status except [`GoalStatus::Accepted`].
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GoalStatus::Accepted)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bus envelope
// ─────────────────────────────────────────────────────────────────────────────

/// Unified envelope for everything routed over the command bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. `"rmi-action::joint_trajectory_action"`
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    CommandList(CommandList),
    CommandResult(CommandResult),
    GoalStatus { goal_id: GoalId, status: GoalStatus },
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Error type shared by every RMI crate.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RmiError {
    #[error("Invalid joints: {0}")]
    InvalidJoints(String),

    #[error("Invalid goal: {0}")]
    InvalidGoal(String),

    #[error("Command build failed in {handler}: {details}")]
    BuildFailed { handler: String, details: String },

    #[error("No handler matched command '{0}'")]
    NoHandlerMatch(String),

    #[error("Controller reported failure {code}: {message}")]
    ExternalFailure { code: i32, message: String },

    #[error("Bus channel error: {0}")]
    Channel(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RmiError {
    /// The goal error code a rejection caused by this error carries.
    pub fn goal_code(&self) -> i32 {
        match self {
            RmiError::InvalidJoints(_) => goal_error_code::INVALID_JOINTS,
            RmiError::ExternalFailure { .. } => goal_error_code::ABORTED,
            _ => goal_error_code::INVALID_GOAL,
        }
    }
}
