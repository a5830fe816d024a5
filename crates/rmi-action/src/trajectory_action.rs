//! [`GoalCoordinator`] – the joint-trajectory action state machine.
//!
//! # States
//!
//! | State | Meaning |
//! |---|---|
//! | Idle | no goal is active; results are ignored |
//! | Active | one accepted goal is waiting for the result of its last command |
//!
//! # Transitions
//!
//! | Event | From | Effect |
//! |---|---|---|
//! | new goal | Idle | validate, accept, dispatch the command list |
//! | new goal | Active | abort the current goal, then as from Idle |
//! | cancel of the active goal | Active | abort |
//! | failed result | Active | abort |
//! | OK result for the last command | Active | succeed, go Idle |
//!
//! An abort always sends an ABORT command list (with the replace flag set),
//! waits the configured grace period and then resolves the active goal, if
//! any, as canceled.
//!
//! Each accepted goal gets its own range of correlation ids, so a late
//! result from a superseded goal never completes its successor.  The ABORT
//! command carries [`ABORT_COMMAND_ID`], which no goal range contains.
//!
//! Every transition runs under one async mutex, so goal, cancel and result
//! callbacks arriving from different tasks never interleave.  The grace
//! period is a [`tokio::time::sleep`] inside the transition: it holds back
//! other transitions but never blocks a worker thread.

use std::sync::Arc;
use std::time::Duration;

use rmi_commands::CommandRegistry;
use rmi_middleware::{CommandBus, CommandPublisher, Topic};
use rmi_types::{
    ABORT_COMMAND_ID, CommandList, CommandResult, EventPayload, GoalId, GoalStatus,
    JointTrajectory, RmiError, goal_error_code, result_code,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::goal::GoalHandle;
use crate::joint_map::{joint_mapping, reorder_trajectory};

const SOURCE: &str = "rmi-action::joint_trajectory_action";

/// Delay between sending ABORT and resolving the goal.
pub const DEFAULT_ABORT_GRACE: Duration = Duration::from_millis(200);

/// Message attached to a goal canceled on request.
pub const CANCEL_MESSAGE: &str = "Goal cancelled";

/// Message attached to a goal replaced by a newer one.
pub const SUPERSEDED_MESSAGE: &str = "a goal was active";

#[derive(Debug, Clone)]
pub struct TrajectoryActionConfig {
    /// Used as a log field only.
    pub namespace: String,
    pub abort_grace: Duration,
}

impl Default for TrajectoryActionConfig {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            abort_grace: DEFAULT_ABORT_GRACE,
        }
    }
}

/// A validated goal ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedGoal {
    /// The trajectory in the driver's joint order.
    pub trajectory: JointTrajectory,
    pub commands: CommandList,
    /// Correlation id whose OK result completes the goal.
    pub last_command_id: u32,
}

#[derive(Default)]
struct GoalState {
    active_goal: Option<Arc<dyn GoalHandle>>,
    last_correlation_id: u32,
    /// First id of the next goal's range.
    next_correlation_id: u32,
}

impl GoalState {
    /// Reserve `span` consecutive ids and return the first.  Starts over at
    /// 0 rather than reach [`ABORT_COMMAND_ID`].
    fn reserve_ids(&mut self, span: u32) -> u32 {
        let base = match self.next_correlation_id.checked_add(span) {
            Some(end) if end < ABORT_COMMAND_ID => self.next_correlation_id,
            _ => 0,
        };
        self.next_correlation_id = base + span;
        base
    }
}

/// Serializes goal, cancel and result handling for one robot.
pub struct GoalCoordinator {
    namespace: String,
    joint_names: Vec<String>,
    registry: Arc<CommandRegistry>,
    publisher: Arc<dyn CommandPublisher>,
    abort_grace: Duration,
    state: Mutex<GoalState>,
}

impl GoalCoordinator {
    /// The canonical joint order is taken from the registry context.
    pub fn new(
        config: TrajectoryActionConfig,
        registry: Arc<CommandRegistry>,
        publisher: Arc<dyn CommandPublisher>,
    ) -> Self {
        Self {
            namespace: config.namespace,
            joint_names: registry.context().joint_names().to_vec(),
            registry,
            publisher,
            abort_grace: config.abort_grace,
            state: Mutex::new(GoalState::default()),
        }
    }

    pub fn joint_names(&self) -> &[String] {
        &self.joint_names
    }

    pub fn abort_grace(&self) -> Duration {
        self.abort_grace
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Handle a newly delivered goal.
    ///
    /// A goal that fails validation is rejected and never becomes active.
    /// Otherwise it is accepted before its command list is dispatched.
    pub async fn on_goal(&self, goal: Arc<dyn GoalHandle>) {
        let mut state = self.state.lock().await;
        let goal_id = goal.id();
        info!(namespace = %self.namespace, %goal_id, "new trajectory goal received");

        if state.active_goal.is_some() {
            info!(namespace = %self.namespace, "a goal was active, aborting it first");
            self.abort_locked(&mut state, goal_error_code::ABORTED, SUPERSEDED_MESSAGE)
                .await;
        }
        state.last_correlation_id = 0;

        let mut prepared = match self.prepare(goal.trajectory()) {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!(namespace = %self.namespace, %goal_id, error = %e, "rejecting goal");
                goal.resolve(GoalStatus::Rejected {
                    code: e.goal_code(),
                    message: e.to_string(),
                });
                return;
            }
        };

        let span = prepared
            .commands
            .commands
            .iter()
            .map(|c| c.command_id + 1)
            .max()
            .unwrap_or(1);
        let base = state.reserve_ids(span);
        for command in &mut prepared.commands.commands {
            command.command_id += base;
        }
        prepared.last_command_id += base;

        state.last_correlation_id = prepared.last_command_id;
        goal.resolve(GoalStatus::Accepted);
        state.active_goal = Some(goal);
        info!(
            namespace = %self.namespace,
            %goal_id,
            commands = prepared.commands.commands.len(),
            last_command_id = prepared.last_command_id,
            "goal accepted, dispatching command list"
        );

        if let Err(e) = self.publisher.publish_command_list(SOURCE, prepared.commands) {
            warn!(namespace = %self.namespace, %goal_id, error = %e, "command list dispatch failed");
            let message = format!("failed to dispatch command list: {e}");
            self.abort_locked(&mut state, goal_error_code::ABORTED, &message)
                .await;
        }
    }

    /// Cancel `goal_id`.  Does nothing unless it is the active goal.
    pub async fn on_cancel(&self, goal_id: GoalId) {
        let mut state = self.state.lock().await;
        let is_active = state
            .active_goal
            .as_ref()
            .is_some_and(|g| g.id() == goal_id);
        if !is_active {
            debug!(namespace = %self.namespace, %goal_id, "cancel for inactive goal ignored");
            return;
        }
        info!(namespace = %self.namespace, %goal_id, "cancel requested");
        self.abort_locked(&mut state, goal_error_code::ABORTED, CANCEL_MESSAGE)
            .await;
    }

    /// Handle a completion notification from the controller.
    ///
    /// Any failed result aborts the active goal.  Only an
    /// [`result_code::OK`] result for the goal's last command completes it;
    /// [`result_code::ABORT_OK`] is neither.
    pub async fn on_result(&self, result: &CommandResult) {
        let mut state = self.state.lock().await;
        if state.active_goal.is_none() {
            debug!(command_id = result.command_id, "result while idle ignored");
            return;
        }

        if !result.is_ok() {
            let failure = RmiError::ExternalFailure {
                code: result.result_code,
                message: result.additional_information.clone(),
            };
            warn!(
                namespace = %self.namespace,
                command_id = result.command_id,
                error = %failure,
                "command failed on the controller"
            );
            self.abort_locked(&mut state, failure.goal_code(), &failure.to_string())
                .await;
        } else if result.result_code == result_code::OK
            && result.command_id == state.last_correlation_id
            && let Some(goal) = state.active_goal.take()
        {
            info!(namespace = %self.namespace, goal_id = %goal.id(), "trajectory goal succeeded");
            goal.resolve(GoalStatus::Succeeded);
        }
    }

    /// Stop the robot.  ABORT is dispatched even when no goal is active.
    ///
    /// The grace sleep holds the coordinator lock, so goals, cancels and
    /// results arriving meanwhile wait until the abort has resolved.
    pub async fn abort(&self, code: i32, message: &str) {
        let mut state = self.state.lock().await;
        self.abort_locked(&mut state, code, message).await;
    }

    /// Caller holds the state lock for the whole grace period.
    async fn abort_locked(&self, state: &mut GoalState, code: i32, message: &str) {
        if let Err(e) = self
            .publisher
            .publish_command_list(SOURCE, CommandList::abort())
        {
            warn!(namespace = %self.namespace, error = %e, "ABORT dispatch failed");
        }
        tokio::time::sleep(self.abort_grace).await;

        if let Some(goal) = state.active_goal.take() {
            info!(namespace = %self.namespace, goal_id = %goal.id(), code, reason = message, "goal aborted");
            goal.resolve(GoalStatus::Canceled {
                code,
                message: message.to_string(),
            });
        } else {
            info!(namespace = %self.namespace, code, reason = message, "abort sent with no active goal");
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Fix the joint order of `trajectory` and build its command list.
    ///
    /// # Errors
    ///
    /// * [`RmiError::InvalidJoints`] – the goal's joints do not match the
    ///   driver's joints.
    /// * [`RmiError::InvalidGoal`] – a waypoint array has the wrong length,
    ///   no command list could be built, or a command uses the id reserved
    ///   for ABORT.
    ///
    /// Command ids start at 0 here; [`Self::on_goal`] moves them into the
    /// goal's own range.
    pub fn prepare(&self, trajectory: &JointTrajectory) -> Result<PreparedGoal, RmiError> {
        let mapping = joint_mapping(&self.joint_names, &trajectory.joint_names)?;
        let trajectory = reorder_trajectory(&mapping, trajectory)?;

        let commands = self.registry.trajectory_builder().build(&trajectory);
        let Some(last_command_id) = commands.last_command_id() else {
            return Err(RmiError::InvalidGoal(
                "unable to create a command list".into(),
            ));
        };
        if commands
            .commands
            .iter()
            .any(|c| c.command_id == ABORT_COMMAND_ID)
        {
            return Err(RmiError::InvalidGoal(
                "command list uses the ABORT command id".into(),
            ));
        }

        Ok(PreparedGoal {
            trajectory,
            commands,
            last_command_id,
        })
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    pub async fn is_active(&self) -> bool {
        self.state.lock().await.active_goal.is_some()
    }

    pub async fn active_goal_id(&self) -> Option<GoalId> {
        self.state.lock().await.active_goal.as_ref().map(|g| g.id())
    }

    pub async fn last_correlation_id(&self) -> u32 {
        self.state.lock().await.last_correlation_id
    }

    /// Feed every [`Topic::CommandResult`] event into [`Self::on_result`].
    /// Subscribes before spawning, so no result published after this call
    /// returns is missed.
    pub fn spawn_result_listener(self: Arc<Self>, bus: &CommandBus) -> JoinHandle<()> {
        let mut rx = bus.subscribe_to(Topic::CommandResult);
        tokio::spawn(async move {
            while let Some(event) = rx.next().await {
                if let EventPayload::CommandResult(result) = event.payload {
                    self.on_result(&result).await;
                }
            }
            debug!("result listener stopped");
        })
    }
}
