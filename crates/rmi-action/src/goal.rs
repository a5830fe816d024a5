//! Goal handles.
//!
//! The action-server framework that delivers goals is an external
//! collaborator; the coordinator only needs to read a goal's trajectory and
//! report how it was resolved.  [`GoalHandle`] is that seam.
//! [`BusGoalHandle`] is the in-process implementation: every status it is
//! given is kept in a [`tokio::sync::watch`] history and, when a bus is
//! attached, announced on [`Topic::GoalStatus`][rmi_middleware::Topic].

use std::sync::Arc;

use rmi_middleware::CommandBus;
use rmi_types::{GoalId, GoalStatus, JointTrajectory};
use tokio::sync::watch;
use tracing::debug;

const SOURCE: &str = "rmi-action::goal";

/// A goal as seen by the coordinator.
pub trait GoalHandle: Send + Sync {
    fn id(&self) -> GoalId;

    /// The trajectory as the client sent it (joint order not yet fixed).
    fn trajectory(&self) -> &JointTrajectory;

    /// Report accepted, rejected, succeeded or canceled.
    fn resolve(&self, status: GoalStatus);
}

/// Goal handle backed by a watch channel of every status it has been given.
pub struct BusGoalHandle {
    id: GoalId,
    trajectory: JointTrajectory,
    bus: Option<CommandBus>,
    history: watch::Sender<Vec<GoalStatus>>,
}

impl BusGoalHandle {
    /// A goal whose statuses are also published on `bus`.
    pub fn new(trajectory: JointTrajectory, bus: CommandBus) -> Arc<Self> {
        Arc::new(Self::build(trajectory, Some(bus)))
    }

    /// A goal that only records its statuses.
    pub fn detached(trajectory: JointTrajectory) -> Arc<Self> {
        Arc::new(Self::build(trajectory, None))
    }

    fn build(trajectory: JointTrajectory, bus: Option<CommandBus>) -> Self {
        let (history, _) = watch::channel(Vec::new());
        Self {
            id: GoalId::new(),
            trajectory,
            bus,
            history,
        }
    }

    /// Most recent status, `None` until the coordinator has looked at it.
    pub fn status(&self) -> Option<GoalStatus> {
        self.history.borrow().last().cloned()
    }

    /// Every status in the order it was reported.
    pub fn history(&self) -> Vec<GoalStatus> {
        self.history.borrow().clone()
    }

    /// Wait until the goal reaches a terminal status and return it.
    pub async fn wait_terminal(&self) -> Option<GoalStatus> {
        let mut rx = self.history.subscribe();
        let history = rx
            .wait_for(|h| h.last().is_some_and(GoalStatus::is_terminal))
            .await
            .ok()?;
        history.last().cloned()
    }
}

impl GoalHandle for BusGoalHandle {
    fn id(&self) -> GoalId {
        self.id
    }

    fn trajectory(&self) -> &JointTrajectory {
        &self.trajectory
    }

    fn resolve(&self, status: GoalStatus) {
        if let Some(bus) = &self.bus
            && let Err(e) = bus.publish_goal_status(SOURCE, self.id, status.clone())
        {
            debug!(goal_id = %self.id, error = %e, "no listener for goal status");
        }
        self.history.send_modify(|h| h.push(status));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmi_middleware::Topic;
    use rmi_types::{EventPayload, goal_error_code};

    #[test]
    fn history_keeps_every_status() {
        let goal = BusGoalHandle::detached(JointTrajectory::default());
        assert_eq!(goal.status(), None);

        goal.resolve(GoalStatus::Accepted);
        goal.resolve(GoalStatus::Succeeded);

        assert_eq!(goal.history(), vec![GoalStatus::Accepted, GoalStatus::Succeeded]);
        assert_eq!(goal.status(), Some(GoalStatus::Succeeded));
    }

    #[tokio::test]
    async fn statuses_are_announced_on_the_bus() {
        let bus = CommandBus::default();
        let mut rx = bus.subscribe_to(Topic::GoalStatus);
        let goal = BusGoalHandle::new(JointTrajectory::default(), bus);

        let status = GoalStatus::Rejected {
            code: goal_error_code::INVALID_JOINTS,
            message: "joint 'a' missing from goal".into(),
        };
        goal.resolve(status.clone());

        match rx.recv().await.unwrap().payload {
            EventPayload::GoalStatus { goal_id, status: s } => {
                assert_eq!(goal_id, goal.id());
                assert_eq!(s, status);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn wait_terminal_skips_accepted() {
        let goal = BusGoalHandle::detached(JointTrajectory::default());
        goal.resolve(GoalStatus::Accepted);

        let waiter = {
            let goal = goal.clone();
            tokio::spawn(async move { goal.wait_terminal().await })
        };
        tokio::task::yield_now().await;
        goal.resolve(GoalStatus::Succeeded);

        assert_eq!(waiter.await.unwrap(), Some(GoalStatus::Succeeded));
    }
}
