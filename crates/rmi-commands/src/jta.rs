//! Trajectory-to-command translation.
//!
//! A [`TrajectoryCommandBuilder`] turns a [`JointTrajectory`] whose arrays are
//! already in the driver's canonical joint order into the [`CommandList`]
//! that the trajectory action dispatches.
//!
//! [`TrajectoryCommandBuilder::build`] routes the first waypoint through
//! [`process_first_point`](TrajectoryCommandBuilder::process_first_point),
//! the last one through
//! [`process_last_point`](TrajectoryCommandBuilder::process_last_point) and
//! everything in between through
//! [`process_point`](TrajectoryCommandBuilder::process_point).  The hooks
//! default to the plain per-point rule; override them to inject setup
//! commands before motion starts or waits after it ends.
//!
//! Correlation ids are assigned per emitted command, starting at 0 for every
//! call to `build`.

use rmi_types::{CommandList, CommandMsg, JointTrajectory, Waypoint};

/// Type tag attached to every velocity/acceleration/effort modifier.
pub const ROS_PARAM_TYPE: &str = "ROS";

/// Translator from trajectory waypoints to dispatched commands.
pub trait TrajectoryCommandBuilder: Send + Sync {
    fn name(&self) -> &str {
        "JTA Command"
    }

    /// Build the full command list.  An empty trajectory yields an empty
    /// list, which callers must treat as "no valid command list".
    fn build(&self, trajectory: &JointTrajectory) -> CommandList {
        let mut list = CommandList::default();
        let last = trajectory.points.len().saturating_sub(1);
        for (i, point) in trajectory.points.iter().enumerate() {
            if i == 0 {
                self.process_first_point(point, &mut list);
            } else if i == last {
                self.process_last_point(point, &mut list);
            } else {
                self.process_point(point, &mut list);
            }
        }
        list
    }

    /// Append one `PTP`/`JOINTS` command for `point`.
    fn process_point(&self, point: &Waypoint, list: &mut CommandList) {
        let mut cmd = CommandMsg {
            command_id: next_command_id(list),
            command_type: "PTP".to_string(),
            pose_type: "JOINTS".to_string(),
            pose: to_f32(&point.positions),
            ..CommandMsg::default()
        };
        if !point.velocities.is_empty() {
            cmd.velocity_type = ROS_PARAM_TYPE.to_string();
            cmd.velocity = to_f32(&point.velocities);
        }
        if !point.accelerations.is_empty() {
            cmd.acceleration_type = ROS_PARAM_TYPE.to_string();
            cmd.acceleration = to_f32(&point.accelerations);
        }
        if !point.effort.is_empty() {
            cmd.effort_type = ROS_PARAM_TYPE.to_string();
            cmd.effort = to_f32(&point.effort);
        }
        list.commands.push(cmd);
    }

    fn process_first_point(&self, point: &Waypoint, list: &mut CommandList) {
        self.process_point(point, list);
    }

    fn process_last_point(&self, point: &Waypoint, list: &mut CommandList) {
        self.process_point(point, list);
    }
}

/// The stock builder: every hook uses the plain per-point rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct JtaCommandBuilder;

impl TrajectoryCommandBuilder for JtaCommandBuilder {}

/// The correlation id the next appended command should carry.  Ids count
/// up from 0 and never reach [`ABORT_COMMAND_ID`][rmi_types::ABORT_COMMAND_ID]
/// for any trajectory that fits in memory.
pub fn next_command_id(list: &CommandList) -> u32 {
    list.commands.len() as u32
}

fn to_f32(values: &[f64]) -> Vec<f32> {
    values.iter().map(|&v| v as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trajectory(n: usize) -> JointTrajectory {
        JointTrajectory {
            joint_names: vec!["a".into(), "b".into(), "c".into()],
            points: (0..n)
                .map(|i| Waypoint::from_positions(vec![i as f64, 0.5, -1.0]))
                .collect(),
        }
    }

    /// Adds a tool setting before motion and a wait after it.
    struct SetupAndWaitBuilder;

    impl TrajectoryCommandBuilder for SetupAndWaitBuilder {
        fn process_first_point(&self, point: &Waypoint, list: &mut CommandList) {
            list.commands.push(CommandMsg {
                command_id: next_command_id(list),
                ..CommandMsg::with_type("SETTING")
            });
            self.process_point(point, list);
        }

        fn process_last_point(&self, point: &Waypoint, list: &mut CommandList) {
            self.process_point(point, list);
            list.commands.push(CommandMsg {
                command_id: next_command_id(list),
                ..CommandMsg::with_type("WAIT")
            });
        }
    }

    #[test]
    fn five_points_get_ids_zero_to_four() {
        let list = JtaCommandBuilder.build(&trajectory(5));
        let ids: Vec<u32> = list.commands.iter().map(|c| c.command_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(list.last_command_id(), Some(4));
        assert!(!list.replace_previous_commands);
        for cmd in &list.commands {
            assert_eq!(cmd.command_type, "PTP");
            assert_eq!(cmd.pose_type, "JOINTS");
            assert_eq!(cmd.pose.len(), 3);
        }
    }

    #[test]
    fn empty_trajectory_gives_empty_list() {
        assert!(JtaCommandBuilder.build(&trajectory(0)).is_empty());
    }

    #[test]
    fn optional_arrays_become_ros_modifiers_independently() {
        let mut traj = trajectory(1);
        traj.points[0].velocities = vec![0.1, 0.2, 0.3];
        traj.points[0].effort = vec![5.0, 5.0, 5.0];
        let list = JtaCommandBuilder.build(&traj);
        let cmd = &list.commands[0];
        assert_eq!(cmd.velocity_type, "ROS");
        assert_eq!(cmd.velocity, vec![0.1, 0.2, 0.3]);
        assert_eq!(cmd.effort_type, "ROS");
        assert!(cmd.acceleration_type.is_empty());
        assert!(cmd.acceleration.is_empty());
    }

    #[test]
    fn hooks_shift_ids_per_emitted_command() {
        let list = SetupAndWaitBuilder.build(&trajectory(3));
        let kinds: Vec<&str> = list.commands.iter().map(|c| c.command_type.as_str()).collect();
        assert_eq!(kinds, vec!["SETTING", "PTP", "PTP", "PTP", "WAIT"]);
        let ids: Vec<u32> = list.commands.iter().map(|c| c.command_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn single_point_goes_through_first_hook_only() {
        let list = SetupAndWaitBuilder.build(&trajectory(1));
        let kinds: Vec<&str> = list.commands.iter().map(|c| c.command_type.as_str()).collect();
        assert_eq!(kinds, vec!["SETTING", "PTP"]);
    }

    #[test]
    fn counter_restarts_on_every_build() {
        let builder = JtaCommandBuilder;
        builder.build(&trajectory(4));
        let again = builder.build(&trajectory(2));
        assert_eq!(again.commands[0].command_id, 0);
        assert_eq!(again.last_command_id(), Some(1));
    }
}
