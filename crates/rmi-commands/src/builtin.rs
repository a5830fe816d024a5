//! Stock handlers for a generic joint-space controller.
//!
//! [`register_default_handlers`] adds them in most-specific-first order:
//!
//! | Request | Command | Kind |
//! |---|---|---|
//! | `PTP` / `JOINTS` / pose = joint count | `ptp : j1 .. jn;` | Queued |
//! | `LIN` / `QUATERNION` / pose[7] | `lin : x y z qw qx qy qz;` | Queued |
//! | `GET` / `JOINT_POSITION` | `get joint position;` | Immediate |
//! | `IO_IN` / `DIO` / pose[1] | `get dio : port;` | Immediate |
//! | `ABORT` | `abort;` | Immediate |
//!
//! Motion commands translate `velocity` into a `speed` modifier and
//! `blending` into an `overlap` modifier when the request carries them.

use rmi_types::{CommandMsg, RmiError};

use crate::handler::{CommandHandler, FnHandler};
use crate::registry::{CommandRegistry, RegistryContext};
use crate::robot_command::{Command, CommandKind};

/// Register every stock handler on `registry`.
pub fn register_default_handlers(registry: &mut CommandRegistry) {
    registry.add_handler(Box::new(PtpJointsHandler::default()));
    registry.add_handler(Box::new(LinQuaternionHandler::default()));
    registry.add_handler(Box::new(GetJointPositionHandler::default()));
    registry.add_handler(Box::new(DigitalInputHandler::default()));
    registry.add_handler(Box::new(
        FnHandler::new(CommandMsg::with_type("ABORT"), |_| {
            Some(Command::new(CommandKind::Immediate, "abort", ""))
        })
        .with_name("ABORT"),
    ));
}

fn add_motion_modifiers(cmd: &mut Command, request: &CommandMsg) {
    if !request.velocity.is_empty() {
        cmd.add_values("speed", &request.velocity);
    }
    if !request.blending.is_empty() {
        cmd.add_values("overlap", &request.blending);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PTP in joint space
// ────────────────────────────────────────────────────────────────────────────

/// Point-to-point move in joint space.  The expected pose length is the
/// robot's joint count, learned in [`CommandHandler::initialize`].
pub struct PtpJointsHandler {
    sample: CommandMsg,
}

impl Default for PtpJointsHandler {
    fn default() -> Self {
        Self {
            sample: CommandMsg {
                command_type: "PTP".to_string(),
                pose_type: "JOINTS".to_string(),
                ..CommandMsg::default()
            },
        }
    }
}

impl CommandHandler for PtpJointsHandler {
    fn name(&self) -> &str {
        "PTP JOINTS"
    }

    fn sample(&self) -> &CommandMsg {
        &self.sample
    }

    fn initialize(&mut self, ctx: &RegistryContext) {
        self.sample.pose = vec![0.0; ctx.joint_count()];
    }

    fn build(&self, request: &CommandMsg, _ctx: &RegistryContext) -> Result<Command, RmiError> {
        let mut cmd = Command::with_values(CommandKind::Queued, "ptp", &request.pose);
        add_motion_modifiers(&mut cmd, request);
        Ok(cmd)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LIN in Cartesian space
// ────────────────────────────────────────────────────────────────────────────

/// Linear move to a position + quaternion pose.
pub struct LinQuaternionHandler {
    sample: CommandMsg,
}

impl Default for LinQuaternionHandler {
    fn default() -> Self {
        Self {
            sample: CommandMsg {
                command_type: "LIN".to_string(),
                pose_type: "QUATERNION".to_string(),
                pose: vec![0.0; 7],
                ..CommandMsg::default()
            },
        }
    }
}

impl CommandHandler for LinQuaternionHandler {
    fn name(&self) -> &str {
        "LIN QUATERNION"
    }

    fn sample(&self) -> &CommandMsg {
        &self.sample
    }

    fn build(&self, request: &CommandMsg, _ctx: &RegistryContext) -> Result<Command, RmiError> {
        let mut cmd = Command::with_values(CommandKind::Queued, "lin", &request.pose);
        add_motion_modifiers(&mut cmd, request);
        Ok(cmd)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Reads
// ────────────────────────────────────────────────────────────────────────────

/// Reads the current joint positions.
pub struct GetJointPositionHandler {
    sample: CommandMsg,
}

impl Default for GetJointPositionHandler {
    fn default() -> Self {
        Self {
            sample: CommandMsg {
                command_type: "GET".to_string(),
                pose_type: "JOINT_POSITION".to_string(),
                ..CommandMsg::default()
            },
        }
    }
}

impl CommandHandler for GetJointPositionHandler {
    fn name(&self) -> &str {
        "GET JOINT_POSITION"
    }

    fn sample(&self) -> &CommandMsg {
        &self.sample
    }

    fn build(&self, _request: &CommandMsg, _ctx: &RegistryContext) -> Result<Command, RmiError> {
        Ok(Command::new(CommandKind::Immediate, "get joint position", ""))
    }
}

/// Reads one digital input.  `pose[0]` is the port number.
pub struct DigitalInputHandler {
    sample: CommandMsg,
}

impl Default for DigitalInputHandler {
    fn default() -> Self {
        Self {
            sample: CommandMsg {
                command_type: "IO_IN".to_string(),
                pose_type: "DIO".to_string(),
                pose: vec![0.0],
                ..CommandMsg::default()
            },
        }
    }
}

impl CommandHandler for DigitalInputHandler {
    fn name(&self) -> &str {
        "IO_IN DIO"
    }

    fn sample(&self) -> &CommandMsg {
        &self.sample
    }

    fn build(&self, request: &CommandMsg, _ctx: &RegistryContext) -> Result<Command, RmiError> {
        let Some(&port) = request.pose.first() else {
            return Err(RmiError::BuildFailed {
                handler: self.name().to_string(),
                details: "missing digital input port".into(),
            });
        };
        if port < 0.0 || port.fract() != 0.0 {
            return Err(RmiError::BuildFailed {
                handler: self.name().to_string(),
                details: format!("invalid digital input port {port}"),
            });
        }
        Ok(Command::with_values(CommandKind::Immediate, "get dio", &[port]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> CommandRegistry {
        let joints = (1..=6).map(|i| format!("joint_{i}")).collect();
        let mut registry = CommandRegistry::new(joints, "1.0");
        register_default_handlers(&mut registry);
        registry
    }

    #[test]
    fn ptp_joints_builds_queued_ptp_with_speed() {
        let request = CommandMsg {
            command_type: "PTP".into(),
            pose_type: "JOINTS".into(),
            pose: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            velocity_type: "%".into(),
            velocity: vec![100.0],
            ..CommandMsg::default()
        };
        let cmd = registry().build_command(&request).unwrap();
        assert_eq!(cmd.kind(), CommandKind::Queued);
        assert_eq!(cmd.to_wire(true), "ptp : 1 2 3 4 5 6; speed : 100;\n");
    }

    #[test]
    fn ptp_with_wrong_joint_count_has_no_handler() {
        let request = CommandMsg {
            command_type: "PTP".into(),
            pose_type: "JOINTS".into(),
            pose: vec![0.0; 7],
            ..CommandMsg::default()
        };
        assert!(matches!(
            registry().build_command(&request),
            Err(RmiError::NoHandlerMatch(_))
        ));
    }

    #[test]
    fn lin_quaternion_adds_overlap() {
        let request = CommandMsg {
            command_type: "LIN".into(),
            pose_type: "QUATERNION".into(),
            pose: vec![0.5, 0.0, 0.25, 1.0, 0.0, 0.0, 0.0],
            blending_type: "%".into(),
            blending: vec![50.0],
            ..CommandMsg::default()
        };
        let cmd = registry().build_command(&request).unwrap();
        assert_eq!(cmd.to_wire(false), "lin : 0.5 0 0.25 1 0 0 0; overlap : 50;");
    }

    #[test]
    fn digital_input_read_is_immediate() {
        let request = CommandMsg {
            command_type: "IO_IN".into(),
            pose_type: "DIO".into(),
            pose: vec![3.0],
            ..CommandMsg::default()
        };
        let cmd = registry().build_command(&request).unwrap();
        assert_eq!(cmd.kind(), CommandKind::Immediate);
        assert_eq!(cmd.to_wire(false), "get dio : 3;");
    }

    #[test]
    fn digital_input_rejects_fractional_port() {
        let request = CommandMsg {
            command_type: "IO_IN".into(),
            pose_type: "DIO".into(),
            pose: vec![1.5],
            ..CommandMsg::default()
        };
        assert!(matches!(
            registry().build_command(&request),
            Err(RmiError::BuildFailed { .. })
        ));
    }

    #[test]
    fn digital_input_built_directly_without_port_fails() {
        let handler = DigitalInputHandler::default();
        let ctx = RegistryContext::new(vec!["joint_1".into()]);
        let request = CommandMsg {
            command_type: "IO_IN".into(),
            pose_type: "DIO".into(),
            ..CommandMsg::default()
        };
        assert!(!handler.matches(&request));
        assert!(matches!(
            handler.build(&request, &ctx),
            Err(RmiError::BuildFailed { details, .. }) if details.contains("missing")
        ));
    }

    #[test]
    fn abort_and_joint_read_resolve() {
        let registry = registry();
        let abort_msg = &rmi_types::CommandList::abort().commands[0];
        let abort = registry.build_command(abort_msg).unwrap();
        assert_eq!(abort.to_wire(true), "abort;\n");
        assert_eq!(abort.correlation_id(), rmi_types::ABORT_COMMAND_ID);

        let read = CommandMsg {
            command_type: "GET".into(),
            pose_type: "JOINT_POSITION".into(),
            ..CommandMsg::default()
        };
        let cmd = registry.build_command(&read).unwrap();
        assert_eq!(cmd.verb(), "get joint position");
        assert_eq!(cmd.kind(), CommandKind::Immediate);
    }

    #[test]
    fn trajectory_output_resolves_through_defaults() {
        use crate::jta::TrajectoryCommandBuilder;
        use rmi_types::{JointTrajectory, Waypoint};

        let registry = registry();
        let traj = JointTrajectory {
            joint_names: registry.context().joint_names().to_vec(),
            points: vec![Waypoint::from_positions(vec![0.0; 6]); 3],
        };
        let list = registry.trajectory_builder().build(&traj);
        for msg in &list.commands {
            let cmd = registry.build_command(msg).unwrap();
            assert_eq!(cmd.verb(), "ptp");
            assert_eq!(cmd.correlation_id(), msg.command_id);
        }
    }
}
