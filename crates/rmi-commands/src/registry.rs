//! [`CommandRegistry`] – ordered handler set and request resolver.
//!
//! The registry stores every registered [`CommandHandler`] in insertion
//! order.  Resolving a request is a linear scan: the first handler whose
//! sample matches wins.  Register specific templates (e.g. `PTP` + `JOINTS`)
//! before general ones (`PTP` alone), otherwise the general one shadows them.
//!
//! The registry also owns the single [`TrajectoryCommandBuilder`] used by the
//! trajectory action.  It is replaced wholesale, never merged.
//!
//! The registry is populated once at startup and treated as read-only
//! afterwards, so it is usually shared behind an `Arc`.

use rmi_types::{CommandMsg, RmiError};
use tracing::debug;

use crate::handler::CommandHandler;
use crate::jta::{JtaCommandBuilder, TrajectoryCommandBuilder};
use crate::robot_command::Command;

/// Registry-wide configuration visible to every handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryContext {
    joint_names: Vec<String>,
}

impl RegistryContext {
    pub fn new(joint_names: Vec<String>) -> Self {
        Self { joint_names }
    }

    /// Canonical joint order of the robot.
    pub fn joint_names(&self) -> &[String] {
        &self.joint_names
    }

    pub fn joint_count(&self) -> usize {
        self.joint_names.len()
    }
}

/// Ordered collection of [`CommandHandler`]s.
pub struct CommandRegistry {
    context: RegistryContext,
    version: String,
    handlers: Vec<Box<dyn CommandHandler>>,
    trajectory_builder: Box<dyn TrajectoryCommandBuilder>,
}

impl CommandRegistry {
    /// Create an empty registry for a robot with the given canonical joint
    /// order.  `version` is the protocol version expected from the
    /// controller.
    pub fn new(joint_names: Vec<String>, version: impl Into<String>) -> Self {
        Self {
            context: RegistryContext::new(joint_names),
            version: version.into(),
            handlers: Vec::new(),
            trajectory_builder: Box::new(JtaCommandBuilder),
        }
    }

    /// Append `handler` and run its [`CommandHandler::initialize`] hook.
    pub fn add_handler(&mut self, mut handler: Box<dyn CommandHandler>) {
        handler.initialize(&self.context);
        debug!(handler = %handler, "registered command handler");
        self.handlers.push(handler);
    }

    pub fn handlers(&self) -> &[Box<dyn CommandHandler>] {
        &self.handlers
    }

    /// Return the earliest-registered handler that matches `request`.
    pub fn find_handler(&self, request: &CommandMsg) -> Option<&dyn CommandHandler> {
        self.handlers
            .iter()
            .find(|h| h.matches(request))
            .map(|h| h.as_ref())
    }

    /// Resolve and build `request` in one step.  The resulting command
    /// carries `request.command_id` as its correlation id.
    ///
    /// # Errors
    ///
    /// - [`RmiError::NoHandlerMatch`] – no registered handler matches.
    /// - [`RmiError::BuildFailed`] – the matched handler could not build.
    pub fn build_command(&self, request: &CommandMsg) -> Result<Command, RmiError> {
        let handler = self
            .find_handler(request)
            .ok_or_else(|| RmiError::NoHandlerMatch(request.command_type.clone()))?;
        let mut command = handler.build(request, &self.context)?;
        command.set_correlation_id(request.command_id);
        Ok(command)
    }

    pub fn trajectory_builder(&self) -> &dyn TrajectoryCommandBuilder {
        self.trajectory_builder.as_ref()
    }

    pub fn set_trajectory_builder(&mut self, builder: Box<dyn TrajectoryCommandBuilder>) {
        self.trajectory_builder = builder;
    }

    pub fn context(&self) -> &RegistryContext {
        &self.context
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::FnHandler;
    use crate::robot_command::CommandKind;
    use rmi_types::{CommandList, JointTrajectory};

    fn joints() -> Vec<String> {
        vec!["j1".into(), "j2".into(), "j3".into()]
    }

    fn named(sample: CommandMsg, name: &'static str) -> Box<dyn CommandHandler> {
        Box::new(
            FnHandler::new(sample, move |_| Some(Command::new(CommandKind::Queued, name, "")))
                .with_name(name),
        )
    }

    fn ptp_joints() -> CommandMsg {
        CommandMsg {
            command_type: "PTP".into(),
            pose_type: "JOINTS".into(),
            ..CommandMsg::default()
        }
    }

    // ------------------------------------------------------------------
    // Test doubles
    // ------------------------------------------------------------------

    /// Learns the joint count in `initialize` and only matches poses of
    /// that length.
    struct JointCountHandler {
        sample: CommandMsg,
    }

    impl CommandHandler for JointCountHandler {
        fn name(&self) -> &str {
            "joint count"
        }
        fn sample(&self) -> &CommandMsg {
            &self.sample
        }
        fn initialize(&mut self, ctx: &RegistryContext) {
            self.sample.pose = vec![0.0; ctx.joint_count()];
        }
        fn build(&self, req: &CommandMsg, _ctx: &RegistryContext) -> Result<Command, RmiError> {
            Ok(Command::with_values(CommandKind::Queued, "ptp", &req.pose))
        }
    }

    struct EmptyBuilder;

    impl TrajectoryCommandBuilder for EmptyBuilder {
        fn name(&self) -> &str {
            "empty"
        }
        fn build(&self, _trajectory: &JointTrajectory) -> CommandList {
            CommandList::default()
        }
    }

    // ------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------

    #[test]
    fn specific_handler_registered_first_wins() {
        let mut registry = CommandRegistry::new(joints(), "1.0");
        registry.add_handler(named(ptp_joints(), "specific"));
        registry.add_handler(named(CommandMsg::with_type("PTP"), "generic"));

        let handler = registry.find_handler(&ptp_joints()).unwrap();
        assert_eq!(handler.name(), "specific");

        let mut quaternion = ptp_joints();
        quaternion.pose_type = "QUATERNION".into();
        assert_eq!(registry.find_handler(&quaternion).unwrap().name(), "generic");
    }

    #[test]
    fn generic_handler_registered_first_shadows_specific() {
        let mut registry = CommandRegistry::new(joints(), "1.0");
        registry.add_handler(named(CommandMsg::with_type("PTP"), "generic"));
        registry.add_handler(named(ptp_joints(), "specific"));
        assert_eq!(registry.find_handler(&ptp_joints()).unwrap().name(), "generic");
    }

    #[test]
    fn no_match_returns_none_and_build_reports_it() {
        let mut registry = CommandRegistry::new(joints(), "1.0");
        registry.add_handler(named(ptp_joints(), "ptp"));
        let request = CommandMsg::with_type("LIN");
        assert!(registry.find_handler(&request).is_none());
        assert_eq!(
            registry.build_command(&request),
            Err(RmiError::NoHandlerMatch("LIN".to_string()))
        );
    }

    #[test]
    fn initialize_sees_registry_configuration() {
        let mut registry = CommandRegistry::new(joints(), "1.0");
        registry.add_handler(Box::new(JointCountHandler {
            sample: ptp_joints(),
        }));
        assert_eq!(registry.handlers()[0].sample().pose.len(), 3);

        let mut three = ptp_joints();
        three.pose = vec![0.1, 0.2, 0.3];
        assert!(registry.find_handler(&three).is_some());

        let mut six = ptp_joints();
        six.pose = vec![0.0; 6];
        assert!(registry.find_handler(&six).is_none());
    }

    #[test]
    fn build_command_stamps_correlation_id() {
        let mut registry = CommandRegistry::new(joints(), "1.0");
        registry.add_handler(named(ptp_joints(), "ptp"));
        let mut request = ptp_joints();
        request.command_id = 42;
        let cmd = registry.build_command(&request).unwrap();
        assert_eq!(cmd.correlation_id(), 42);
        assert_eq!(cmd.verb(), "ptp");
    }

    #[test]
    fn trajectory_builder_is_replaced_wholesale() {
        let mut registry = CommandRegistry::new(joints(), "1.0");
        assert_eq!(registry.trajectory_builder().name(), "JTA Command");
        registry.set_trajectory_builder(Box::new(EmptyBuilder));
        assert_eq!(registry.trajectory_builder().name(), "empty");
        assert_eq!(registry.version(), "1.0");
        assert_eq!(registry.context().joint_count(), 3);
    }
}
