//! [`CommandHandler`] – template matcher and [`Command`] builder.
//!
//! A handler carries a *sample* [`CommandMsg`].  Only the fields the sample
//! populates take part in matching: strings must be equal, lists must have
//! the same length (their values are never compared, a length only says
//! "this parameter is expected").  Empty sample fields are unconstrained.
//!
//! Handlers are registered with a
//! [`CommandRegistry`][crate::registry::CommandRegistry], which calls
//! [`CommandHandler::initialize`] once the handler is attached and passes its
//! [`RegistryContext`] to every build.
//!
//! Quick handlers that do not need their own type can be created from a
//! closure with [`FnHandler`]:
//!
//! ```
//! use rmi_commands::{Command, CommandKind, FnHandler, CommandHandler, RegistryContext};
//! use rmi_types::CommandMsg;
//!
//! let handler = FnHandler::new(CommandMsg::with_type("ABORT"), |_msg| {
//!     Some(Command::new(CommandKind::Immediate, "abort", ""))
//! });
//!
//! let ctx = RegistryContext::new(vec!["j1".into()]);
//! let cmd = handler.build(&CommandMsg::with_type("ABORT"), &ctx).unwrap();
//! assert_eq!(cmd.verb(), "abort");
//! ```

use std::fmt;

use rmi_types::{CommandMsg, RmiError};

use crate::registry::RegistryContext;
use crate::robot_command::Command;

/// Builder closure attached to a [`FnHandler`].  Returning `None` signals a
/// failed build.
pub type BuildFn = Box<dyn Fn(&CommandMsg) -> Option<Command> + Send + Sync>;

/// A request-to-command translation strategy.
pub trait CommandHandler: Send + Sync {
    /// Diagnostic label.
    fn name(&self) -> &str;

    /// The template this handler matches against.
    fn sample(&self) -> &CommandMsg;

    /// Finish setting up the sample once the handler is registered.
    ///
    /// Runs after the handler is attached, so `ctx` already describes the
    /// robot (e.g. its joint count).
    fn initialize(&mut self, _ctx: &RegistryContext) {}

    /// `true` when every populated field of the sample matches `request`.
    fn matches(&self, request: &CommandMsg) -> bool {
        sample_matches(self.sample(), request)
    }

    /// Translate `request` into a protocol [`Command`].
    ///
    /// # Errors
    ///
    /// [`RmiError::BuildFailed`] when the request cannot be translated.
    fn build(&self, request: &CommandMsg, ctx: &RegistryContext) -> Result<Command, RmiError>;
}

impl fmt::Display for dyn CommandHandler + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name(), describe_sample(self.sample()))
    }
}

/// Structural match of `request` against `sample`.
pub fn sample_matches(sample: &CommandMsg, request: &CommandMsg) -> bool {
    let strings = [
        (&sample.command_type, &request.command_type),
        (&sample.pose_reference, &request.pose_reference),
        (&sample.pose_type, &request.pose_type),
        (&sample.velocity_type, &request.velocity_type),
        (&sample.acceleration_type, &request.acceleration_type),
        (&sample.deceleration_type, &request.deceleration_type),
        (&sample.blending_type, &request.blending_type),
        (&sample.force_threshold_type, &request.force_threshold_type),
        (&sample.effort_type, &request.effort_type),
    ];
    let strings_ok = strings
        .iter()
        .all(|(want, got)| want.is_empty() || want == got);

    let lengths = [
        (sample.pose.len(), request.pose.len()),
        (sample.velocity.len(), request.velocity.len()),
        (sample.acceleration.len(), request.acceleration.len()),
        (sample.deceleration.len(), request.deceleration.len()),
        (sample.blending.len(), request.blending.len()),
        (sample.force_threshold.len(), request.force_threshold.len()),
        (sample.effort.len(), request.effort.len()),
        (sample.additional_parameters.len(), request.additional_parameters.len()),
        (sample.additional_values.len(), request.additional_values.len()),
    ];
    let lengths_ok = lengths.iter().all(|&(want, got)| want == 0 || want == got);

    strings_ok && lengths_ok
}

/// One-line summary of the populated fields of a sample, e.g.
/// `"PTP JOINTS pose[6]"`.
pub fn describe_sample(sample: &CommandMsg) -> String {
    let mut parts: Vec<String> = [
        &sample.command_type,
        &sample.pose_reference,
        &sample.pose_type,
        &sample.velocity_type,
        &sample.acceleration_type,
        &sample.deceleration_type,
        &sample.blending_type,
        &sample.force_threshold_type,
        &sample.effort_type,
    ]
    .into_iter()
    .filter(|s| !s.is_empty())
    .cloned()
    .collect();

    let lists = [
        ("pose", sample.pose.len()),
        ("velocity", sample.velocity.len()),
        ("acceleration", sample.acceleration.len()),
        ("deceleration", sample.deceleration.len()),
        ("blending", sample.blending.len()),
        ("force_threshold", sample.force_threshold.len()),
        ("effort", sample.effort.len()),
        ("additional_parameters", sample.additional_parameters.len()),
        ("additional_values", sample.additional_values.len()),
    ];
    parts.extend(
        lists
            .iter()
            .filter(|(_, len)| *len > 0)
            .map(|(name, len)| format!("{name}[{len}]")),
    );
    parts.join(" ")
}

// ────────────────────────────────────────────────────────────────────────────
// Closure-backed handler
// ────────────────────────────────────────────────────────────────────────────

/// A handler whose build step is a closure.
pub struct FnHandler {
    name: String,
    sample: CommandMsg,
    build_fn: Option<BuildFn>,
}

impl FnHandler {
    pub fn new<F>(sample: CommandMsg, f: F) -> Self
    where
        F: Fn(&CommandMsg) -> Option<Command> + Send + Sync + 'static,
    {
        Self {
            name: "Base CommandHandler".to_string(),
            sample,
            build_fn: Some(Box::new(f)),
        }
    }

    /// A handler with a sample but no builder.  It matches, but every build
    /// fails until [`FnHandler::set_build_fn`] is called.
    pub fn template(sample: CommandMsg) -> Self {
        Self {
            name: "Base CommandHandler".to_string(),
            sample,
            build_fn: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn set_build_fn<F>(&mut self, f: F)
    where
        F: Fn(&CommandMsg) -> Option<Command> + Send + Sync + 'static,
    {
        self.build_fn = Some(Box::new(f));
    }
}

impl CommandHandler for FnHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample(&self) -> &CommandMsg {
        &self.sample
    }

    fn build(&self, request: &CommandMsg, _ctx: &RegistryContext) -> Result<Command, RmiError> {
        let f = self.build_fn.as_ref().ok_or_else(|| RmiError::BuildFailed {
            handler: self.name.clone(),
            details: "no builder function attached".to_string(),
        })?;
        f(request).ok_or_else(|| RmiError::BuildFailed {
            handler: self.name.clone(),
            details: format!("builder rejected '{}'", request.command_type),
        })
    }
}
