//! `rmi-commands` – request matching and protocol command construction.
//!
//! # Modules
//!
//! - [`robot_command`] – [`Command`]: ordered verb + modifier entries and
//!   their text wire format.
//! - [`handler`] – [`CommandHandler`]: structural template matching and the
//!   build step; [`FnHandler`] for closure-backed handlers.
//! - [`registry`] – [`CommandRegistry`]: first-match resolution over the
//!   registered handlers, plus the active trajectory builder.
//! - [`jta`] – [`TrajectoryCommandBuilder`]: waypoints → [`CommandList`][rmi_types::CommandList].
//! - [`builtin`] – stock handlers for a joint-space controller.

pub mod builtin;
pub mod handler;
pub mod jta;
pub mod registry;
pub mod robot_command;

pub use builtin::register_default_handlers;
pub use handler::{CommandHandler, FnHandler};
pub use jta::{JtaCommandBuilder, TrajectoryCommandBuilder};
pub use registry::{CommandRegistry, RegistryContext};
pub use robot_command::{Command, CommandKind};
