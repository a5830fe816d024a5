//! Seams to the outside world.
//!
//! The core never talks to a socket or a message broker directly.
//!
//! - [`CommandPublisher`] – where the trajectory action sends its command
//!   lists.  [`CommandBus`] implements it.
//! - [`RobotTransport`] – the socket layer that carries serialized commands
//!   to the controller.  Implemented outside this workspace (or by the
//!   simulated controller in `rmi-cli`).

use async_trait::async_trait;
use rmi_commands::Command;
use rmi_types::{CommandList, RmiError};

use crate::bus::CommandBus;

/// Outbound port for dispatched command lists.
pub trait CommandPublisher: Send + Sync {
    /// Hand `list` to whoever delivers it to the controller.
    fn publish_command_list(&self, source: &str, list: CommandList) -> Result<(), RmiError>;
}

impl CommandPublisher for CommandBus {
    fn publish_command_list(&self, source: &str, list: CommandList) -> Result<(), RmiError> {
        CommandBus::publish_command_list(self, source, list).map(|_| ())
    }
}

/// The connection to the robot controller.
///
/// # Contract
///
/// * `send` – write one serialized command on the lane its
///   [`CommandKind`][rmi_commands::CommandKind] selects.  Completion is
///   reported later as a [`CommandResult`][rmi_types::CommandResult] carrying
///   the command's correlation id.
/// * `flush_queue` – drop every queued command not yet written.
#[async_trait]
pub trait RobotTransport: Send + Sync {
    async fn send(&self, command: Command) -> Result<(), RmiError>;

    async fn flush_queue(&self) -> Result<(), RmiError>;
}
