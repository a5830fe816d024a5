//! [`CommandListDispatcher`] – turns dispatched command lists into wire
//! commands.
//!
//! Every [`CommandMsg`][rmi_types::CommandMsg] in a list is resolved through
//! the [`CommandRegistry`], stamped with its correlation id and written to
//! the [`RobotTransport`].  Requests nobody can handle are answered on the
//! bus with a [`result_code::FAILED_TO_FIND_HANDLER`] result, so the goal
//! waiting on them aborts instead of hanging.

use std::sync::Arc;

use rmi_commands::CommandRegistry;
use rmi_types::{CommandList, CommandResult, EventPayload, RmiError, result_code};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::adapter::RobotTransport;
use crate::bus::{CommandBus, Topic, TopicReceiver};

const SOURCE: &str = "rmi-middleware::dispatcher";

/// Resolves command lists and feeds the transport.
pub struct CommandListDispatcher {
    registry: Arc<CommandRegistry>,
    transport: Arc<dyn RobotTransport>,
    bus: CommandBus,
}

impl CommandListDispatcher {
    pub fn new(
        registry: Arc<CommandRegistry>,
        transport: Arc<dyn RobotTransport>,
        bus: CommandBus,
    ) -> Self {
        Self {
            registry,
            transport,
            bus,
        }
    }

    /// Dispatch one list.  Returns the number of commands written.
    ///
    /// # Errors
    ///
    /// Propagates the first transport failure.  A
    /// [`result_code::SOCKET_FAILED_TO_CONNECT`] result is published for the
    /// command that failed and the rest of the list is dropped.
    pub async fn dispatch(&self, list: &CommandList) -> Result<usize, RmiError> {
        if list.replace_previous_commands {
            debug!("flushing queued commands before new list");
            self.transport.flush_queue().await?;
        }

        let mut sent = 0;
        for msg in &list.commands {
            let command = match self.registry.build_command(msg) {
                Ok(command) => command,
                Err(e) => {
                    warn!(command_id = msg.command_id, error = %e, "dropping unhandled command");
                    self.report(CommandResult::new(
                        msg.command_id,
                        result_code::FAILED_TO_FIND_HANDLER,
                        e.to_string(),
                    ));
                    continue;
                }
            };

            debug!(command_id = msg.command_id, wire = %command, "sending command");
            if let Err(e) = self.transport.send(command).await {
                self.report(CommandResult::new(
                    msg.command_id,
                    result_code::SOCKET_FAILED_TO_CONNECT,
                    e.to_string(),
                ));
                return Err(e);
            }
            sent += 1;
        }
        Ok(sent)
    }

    /// Consume command lists from `rx` until the bus closes.
    pub async fn run(self, mut rx: TopicReceiver) {
        info!("command list dispatcher started");
        while let Some(event) = rx.next().await {
            if let EventPayload::CommandList(list) = event.payload
                && let Err(e) = self.dispatch(&list).await
            {
                warn!(source = %event.source, error = %e, "command list dispatch failed");
            }
        }
        info!("command list dispatcher stopped");
    }

    /// Subscribe to [`Topic::CommandList`] and run on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        let rx = self.bus.subscribe_to(Topic::CommandList);
        tokio::spawn(self.run(rx))
    }

    fn report(&self, result: CommandResult) {
        if let Err(e) = self.bus.publish_result(SOURCE, result) {
            debug!(error = %e, "no listener for command result");
        }
    }
}
