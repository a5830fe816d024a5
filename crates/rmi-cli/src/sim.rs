//! Simulated robot controller for running the driver without hardware.
//!
//! [`SimController`] implements [`RobotTransport`].  Queued commands are
//! executed one at a time, each taking a fixed step, and answered with
//! [`result_code::OK`]; immediate commands are answered right away
//! (ABORT with [`result_code::ABORT_OK`]).  Results are published on the
//! bus's [`Topic::CommandResult`][rmi_middleware::Topic] lane exactly like
//! a real controller link would.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rmi_commands::{Command, CommandKind};
use rmi_middleware::{CommandBus, RobotTransport};
use rmi_types::{CommandResult, RmiError, result_code};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const SOURCE: &str = "rmi-cli::sim";

pub struct SimController {
    bus: CommandBus,
    queue: Arc<Mutex<VecDeque<Command>>>,
    wake: Arc<Notify>,
    worker: JoinHandle<()>,
}

impl SimController {
    /// Start the execution worker.  Must be called inside a Tokio runtime.
    pub fn start(bus: CommandBus, step: Duration) -> Self {
        let queue = Arc::new(Mutex::new(VecDeque::new()));
        let wake = Arc::new(Notify::new());
        let worker = tokio::spawn(execute(bus.clone(), queue.clone(), wake.clone(), step));
        info!(step_ms = step.as_millis() as u64, "simulated controller started");
        Self {
            bus,
            queue,
            wake,
            worker,
        }
    }

    /// Commands waiting for execution.
    #[cfg(test)]
    async fn pending(&self) -> usize {
        self.queue.lock().await.len()
    }
}

impl Drop for SimController {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

#[async_trait]
impl RobotTransport for SimController {
    async fn send(&self, command: Command) -> Result<(), RmiError> {
        debug!(wire = %command, id = command.correlation_id(), "sim controller received");
        match command.kind() {
            CommandKind::Immediate => {
                let code = if command.verb() == "abort" {
                    result_code::ABORT_OK
                } else {
                    result_code::OK
                };
                report(&self.bus, CommandResult::new(command.correlation_id(), code, ""));
            }
            CommandKind::Queued => {
                self.queue.lock().await.push_back(command);
                self.wake.notify_one();
            }
        }
        Ok(())
    }

    async fn flush_queue(&self) -> Result<(), RmiError> {
        let dropped = {
            let mut queue = self.queue.lock().await;
            let n = queue.len();
            queue.clear();
            n
        };
        debug!(dropped, "sim controller queue flushed");
        Ok(())
    }
}

async fn execute(
    bus: CommandBus,
    queue: Arc<Mutex<VecDeque<Command>>>,
    wake: Arc<Notify>,
    step: Duration,
) {
    loop {
        let next = queue.lock().await.pop_front();
        match next {
            Some(command) => {
                tokio::time::sleep(step).await;
                report(
                    &bus,
                    CommandResult::new(command.correlation_id(), result_code::OK, ""),
                );
            }
            None => wake.notified().await,
        }
    }
}

fn report(bus: &CommandBus, result: CommandResult) {
    if let Err(e) = bus.publish_result(SOURCE, result) {
        debug!(error = %e, "no listener for sim result");
    }
}
