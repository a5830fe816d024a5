//! Typed, topic-based publish/subscribe bus for driver traffic.
//!
//! Uses [`tokio::sync::broadcast`] channels so every subscriber receives
//! every message and no subscriber can block the others.
//!
//! # Topics
//!
//! | Topic | Traffic |
//! |---|---|
//! | [`Topic::CommandList`] | Command lists headed for the controller (trajectories, ABORT) |
//! | [`Topic::CommandResult`] | Per-command completion notifications from the controller |
//! | [`Topic::GoalStatus`] | Goal acceptance and resolutions |

use rmi_types::{CommandList, CommandResult, Event, EventPayload, GoalId, GoalStatus, RmiError};
use tokio::sync::broadcast;
use tracing::warn;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Routing lanes of the [`CommandBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    CommandList,
    CommandResult,
    GoalStatus,
}

/// Shared bus.  Clone it cheaply – all clones share the same channels.
#[derive(Clone, Debug)]
pub struct CommandBus {
    command_list: broadcast::Sender<Event>,
    command_result: broadcast::Sender<Event>,
    goal_status: broadcast::Sender<Event>,
}

impl CommandBus {
    /// Create a new bus.  `capacity` applies to every topic independently.
    pub fn new(capacity: usize) -> Self {
        let (command_list, _) = broadcast::channel(capacity);
        let (command_result, _) = broadcast::channel(capacity);
        let (goal_status, _) = broadcast::channel(capacity);
        Self {
            command_list,
            command_result,
            goal_status,
        }
    }

    /// Publish `event` on `topic`.
    ///
    /// Returns the number of receivers handed the event.
    ///
    /// # Errors
    ///
    /// [`RmiError::Channel`] when nobody is subscribed to the topic.
    pub fn publish_to(&self, topic: Topic, event: Event) -> Result<usize, RmiError> {
        self.topic_sender(topic)
            .send(event)
            .map_err(|_| RmiError::Channel(format!("no subscribers for topic {topic:?}")))
    }

    pub fn publish_command_list(
        &self,
        source: &str,
        list: CommandList,
    ) -> Result<usize, RmiError> {
        self.publish_to(
            Topic::CommandList,
            Event::new(source, EventPayload::CommandList(list)),
        )
    }

    pub fn publish_result(&self, source: &str, result: CommandResult) -> Result<usize, RmiError> {
        self.publish_to(
            Topic::CommandResult,
            Event::new(source, EventPayload::CommandResult(result)),
        )
    }

    pub fn publish_goal_status(
        &self,
        source: &str,
        goal_id: GoalId,
        status: GoalStatus,
    ) -> Result<usize, RmiError> {
        self.publish_to(
            Topic::GoalStatus,
            Event::new(source, EventPayload::GoalStatus { goal_id, status }),
        )
    }

    /// Subscribe to one [`Topic`].
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::CommandList => &self.command_list,
            Topic::CommandResult => &self.command_result,
            Topic::GoalStatus => &self.goal_status,
        }
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Topic receiver
// ---------------------------------------------------------------------------

/// An async receiver bound to a single [`Topic`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event, surfacing `Lagged` and `Closed` to the
    /// caller.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Wait for the next event, skipping over lag.  Returns `None` once the
    /// bus is closed.
    pub async fn next(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "TopicReceiver lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking poll.
    pub fn try_recv(&mut self) -> Result<Event, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }
}
