//! `rmi-middleware` – message plumbing between the core and the controller.
//!
//! # Modules
//!
//! - [`bus`] – [`CommandBus`]: topic lanes for command lists, command
//!   results and goal status, built on Tokio broadcast channels.
//! - [`adapter`] – [`CommandPublisher`] and [`RobotTransport`], the narrow
//!   seams to external collaborators.
//! - [`dispatcher`] – [`CommandListDispatcher`]: resolves dispatched lists
//!   through the command registry and writes them to the transport.

pub mod adapter;
pub mod bus;
pub mod dispatcher;

pub use adapter::{CommandPublisher, RobotTransport};
pub use bus::{CommandBus, Topic, TopicReceiver};
pub use dispatcher::CommandListDispatcher;
