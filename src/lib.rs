//! chat-dispatch - command dispatch for chat bots.
//!
//! Messages are matched against prefixes, routed to a registered command,
//! checked against the command's precondition tree and handed to the command
//! with an argument cursor over the tokenized parameters.

pub mod args;
pub mod commands;
pub mod config;
pub mod demo;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod message;
pub mod preconditions;

pub use commands::{Command, CommandContext, CommandOptions, CommandOutput};
pub use config::DispatcherConfig;
pub use dispatch::{DispatchOutcome, Dispatcher, DispatcherBuilder};
pub use error::{CommandError, ConfigError, DispatchError};
pub use message::Message;
