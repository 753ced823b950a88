//! Lifecycle events emitted by the dispatcher.
//!
//! Listeners observe dispatch without taking part in it: they receive each
//! event by reference and return nothing.

use std::sync::Arc;

use crate::commands::{CommandContext, CommandOutput};
use crate::error::{CommandError, PreconditionError};
use crate::message::Message;

/// A lifecycle signal.
#[derive(Debug, Clone)]
pub enum DispatchEvent {
    /// The message was only the bot mention.
    MentionPrefixOnly {
        /// The message.
        message: Arc<Message>,
    },
    /// A prefix matched but no command name followed.
    UnknownCommandName {
        /// The message.
        message: Arc<Message>,
        /// The matched prefix.
        prefix: String,
    },
    /// The command name did not resolve.
    UnknownCommand {
        /// The message.
        message: Arc<Message>,
        /// The matched prefix.
        prefix: String,
        /// The name as typed.
        name: String,
    },
    /// The command was disabled or a precondition failed.
    CommandDenied {
        /// The message.
        message: Arc<Message>,
        /// Primary name of the command.
        command: String,
        /// Invocation metadata.
        context: CommandContext,
        /// Why it was denied.
        error: PreconditionError,
    },
    /// Every precondition passed.
    CommandAccepted {
        /// The message.
        message: Arc<Message>,
        /// Primary name of the command.
        command: String,
        /// Invocation metadata.
        context: CommandContext,
    },
    /// The handler is about to run.
    CommandRun {
        /// The message.
        message: Arc<Message>,
        /// Primary name of the command.
        command: String,
        /// Invocation metadata.
        context: CommandContext,
    },
    /// The handler returned successfully.
    CommandSuccess {
        /// The message.
        message: Arc<Message>,
        /// Primary name of the command.
        command: String,
        /// Invocation metadata.
        context: CommandContext,
        /// What the handler returned.
        output: CommandOutput,
    },
    /// The handler failed or panicked.
    CommandError {
        /// The message.
        message: Arc<Message>,
        /// Primary name of the command.
        command: String,
        /// Invocation metadata.
        context: CommandContext,
        /// The failure.
        error: Arc<CommandError>,
    },
    /// Dispatch of a resolved command is over, whatever the outcome.
    CommandFinish {
        /// The message.
        message: Arc<Message>,
        /// Primary name of the command.
        command: String,
        /// Invocation metadata.
        context: CommandContext,
    },
}

impl DispatchEvent {
    /// Short event name, for logs and tests.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MentionPrefixOnly { .. } => "mention_prefix_only",
            Self::UnknownCommandName { .. } => "unknown_command_name",
            Self::UnknownCommand { .. } => "unknown_command",
            Self::CommandDenied { .. } => "command_denied",
            Self::CommandAccepted { .. } => "command_accepted",
            Self::CommandRun { .. } => "command_run",
            Self::CommandSuccess { .. } => "command_success",
            Self::CommandError { .. } => "command_error",
            Self::CommandFinish { .. } => "command_finish",
        }
    }

    /// The message the event is about.
    pub fn message(&self) -> &Message {
        match self {
            Self::MentionPrefixOnly { message }
            | Self::UnknownCommandName { message, .. }
            | Self::UnknownCommand { message, .. }
            | Self::CommandDenied { message, .. }
            | Self::CommandAccepted { message, .. }
            | Self::CommandRun { message, .. }
            | Self::CommandSuccess { message, .. }
            | Self::CommandError { message, .. }
            | Self::CommandFinish { message, .. } => message,
        }
    }
}

/// Observes dispatch events.
pub trait DispatchListener: Send + Sync {
    /// Called for every event, in order.
    fn on_event(&self, event: &DispatchEvent);
}

/// Logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl DispatchListener for TracingListener {
    fn on_event(&self, event: &DispatchEvent) {
        let author = &event.message().author.id;
        match event {
            DispatchEvent::MentionPrefixOnly { .. } => {
                tracing::debug!(%author, "Mention without command");
            }
            DispatchEvent::UnknownCommandName { prefix, .. } => {
                tracing::debug!(%author, prefix = %prefix, "Prefix without command name");
            }
            DispatchEvent::UnknownCommand { name, .. } => {
                tracing::debug!(%author, name = %name, "Unknown command");
            }
            DispatchEvent::CommandDenied { command, error, .. } => {
                tracing::info!(
                    %author,
                    command = %command,
                    precondition = %error.precondition,
                    identifier = %error.identifier,
                    "Command denied: {}",
                    error
                );
            }
            DispatchEvent::CommandAccepted { command, .. } => {
                tracing::debug!(%author, command = %command, "Command accepted");
            }
            DispatchEvent::CommandRun { command, context, .. } => {
                tracing::debug!(
                    %author,
                    command = %command,
                    parameters = %context.parameters,
                    "Running command"
                );
            }
            DispatchEvent::CommandSuccess { command, .. } => {
                tracing::debug!(%author, command = %command, "Command succeeded");
            }
            DispatchEvent::CommandError { command, error, .. } => {
                tracing::error!(
                    %author,
                    command = %command,
                    category = error.category(),
                    "Command failed: {}",
                    error_chain(error.as_ref())
                );
            }
            DispatchEvent::CommandFinish { command, .. } => {
                tracing::debug!(%author, command = %command, "Command finished");
            }
        }
    }
}

/// Joins an error and its sources with `: `.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}
