//! The dispatcher: from an inbound message to a finished command.
//!
//! Each message goes through the same steps: bot filter, prefix match, name
//! lookup, enabled check, precondition tree, tokenizing, handler. Every step
//! after the name lookup emits a [`DispatchEvent`], and a resolved command
//! always ends with `CommandFinish`.
//!
//! Precondition evaluation and handlers run inside the unwind boundary. A panic
//! carrying a [`ConfigError`] (an unknown resolver name, a guild cooldown in a
//! direct message) is reported as a configuration fault; any other panic
//! becomes [`CommandError::Panic`].

pub mod events;
pub mod prefix;

pub use events::{DispatchEvent, DispatchListener, TracingListener};
pub use prefix::{Prefix, PrefixProvider, StaticPrefixes};

use std::any::Any;
use std::borrow::Cow;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::args::resolver::{Resolver, ResolverStore};
use crate::args::tokenizer::TokenizerConfig;
use crate::args::Args;
use crate::commands::{
    Command, CommandContext, CommandOutput, CommandStore, RegisteredCommand, UnregisterHook,
};
use crate::config::{DispatcherConfig, StrategyConfig};
use crate::error::{CommandError, ConfigError, DispatchError, PreconditionError};
use crate::message::{Message, UserId};
use crate::preconditions::{Precondition, PreconditionStore};

/// Where dispatch of one message stopped.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// Sent by a bot or webhook, or no prefix matched.
    Ignored,
    /// The message was only the bot mention.
    MentionPrefixOnly,
    /// A prefix matched but no name followed.
    UnknownCommandName,
    /// No command answers to the name.
    UnknownCommand(String),
    /// The command is disabled or a precondition failed.
    Denied(PreconditionError),
    /// The handler succeeded.
    Success(CommandOutput),
    /// The handler failed.
    Failed(Arc<CommandError>),
}

/// Builds a [`Dispatcher`].
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    preconditions: PreconditionStore,
    resolvers: ResolverStore,
    prefix_provider: Option<Arc<dyn PrefixProvider>>,
    listeners: Vec<Arc<dyn DispatchListener>>,
    commands: Vec<Arc<dyn Command>>,
}

impl DispatcherBuilder {
    /// Starts from `config`, the built-in preconditions and resolvers.
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            preconditions: PreconditionStore::with_defaults(),
            resolvers: ResolverStore::with_defaults(),
            prefix_provider: None,
            listeners: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// Adds a precondition.
    pub fn precondition<P: Precondition + 'static>(mut self, precondition: P) -> Self {
        self.preconditions.register(precondition);
        self
    }

    /// Adds a precondition that also hears about unregistered commands.
    pub fn precondition_with_hook<P>(mut self, precondition: P) -> Self
    where
        P: Precondition + UnregisterHook + 'static,
    {
        self.preconditions.register_with_hook(precondition);
        self
    }

    /// Adds a resolver.
    pub fn resolver<R: Resolver + 'static>(mut self, resolver: R) -> Self {
        self.resolvers.register(resolver);
        self
    }

    /// Replaces the prefixes from the configuration.
    pub fn prefix_provider(mut self, provider: Arc<dyn PrefixProvider>) -> Self {
        self.prefix_provider = Some(provider);
        self
    }

    /// Adds a listener.
    pub fn listener(mut self, listener: Arc<dyn DispatchListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Adds a command.
    pub fn command<C: Command + 'static>(mut self, command: C) -> Self {
        self.commands.push(Arc::new(command));
        self
    }

    /// Compiles prefixes, registers commands and applies `disabled_commands`.
    pub fn build(self) -> Result<Dispatcher, ConfigError> {
        let config = self.config;
        let prefix_provider = match self.prefix_provider {
            Some(provider) => provider,
            None => Arc::new(StaticPrefixes::from_config(
                &config.prefixes,
                &config.prefix_patterns,
                config.case_insensitive_prefixes,
            )?),
        };

        let mut commands = CommandStore::new(config.case_insensitive_commands);
        for hook in self.preconditions.hooks() {
            commands.add_hook(hook.clone());
        }
        for command in self.commands {
            commands.register_arc(command, &self.preconditions)?;
        }
        for name in &config.disabled_commands {
            if !commands.set_enabled(name, false) {
                tracing::warn!(command = %name, "Cannot disable unknown command");
            }
        }

        tracing::info!(
            commands = commands.len(),
            prefixes = ?config.prefixes,
            mention = config.client_id.is_some(),
            "Dispatcher ready"
        );

        Ok(Dispatcher {
            client_id: config.client_id.as_deref().map(UserId::from),
            case_insensitive_prefixes: config.case_insensitive_prefixes,
            ignore_bots: config.ignore_bots,
            strategy: config.strategy,
            prefix_provider,
            commands,
            preconditions: self.preconditions,
            resolvers: Arc::new(self.resolvers),
            listeners: self.listeners,
        })
    }
}

/// Routes messages to commands.
pub struct Dispatcher {
    client_id: Option<UserId>,
    case_insensitive_prefixes: bool,
    ignore_bots: bool,
    strategy: StrategyConfig,
    prefix_provider: Arc<dyn PrefixProvider>,
    commands: CommandStore,
    preconditions: PreconditionStore,
    resolvers: Arc<ResolverStore>,
    listeners: Vec<Arc<dyn DispatchListener>>,
}

impl Dispatcher {
    /// Starts a builder from `config`.
    pub fn builder(config: DispatcherConfig) -> DispatcherBuilder {
        DispatcherBuilder::new(config)
    }

    /// The registered commands.
    pub fn commands(&self) -> &CommandStore {
        &self.commands
    }

    /// Registers a command after the dispatcher was built.
    pub fn register<C: Command + 'static>(
        &mut self,
        command: C,
    ) -> Result<Arc<RegisteredCommand>, ConfigError> {
        self.commands.register(command, &self.preconditions)
    }

    /// Unregisters a command by name or alias.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<RegisteredCommand>> {
        self.commands.unregister(name)
    }

    /// Adds a listener.
    pub fn add_listener(&mut self, listener: Arc<dyn DispatchListener>) {
        self.listeners.push(listener);
    }

    fn emit(&self, event: DispatchEvent) {
        for listener in &self.listeners {
            listener.on_event(&event);
        }
    }

    /// Dispatches one message.
    ///
    /// Returns `Err` only for configuration faults raised while preconditions
    /// or the handler ran; the `CommandError` and `CommandFinish` events were
    /// emitted first.
    pub async fn dispatch(
        &self,
        message: impl Into<Arc<Message>>,
    ) -> Result<DispatchOutcome, DispatchError> {
        let message: Arc<Message> = message.into();

        if self.ignore_bots && message.is_automated() {
            return Ok(DispatchOutcome::Ignored);
        }

        let content = message.content.as_str();
        let prefix = match self.match_prefix(&message).await {
            Some(PrefixMatch::MentionOnly) => {
                self.emit(DispatchEvent::MentionPrefixOnly {
                    message: message.clone(),
                });
                return Ok(DispatchOutcome::MentionPrefixOnly);
            }
            Some(PrefixMatch::Matched(prefix)) => prefix,
            None => return Ok(DispatchOutcome::Ignored),
        };

        let prefix_less = content[prefix.len()..].trim();
        let (name, parameters) = match prefix_less.find(char::is_whitespace) {
            Some(index) => (&prefix_less[..index], prefix_less[index..].trim()),
            None => (prefix_less, ""),
        };
        if name.is_empty() {
            self.emit(DispatchEvent::UnknownCommandName {
                message: message.clone(),
                prefix,
            });
            return Ok(DispatchOutcome::UnknownCommandName);
        }

        let Some(registered) = self.commands.get(name) else {
            self.emit(DispatchEvent::UnknownCommand {
                message: message.clone(),
                prefix,
                name: name.to_string(),
            });
            return Ok(DispatchOutcome::UnknownCommand(name.to_string()));
        };

        let context = CommandContext {
            prefix,
            command_name: name.to_string(),
            parameters: parameters.to_string(),
        };
        self.run_command(message.clone(), &registered, context).await
    }

    async fn match_prefix(&self, message: &Message) -> Option<PrefixMatch> {
        let content = message.content.as_str();
        if let Some(client_id) = &self.client_id {
            if let Some(mention) = prefix::match_mention(content, client_id) {
                if content[mention.len()..].trim().is_empty() {
                    return Some(PrefixMatch::MentionOnly);
                }
                return Some(PrefixMatch::Matched(mention.to_string()));
            }
        }

        let prefixes = self.prefix_provider.prefixes(message).await;
        prefix::match_prefix(content, &prefixes, self.case_insensitive_prefixes)
            .map(|matched| PrefixMatch::Matched(matched.to_string()))
    }

    async fn run_command(
        &self,
        message: Arc<Message>,
        registered: &RegisteredCommand,
        context: CommandContext,
    ) -> Result<DispatchOutcome, DispatchError> {
        let command = registered.name().to_string();

        let verdict = if registered.is_enabled() {
            let evaluation = registered.preconditions().run(&message, &command);
            let evaluated = AssertUnwindSafe(evaluation).catch_unwind().await;
            match evaluated {
                Ok(verdict) => verdict,
                Err(payload) => {
                    return self.fail(message, command, context, classify_panic(payload));
                }
            }
        } else {
            Err(PreconditionError::disabled())
        };
        if let Err(error) = verdict {
            self.emit(DispatchEvent::CommandDenied {
                message: message.clone(),
                command: command.clone(),
                context: context.clone(),
                error: error.clone(),
            });
            self.finish(message, command, context);
            return Ok(DispatchOutcome::Denied(error));
        }

        self.emit(DispatchEvent::CommandAccepted {
            message: message.clone(),
            command: command.clone(),
            context: context.clone(),
        });

        let tokenizer = self.tokenizer_for(registered);
        let parameters = registered
            .command()
            .pre_parse(&context.parameters, &tokenizer);
        let mut args = Args::new(
            message.clone(),
            command.clone(),
            parameters,
            self.resolvers.clone(),
        );

        self.emit(DispatchEvent::CommandRun {
            message: message.clone(),
            command: command.clone(),
            context: context.clone(),
        });

        let handler = registered.command().run(&message, &mut args, &context);
        let result = match AssertUnwindSafe(handler).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(classify_panic(payload)),
        };

        match result {
            Ok(output) => {
                self.emit(DispatchEvent::CommandSuccess {
                    message: message.clone(),
                    command: command.clone(),
                    context: context.clone(),
                    output: output.clone(),
                });
                self.finish(message, command, context);
                Ok(DispatchOutcome::Success(output))
            }
            Err(error) => self.fail(message, command, context, error),
        }
    }

    /// Emits `CommandError` and `CommandFinish`; configuration faults become `Err`.
    fn fail(
        &self,
        message: Arc<Message>,
        command: String,
        context: CommandContext,
        error: CommandError,
    ) -> Result<DispatchOutcome, DispatchError> {
        let error = Arc::new(error);
        self.emit(DispatchEvent::CommandError {
            message: message.clone(),
            command: command.clone(),
            context: context.clone(),
            error: error.clone(),
        });
        self.finish(message, command.clone(), context);

        if let CommandError::Config(fault) = error.as_ref() {
            tracing::error!(command = %command, "Configuration fault: {}", fault);
            return Err(DispatchError::Config(fault.clone()));
        }
        Ok(DispatchOutcome::Failed(error))
    }

    fn finish(&self, message: Arc<Message>, command: String, context: CommandContext) {
        self.emit(DispatchEvent::CommandFinish {
            message,
            command,
            context,
        });
    }

    fn tokenizer_for<'a>(&self, registered: &'a RegisteredCommand) -> Cow<'a, TokenizerConfig> {
        let own = &registered.options().tokenizer;
        if self.strategy.is_empty() {
            return Cow::Borrowed(own);
        }
        let mut config = own.clone();
        self.strategy.apply(&mut config.strategy);
        Cow::Owned(config)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("client_id", &self.client_id)
            .field("ignore_bots", &self.ignore_bots)
            .field("commands", &self.commands)
            .field("preconditions", &self.preconditions)
            .field("resolvers", &self.resolvers)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

enum PrefixMatch {
    MentionOnly,
    Matched(String),
}

/// Turns a panic payload into a `CommandError`.
fn classify_panic(payload: Box<dyn Any + Send>) -> CommandError {
    let payload = match payload.downcast::<ConfigError>() {
        Ok(fault) => return CommandError::Config(*fault),
        Err(payload) => payload,
    };
    if let Some(message) = payload.downcast_ref::<&str>() {
        return CommandError::Panic(message.to_string());
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return CommandError::Panic(message.clone());
    }
    CommandError::Panic("unknown panic payload".to_string())
}
