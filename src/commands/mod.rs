//! Commands and their declared options.
//!
//! A command declares its name, aliases, precondition tree and tokenizer
//! settings through [`CommandOptions`], and implements [`Command::run`]. The
//! dispatcher hands `run` an [`Args`] cursor over the invocation's parameters.

pub mod store;

pub use store::{CommandStore, RegisteredCommand, UnregisterHook};

use async_trait::async_trait;

use crate::args::tokenizer::{self, FlagStrategy, Parameters, QuotePair, TokenizerConfig};
use crate::args::Args;
use crate::error::CommandError;
use crate::message::Message;
use crate::preconditions::{CooldownOptions, PreconditionEntry, RunMode};

/// What a command declares about itself.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOptions {
    /// Primary name.
    pub name: String,
    /// Other names the command answers to.
    pub aliases: Vec<String>,
    /// One-line description.
    pub description: String,
    /// Precondition tree; the root list is an AND.
    pub preconditions: Vec<PreconditionEntry>,
    /// Run mode of the root list.
    pub precondition_mode: RunMode,
    /// Quote pairs and flag/option strategy for the parameters.
    pub tokenizer: TokenizerConfig,
    /// Also register `foo-bar` as `foobar`.
    pub generate_dash_less_aliases: bool,
    /// Rate limit, appended to the precondition tree at registration.
    pub cooldown: Option<CooldownOptions>,
    /// Whether the command starts enabled.
    pub enabled: bool,
}

impl CommandOptions {
    /// Options for a command named `name`, enabled, with no preconditions.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: String::new(),
            preconditions: Vec::new(),
            precondition_mode: RunMode::Sequential,
            tokenizer: TokenizerConfig::default(),
            generate_dash_less_aliases: false,
            cooldown: None,
            enabled: true,
        }
    }

    /// Adds aliases.
    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the precondition tree.
    pub fn preconditions(mut self, entries: impl IntoIterator<Item = PreconditionEntry>) -> Self {
        self.preconditions = entries.into_iter().collect();
        self
    }

    /// Sets the run mode of the root precondition list.
    pub fn precondition_mode(mut self, mode: RunMode) -> Self {
        self.precondition_mode = mode;
        self
    }

    /// Declares accepted flags.
    pub fn flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokenizer.strategy = std::mem::take(&mut self.tokenizer.strategy).with_flags(flags);
        self
    }

    /// Declares accepted options.
    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokenizer.strategy =
            std::mem::take(&mut self.tokenizer.strategy).with_options(options);
        self
    }

    /// Replaces the flag strategy, keeping declared flags and options.
    pub fn strategy(mut self, strategy: FlagStrategy) -> Self {
        let FlagStrategy { flags, options, .. } = std::mem::take(&mut self.tokenizer.strategy);
        self.tokenizer.strategy = strategy.with_flags(flags).with_options(options);
        self
    }

    /// Sets the quote pairs. An empty list disables quoting.
    pub fn quotes(mut self, quotes: impl IntoIterator<Item = QuotePair>) -> Self {
        self.tokenizer.quotes = quotes.into_iter().collect();
        self
    }

    /// Registers dash-less versions of hyphenated names.
    pub fn dash_less_aliases(mut self) -> Self {
        self.generate_dash_less_aliases = true;
        self
    }

    /// Sets a cooldown.
    pub fn cooldown(mut self, cooldown: CooldownOptions) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    /// Starts the command disabled.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Per-invocation metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContext {
    /// The prefix that matched, e.g. `!` or the bot mention.
    pub prefix: String,
    /// The name or alias as typed.
    pub command_name: String,
    /// Raw parameter text after the name.
    pub parameters: String,
}

/// What a command produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CommandOutput {
    /// Nothing to send.
    #[default]
    None,
    /// A reply for the channel the message came from.
    Reply(String),
}

impl CommandOutput {
    /// A reply.
    pub fn reply(content: impl Into<String>) -> Self {
        Self::Reply(content.into())
    }
}

/// A chat command.
#[async_trait]
pub trait Command: Send + Sync {
    /// The command's declared options.
    fn options(&self) -> &CommandOptions;

    /// Tokenizes the raw parameter text.
    ///
    /// `config` is the command's tokenizer settings with bot-wide overrides applied.
    fn pre_parse(&self, parameters: &str, config: &TokenizerConfig) -> Parameters {
        tokenizer::lex(parameters, config)
    }

    /// Runs the command.
    async fn run(
        &self,
        message: &Message,
        args: &mut Args,
        context: &CommandContext,
    ) -> Result<CommandOutput, CommandError>;
}
