//! The argument cursor handed to command handlers.
//!
//! `Args` walks the ordinary tokens of one invocation left to right. Every
//! consuming call is atomic: the position only moves when the resolver
//! succeeds, so a handler can try one type and fall back to another at the
//! same offset. `save`/`restore` add explicit backtracking on top of that.
//!
//! Flags and options were pulled out of the stream by the tokenizer and are
//! looked up independently of the position.

pub mod builtin;
pub mod resolver;
pub mod tokenizer;

use std::sync::Arc;

use crate::error::{ArgumentError, ArgumentResult, UserError};
use crate::message::Message;

pub use resolver::{ArgOptions, ArgumentContext, Resolver, ResolverHandle, ResolverStore};
pub use tokenizer::{Parameters, Token, TokenizerConfig};

/// Identifier returned by a strict `repeat` that collected fewer than `times` values.
pub const ARGS_REPEAT_INCOMPLETE: &str = "ArgsRepeatIncomplete";

/// Identifier returned by `restore` without a matching `save`.
pub const ARGS_RESTORE_WITHOUT_SAVE: &str = "ArgsRestoreWithoutSave";

/// Options for `repeat`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RepeatOptions {
    /// Maximum number of values to collect. `None` collects until the stream ends.
    pub times: Option<usize>,
    /// Fail with `ArgsRepeatIncomplete` when fewer than `times` values resolve.
    pub strict: bool,
    /// Bounds handed to every resolver call.
    pub options: ArgOptions,
}

impl RepeatOptions {
    /// Collects at most `times` values.
    pub fn times(times: usize) -> Self {
        Self {
            times: Some(times),
            ..Self::default()
        }
    }

    /// Requires exactly `times` values.
    pub fn exactly(times: usize) -> Self {
        Self {
            times: Some(times),
            strict: true,
            ..Self::default()
        }
    }
}

/// Stateful pull-parser over one invocation's parameters.
#[derive(Debug)]
pub struct Args {
    message: Arc<Message>,
    command: String,
    resolvers: Arc<ResolverStore>,
    parameters: Parameters,
    position: usize,
    states: Vec<usize>,
}

impl Args {
    /// Creates a cursor positioned before the first token.
    pub fn new(
        message: Arc<Message>,
        command: impl Into<String>,
        parameters: Parameters,
        resolvers: Arc<ResolverStore>,
    ) -> Self {
        Self {
            message,
            command: command.into(),
            resolvers,
            parameters,
            position: 0,
            states: Vec::new(),
        }
    }

    /// The message being handled.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Name of the command being run.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The tokenized parameters.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Index of the next token to consume.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Rewinds to the first token. Saved states are kept.
    pub fn start(&mut self) -> &mut Self {
        self.position = 0;
        self
    }

    /// Returns true once every ordinary token was consumed.
    pub fn finished(&self) -> bool {
        self.position >= self.parameters.ordered.len()
    }

    /// Number of tokens left to consume.
    pub fn remaining(&self) -> usize {
        self.parameters.ordered.len().saturating_sub(self.position)
    }

    /// Resolves the next token with the resolver registered as `name`.
    ///
    /// # Panics
    ///
    /// Panics with a [`ConfigError`](crate::error::ConfigError) payload if no
    /// resolver producing `T` is registered under `name`. The dispatcher
    /// catches the unwind and reports it as a configuration fault.
    pub async fn pick<T: Send + 'static>(&mut self, name: &str) -> ArgumentResult<T> {
        self.pick_opts(name, ArgOptions::default()).await
    }

    /// Like [`pick`](Self::pick), with bounds.
    pub async fn pick_opts<T: Send + 'static>(
        &mut self,
        name: &str,
        options: ArgOptions,
    ) -> ArgumentResult<T> {
        let resolver = self.resolver::<T>(name);
        self.pick_with(resolver.as_ref(), options).await
    }

    /// Resolves the next token with `resolver`.
    pub async fn pick_with<R>(&mut self, resolver: &R, options: ArgOptions) -> ArgumentResult<R::Output>
    where
        R: Resolver + ?Sized,
    {
        let Some(token) = self.parameters.ordered.get(self.position) else {
            return Err(ArgumentError::missing(resolver.name()));
        };
        let context = ArgumentContext::new(&self.message, &self.command, options);
        let value = resolver.run(&token.value, &context).await?;
        self.position += 1;
        Ok(value)
    }

    /// Resolves every remaining token, joined, with the resolver registered as `name`.
    ///
    /// # Panics
    ///
    /// Same as [`pick`](Self::pick).
    pub async fn rest<T: Send + 'static>(&mut self, name: &str) -> ArgumentResult<T> {
        self.rest_opts(name, ArgOptions::default()).await
    }

    /// Like [`rest`](Self::rest), with bounds.
    pub async fn rest_opts<T: Send + 'static>(
        &mut self,
        name: &str,
        options: ArgOptions,
    ) -> ArgumentResult<T> {
        let resolver = self.resolver::<T>(name);
        self.rest_with(resolver.as_ref(), options).await
    }

    /// Resolves every remaining token, joined, with `resolver`.
    ///
    /// Tokens are joined with the whitespace that followed them in the input,
    /// or a single space where a flag or option was removed in between.
    pub async fn rest_with<R>(&mut self, resolver: &R, options: ArgOptions) -> ArgumentResult<R::Output>
    where
        R: Resolver + ?Sized,
    {
        if self.finished() {
            return Err(ArgumentError::missing(resolver.name()));
        }
        let joined = self.joined_rest();
        let context = ArgumentContext::new(&self.message, &self.command, options);
        let value = resolver.run(&joined, &context).await?;
        self.position = self.parameters.ordered.len();
        Ok(value)
    }

    /// Picks values with the resolver registered as `name` until the stream
    /// ends, a value fails, or `times` values were collected.
    ///
    /// # Panics
    ///
    /// Same as [`pick`](Self::pick).
    pub async fn repeat<T: Send + 'static>(
        &mut self,
        name: &str,
        options: RepeatOptions,
    ) -> ArgumentResult<Vec<T>> {
        let resolver = self.resolver::<T>(name);
        self.repeat_with(resolver.as_ref(), options).await
    }

    /// Picks values with `resolver` until the stream ends, a value fails, or
    /// `times` values were collected.
    ///
    /// Returns the values collected so far once at least one resolved, unless
    /// `strict` is set. With zero successes the first error is returned and
    /// the position is unchanged.
    pub async fn repeat_with<R>(
        &mut self,
        resolver: &R,
        options: RepeatOptions,
    ) -> ArgumentResult<Vec<R::Output>>
    where
        R: Resolver + ?Sized,
    {
        let times = options.times.unwrap_or(usize::MAX);
        if times == 0 {
            return Ok(Vec::new());
        }
        if self.finished() {
            return Err(ArgumentError::missing(resolver.name()));
        }

        let start = self.position;
        let mut values = Vec::new();
        let mut failure = None;
        while values.len() < times && !self.finished() {
            match self.pick_with(resolver, options.options).await {
                Ok(value) => values.push(value),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        if values.is_empty() {
            self.position = start;
            return Err(failure.unwrap_or_else(|| ArgumentError::missing(resolver.name())));
        }

        if let Some(expected) = options.times.filter(|_| options.strict) {
            if values.len() < expected {
                self.position = start;
                let parameter = failure.map(|e| e.parameter).unwrap_or_default();
                return Err(ArgumentError::new(
                    resolver.name(),
                    parameter,
                    ARGS_REPEAT_INCOMPLETE,
                    format!(
                        "Expected {expected} arguments but only {} could be resolved.",
                        values.len()
                    ),
                ));
            }
        }

        Ok(values)
    }

    /// Returns true if any of `keys` was given as a flag.
    pub fn get_flags(&self, keys: &[&str]) -> bool {
        keys.iter().any(|key| self.parameters.flags.contains(*key))
    }

    /// Returns the last value given for the first of `keys` that has one.
    pub fn get_option(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|key| self.parameters.options.get(*key))
            .find_map(|values| values.last())
            .map(String::as_str)
    }

    /// Returns every value given for any of `keys`, in key order.
    ///
    /// `None` when none of the keys appeared at all.
    pub fn get_options(&self, keys: &[&str]) -> Option<Vec<String>> {
        let mut found = false;
        let mut values = Vec::new();
        for key in keys {
            if let Some(given) = self.parameters.options.get(*key) {
                found = true;
                values.extend(given.iter().cloned());
            }
        }
        found.then_some(values)
    }

    /// Pushes the current position.
    pub fn save(&mut self) {
        self.states.push(self.position);
    }

    /// Pops the last saved position and moves back to it.
    pub fn restore(&mut self) -> Result<(), UserError> {
        match self.states.pop() {
            Some(position) => {
                self.position = position;
                Ok(())
            }
            None => Err(UserError::new(
                ARGS_RESTORE_WITHOUT_SAVE,
                "There is no saved state to restore.",
            )),
        }
    }

    fn joined_rest(&self) -> String {
        let tokens = &self.parameters.ordered[self.position..];
        let mut joined = String::new();
        for (i, token) in tokens.iter().enumerate() {
            joined.push_str(&token.value);
            if i + 1 < tokens.len() {
                joined.push_str(&token.trailing);
            }
        }
        joined
    }

    fn resolver<T: Send + 'static>(&self, name: &str) -> ResolverHandle<T> {
        match self.resolvers.get::<T>(name) {
            Ok(handle) => handle,
            Err(err) => {
                tracing::error!(command = %self.command, resolver = name, "{}", err);
                std::panic::panic_any(err)
            }
        }
    }
}
