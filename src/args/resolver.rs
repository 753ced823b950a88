//! Typed argument resolvers.
//!
//! A resolver turns one raw parameter into a typed value. Resolvers are
//! registered by name in a `ResolverStore` at startup; the argument cursor looks
//! them up when a command asks for a type by name.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ArgumentError, ArgumentResult, ConfigError};
use crate::message::Message;

/// Bounds handed to a resolver through the cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ArgOptions {
    /// Smallest accepted value (or length, for strings).
    pub minimum: Option<f64>,
    /// Largest accepted value (or length, for strings).
    pub maximum: Option<f64>,
    /// Treat the bounds as exclusive instead of inclusive.
    pub exclusive: bool,
}

impl ArgOptions {
    /// Options with a lower bound.
    pub fn min(minimum: f64) -> Self {
        Self {
            minimum: Some(minimum),
            ..Self::default()
        }
    }

    /// Options with an upper bound.
    pub fn max(maximum: f64) -> Self {
        Self {
            maximum: Some(maximum),
            ..Self::default()
        }
    }

    /// Options with both bounds.
    pub fn range(minimum: f64, maximum: f64) -> Self {
        Self {
            minimum: Some(minimum),
            maximum: Some(maximum),
            exclusive: false,
        }
    }
}

/// Context passed to every resolver call.
#[derive(Debug, Clone, Copy)]
pub struct ArgumentContext<'a> {
    /// The message that triggered the command.
    pub message: &'a Message,
    /// Name of the command being run.
    pub command: &'a str,
    /// Optional bounds.
    pub options: ArgOptions,
}

impl<'a> ArgumentContext<'a> {
    /// Creates a context.
    pub fn new(message: &'a Message, command: &'a str, options: ArgOptions) -> Self {
        Self {
            message,
            command,
            options,
        }
    }

    /// Returns true when `value` falls below the configured minimum.
    pub fn below_minimum(&self, value: f64) -> bool {
        match self.options.minimum {
            Some(min) if self.options.exclusive => value <= min,
            Some(min) => value < min,
            None => false,
        }
    }

    /// Returns true when `value` exceeds the configured maximum.
    pub fn above_maximum(&self, value: f64) -> bool {
        match self.options.maximum {
            Some(max) if self.options.exclusive => value >= max,
            Some(max) => value > max,
            None => false,
        }
    }
}

/// Converts a raw parameter into a typed value.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// The resolved type.
    type Output: Send + 'static;

    /// Name the resolver is registered under.
    fn name(&self) -> &str;

    /// Additional names the resolver answers to.
    fn aliases(&self) -> &[&'static str] {
        &[]
    }

    /// Resolves `parameter`.
    async fn run(
        &self,
        parameter: &str,
        context: &ArgumentContext<'_>,
    ) -> ArgumentResult<Self::Output>;

    /// Builds an `ArgumentError` attributed to this resolver.
    fn error(
        &self,
        parameter: &str,
        identifier: &str,
        message: impl Into<String>,
    ) -> ArgumentError
    where
        Self: Sized,
    {
        ArgumentError::new(self.name(), parameter, identifier, message)
    }
}

/// Shared handle to a resolver producing `T`.
pub type ResolverHandle<T> = Arc<dyn Resolver<Output = T>>;

/// Registry mapping resolver names and aliases to typed handles.
#[derive(Default)]
pub struct ResolverStore {
    entries: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl ResolverStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the built-in resolvers.
    pub fn with_defaults() -> Self {
        let mut store = Self::new();
        super::builtin::register_defaults(&mut store);
        store
    }

    /// Registers a resolver under its name and aliases, replacing earlier entries.
    pub fn register<R>(&mut self, resolver: R) -> &mut Self
    where
        R: Resolver + 'static,
    {
        let handle: ResolverHandle<R::Output> = Arc::new(resolver);
        let names = std::iter::once(handle.name().to_string())
            .chain(handle.aliases().iter().map(|a| a.to_string()))
            .collect::<Vec<_>>();
        for name in names {
            tracing::debug!(resolver = %name, "Registered resolver");
            self.entries.insert(name, Arc::new(handle.clone()));
        }
        self
    }

    /// Looks up a resolver producing `T`.
    ///
    /// A missing name or a type mismatch is a configuration fault.
    pub fn get<T: Send + 'static>(&self, name: &str) -> Result<ResolverHandle<T>, ConfigError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| ConfigError::MissingResolver(name.to_string()))?;
        entry
            .downcast_ref::<ResolverHandle<T>>()
            .cloned()
            .ok_or_else(|| ConfigError::ResolverType {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Returns true if a resolver is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns the registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ResolverStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverStore")
            .field("names", &self.names())
            .finish()
    }
}
