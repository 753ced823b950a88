//! Preconditions: named authorization checks run before a command.
//!
//! A command declares a tree of precondition names (see [`container`]). The
//! names are looked up in a [`PreconditionStore`] once, when the command is
//! registered, so an unknown name fails registration instead of a dispatch.

pub mod builtin;
pub mod container;
pub mod cooldown;

pub use builtin::{DmOnly, GuildOnly, Nsfw};
pub use container::{PreconditionContainer, PreconditionEntry, RunCondition, RunMode};
pub use cooldown::{Bucket, BucketType, Cooldown, CooldownOptions};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::commands::store::UnregisterHook;
use crate::error::{ConfigError, PreconditionError, PreconditionResult};
use crate::message::Message;

/// Per-entry data handed to a precondition, e.g. cooldown settings.
pub type PreconditionContext = serde_json::Map<String, serde_json::Value>;

/// A single named authorization check.
///
/// Implementations must be thread-safe (Send + Sync) since one instance is
/// shared by every command that names it.
#[async_trait]
pub trait Precondition: Send + Sync {
    /// Name used in precondition trees.
    fn name(&self) -> &str;

    /// Checks a context at registration time.
    fn validate(&self, _context: &PreconditionContext) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Runs the check for `command` triggered by `message`.
    async fn run(
        &self,
        message: &Message,
        command: &str,
        context: &PreconditionContext,
    ) -> PreconditionResult;

    /// Builds a `PreconditionError` attributed to this precondition.
    fn error(&self, identifier: &str, message: impl Into<String>) -> PreconditionError
    where
        Self: Sized,
    {
        PreconditionError::new(self.name(), identifier, message)
    }
}

/// Registry of preconditions by name.
#[derive(Default)]
pub struct PreconditionStore {
    entries: HashMap<String, Arc<dyn Precondition>>,
    hooks: Vec<Arc<dyn UnregisterHook>>,
}

impl PreconditionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with `GuildOnly`, `DMOnly`, `NSFW` and `Cooldown`.
    pub fn with_defaults() -> Self {
        let mut store = Self::new();
        store
            .register(GuildOnly)
            .register(DmOnly)
            .register(Nsfw)
            .register_with_hook(Cooldown::new());
        store
    }

    /// Registers a precondition, replacing any earlier one with the same name.
    pub fn register<P: Precondition + 'static>(&mut self, precondition: P) -> &mut Self {
        self.insert(Arc::new(precondition));
        self
    }

    /// Registers a precondition that also wants to hear about unregistered commands.
    pub fn register_with_hook<P>(&mut self, precondition: P) -> &mut Self
    where
        P: Precondition + UnregisterHook + 'static,
    {
        let shared = Arc::new(precondition);
        self.hooks.push(shared.clone());
        self.insert(shared);
        self
    }

    fn insert(&mut self, precondition: Arc<dyn Precondition>) {
        let name = precondition.name().to_string();
        tracing::debug!(precondition = %name, "Registered precondition");
        self.entries.insert(name, precondition);
    }

    /// Looks up a precondition by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Precondition>, ConfigError> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::MissingPrecondition(name.to_string()))
    }

    /// Returns true if a precondition is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Hooks registered through [`register_with_hook`](Self::register_with_hook).
    pub fn hooks(&self) -> &[Arc<dyn UnregisterHook>] {
        &self.hooks
    }
}

impl std::fmt::Debug for PreconditionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("PreconditionStore")
            .field("names", &names)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
