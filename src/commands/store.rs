//! Command registry with alias lookup.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{Command, CommandOptions};
use crate::error::ConfigError;
use crate::preconditions::{PreconditionContainer, PreconditionEntry, PreconditionStore};

/// Notified when a command leaves the store.
pub trait UnregisterHook: Send + Sync {
    /// Called with the primary name of the removed command.
    fn command_unregistered(&self, name: &str);
}

/// A command together with its built precondition tree.
pub struct RegisteredCommand {
    command: Arc<dyn Command>,
    preconditions: PreconditionContainer,
    keys: Vec<String>,
    enabled: AtomicBool,
}

impl RegisteredCommand {
    /// Primary name.
    pub fn name(&self) -> &str {
        &self.command.options().name
    }

    /// Declared options.
    pub fn options(&self) -> &CommandOptions {
        self.command.options()
    }

    /// The command.
    pub fn command(&self) -> &Arc<dyn Command> {
        &self.command
    }

    /// The precondition tree built at registration.
    pub fn preconditions(&self) -> &PreconditionContainer {
        &self.preconditions
    }

    /// Every lookup key this command was registered under.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Whether the command currently accepts invocations.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Enables or disables the command.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for RegisteredCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredCommand")
            .field("name", &self.name())
            .field("keys", &self.keys)
            .field("enabled", &self.is_enabled())
            .field("preconditions", &self.preconditions)
            .finish()
    }
}

/// Commands by name and alias.
#[derive(Default)]
pub struct CommandStore {
    commands: HashMap<String, Arc<RegisteredCommand>>,
    lookup: HashMap<String, String>,
    case_insensitive: bool,
    hooks: Vec<Arc<dyn UnregisterHook>>,
}

impl CommandStore {
    /// Creates an empty store. With `case_insensitive`, lookups ignore case.
    pub fn new(case_insensitive: bool) -> Self {
        Self {
            case_insensitive,
            ..Self::default()
        }
    }

    /// Adds a hook notified on every unregistration.
    pub fn add_hook(&mut self, hook: Arc<dyn UnregisterHook>) {
        self.hooks.push(hook);
    }

    fn fold(&self, key: &str) -> String {
        if self.case_insensitive {
            key.to_lowercase()
        } else {
            key.to_string()
        }
    }

    fn keys_for(&self, options: &CommandOptions) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        let names = std::iter::once(&options.name).chain(options.aliases.iter());
        for name in names {
            let mut variants = vec![self.fold(name)];
            if options.generate_dash_less_aliases && name.contains('-') {
                variants.push(self.fold(&name.replace('-', "")));
            }
            for key in variants {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        keys
    }

    /// Registers a command, building its precondition tree from `preconditions`.
    pub fn register<C: Command + 'static>(
        &mut self,
        command: C,
        preconditions: &PreconditionStore,
    ) -> Result<Arc<RegisteredCommand>, ConfigError> {
        self.register_arc(Arc::new(command), preconditions)
    }

    /// Registers a shared command.
    pub fn register_arc(
        &mut self,
        command: Arc<dyn Command>,
        preconditions: &PreconditionStore,
    ) -> Result<Arc<RegisteredCommand>, ConfigError> {
        let options = command.options();
        let name = options.name.clone();
        let enabled = options.enabled;

        if self.commands.contains_key(&name) {
            return Err(ConfigError::DuplicateCommand(name));
        }
        let keys = self.keys_for(options);
        if let Some(taken) = keys.iter().find(|k| self.lookup.contains_key(*k)) {
            return Err(ConfigError::DuplicateCommand(taken.clone()));
        }

        let mut entries = options.preconditions.clone();
        if let Some(cooldown) = &options.cooldown {
            entries.push(PreconditionEntry::with_context(
                "Cooldown",
                cooldown.to_context(),
            ));
        }
        let tree =
            PreconditionContainer::build(&entries, options.precondition_mode, preconditions)?;

        let registered = Arc::new(RegisteredCommand {
            enabled: AtomicBool::new(enabled),
            command,
            preconditions: tree,
            keys: keys.clone(),
        });
        for key in keys {
            self.lookup.insert(key, name.clone());
        }
        self.commands.insert(name.clone(), registered.clone());

        tracing::debug!(command = %name, keys = ?registered.keys(), "Registered command");
        Ok(registered)
    }

    /// Finds a command by name or alias.
    pub fn get(&self, name: &str) -> Option<Arc<RegisteredCommand>> {
        let primary = self.lookup.get(&self.fold(name))?;
        self.commands.get(primary).cloned()
    }

    /// Enables or disables a command. Returns false if it is not registered.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        match self.get(name) {
            Some(command) => {
                command.set_enabled(enabled);
                tracing::info!(command = %command.name(), enabled, "Command toggled");
                true
            }
            None => false,
        }
    }

    /// Removes a command and its aliases, then notifies the hooks.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<RegisteredCommand>> {
        let primary = self.lookup.get(&self.fold(name))?.clone();
        let removed = self.commands.remove(&primary)?;
        self.lookup.retain(|_, target| *target != primary);
        for hook in &self.hooks {
            hook.command_unregistered(&primary);
        }
        tracing::debug!(command = %primary, "Unregistered command");
        Some(removed)
    }

    /// Primary names of all commands, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns true if no command is registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl std::fmt::Debug for CommandStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandStore")
            .field("names", &self.names())
            .field("case_insensitive", &self.case_insensitive)
            .finish()
    }
}
