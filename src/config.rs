//! Configuration management for chat-dispatch.
//!
//! Dispatcher settings are loaded from a TOML file, with a couple of
//! environment overrides for deployments that keep secrets out of files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::args::tokenizer::FlagStrategy;
use crate::error::{ConfigError, Result};

/// Environment variable overriding the literal prefixes (comma-separated).
pub const PREFIX_ENV: &str = "CHAT_DISPATCH_PREFIX";

/// Environment variable overriding the bot's user id.
pub const CLIENT_ID_ENV: &str = "CHAT_DISPATCH_CLIENT_ID";

/// Dispatcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// The bot's own user id. Enables the mention prefix.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Literal prefixes, first match wins.
    #[serde(default = "default_prefixes")]
    pub prefixes: Vec<String>,

    /// Regular expression prefixes, matched at the start of a message.
    #[serde(default)]
    pub prefix_patterns: Vec<String>,

    /// Match command names regardless of case.
    #[serde(default)]
    pub case_insensitive_commands: bool,

    /// Match prefixes regardless of case.
    #[serde(default)]
    pub case_insensitive_prefixes: bool,

    /// Never dispatch messages from bots or webhooks.
    #[serde(default = "default_ignore_bots")]
    pub ignore_bots: bool,

    /// Commands disabled at startup.
    #[serde(default)]
    pub disabled_commands: Vec<String>,

    /// Flag and option syntax shared by every command.
    #[serde(default)]
    pub strategy: StrategyConfig,
}

/// Bot-wide flag and option syntax.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Flag/option prefixes; `None` keeps each command's own.
    #[serde(default)]
    pub prefixes: Option<Vec<String>>,

    /// Option key/value separators; `None` keeps each command's own.
    #[serde(default)]
    pub separators: Option<Vec<String>>,
}

impl StrategyConfig {
    /// Applies the configured syntax to a command's strategy.
    pub fn apply(&self, strategy: &mut FlagStrategy) {
        if let Some(prefixes) = &self.prefixes {
            strategy.prefixes = prefixes.clone();
        }
        if let Some(separators) = &self.separators {
            strategy.separators = separators.clone();
        }
    }

    /// Returns true when nothing is overridden.
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_none() && self.separators.is_none()
    }
}

fn default_prefixes() -> Vec<String> {
    vec!["!".to_string()]
}

fn default_ignore_bots() -> bool {
    true
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            prefixes: default_prefixes(),
            prefix_patterns: Vec::new(),
            case_insensitive_commands: false,
            case_insensitive_prefixes: false,
            ignore_bots: default_ignore_bots(),
            disabled_commands: Vec::new(),
            strategy: StrategyConfig::default(),
        }
    }
}

impl DispatcherConfig {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chat-dispatch")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Applies `CHAT_DISPATCH_PREFIX` and `CHAT_DISPATCH_CLIENT_ID` when set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var(PREFIX_ENV).ok(),
            std::env::var(CLIENT_ID_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, prefix: Option<String>, client_id: Option<String>) {
        if let Some(prefix) = prefix.filter(|p| !p.trim().is_empty()) {
            self.prefixes = prefix
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(client_id) = client_id.filter(|id| !id.trim().is_empty()) {
            self.client_id = Some(client_id.trim().to_string());
        }
    }
}
