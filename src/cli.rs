//! Command-line argument parsing for the demo bot.

use std::path::PathBuf;

use chat_dispatch::config::{DispatcherConfig, CLIENT_ID_ENV};
use chat_dispatch::demo::DEFAULT_MODERATOR_ROLE;
use chat_dispatch::message::{ChannelKind, Message, RoleId};
use clap::Parser;

/// Reads chat messages from stdin and dispatches them to the demo commands.
#[derive(Parser, Debug)]
#[command(name = "chat-dispatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Author id of every message
    #[arg(short = 'u', long, value_name = "ID", default_value = "100000000000000001")]
    pub user: String,

    /// Channel id of every message
    #[arg(short = 'c', long, value_name = "ID", default_value = "200000000000000001")]
    pub channel: String,

    /// Guild id of every message
    #[arg(short = 'g', long, value_name = "ID", default_value = "300000000000000001")]
    pub guild: String,

    /// Send direct messages instead of guild messages
    #[arg(long)]
    pub dm: bool,

    /// Mark the channel NSFW
    #[arg(long)]
    pub nsfw: bool,

    /// Give the author the moderator role
    #[arg(long)]
    pub moderator: bool,

    /// Bot user id, enabling the mention prefix
    #[arg(long, value_name = "ID", env = CLIENT_ID_ENV)]
    pub client_id: Option<String>,

    /// Literal prefix, replacing the configured ones (repeatable)
    #[arg(short = 'p', long = "prefix", value_name = "PREFIX")]
    pub prefixes: Vec<String>,

    /// Log to a file instead of stderr
    #[arg(long)]
    pub log_file: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(DispatcherConfig::default_path)
    }

    /// Applies command-line overrides on top of the loaded configuration.
    pub fn apply_to(&self, config: &mut DispatcherConfig) {
        if let Some(client_id) = &self.client_id {
            config.client_id = Some(client_id.clone());
        }
        if !self.prefixes.is_empty() {
            config.prefixes = self.prefixes.clone();
        }
    }

    /// Wraps one line of input in a message from the configured author.
    pub fn message(&self, content: &str) -> Message {
        let mut message = if self.dm {
            Message::direct(content, self.user.as_str().into(), self.channel.as_str().into())
        } else {
            Message::in_guild(
                content,
                self.user.as_str().into(),
                self.channel.as_str().into(),
                self.guild.as_str().into(),
            )
        };
        if self.nsfw && message.channel.kind != ChannelKind::Dm {
            message.channel.nsfw = true;
        }
        if self.moderator {
            message.author.roles.push(RoleId::from(DEFAULT_MODERATOR_ROLE));
        }
        message
    }
}
