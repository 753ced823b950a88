//! Platform-neutral message model.
//!
//! The chat platform client is an external collaborator; an adapter converts its
//! message objects into these plain values before handing them to the dispatcher.

use serde::{Deserialize, Serialize};

/// Snowflake-style identifier of a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Snowflake-style identifier of a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub String);

/// Snowflake-style identifier of a guild (server).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GuildId(pub String);

/// Snowflake-style identifier of a role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleId(pub String);

macro_rules! impl_id {
    ($($ty:ident),*) => {
        $(
            impl $ty {
                /// Returns the identifier as a string slice.
                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }

            impl From<&str> for $ty {
                fn from(s: &str) -> Self {
                    Self(s.to_string())
                }
            }

            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )*
    };
}

impl_id!(UserId, ChannelId, GuildId, RoleId);

/// The author of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// User identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Whether the author is a bot account.
    #[serde(default)]
    pub bot: bool,
    /// Role identifiers the author holds in the guild, if any.
    #[serde(default)]
    pub roles: Vec<RoleId>,
}

/// Kind of channel a message was sent in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// A guild text channel.
    #[default]
    Text,
    /// A guild announcement channel.
    News,
    /// A direct-message channel.
    Dm,
}

/// The channel a message was sent in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel identifier.
    pub id: ChannelId,
    /// Channel kind.
    #[serde(default)]
    pub kind: ChannelKind,
    /// Whether the channel is marked age-restricted.
    #[serde(default)]
    pub nsfw: bool,
}

/// The guild a message was sent in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    /// Guild identifier.
    pub id: GuildId,
}

/// An inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier.
    pub id: String,
    /// Raw message text.
    pub content: String,
    /// Who sent it.
    pub author: Author,
    /// Where it was sent.
    pub channel: Channel,
    /// The guild, `None` for direct messages.
    pub guild: Option<Guild>,
    /// Set when the message was sent through a webhook.
    #[serde(default)]
    pub webhook_id: Option<String>,
}

impl Message {
    /// Creates a guild text-channel message.
    pub fn in_guild(
        content: impl Into<String>,
        author: UserId,
        channel: ChannelId,
        guild: GuildId,
    ) -> Self {
        Self {
            id: String::new(),
            content: content.into(),
            author: Author {
                name: author.0.clone(),
                id: author,
                bot: false,
                roles: Vec::new(),
            },
            channel: Channel {
                id: channel,
                kind: ChannelKind::Text,
                nsfw: false,
            },
            guild: Some(Guild { id: guild }),
            webhook_id: None,
        }
    }

    /// Creates a direct message.
    pub fn direct(content: impl Into<String>, author: UserId, channel: ChannelId) -> Self {
        Self {
            id: String::new(),
            content: content.into(),
            author: Author {
                name: author.0.clone(),
                id: author,
                bot: false,
                roles: Vec::new(),
            },
            channel: Channel {
                id: channel,
                kind: ChannelKind::Dm,
                nsfw: false,
            },
            guild: None,
            webhook_id: None,
        }
    }

    /// Returns true when the message was sent outside any guild.
    pub fn is_direct(&self) -> bool {
        self.guild.is_none()
    }

    /// Returns true when the message came from a bot or a webhook.
    pub fn is_automated(&self) -> bool {
        self.author.bot || self.webhook_id.is_some()
    }
}
