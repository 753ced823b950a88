//! Prefix matching.
//!
//! A message addresses the bot when it starts with the bot's mention
//! (`<@ID>` or `<@!ID>`) or with one of the prefixes returned by a
//! [`PrefixProvider`]. Literal prefixes are tried in order and the first match
//! wins; patterns must match at the start of the message.

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};

use crate::error::ConfigError;
use crate::message::{Message, UserId};

/// A prefix: literal text or an anchored pattern.
#[derive(Debug, Clone)]
pub enum Prefix {
    /// Literal text such as `!`.
    Literal(String),
    /// A regular expression matched at the start of the message.
    Pattern(Regex),
}

impl Prefix {
    /// Compiles a pattern prefix.
    pub fn pattern(pattern: &str, case_insensitive: bool) -> Result<Self, ConfigError> {
        RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map(Self::Pattern)
            .map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    /// Returns the matched prefix text if `content` starts with this prefix.
    pub fn matches<'a>(&self, content: &'a str, case_insensitive: bool) -> Option<&'a str> {
        match self {
            Self::Literal(prefix) if prefix.is_empty() => None,
            Self::Literal(prefix) => {
                let head = content.get(..prefix.len())?;
                let matched = if case_insensitive {
                    head.to_lowercase() == prefix.to_lowercase()
                } else {
                    head == prefix
                };
                matched.then_some(head)
            }
            Self::Pattern(regex) => regex
                .find(content)
                .filter(|m| m.start() == 0 && !m.is_empty())
                .map(|m| m.as_str()),
        }
    }
}

impl From<&str> for Prefix {
    fn from(prefix: &str) -> Self {
        Self::Literal(prefix.to_string())
    }
}

/// Supplies the prefixes accepted for a message.
///
/// Returning an empty list leaves only the mention prefix.
#[async_trait]
pub trait PrefixProvider: Send + Sync {
    /// Prefixes accepted for `message`, in priority order.
    async fn prefixes(&self, message: &Message) -> Vec<Prefix>;
}

/// The same prefixes for every message.
#[derive(Debug, Clone, Default)]
pub struct StaticPrefixes {
    prefixes: Vec<Prefix>,
}

impl StaticPrefixes {
    /// Creates a provider from prefixes.
    pub fn new(prefixes: Vec<Prefix>) -> Self {
        Self { prefixes }
    }

    /// Builds literal prefixes followed by compiled patterns.
    pub fn from_config(
        literals: &[String],
        patterns: &[String],
        case_insensitive: bool,
    ) -> Result<Self, ConfigError> {
        let mut prefixes: Vec<Prefix> = literals.iter().map(|p| p.as_str().into()).collect();
        for pattern in patterns {
            prefixes.push(Prefix::pattern(pattern, case_insensitive)?);
        }
        Ok(Self::new(prefixes))
    }
}

#[async_trait]
impl PrefixProvider for StaticPrefixes {
    async fn prefixes(&self, _message: &Message) -> Vec<Prefix> {
        self.prefixes.clone()
    }
}

/// Returns the mention of `client_id` that `content` starts with.
pub fn match_mention<'a>(content: &'a str, client_id: &UserId) -> Option<&'a str> {
    let id = client_id.as_str();
    ["<@", "<@!"].iter().find_map(|open| {
        let len = open.len() + id.len() + 1;
        let head = content.get(..len)?;
        let matched = head.starts_with(open)
            && head[open.len()..].starts_with(id)
            && head.ends_with('>');
        matched.then_some(head)
    })
}

/// Returns the first prefix in `prefixes` that `content` starts with.
pub fn match_prefix<'a>(
    content: &'a str,
    prefixes: &[Prefix],
    case_insensitive: bool,
) -> Option<&'a str> {
    prefixes
        .iter()
        .find_map(|prefix| prefix.matches(content, case_insensitive))
}
