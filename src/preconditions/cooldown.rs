//! Cooldown buckets and the `Cooldown` precondition.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Precondition, PreconditionContext};
use crate::commands::store::UnregisterHook;
use crate::error::{ConfigError, PreconditionResult};
use crate::message::Message;

/// What a cooldown is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketType {
    /// One bucket per channel.
    Channel,
    /// One bucket for everyone.
    Global,
    /// One bucket per guild.
    Guild,
    /// One bucket per author.
    #[default]
    User,
}

impl BucketType {
    /// Returns the scope key for `message`.
    ///
    /// A guild bucket on a message without a guild is a configuration fault.
    pub fn key(&self, message: &Message) -> Result<String, ConfigError> {
        let key = match self {
            Self::Global => "global".to_string(),
            Self::Channel => message.channel.id.to_string(),
            Self::Guild => match &message.guild {
                Some(guild) => guild.id.to_string(),
                None => return Err(ConfigError::GuildBucketOutsideGuild),
            },
            Self::User => message.author.id.to_string(),
        };
        Ok(key)
    }
}

fn default_limit() -> u32 {
    1
}

/// Cooldown settings of one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownOptions {
    /// Window length in milliseconds. Zero disables the cooldown.
    pub delay_ms: u64,
    /// Uses allowed per window.
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Scope of the bucket.
    #[serde(default)]
    pub bucket_type: BucketType,
}

impl CooldownOptions {
    /// One use per `delay_ms` per user.
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            limit: default_limit(),
            bucket_type: BucketType::default(),
        }
    }

    /// Sets the uses allowed per window.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the bucket scope.
    pub fn with_bucket_type(mut self, bucket_type: BucketType) -> Self {
        self.bucket_type = bucket_type;
        self
    }

    /// Parses options out of a precondition context.
    pub fn from_context(context: &PreconditionContext) -> Result<Self, ConfigError> {
        serde_json::from_value(serde_json::Value::Object(context.clone())).map_err(|e| {
            ConfigError::InvalidContext {
                name: "Cooldown".to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Serializes the options into a precondition context.
    pub fn to_context(&self) -> PreconditionContext {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => PreconditionContext::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    start: Instant,
    used: u32,
}

/// A fixed-window counter per scope key.
#[derive(Debug)]
pub struct Bucket {
    delay: Duration,
    limit: u32,
    windows: HashMap<String, Window>,
}

impl Bucket {
    /// Allows `limit` uses per `delay`. A limit of zero or one is a plain delay.
    pub fn new(delay: Duration, limit: u32) -> Self {
        Self {
            delay,
            limit: limit.max(1),
            windows: HashMap::new(),
        }
    }

    /// Takes a slot for `key` now. See [`take_at`](Self::take_at).
    pub fn take(&mut self, key: &str) -> u64 {
        self.take_at(key, Instant::now())
    }

    /// Takes a slot for `key` at `now`.
    ///
    /// Returns `0` when a slot was taken, otherwise the milliseconds left until
    /// the window resets. A denied call does not consume anything.
    pub fn take_at(&mut self, key: &str, now: Instant) -> u64 {
        if let Some(window) = self.windows.get_mut(key) {
            let elapsed = now.saturating_duration_since(window.start);
            if elapsed < self.delay {
                if window.used < self.limit {
                    window.used += 1;
                    return 0;
                }
                let remaining = (self.delay - elapsed).as_millis() as u64;
                return remaining.max(1);
            }
        }
        self.windows
            .insert(key.to_string(), Window { start: now, used: 1 });
        0
    }

    /// Drops windows that have expired at `now`.
    pub fn sweep_at(&mut self, now: Instant) {
        let delay = self.delay;
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.start) < delay);
    }

    /// Number of scope keys with a window.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Returns true if no window is tracked.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Rate-limits commands through per-command buckets.
///
/// The bucket of a command is created on its first use, from the options in
/// that use's context, and dropped when the command is unregistered.
#[derive(Debug, Default)]
pub struct Cooldown {
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl Cooldown {
    /// Creates a cooldown with no buckets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a slot for `command` and returns the milliseconds left, or `0`.
    pub fn take_at(
        &self,
        command: &str,
        options: &CooldownOptions,
        key: &str,
        now: Instant,
    ) -> u64 {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        let bucket = buckets.entry(command.to_string()).or_insert_with(|| {
            Bucket::new(Duration::from_millis(options.delay_ms), options.limit)
        });
        bucket.sweep_at(now);
        bucket.take_at(key, now)
    }

    /// Returns true if a bucket exists for `command`.
    pub fn has_bucket(&self, command: &str) -> bool {
        self.buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(command)
    }
}

/// Formats the denial message for `remaining` milliseconds.
pub fn cooldown_message(remaining: u64) -> String {
    let seconds = remaining.div_ceil(1000);
    let plural = if remaining > 1000 { "s" } else { "" };
    format!("You have just used this command. Try again in {seconds} second{plural}.")
}

#[async_trait]
impl Precondition for Cooldown {
    fn name(&self) -> &str {
        "Cooldown"
    }

    fn validate(&self, context: &PreconditionContext) -> Result<(), ConfigError> {
        CooldownOptions::from_context(context).map(|_| ())
    }

    async fn run(
        &self,
        message: &Message,
        command: &str,
        context: &PreconditionContext,
    ) -> PreconditionResult {
        let options = match CooldownOptions::from_context(context) {
            Ok(options) => options,
            Err(err) => {
                // Contexts are validated at registration
                tracing::error!(command, "{}", err);
                return Ok(());
            }
        };
        if options.delay_ms == 0 {
            return Ok(());
        }

        // Reported through the dispatcher's unwind boundary, like a missing resolver
        let key = match options.bucket_type.key(message) {
            Ok(key) => key,
            Err(fault) => {
                tracing::error!(command, "{}", fault);
                std::panic::panic_any(fault)
            }
        };
        let remaining = self.take_at(command, &options, &key, Instant::now());
        if remaining == 0 {
            return Ok(());
        }

        tracing::debug!(command, key = %key, remaining_ms = remaining, "Cooldown active");
        Err(self
            .error("PreconditionCooldown", cooldown_message(remaining))
            .with_extras(serde_json::json!({ "remaining": remaining })))
    }
}

impl UnregisterHook for Cooldown {
    fn command_unregistered(&self, name: &str) {
        let removed = self
            .buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        if removed.is_some() {
            tracing::debug!(command = name, "Evicted cooldown bucket");
        }
    }
}
