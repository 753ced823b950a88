//! Built-in preconditions.

use async_trait::async_trait;

use super::{Precondition, PreconditionContext};
use crate::error::PreconditionResult;
use crate::message::Message;

/// Allows only messages sent in a guild.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuildOnly;

#[async_trait]
impl Precondition for GuildOnly {
    fn name(&self) -> &str {
        "GuildOnly"
    }

    async fn run(&self, message: &Message, _: &str, _: &PreconditionContext) -> PreconditionResult {
        if message.is_direct() {
            return Err(self.error(
                "PreconditionGuildOnly",
                "This command can only be used in servers.",
            ));
        }
        Ok(())
    }
}

/// Allows only direct messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct DmOnly;

#[async_trait]
impl Precondition for DmOnly {
    fn name(&self) -> &str {
        "DMOnly"
    }

    async fn run(&self, message: &Message, _: &str, _: &PreconditionContext) -> PreconditionResult {
        if !message.is_direct() {
            return Err(self.error(
                "PreconditionDMOnly",
                "This command can only be used in DMs.",
            ));
        }
        Ok(())
    }
}

/// Allows only channels marked NSFW.
#[derive(Debug, Clone, Copy, Default)]
pub struct Nsfw;

#[async_trait]
impl Precondition for Nsfw {
    fn name(&self) -> &str {
        "NSFW"
    }

    async fn run(&self, message: &Message, _: &str, _: &PreconditionContext) -> PreconditionResult {
        if !message.channel.nsfw {
            return Err(self.error(
                "PreconditionNSFW",
                "You cannot run this command outside NSFW channels.",
            ));
        }
        Ok(())
    }
}
