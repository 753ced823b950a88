//! A small command set used by the `chat-dispatch` binary and the tests.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use crate::args::{ArgOptions, Args, RepeatOptions};
use crate::commands::{Command, CommandContext, CommandOptions, CommandOutput};
use crate::dispatch::DispatcherBuilder;
use crate::error::{CommandError, PreconditionResult};
use crate::message::{Message, RoleId};
use crate::preconditions::{
    BucketType, CooldownOptions, Precondition, PreconditionContext, PreconditionEntry,
};

/// Role the `Moderator` precondition looks for unless told otherwise.
pub const DEFAULT_MODERATOR_ROLE: &str = "moderator";

/// Adds every demo command and the `Moderator` precondition.
pub fn install(builder: DispatcherBuilder, moderator_role: RoleId) -> DispatcherBuilder {
    builder
        .precondition(Moderator::new(moderator_role))
        .command(Ping::default())
        .command(Add::default())
        .command(Say::default())
        .command(Sum::default())
        .command(Inspect::default())
        .command(Roll::default())
        .command(ModOnly::default())
}

/// Allows authors holding a given role.
#[derive(Debug, Clone)]
pub struct Moderator {
    role: RoleId,
}

impl Moderator {
    /// Checks for `role`.
    pub fn new(role: RoleId) -> Self {
        Self { role }
    }
}

#[async_trait]
impl Precondition for Moderator {
    fn name(&self) -> &str {
        "Moderator"
    }

    async fn run(&self, message: &Message, _: &str, _: &PreconditionContext) -> PreconditionResult {
        if message.author.roles.contains(&self.role) {
            return Ok(());
        }
        Err(self.error(
            "PreconditionModerator",
            "Only moderators can use this command.",
        ))
    }
}

macro_rules! demo_command {
    ($ty:ident, $options:expr) => {
        #[doc = concat!("The `", stringify!($ty), "` demo command.")]
        #[derive(Debug, Clone)]
        pub struct $ty(CommandOptions);

        impl Default for $ty {
            fn default() -> Self {
                Self($options)
            }
        }
    };
}

demo_command!(
    Ping,
    CommandOptions::new("ping").description("Replies with pong")
);
demo_command!(
    Add,
    CommandOptions::new("add")
        .aliases(["plus"])
        .description("Adds two integers")
);
demo_command!(
    Say,
    CommandOptions::new("say")
        .aliases(["echo"])
        .description("Repeats the text")
        .flags(["upper", "u"])
);
demo_command!(
    Sum,
    CommandOptions::new("sum")
        .description("Adds up to ten numbers")
        .options(["limit"])
);
demo_command!(
    Inspect,
    CommandOptions::new("inspect").description("Tells numbers from text")
);
demo_command!(
    Roll,
    CommandOptions::new("roll")
        .aliases(["dice"])
        .description("Rolls a die")
        .cooldown(CooldownOptions::new(5_000).with_bucket_type(BucketType::User))
);
demo_command!(
    ModOnly,
    CommandOptions::new("mod-only")
        .description("Only moderators may run this")
        .dash_less_aliases()
        .preconditions([
            PreconditionEntry::name("GuildOnly"),
            PreconditionEntry::name("Moderator"),
        ])
);

#[async_trait]
impl Command for Ping {
    fn options(&self) -> &CommandOptions {
        &self.0
    }

    async fn run(
        &self,
        _: &Message,
        _: &mut Args,
        _: &CommandContext,
    ) -> Result<CommandOutput, CommandError> {
        Ok(CommandOutput::reply("Pong!"))
    }
}

#[async_trait]
impl Command for Add {
    fn options(&self) -> &CommandOptions {
        &self.0
    }

    async fn run(
        &self,
        _: &Message,
        args: &mut Args,
        _: &CommandContext,
    ) -> Result<CommandOutput, CommandError> {
        let a: i64 = args.pick("integer").await?;
        let b: i64 = args.pick("integer").await?;
        Ok(CommandOutput::reply(format!("{a} + {b} = {}", a.saturating_add(b))))
    }
}

#[async_trait]
impl Command for Say {
    fn options(&self) -> &CommandOptions {
        &self.0
    }

    async fn run(
        &self,
        _: &Message,
        args: &mut Args,
        _: &CommandContext,
    ) -> Result<CommandOutput, CommandError> {
        let text: String = args.rest("string").await?;
        if args.get_flags(&["upper", "u"]) {
            return Ok(CommandOutput::reply(text.to_uppercase()));
        }
        Ok(CommandOutput::reply(text))
    }
}

#[async_trait]
impl Command for Sum {
    fn options(&self) -> &CommandOptions {
        &self.0
    }

    async fn run(
        &self,
        _: &Message,
        args: &mut Args,
        _: &CommandContext,
    ) -> Result<CommandOutput, CommandError> {
        let limit = args
            .get_option(&["limit"])
            .and_then(|limit| limit.parse::<usize>().ok())
            .unwrap_or(10)
            .min(10);
        let numbers: Vec<f64> = args.repeat("number", RepeatOptions::times(limit)).await?;
        let total: f64 = numbers.iter().sum();
        Ok(CommandOutput::reply(format!(
            "{} numbers, total {total}",
            numbers.len()
        )))
    }
}

#[async_trait]
impl Command for Inspect {
    fn options(&self) -> &CommandOptions {
        &self.0
    }

    async fn run(
        &self,
        _: &Message,
        args: &mut Args,
        _: &CommandContext,
    ) -> Result<CommandOutput, CommandError> {
        args.save();
        if let Ok(number) = args.pick::<f64>("number").await {
            return Ok(CommandOutput::reply(format!("number {number}")));
        }
        args.restore()?;
        let text: String = args.pick("string").await?;
        Ok(CommandOutput::reply(format!("text \"{text}\"")))
    }
}

#[async_trait]
impl Command for Roll {
    fn options(&self) -> &CommandOptions {
        &self.0
    }

    async fn run(
        &self,
        _: &Message,
        args: &mut Args,
        _: &CommandContext,
    ) -> Result<CommandOutput, CommandError> {
        let sides: i64 = if args.finished() {
            6
        } else {
            args.pick_opts("integer", ArgOptions::range(2.0, 100.0)).await?
        };
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.subsec_nanos())
            .unwrap_or_default();
        let value = i64::from(seed) % sides + 1;
        Ok(CommandOutput::reply(format!("You rolled {value} (d{sides})")))
    }
}

#[async_trait]
impl Command for ModOnly {
    fn options(&self) -> &CommandOptions {
        &self.0
    }

    async fn run(
        &self,
        message: &Message,
        _: &mut Args,
        _: &CommandContext,
    ) -> Result<CommandOutput, CommandError> {
        Ok(CommandOutput::reply(format!(
            "Welcome, moderator {}.",
            message.author.name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ChannelId, UserId};

    #[tokio::test]
    async fn test_moderator_checks_role() {
        let moderator = Moderator::new(RoleId::from("mods"));
        let mut message = Message::direct("!mod-only", UserId::from("1"), ChannelId::from("2"));
        let context = PreconditionContext::new();

        let err = moderator.run(&message, "mod-only", &context).await.unwrap_err();
        assert_eq!(err.identifier, "PreconditionModerator");
        assert_eq!(err.precondition, "Moderator");

        message.author.roles.push(RoleId::from("mods"));
        assert!(moderator.run(&message, "mod-only", &context).await.is_ok());
    }

    #[test]
    fn test_demo_options() {
        assert_eq!(Roll::default().options().aliases, vec!["dice"]);
        assert!(Roll::default().options().cooldown.is_some());
        assert!(ModOnly::default().options().generate_dash_less_aliases);
        assert_eq!(Say::default().options().tokenizer.strategy.flags, vec!["upper", "u"]);
    }
}
