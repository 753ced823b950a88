//! End-to-end dispatch through the public `Dispatcher` API.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use chat_dispatch::args::Args;
use chat_dispatch::dispatch::{DispatchEvent, DispatchOutcome, Dispatcher, Prefix, PrefixProvider};
use chat_dispatch::error::{CommandError, MISSING_ARGUMENTS};
use chat_dispatch::message::Message;
use chat_dispatch::preconditions::{PreconditionEntry, RunMode};
use chat_dispatch::{Command, CommandContext, CommandOptions, CommandOutput, DispatcherConfig};
use pretty_assertions::assert_eq;
use tokio_test::assert_ok;

use super::common::{
    config, demo_dispatcher, direct_message, guild_message, moderator_message, Fixed,
    RecordingListener, BOT_ID,
};

fn reply(outcome: DispatchOutcome) -> String {
    match outcome {
        DispatchOutcome::Success(CommandOutput::Reply(text)) => text,
        other => panic!("expected a reply, got {other:?}"),
    }
}

#[tokio::test]
async fn test_add_two_integers() {
    let (dispatcher, listener) = demo_dispatcher(config());

    let outcome = assert_ok!(dispatcher.dispatch(guild_message("!add 2 3", "1")).await);

    assert_eq!(reply(outcome), "2 + 3 = 5");
    assert_eq!(
        listener.kinds(),
        vec![
            "command_accepted",
            "command_run",
            "command_success",
            "command_finish"
        ]
    );
}

#[tokio::test]
async fn test_add_rejects_word() {
    let (dispatcher, listener) = demo_dispatcher(config());

    let outcome = assert_ok!(dispatcher.dispatch(guild_message("!add two 3", "1")).await);

    let DispatchOutcome::Failed(error) = outcome else {
        panic!("expected a failure");
    };
    let CommandError::Argument(argument) = error.as_ref() else {
        panic!("expected an argument error, got {error:?}");
    };
    assert_eq!(argument.identifier, "ArgumentIntegerInvalidNumber");
    assert_eq!(argument.argument, "integer");
    assert_eq!(argument.parameter, "two");
    assert_eq!(
        listener.kinds(),
        vec![
            "command_accepted",
            "command_run",
            "command_error",
            "command_finish"
        ]
    );
}

#[tokio::test]
async fn test_add_missing_argument() {
    let (dispatcher, _) = demo_dispatcher(config());

    let outcome = assert_ok!(dispatcher.dispatch(guild_message("!plus 2", "1")).await);

    let DispatchOutcome::Failed(error) = outcome else {
        panic!("expected a failure");
    };
    assert_eq!(error.user_error().unwrap().identifier, MISSING_ARGUMENTS);
}

struct Play;

#[async_trait]
impl Command for Play {
    fn options(&self) -> &CommandOptions {
        static OPTIONS: std::sync::OnceLock<CommandOptions> = std::sync::OnceLock::new();
        OPTIONS.get_or_init(|| {
            CommandOptions::new("play").preconditions([
                PreconditionEntry::name("GuildOnly"),
                PreconditionEntry::list([
                    PreconditionEntry::name("Moderator"),
                    PreconditionEntry::list([
                        PreconditionEntry::name("DJ"),
                        PreconditionEntry::name("SongAuthor"),
                    ]),
                ]),
            ])
        })
    }

    async fn run(
        &self,
        _: &Message,
        _: &mut Args,
        _: &CommandContext,
    ) -> Result<CommandOutput, CommandError> {
        Ok(CommandOutput::reply("Playing"))
    }
}

#[tokio::test]
async fn test_nested_precondition_tree_denies() {
    let (moderator, moderator_calls) = Fixed::new("Moderator", false);
    let (dj, dj_calls) = Fixed::new("DJ", false);
    let (author, author_calls) = Fixed::new("SongAuthor", true);
    let listener = Arc::new(RecordingListener::default());
    let dispatcher = Dispatcher::builder(config())
        .precondition(moderator)
        .precondition(dj)
        .precondition(author)
        .command(Play)
        .listener(listener.clone())
        .build()
        .unwrap();

    let outcome = assert_ok!(dispatcher.dispatch(guild_message("!play", "1")).await);

    let DispatchOutcome::Denied(error) = outcome else {
        panic!("expected a denial");
    };
    assert_eq!(error.precondition, "DJ");
    assert_eq!(moderator_calls.load(Ordering::SeqCst), 1);
    assert_eq!(dj_calls.load(Ordering::SeqCst), 1);
    assert_eq!(author_calls.load(Ordering::SeqCst), 0);
    assert_eq!(listener.kinds(), vec!["command_denied", "command_finish"]);
}

#[tokio::test]
async fn test_nested_precondition_tree_allows_moderator() {
    let (moderator, _) = Fixed::new("Moderator", true);
    let (dj, dj_calls) = Fixed::new("DJ", false);
    let (author, _) = Fixed::new("SongAuthor", false);
    let dispatcher = Dispatcher::builder(config())
        .precondition(moderator)
        .precondition(dj)
        .precondition(author)
        .command(Play)
        .build()
        .unwrap();

    let outcome = assert_ok!(dispatcher.dispatch(guild_message("!play", "1")).await);

    assert_eq!(reply(outcome), "Playing");
    assert_eq!(dj_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_nested_precondition_tree_outside_guild() {
    let (moderator, moderator_calls) = Fixed::new("Moderator", true);
    let (dj, _) = Fixed::new("DJ", true);
    let (author, _) = Fixed::new("SongAuthor", true);
    let dispatcher = Dispatcher::builder(config())
        .precondition(moderator)
        .precondition(dj)
        .precondition(author)
        .command(Play)
        .build()
        .unwrap();

    let outcome = assert_ok!(dispatcher.dispatch(direct_message("!play", "1")).await);

    let DispatchOutcome::Denied(error) = outcome else {
        panic!("expected a denial");
    };
    assert_eq!(error.identifier, "PreconditionGuildOnly");
    assert_eq!(moderator_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cooldown_per_user() {
    let (dispatcher, listener) = demo_dispatcher(config());

    let first = assert_ok!(dispatcher.dispatch(guild_message("!roll", "1")).await);
    assert!(reply(first).starts_with("You rolled"));

    let second = assert_ok!(dispatcher.dispatch(guild_message("!dice", "1")).await);
    let DispatchOutcome::Denied(error) = second else {
        panic!("expected a cooldown denial");
    };
    assert_eq!(error.identifier, "PreconditionCooldown");
    assert_eq!(error.precondition, "Cooldown");
    let remaining = error.extras.as_ref().unwrap()["remaining"].as_u64().unwrap();
    assert!(remaining > 0 && remaining <= 5_000);
    assert!(error.message.starts_with("You have just used this command."));

    let other = assert_ok!(dispatcher.dispatch(guild_message("!roll", "2")).await);
    assert!(reply(other).starts_with("You rolled"));

    let denied = listener
        .events()
        .into_iter()
        .filter(|event| matches!(event, DispatchEvent::CommandDenied { .. }))
        .count();
    assert_eq!(denied, 1);
}

#[tokio::test]
async fn test_cooldown_is_atomic_under_concurrency() {
    let (dispatcher, _) = demo_dispatcher(config());

    let outcomes = futures::future::join_all(
        (0..5).map(|_| dispatcher.dispatch(guild_message("!roll 20", "1"))),
    )
    .await;

    let successes = outcomes
        .into_iter()
        .filter(|outcome| matches!(outcome, Ok(DispatchOutcome::Success(_))))
        .count();
    assert_eq!(successes, 1);
}

#[tokio::test]
async fn test_unregister_evicts_cooldown() {
    let (mut dispatcher, _) = demo_dispatcher(config());

    assert_ok!(dispatcher.dispatch(guild_message("!roll", "1")).await);
    assert!(dispatcher.unregister("dice").is_some());

    let outcome = assert_ok!(dispatcher.dispatch(guild_message("!roll", "1")).await);
    assert!(matches!(outcome, DispatchOutcome::UnknownCommand(name) if name == "roll"));

    dispatcher
        .register(chat_dispatch::demo::Roll::default())
        .unwrap();
    let outcome = assert_ok!(dispatcher.dispatch(guild_message("!roll", "1")).await);
    assert!(reply(outcome).starts_with("You rolled"));
}

#[tokio::test]
async fn test_mod_only() {
    let (dispatcher, _) = demo_dispatcher(config());

    let outcome = assert_ok!(dispatcher.dispatch(guild_message("!mod-only", "1")).await);
    let DispatchOutcome::Denied(error) = outcome else {
        panic!("expected a denial");
    };
    assert_eq!(error.identifier, "PreconditionModerator");

    let outcome = assert_ok!(dispatcher.dispatch(moderator_message("!modonly", "1")).await);
    assert_eq!(reply(outcome), "Welcome, moderator 1.");
}

#[tokio::test]
async fn test_mention_prefix() {
    let (dispatcher, listener) = demo_dispatcher(config());

    let outcome = assert_ok!(
        dispatcher
            .dispatch(guild_message(&format!("<@{BOT_ID}> ping"), "1"))
            .await
    );
    assert_eq!(reply(outcome), "Pong!");

    listener.clear();
    let outcome = assert_ok!(
        dispatcher
            .dispatch(guild_message(&format!("<@!{BOT_ID}>"), "1"))
            .await
    );
    assert!(matches!(outcome, DispatchOutcome::MentionPrefixOnly));
    assert_eq!(listener.kinds(), vec!["mention_prefix_only"]);
}

#[tokio::test]
async fn test_unknown_command() {
    let (dispatcher, listener) = demo_dispatcher(config());

    let outcome = assert_ok!(dispatcher.dispatch(guild_message("!dance now", "1")).await);
    assert!(matches!(outcome, DispatchOutcome::UnknownCommand(name) if name == "dance"));

    let outcome = assert_ok!(dispatcher.dispatch(guild_message("!", "1")).await);
    assert!(matches!(outcome, DispatchOutcome::UnknownCommandName));

    let outcome = assert_ok!(dispatcher.dispatch(guild_message("ping", "1")).await);
    assert!(matches!(outcome, DispatchOutcome::Ignored));

    assert_eq!(
        listener.kinds(),
        vec!["unknown_command", "unknown_command_name"]
    );
}

#[tokio::test]
async fn test_disabled_from_config() {
    let config = DispatcherConfig {
        disabled_commands: vec!["ping".to_string()],
        ..config()
    };
    let (dispatcher, listener) = demo_dispatcher(config);

    let outcome = assert_ok!(dispatcher.dispatch(guild_message("!ping", "1")).await);
    let DispatchOutcome::Denied(error) = outcome else {
        panic!("expected a denial");
    };
    assert_eq!(error.identifier, "CommandDisabled");
    assert_eq!(listener.kinds(), vec!["command_denied", "command_finish"]);

    assert!(dispatcher.commands().set_enabled("ping", true));
    let outcome = assert_ok!(dispatcher.dispatch(guild_message("!ping", "1")).await);
    assert_eq!(reply(outcome), "Pong!");
}

#[tokio::test]
async fn test_case_insensitive_commands() {
    let config = DispatcherConfig {
        case_insensitive_commands: true,
        ..config()
    };
    let (dispatcher, _) = demo_dispatcher(config);

    let outcome = assert_ok!(dispatcher.dispatch(guild_message("!PiNg", "1")).await);
    assert_eq!(reply(outcome), "Pong!");

    let (strict, _) = demo_dispatcher(super::common::config());
    let outcome = assert_ok!(strict.dispatch(guild_message("!PiNg", "1")).await);
    assert!(matches!(outcome, DispatchOutcome::UnknownCommand(_)));
}

#[tokio::test]
async fn test_pattern_prefix() {
    let config = DispatcherConfig {
        prefix_patterns: vec![r"hey bot,?\s*".to_string()],
        case_insensitive_prefixes: true,
        ..config()
    };
    let (dispatcher, _) = demo_dispatcher(config);

    let outcome = assert_ok!(dispatcher.dispatch(guild_message("Hey Bot, ping", "1")).await);
    assert_eq!(reply(outcome), "Pong!");
}

#[tokio::test]
async fn test_bots_and_webhooks_ignored() {
    let (dispatcher, listener) = demo_dispatcher(config());

    let mut from_bot = guild_message("!ping", "1");
    from_bot.author.bot = true;
    let mut from_webhook = guild_message("!ping", "1");
    from_webhook.webhook_id = Some("77".to_string());

    for message in [from_bot, from_webhook] {
        let outcome = assert_ok!(dispatcher.dispatch(message).await);
        assert!(matches!(outcome, DispatchOutcome::Ignored));
    }
    assert!(listener.kinds().is_empty());

    let config = DispatcherConfig {
        ignore_bots: false,
        ..config()
    };
    let (permissive, _) = demo_dispatcher(config);
    let mut from_bot = guild_message("!ping", "1");
    from_bot.author.bot = true;
    let outcome = assert_ok!(permissive.dispatch(from_bot).await);
    assert_eq!(reply(outcome), "Pong!");
}

struct GuildPrefixes;

#[async_trait]
impl PrefixProvider for GuildPrefixes {
    async fn prefixes(&self, message: &Message) -> Vec<Prefix> {
        match &message.guild {
            Some(_) => vec![Prefix::from("$")],
            None => Vec::new(),
        }
    }
}

#[tokio::test]
async fn test_custom_prefix_provider() {
    let listener = Arc::new(RecordingListener::default());
    let builder = Dispatcher::builder(config())
        .prefix_provider(Arc::new(GuildPrefixes))
        .listener(listener);
    let dispatcher = chat_dispatch::demo::install(builder, "mods".into())
        .build()
        .unwrap();

    let outcome = assert_ok!(dispatcher.dispatch(guild_message("$ping", "1")).await);
    assert_eq!(reply(outcome), "Pong!");

    let outcome = assert_ok!(dispatcher.dispatch(guild_message("!ping", "1")).await);
    assert!(matches!(outcome, DispatchOutcome::Ignored));

    let outcome = assert_ok!(dispatcher.dispatch(direct_message("$ping", "1")).await);
    assert!(matches!(outcome, DispatchOutcome::Ignored));

    let outcome = assert_ok!(
        dispatcher
            .dispatch(direct_message(&format!("<@{BOT_ID}> ping"), "1"))
            .await
    );
    assert_eq!(reply(outcome), "Pong!");
}

#[tokio::test]
async fn test_parallel_root_runs_every_precondition() {
    let (first, first_calls) = Fixed::new("First", false);
    let (second, second_calls) = Fixed::new("Second", false);

    struct Guarded;

    #[async_trait]
    impl Command for Guarded {
        fn options(&self) -> &CommandOptions {
            static OPTIONS: std::sync::OnceLock<CommandOptions> = std::sync::OnceLock::new();
            OPTIONS.get_or_init(|| {
                CommandOptions::new("guarded")
                    .preconditions([PreconditionEntry::name("First"), "Second".into()])
                    .precondition_mode(RunMode::Parallel)
            })
        }

        async fn run(
            &self,
            _: &Message,
            _: &mut Args,
            _: &CommandContext,
        ) -> Result<CommandOutput, CommandError> {
            Ok(CommandOutput::None)
        }
    }

    let dispatcher = Dispatcher::builder(config())
        .precondition(first)
        .precondition(second)
        .command(Guarded)
        .build()
        .unwrap();

    let outcome = assert_ok!(dispatcher.dispatch(guild_message("!guarded", "1")).await);
    let DispatchOutcome::Denied(error) = outcome else {
        panic!("expected a denial");
    };
    assert_eq!(error.precondition, "First");
    assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    assert_eq!(second_calls.load(Ordering::SeqCst), 1);
}
