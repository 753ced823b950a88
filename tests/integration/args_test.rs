//! Argument handling as seen by commands: flags, rest, repeat, save/restore.

use chat_dispatch::dispatch::DispatchOutcome;
use chat_dispatch::CommandOutput;
use pretty_assertions::assert_eq;
use tokio_test::assert_ok;

use super::common::{config, demo_dispatcher, guild_message};

async fn run(content: &str) -> DispatchOutcome {
    let (dispatcher, _) = demo_dispatcher(config());
    assert_ok!(dispatcher.dispatch(guild_message(content, "1")).await)
}

async fn reply(content: &str) -> String {
    match run(content).await {
        DispatchOutcome::Success(CommandOutput::Reply(text)) => text,
        other => panic!("expected a reply to {content:?}, got {other:?}"),
    }
}

async fn failure_identifier(content: &str) -> String {
    match run(content).await {
        DispatchOutcome::Failed(error) => error.user_error().unwrap().identifier,
        other => panic!("expected a failure for {content:?}, got {other:?}"),
    }
}

#[tokio::test]
async fn test_say_keeps_spacing_and_strips_quotes() {
    assert_eq!(reply("!say hello   world").await, "hello   world");
    assert_eq!(reply("!echo \"quoted text\" tail").await, "quoted text tail");
}

#[tokio::test]
async fn test_say_flag() {
    assert_eq!(reply("!say --upper hi there").await, "HI THERE");
    assert_eq!(reply("!say hi -u").await, "HI");
}

#[tokio::test]
async fn test_say_needs_text() {
    assert_eq!(failure_identifier("!say").await, "MissingArguments");
}

#[tokio::test]
async fn test_sum_stops_at_first_failure() {
    assert_eq!(reply("!sum 1 2 x 4").await, "2 numbers, total 3");
}

#[tokio::test]
async fn test_sum_limit_option() {
    assert_eq!(reply("!sum --limit=2 1 2 3").await, "2 numbers, total 3");
    assert_eq!(reply("!sum --limit 1 5 6").await, "1 numbers, total 5");
}

#[tokio::test]
async fn test_sum_without_numbers() {
    assert_eq!(
        failure_identifier("!sum x").await,
        "ArgumentNumberInvalidNumber"
    );
}

#[tokio::test]
async fn test_inspect_backtracks() {
    assert_eq!(reply("!inspect 4.5").await, "number 4.5");
    assert_eq!(reply("!inspect hello").await, "text \"hello\"");
}

#[tokio::test]
async fn test_roll_bounds() {
    assert_eq!(failure_identifier("!roll 1").await, "ArgumentIntegerTooSmall");
    assert_eq!(failure_identifier("!roll 101").await, "ArgumentIntegerTooBig");
    assert!(reply("!roll 100").await.ends_with("(d100)"));
}
