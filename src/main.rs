//! chat-dispatch - a terminal stand-in for a chat bot.
//!
//! Each line read from stdin is dispatched as a message; replies and denials
//! are printed to stdout.

mod cli;

use std::sync::Arc;

use anyhow::Context;
use chat_dispatch::demo;
use chat_dispatch::dispatch::{DispatchOutcome, Dispatcher, TracingListener};
use chat_dispatch::logging::{self, LogTarget};
use chat_dispatch::message::RoleId;
use chat_dispatch::{CommandOutput, DispatcherConfig};
use cli::Cli;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env is not an error
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    if let Some(path) = logging::init(LogTarget::from_flag(cli.log_file)) {
        eprintln!("Logging to {}", path.display());
    }

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = DispatcherConfig::load_from_file(&config_path)?;
    config.apply_env_overrides();
    cli.apply_to(&mut config);

    let builder = Dispatcher::builder(config).listener(Arc::new(TracingListener));
    let dispatcher = demo::install(builder, RoleId::from(demo::DEFAULT_MODERATOR_ROLE))
        .build()
        .context("Failed to build dispatcher")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == "quit" {
            break;
        }
        if line.is_empty() {
            continue;
        }

        match dispatcher.dispatch(cli.message(line)).await? {
            DispatchOutcome::Success(CommandOutput::Reply(reply)) => println!("{reply}"),
            DispatchOutcome::Success(CommandOutput::None) | DispatchOutcome::Ignored => {}
            DispatchOutcome::MentionPrefixOnly => println!("Hi! Try `ping`."),
            DispatchOutcome::UnknownCommandName => {}
            DispatchOutcome::UnknownCommand(name) => println!("Unknown command: {name}"),
            DispatchOutcome::Denied(denial) => println!("{denial}"),
            DispatchOutcome::Failed(failure) => match failure.user_error() {
                Some(user_error) => println!("{user_error}"),
                None => println!("Something went wrong."),
            },
        }
    }

    Ok(())
}
