//! Shared helpers for the dispatch integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chat_dispatch::demo;
use chat_dispatch::dispatch::{DispatchEvent, DispatchListener, Dispatcher};
use chat_dispatch::error::PreconditionResult;
use chat_dispatch::message::{Message, RoleId};
use chat_dispatch::preconditions::{Precondition, PreconditionContext};
use chat_dispatch::DispatcherConfig;

/// Id the test bot answers to through mentions.
pub const BOT_ID: &str = "999999999999999999";

/// Role given to moderators in the tests.
pub const MOD_ROLE: &str = "mods";

/// Listener that keeps every event.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<DispatchEvent>>,
}

impl RecordingListener {
    /// Names of the recorded events, in order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(DispatchEvent::kind)
            .collect()
    }

    /// A copy of the recorded events.
    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl DispatchListener for RecordingListener {
    fn on_event(&self, event: &DispatchEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Precondition with a fixed verdict that counts its calls.
pub struct Fixed {
    name: &'static str,
    passes: bool,
    calls: Arc<AtomicUsize>,
}

impl Fixed {
    pub fn new(name: &'static str, passes: bool) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let precondition = Self {
            name,
            passes,
            calls: calls.clone(),
        };
        (precondition, calls)
    }
}

#[async_trait]
impl Precondition for Fixed {
    fn name(&self) -> &str {
        self.name
    }

    async fn run(&self, _: &Message, _: &str, _: &PreconditionContext) -> PreconditionResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.passes {
            Ok(())
        } else {
            Err(self.error(
                &format!("Precondition{}", self.name),
                format!("{} denied.", self.name),
            ))
        }
    }
}

/// Default test configuration: `!` prefix plus the bot mention.
pub fn config() -> DispatcherConfig {
    DispatcherConfig {
        client_id: Some(BOT_ID.to_string()),
        ..DispatcherConfig::default()
    }
}

/// A dispatcher with the demo commands and a recording listener.
pub fn demo_dispatcher(config: DispatcherConfig) -> (Dispatcher, Arc<RecordingListener>) {
    let listener = Arc::new(RecordingListener::default());
    let builder = Dispatcher::builder(config).listener(listener.clone());
    let dispatcher = demo::install(builder, RoleId::from(MOD_ROLE))
        .build()
        .unwrap();
    (dispatcher, listener)
}

/// A guild message from `user`.
pub fn guild_message(content: &str, user: &str) -> Message {
    Message::in_guild(content, user.into(), "200".into(), "300".into())
}

/// A guild message from a moderator.
pub fn moderator_message(content: &str, user: &str) -> Message {
    let mut message = guild_message(content, user);
    message.author.roles.push(RoleId::from(MOD_ROLE));
    message
}

/// A direct message from `user`.
pub fn direct_message(content: &str, user: &str) -> Message {
    Message::direct(content, user.into(), "400".into())
}
