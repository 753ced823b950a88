//! Precondition trees.
//!
//! A command declares its preconditions as nested lists of names. The root
//! list is an AND; every list nested directly in another flips the condition,
//! so `["Connect", ["Moderator", ["DJ", "SongAuthor"]]]` reads as
//! `Connect && (Moderator || (DJ && SongAuthor))`.
//!
//! The declarative [`PreconditionEntry`] is turned into a [`PreconditionContainer`]
//! once at registration. Evaluation never looks anything up.

use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use super::{Precondition, PreconditionContext, PreconditionStore};
use crate::error::{ConfigError, PreconditionResult};
use crate::message::Message;

/// How the children of a list are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// One after another, stopping as soon as the outcome is known.
    #[default]
    Sequential,
    /// All at once; the outcome is chosen by declaration order once all settle.
    Parallel,
}

/// How the results of a list are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunCondition {
    /// Every child must pass.
    And,
    /// At least one child must pass.
    Or,
}

impl RunCondition {
    /// The opposite condition.
    pub fn flipped(self) -> Self {
        match self {
            Self::And => Self::Or,
            Self::Or => Self::And,
        }
    }
}

/// Declarative precondition entry, as written in command options or config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreconditionEntry {
    /// A precondition name.
    Name(String),
    /// A precondition name with a context.
    Detailed {
        /// Precondition name.
        name: String,
        /// Data handed to the precondition.
        #[serde(default)]
        context: PreconditionContext,
    },
    /// A nested list with a pinned run mode.
    Group {
        /// Run mode of this list and, by default, its nested lists.
        mode: RunMode,
        /// Children.
        entries: Vec<PreconditionEntry>,
    },
    /// A nested list inheriting the parent's run mode.
    List(Vec<PreconditionEntry>),
}

impl PreconditionEntry {
    /// A plain precondition name.
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// A precondition name with a context.
    pub fn with_context(name: impl Into<String>, context: PreconditionContext) -> Self {
        Self::Detailed {
            name: name.into(),
            context,
        }
    }

    /// A nested list with its own run mode.
    pub fn group(mode: RunMode, entries: impl IntoIterator<Item = PreconditionEntry>) -> Self {
        Self::Group {
            mode,
            entries: entries.into_iter().collect(),
        }
    }

    /// A nested list.
    pub fn list(entries: impl IntoIterator<Item = PreconditionEntry>) -> Self {
        Self::List(entries.into_iter().collect())
    }
}

impl From<&str> for PreconditionEntry {
    fn from(name: &str) -> Self {
        Self::name(name)
    }
}

/// A built precondition tree.
pub enum PreconditionContainer {
    /// One precondition.
    Single {
        /// The resolved precondition.
        precondition: Arc<dyn Precondition>,
        /// Its context.
        context: PreconditionContext,
    },
    /// A list of sub-trees.
    Array {
        /// How results combine.
        condition: RunCondition,
        /// How children run.
        mode: RunMode,
        /// Children in declaration order.
        entries: Vec<PreconditionContainer>,
    },
}

impl PreconditionContainer {
    /// Builds the root container (an AND) from declarative entries.
    ///
    /// Every name is resolved and every context validated here; an unknown
    /// name is a configuration fault.
    pub fn build(
        entries: &[PreconditionEntry],
        mode: RunMode,
        store: &PreconditionStore,
    ) -> Result<Self, ConfigError> {
        Self::build_array(entries, RunCondition::And, mode, store)
    }

    fn build_array(
        entries: &[PreconditionEntry],
        condition: RunCondition,
        mode: RunMode,
        store: &PreconditionStore,
    ) -> Result<Self, ConfigError> {
        let entries = entries
            .iter()
            .map(|entry| match entry {
                PreconditionEntry::Name(name) => {
                    Self::build_single(name, PreconditionContext::new(), store)
                }
                PreconditionEntry::Detailed { name, context } => {
                    Self::build_single(name, context.clone(), store)
                }
                PreconditionEntry::List(children) => {
                    Self::build_array(children, condition.flipped(), mode, store)
                }
                PreconditionEntry::Group {
                    mode: pinned,
                    entries: children,
                } => Self::build_array(children, condition.flipped(), *pinned, store),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::Array {
            condition,
            mode,
            entries,
        })
    }

    fn build_single(
        name: &str,
        context: PreconditionContext,
        store: &PreconditionStore,
    ) -> Result<Self, ConfigError> {
        let precondition = store.get(name)?;
        precondition.validate(&context)?;
        Ok(Self::Single {
            precondition,
            context,
        })
    }

    /// Returns true when the tree holds no precondition at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single { .. } => false,
            Self::Array { entries, .. } => entries.iter().all(Self::is_empty),
        }
    }

    /// Evaluates the tree for `command` triggered by `message`.
    pub fn run<'a>(
        &'a self,
        message: &'a Message,
        command: &'a str,
    ) -> BoxFuture<'a, PreconditionResult> {
        async move {
            match self {
                Self::Single {
                    precondition,
                    context,
                } => precondition.run(message, command, context).await,
                Self::Array {
                    condition,
                    mode,
                    entries,
                } => match (condition, mode) {
                    (RunCondition::And, RunMode::Sequential) => {
                        for entry in entries {
                            entry.run(message, command).await?;
                        }
                        Ok(())
                    }
                    (RunCondition::And, RunMode::Parallel) => {
                        let results =
                            join_all(entries.iter().map(|e| e.run(message, command))).await;
                        results.into_iter().find(Result::is_err).unwrap_or(Ok(()))
                    }
                    (RunCondition::Or, RunMode::Sequential) => {
                        let mut last = Ok(());
                        for entry in entries {
                            match entry.run(message, command).await {
                                Ok(()) => return Ok(()),
                                Err(err) => last = Err(err),
                            }
                        }
                        last
                    }
                    (RunCondition::Or, RunMode::Parallel) => {
                        let results =
                            join_all(entries.iter().map(|e| e.run(message, command))).await;
                        if results.iter().any(Result::is_ok) {
                            return Ok(());
                        }
                        results.into_iter().last().unwrap_or(Ok(()))
                    }
                },
            }
        }
        .boxed()
    }
}

impl std::fmt::Debug for PreconditionContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single {
                precondition,
                context,
            } => f
                .debug_struct("Single")
                .field("name", &precondition.name())
                .field("context", context)
                .finish(),
            Self::Array {
                condition,
                mode,
                entries,
            } => f
                .debug_struct("Array")
                .field("condition", condition)
                .field("mode", mode)
                .field("entries", entries)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PreconditionError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Fixed {
        name: &'static str,
        pass: bool,
        delay_ms: u64,
        calls: Arc<AtomicUsize>,
    }

    impl Fixed {
        fn new(name: &'static str, pass: bool) -> Self {
            Self {
                name,
                pass,
                delay_ms: 0,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn delayed(mut self, delay_ms: u64) -> Self {
            self.delay_ms = delay_ms;
            self
        }
    }

    #[async_trait]
    impl Precondition for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn run(&self, _: &Message, _: &str, _: &PreconditionContext) -> PreconditionResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.pass {
                Ok(())
            } else {
                Err(self.error(&format!("{}Failed", self.name), self.name))
            }
        }
    }

    fn message() -> Message {
        Message::in_guild("", "1".into(), "2".into(), "3".into())
    }

    fn entries(names: &[&str]) -> Vec<PreconditionEntry> {
        names.iter().map(|n| PreconditionEntry::name(*n)).collect()
    }

    fn denied_by(result: PreconditionResult) -> String {
        let err: PreconditionError = result.unwrap_err();
        err.precondition
    }

    #[tokio::test]
    async fn test_sequential_and_short_circuits() {
        let third = Fixed::new("C", true);
        let third_calls = third.calls.clone();
        let mut store = PreconditionStore::new();
        store
            .register(Fixed::new("A", true))
            .register(Fixed::new("B", false))
            .register(third);

        let tree =
            PreconditionContainer::build(&entries(&["A", "B", "C"]), RunMode::Sequential, &store)
                .unwrap();
        let result = tree.run(&message(), "cmd").await;
        assert_eq!(denied_by(result), "B");
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_parallel_and_picks_first_error_by_order() {
        let mut store = PreconditionStore::new();
        store
            .register(Fixed::new("A", false).delayed(30))
            .register(Fixed::new("B", false))
            .register(Fixed::new("C", true));

        let tree =
            PreconditionContainer::build(&entries(&["A", "B", "C"]), RunMode::Parallel, &store)
                .unwrap();
        assert_eq!(denied_by(tree.run(&message(), "cmd").await), "A");
    }

    #[tokio::test]
    async fn test_parallel_or_passes_when_any_passes() {
        let mut store = PreconditionStore::new();
        store
            .register(Fixed::new("A", false))
            .register(Fixed::new("B", true).delayed(30))
            .register(Fixed::new("C", false).delayed(10));

        let tree = PreconditionContainer::build(
            &[PreconditionEntry::list(entries(&["A", "B", "C"]))],
            RunMode::Parallel,
            &store,
        )
        .unwrap();
        assert!(tree.run(&message(), "cmd").await.is_ok());
    }

    #[tokio::test]
    async fn test_or_returns_last_error() {
        let mut store = PreconditionStore::new();
        store
            .register(Fixed::new("A", false))
            .register(Fixed::new("B", false).delayed(20));

        for mode in [RunMode::Sequential, RunMode::Parallel] {
            let tree = PreconditionContainer::build(
                &[PreconditionEntry::list(entries(&["B", "A"]))],
                mode,
                &store,
            )
            .unwrap();
            assert_eq!(denied_by(tree.run(&message(), "cmd").await), "A");
        }
    }

    #[tokio::test]
    async fn test_sequential_or_short_circuits() {
        let second = Fixed::new("B", true);
        let second_calls = second.calls.clone();
        let mut store = PreconditionStore::new();
        store.register(Fixed::new("A", true)).register(second);

        let tree = PreconditionContainer::build(
            &[PreconditionEntry::list(entries(&["A", "B"]))],
            RunMode::Sequential,
            &store,
        )
        .unwrap();
        assert!(tree.run(&message(), "cmd").await.is_ok());
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_nested_polarity() {
        // Connect && (Moderator || (DJ && SongAuthor))
        let song_author = Fixed::new("SongAuthor", true);
        let song_calls = song_author.calls.clone();
        let mut store = PreconditionStore::new();
        store
            .register(Fixed::new("Connect", true))
            .register(Fixed::new("Moderator", false))
            .register(Fixed::new("DJ", false))
            .register(song_author);

        let tree = PreconditionContainer::build(
            &[
                "Connect".into(),
                PreconditionEntry::list([
                    "Moderator".into(),
                    PreconditionEntry::list(entries(&["DJ", "SongAuthor"])),
                ]),
            ],
            RunMode::Sequential,
            &store,
        )
        .unwrap();

        assert_eq!(denied_by(tree.run(&message(), "cmd").await), "DJ");
        assert_eq!(song_calls.load(Ordering::SeqCst), 0);

        let PreconditionContainer::Array { condition, entries, .. } = &tree else {
            panic!("root must be an array");
        };
        assert_eq!(*condition, RunCondition::And);
        let PreconditionContainer::Array { condition, entries, .. } = &entries[1] else {
            panic!("second entry must be an array");
        };
        assert_eq!(*condition, RunCondition::Or);
        let PreconditionContainer::Array { condition, .. } = &entries[1] else {
            panic!("nested entry must be an array");
        };
        assert_eq!(*condition, RunCondition::And);
    }

    #[tokio::test]
    async fn test_empty_tree_passes() {
        let store = PreconditionStore::new();
        let tree = PreconditionContainer::build(&[], RunMode::Sequential, &store).unwrap();
        assert!(tree.is_empty());
        assert!(tree.run(&message(), "cmd").await.is_ok());
    }

    #[test]
    fn test_unknown_name_fails_build() {
        let store = PreconditionStore::new();
        let err = PreconditionContainer::build(
            &[PreconditionEntry::list(entries(&["Missing"]))],
            RunMode::Sequential,
            &store,
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::MissingPrecondition("Missing".to_string()));
    }

    #[test]
    fn test_group_pins_mode() {
        let mut store = PreconditionStore::new();
        store.register(Fixed::new("A", true));
        let tree = PreconditionContainer::build(
            &[PreconditionEntry::group(
                RunMode::Parallel,
                [PreconditionEntry::list(entries(&["A"]))],
            )],
            RunMode::Sequential,
            &store,
        )
        .unwrap();

        let PreconditionContainer::Array { entries, .. } = &tree else {
            panic!("root must be an array");
        };
        let PreconditionContainer::Array { mode, entries, .. } = &entries[0] else {
            panic!("group must be an array");
        };
        assert_eq!(*mode, RunMode::Parallel);
        let PreconditionContainer::Array { mode, .. } = &entries[0] else {
            panic!("nested list must be an array");
        };
        assert_eq!(*mode, RunMode::Parallel);
    }

    #[test]
    fn test_entries_deserialize() {
        let json = r#"[
            "GuildOnly",
            { "name": "Cooldown", "context": { "delay_ms": 5000 } },
            { "mode": "parallel", "entries": ["A", "B"] },
            ["C", ["D"]]
        ]"#;
        let parsed: Vec<PreconditionEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed[0], PreconditionEntry::name("GuildOnly"));
        assert!(matches!(&parsed[1], PreconditionEntry::Detailed { name, context }
            if name == "Cooldown" && context["delay_ms"] == 5000));
        assert!(matches!(&parsed[2], PreconditionEntry::Group { mode: RunMode::Parallel, entries }
            if entries.len() == 2));
        assert!(matches!(&parsed[3], PreconditionEntry::List(children) if children.len() == 2));
    }
}
