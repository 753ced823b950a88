//! Error types for chat-dispatch.
//!
//! User-facing failures (`UserError`, `ArgumentError`, `PreconditionError`) are
//! ordinary data returned through `Result`s. `ConfigError` marks deployment
//! mistakes such as an unregistered precondition name, and `CommandError` is
//! what the dispatcher reports when a command handler does not succeed.

use thiserror::Error;

/// Identifier used when the cursor runs out of tokens.
pub const MISSING_ARGUMENTS: &str = "MissingArguments";

/// A normal, expected, user-facing denial.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct UserError {
    /// Stable identifier, useful for localisation and matching.
    pub identifier: String,
    /// Human-readable message.
    pub message: String,
}

impl UserError {
    /// Creates a user error with the given identifier and message.
    pub fn new(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            message: message.into(),
        }
    }
}

/// A user error raised by a resolver or by the argument cursor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ArgumentError {
    /// Name of the resolver that rejected the parameter.
    pub argument: String,
    /// The raw parameter text that failed.
    pub parameter: String,
    /// Stable identifier, e.g. `ArgumentIntegerInvalidNumber`.
    pub identifier: String,
    /// Human-readable message.
    pub message: String,
}

impl ArgumentError {
    /// Creates an argument error.
    pub fn new(
        argument: impl Into<String>,
        parameter: impl Into<String>,
        identifier: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            argument: argument.into(),
            parameter: parameter.into(),
            identifier: identifier.into(),
            message: message.into(),
        }
    }

    /// Error returned when the cursor has no tokens left to hand to `argument`.
    pub fn missing(argument: impl Into<String>) -> Self {
        Self::new(
            argument,
            "",
            MISSING_ARGUMENTS,
            "There are no more arguments.",
        )
    }

    /// Returns the error as its `UserError` base.
    pub fn to_user_error(&self) -> UserError {
        UserError::new(self.identifier.clone(), self.message.clone())
    }
}

/// A user error raised by a precondition.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct PreconditionError {
    /// Name of the precondition that denied the invocation.
    pub precondition: String,
    /// Stable identifier, e.g. `PreconditionCooldown`.
    pub identifier: String,
    /// Human-readable message.
    pub message: String,
    /// Optional structured context, e.g. `{"remaining": 4200}`.
    pub extras: Option<serde_json::Value>,
}

impl PreconditionError {
    /// Creates a precondition error without extras.
    pub fn new(
        precondition: impl Into<String>,
        identifier: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            precondition: precondition.into(),
            identifier: identifier.into(),
            message: message.into(),
            extras: None,
        }
    }

    /// Attaches structured extras to the error.
    pub fn with_extras(self, extras: serde_json::Value) -> Self {
        Self {
            extras: Some(extras),
            ..self
        }
    }

    /// The synthetic denial used for disabled commands.
    pub fn disabled() -> Self {
        Self::new("Enabled", "CommandDisabled", "This command is disabled.")
    }

    /// Returns the error as its `UserError` base.
    pub fn to_user_error(&self) -> UserError {
        UserError::new(self.identifier.clone(), self.message.clone())
    }
}

/// Deployment or programming mistakes. Never the result of user input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A precondition tree names a precondition that is not registered.
    #[error("The precondition \"{0}\" is not available.")]
    MissingPrecondition(String),

    /// The cursor was asked for a resolver that is not registered.
    #[error("The argument \"{0}\" is not available.")]
    MissingResolver(String),

    /// A resolver is registered under the name but produces another type.
    #[error("The argument \"{name}\" does not resolve to {expected}.")]
    ResolverType {
        /// Resolver name that was looked up.
        name: String,
        /// Type the caller asked for.
        expected: &'static str,
    },

    /// A precondition received a context it cannot interpret.
    #[error("Invalid context for precondition \"{name}\": {reason}")]
    InvalidContext {
        /// Precondition name.
        name: String,
        /// What was wrong with the context.
        reason: String,
    },

    /// A prefix pattern failed to compile.
    #[error("Invalid prefix pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Compiler error.
        reason: String,
    },

    /// A guild-scoped cooldown ran on a message sent outside any guild.
    #[error("The cooldown bucket \"guild\" cannot be used outside a guild.")]
    GuildBucketOutsideGuild,

    /// Two commands claim the same name or alias.
    #[error("The command name or alias \"{0}\" is already registered.")]
    DuplicateCommand(String),

    /// The configuration file could not be read.
    #[error("Failed to read config file {path}: {reason}")]
    File {
        /// Path of the file.
        path: String,
        /// I/O error text.
        reason: String,
    },

    /// The configuration file could not be parsed.
    #[error("Configuration error in {path}:\n  {reason}")]
    Parse {
        /// Path of the file.
        path: String,
        /// Parser error text.
        reason: String,
    },
}

/// Why a command handler did not succeed.
#[derive(Error, Debug)]
pub enum CommandError {
    /// An argument could not be resolved.
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    /// The handler rejected the invocation with a user-facing error.
    #[error(transparent)]
    User(#[from] UserError),

    /// The handler ran a precondition of its own and it failed.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// A configuration fault surfaced while the handler ran.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The handler panicked.
    #[error("Command panicked: {0}")]
    Panic(String),

    /// Any other failure raised by the handler body.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl CommandError {
    /// Returns the user-facing part of the error, if any.
    pub fn user_error(&self) -> Option<UserError> {
        match self {
            Self::Argument(e) => Some(e.to_user_error()),
            Self::User(e) => Some(e.clone()),
            Self::Precondition(e) => Some(e.to_user_error()),
            Self::Config(_) | Self::Panic(_) | Self::Unexpected(_) => None,
        }
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Argument(_) => "Argument Error",
            Self::User(_) => "User Error",
            Self::Precondition(_) => "Precondition Error",
            Self::Config(_) => "Configuration Error",
            Self::Panic(_) => "Panic",
            Self::Unexpected(_) => "Unexpected Error",
        }
    }
}

/// Errors returned by `Dispatcher::dispatch`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Dispatch aborted on a configuration fault.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result of running a resolver or a cursor operation.
pub type ArgumentResult<T> = std::result::Result<T, ArgumentError>;

/// Result of running a precondition or a precondition tree.
pub type PreconditionResult = std::result::Result<(), PreconditionError>;

/// Result type alias for configuration-level operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
