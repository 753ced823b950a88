//! Logging setup for chat-dispatch.
//!
//! The demo bot prints replies on stdout, so diagnostics go to stderr or, with
//! `--log-file`, to a file under the platform state directory. `RUST_LOG`
//! selects the level and defaults to `info`.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

/// Where diagnostics are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogTarget {
    /// Standard error, with colours.
    #[default]
    Stderr,
    /// The file returned by [`log_path`], appended to, without colours.
    File,
}

impl LogTarget {
    /// `File` when `to_file` is set.
    pub fn from_flag(to_file: bool) -> Self {
        if to_file {
            Self::File
        } else {
            Self::Stderr
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber.
///
/// Returns the log file path when logging to a file. If the file cannot be
/// opened, logging falls back to stderr and the reason is logged there.
pub fn init(target: LogTarget) -> Option<PathBuf> {
    if target == LogTarget::Stderr {
        init_stderr();
        return None;
    }

    let path = log_path();
    let opened = path
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|()| OpenOptions::new().create(true).append(true).open(&path));

    match opened {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(file)
                .with_ansi(false)
                .init();
            Some(path)
        }
        Err(e) => {
            init_stderr();
            tracing::warn!(path = %path.display(), "Cannot open log file, using stderr: {e}");
            None
        }
    }
}

fn init_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Log file location: the XDG state directory on Linux, the config directory
/// where no state directory exists, the temp directory as a last resort.
pub fn log_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::config_dir)
        .map(|dir| dir.join("chat-dispatch"))
        .unwrap_or_else(std::env::temp_dir)
        .join("chat-dispatch.log")
}
