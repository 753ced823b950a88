//! Runs the demo bot binary over stdin.

use std::io::Write;
use std::process::{Command, Stdio};

/// Feeds `input` to the binary and returns (exit code, stdout, stderr).
fn run_bot(args: &[&str], input: &str) -> (i32, String, String) {
    let config_dir = tempfile::tempdir().unwrap();
    let config_path = config_dir.path().join("config.toml");

    let mut child = Command::new(env!("CARGO_BIN_EXE_chat-dispatch"))
        .arg("--config")
        .arg(&config_path)
        .args(args)
        .env_remove("CHAT_DISPATCH_PREFIX")
        .env_remove("CHAT_DISPATCH_CLIENT_ID")
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start chat-dispatch");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();

    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

#[test]
fn test_replies_on_stdout() {
    let (code, stdout, _) = run_bot(&[], "!ping\n!add 2 3\nhello\n!add two 3\nquit\n!ping\n");

    assert_eq!(code, 0);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Pong!",
            "2 + 3 = 5",
            "The argument did not resolve to an integer."
        ]
    );
}

#[test]
fn test_moderator_flag() {
    let (_, stdout, _) = run_bot(&[], "!mod-only\n");
    assert_eq!(stdout.trim(), "Only moderators can use this command.");

    let (_, stdout, _) = run_bot(&["--moderator", "--user", "42"], "!mod-only\n");
    assert_eq!(stdout.trim(), "Welcome, moderator 42.");
}

#[test]
fn test_prefix_override() {
    let (_, stdout, _) = run_bot(&["--prefix", "?"], "!ping\n?ping\n");
    assert_eq!(stdout.trim(), "Pong!");
}

#[test]
fn test_invalid_config_exits_nonzero() {
    let config_dir = tempfile::tempdir().unwrap();
    let config_path = config_dir.path().join("config.toml");
    std::fs::write(&config_path, "prefixes = 5\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_chat-dispatch"))
        .arg("--config")
        .arg(&config_path)
        .stdin(Stdio::null())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Configuration error"));
}
