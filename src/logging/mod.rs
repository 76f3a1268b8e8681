//! Tracing subscriber setup.
//!
//! Non-interactive commands log to stderr. The interactive browser owns the terminal,
//! so it logs to `chat-timeline.log` in the platform cache directory instead:
//! - macOS: `~/Library/Caches/chat-timeline/`
//! - Linux: `~/.cache/chat-timeline/`
//! - Windows: `%LOCALAPPDATA%\chat-timeline\`

use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "chat_timeline=info";
const LOG_FILE_NAME: &str = "chat-timeline.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Log to stderr, honouring `RUST_LOG`.
pub fn init_stderr() {
    // Ignore the error if a subscriber is already installed (tests, repeated init)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Get the directory holding the log file, creating it if missing
pub fn log_dir() -> Result<PathBuf> {
    let cache_base = dirs::cache_dir().context("Failed to get platform cache directory")?;
    let dir = cache_base.join("chat-timeline");
    if !dir.exists() {
        fs::create_dir_all(&dir).context("Failed to create log directory")?;
    }
    Ok(dir)
}

/// Log to a file so the terminal UI is not disturbed. Returns the log file path.
pub fn init_file() -> Result<PathBuf> {
    let path = log_dir()?.join(LOG_FILE_NAME);
    let file: File = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
    Ok(path)
}
