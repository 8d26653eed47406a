//! Logging context
//!
//! The subscriber is built once at startup and handed around as a
//! `LogContext`. The control thread installs it with a scoped guard;
//! background threads run their body inside `in_scope` with a clone.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::dispatcher::{self, DefaultGuard};
use tracing::{Dispatch, Level};
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::writer::MakeWriterExt;

#[derive(Clone)]
pub struct LogContext {
    dispatch: Dispatch,
}

impl std::fmt::Debug for LogContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogContext").finish_non_exhaustive()
    }
}

impl LogContext {
    /// Log to stderr, and to `log_file` when it can be opened
    pub fn new(level: Level, log_file: Option<&Path>) -> Self {
        let builder = FmtSubscriber::builder()
            .with_max_level(level)
            .with_ansi(false)
            .with_target(false);

        let file = log_file.and_then(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .inspect_err(|e| eprintln!("cannot open log file {}: {e}", path.display()))
                .ok()
        });

        let dispatch = match file {
            Some(file) => Dispatch::new(
                builder
                    .with_writer(std::io::stderr.and(Mutex::new(file)))
                    .finish(),
            ),
            None => Dispatch::new(builder.with_writer(std::io::stderr).finish()),
        };
        Self { dispatch }
    }

    /// Discards everything
    pub fn disabled() -> Self {
        Self {
            dispatch: Dispatch::none(),
        }
    }

    /// Make this context the default for the calling thread until the guard drops
    pub fn install(&self) -> DefaultGuard {
        dispatcher::set_default(&self.dispatch)
    }

    /// Run `f` with this context as the thread's default
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.dispatch, f)
    }
}

/// Parse a level name; anything unrecognised means ERROR
pub fn parse_level(text: &str) -> Level {
    match text.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        _ => Level::ERROR,
    }
}
