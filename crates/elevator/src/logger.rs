//! Announcement sinks.
//!
//! The lift and the shell report progress as plain lines through a
//! [`Logger`]. The line order is the call order; nothing else is promised.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

/// Receives human-readable status lines.
pub trait Logger {
    /// Appends one line.
    fn log(&self, message: &str);
}

impl<L: Logger + ?Sized> Logger for &L {
    fn log(&self, message: &str) {
        (**self).log(message);
    }
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn log(&self, message: &str) {
        (**self).log(message);
    }
}

impl<L: Logger + ?Sized> Logger for Box<L> {
    fn log(&self, message: &str) {
        (**self).log(message);
    }
}

/// Writes every line to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, message: &str) {
        println!("{message}");
    }
}

/// Emits every line as a `tracing` event at INFO.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, message: &str) {
        info!(target: "elevator", "{}", message);
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<String>>,
}

impl MemoryLogger {
    /// Creates an empty logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all lines logged so far.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the most recent line.
    #[must_use]
    pub fn last_entry(&self) -> Option<String> {
        self.entry_from_end(0)
    }

    /// Returns the line `offset` positions before the most recent one.
    #[must_use]
    pub fn entry_from_end(&self, offset: usize) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().rev().nth(offset).cloned()
    }

    /// Returns whether a line equal to `expected` was logged.
    #[must_use]
    pub fn contains(&self, expected: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|entry| entry == expected)
    }

    /// Counts lines that start with `prefix`.
    #[must_use]
    pub fn count_starting_with(&self, prefix: &str) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, message: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}
