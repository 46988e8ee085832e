//! The migration unit: a numbered level with a description and an action.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// The work a level performs when the lift arrives at it.
pub type LevelAction = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// One migration step.
///
/// Levels are identified by their number alone: two levels with the same
/// number are equal whatever their descriptions say, and levels order by
/// number ascending.
#[derive(Clone)]
pub struct Level {
    number: i64,
    description: String,
    action: LevelAction,
}

impl Level {
    /// Creates a level whose action does nothing.
    #[must_use]
    pub fn new(number: i64, description: impl Into<String>) -> Self {
        Self::with_action(number, description, || Ok(()))
    }

    /// Creates a level that runs `action` when applied.
    #[must_use]
    pub fn with_action<F>(number: i64, description: impl Into<String>, action: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            number,
            description: description.into(),
            action: Arc::new(action),
        }
    }

    /// Returns the level number.
    #[must_use]
    pub const fn number(&self) -> i64 {
        self.number
    }

    /// Returns the human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Runs the level's action.
    pub fn up(&self) -> anyhow::Result<()> {
        (self.action)()
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Level")
            .field("number", &self.number)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Level Number={}, Description={}]",
            self.number, self.description
        )
    }
}

impl PartialEq for Level {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
    }
}

impl Eq for Level {}

impl Hash for Level {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.number.hash(state);
    }
}

impl PartialOrd for Level {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Level {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number.cmp(&other.number)
    }
}
