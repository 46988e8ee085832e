//! Progress stores.
//!
//! A progress store keeps a single marker: the highest level known to be
//! applied. The lift is its only writer during a run.

mod json;
mod memory;
mod sqlite;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::level::Level;

pub use json::JsonFileLevelDataStorage;
pub use memory::MemoryLevelDataStorage;
pub use sqlite::SqliteLevelDataStorage;

/// Message used by stores that require [`LevelDataStorage::initialize`] first.
pub const NOT_INITIALIZED: &str =
    "Initialize must be called before any method on this object, to setup dependencies";

/// Message used when the current level is requested from an empty store.
pub const NOTHING_STORED: &str = "No Level info is stored";

/// Persists the lift's high-water mark.
pub trait LevelDataStorage {
    /// Sets up the store. Must be called before any other method.
    fn initialize(&mut self) -> Result<()>;

    /// Returns whether a level has been stored.
    fn has_stored_level_info(&self) -> Result<bool>;

    /// Replaces the stored marker with `level`.
    fn save_current_level(&mut self, level: &Level) -> Result<()>;

    /// Returns the stored marker. Fails when nothing is stored.
    fn get_current_level(&self) -> Result<Level>;
}

impl<S: LevelDataStorage + ?Sized> LevelDataStorage for Box<S> {
    fn initialize(&mut self) -> Result<()> {
        (**self).initialize()
    }

    fn has_stored_level_info(&self) -> Result<bool> {
        (**self).has_stored_level_info()
    }

    fn save_current_level(&mut self, level: &Level) -> Result<()> {
        (**self).save_current_level(level)
    }

    fn get_current_level(&self) -> Result<Level> {
        (**self).get_current_level()
    }
}

impl<S: LevelDataStorage + ?Sized> LevelDataStorage for &mut S {
    fn initialize(&mut self) -> Result<()> {
        (**self).initialize()
    }

    fn has_stored_level_info(&self) -> Result<bool> {
        (**self).has_stored_level_info()
    }

    fn save_current_level(&mut self, level: &Level) -> Result<()> {
        (**self).save_current_level(level)
    }

    fn get_current_level(&self) -> Result<Level> {
        (**self).get_current_level()
    }
}

/// The persisted form of the marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRecord {
    /// Number of the highest applied level.
    pub level_number: i64,
    /// Description of that level.
    pub description: String,
    /// When the marker was written.
    pub saved_at: DateTime<Utc>,
}

impl LevelRecord {
    /// Captures `level` as of now.
    #[must_use]
    pub fn now(level: &Level) -> Self {
        Self {
            level_number: level.number(),
            description: level.description().to_string(),
            saved_at: Utc::now(),
        }
    }

    /// Converts back into a level without an action.
    #[must_use]
    pub fn to_level(&self) -> Level {
        Level::new(self.level_number, self.description.clone())
    }
}
