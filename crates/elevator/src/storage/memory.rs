use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{ElevatorError, Result};
use crate::level::Level;

use super::{LevelDataStorage, LevelRecord, NOTHING_STORED};

#[derive(Debug, Default)]
struct State {
    current: Option<LevelRecord>,
    writes: Vec<i64>,
    initialized: bool,
}

/// In-process progress store.
///
/// Clones share the same marker, so a caller can keep a handle for
/// inspection while the lift owns another.
#[derive(Debug, Default, Clone)]
pub struct MemoryLevelDataStorage {
    state: Arc<Mutex<State>>,
}

impl MemoryLevelDataStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already records `level` as applied.
    #[must_use]
    pub fn with_level(level: &Level) -> Self {
        let storage = Self::new();
        storage.lock().current = Some(LevelRecord::now(level));
        storage
    }

    /// Returns the stored level number, if any.
    #[must_use]
    pub fn current_number(&self) -> Option<i64> {
        self.lock().current.as_ref().map(|record| record.level_number)
    }

    /// Returns every level number saved through this store, oldest first.
    #[must_use]
    pub fn writes(&self) -> Vec<i64> {
        self.lock().writes.clone()
    }

    /// Returns whether [`LevelDataStorage::initialize`] was called.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LevelDataStorage for MemoryLevelDataStorage {
    fn initialize(&mut self) -> Result<()> {
        self.lock().initialized = true;
        Ok(())
    }

    fn has_stored_level_info(&self) -> Result<bool> {
        Ok(self.lock().current.is_some())
    }

    fn save_current_level(&mut self, level: &Level) -> Result<()> {
        let mut state = self.lock();
        state.current = Some(LevelRecord::now(level));
        state.writes.push(level.number());
        Ok(())
    }

    fn get_current_level(&self) -> Result<Level> {
        self.lock()
            .current
            .as_ref()
            .map(LevelRecord::to_level)
            .ok_or_else(|| ElevatorError::state(NOTHING_STORED))
    }
}
