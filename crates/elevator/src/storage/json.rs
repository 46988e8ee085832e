use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ElevatorError, Result};
use crate::level::Level;

use super::{LevelDataStorage, LevelRecord, NOTHING_STORED, NOT_INITIALIZED};

/// Progress store backed by a single JSON file.
///
/// The file holds one [`LevelRecord`]. Writes go to a sibling temporary file
/// that is renamed over the original, so a crash never leaves half a record.
#[derive(Debug)]
pub struct JsonFileLevelDataStorage {
    path: PathBuf,
    initialized: bool,
}

impl JsonFileLevelDataStorage {
    /// Creates a store for `path`. Nothing is touched until
    /// [`LevelDataStorage::initialize`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            initialized: false,
        }
    }

    /// Returns the record file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored record, if any.
    pub fn current_record(&self) -> Result<Option<LevelRecord>> {
        self.guard_initialized()?;
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn guard_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(ElevatorError::state(NOT_INITIALIZED))
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl LevelDataStorage for JsonFileLevelDataStorage {
    fn initialize(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        self.initialized = true;
        debug!(path = %self.path.display(), "JSON level store initialized");
        Ok(())
    }

    fn has_stored_level_info(&self) -> Result<bool> {
        self.guard_initialized()?;
        Ok(self.path.exists())
    }

    fn save_current_level(&mut self, level: &Level) -> Result<()> {
        self.guard_initialized()?;
        let json = serde_json::to_string_pretty(&LevelRecord::now(level))?;
        let temp = self.temp_path();
        let mut file = File::create(&temp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp, &self.path)?;
        Ok(())
    }

    fn get_current_level(&self) -> Result<Level> {
        self.current_record()?
            .map(|record| record.to_level())
            .ok_or_else(|| ElevatorError::state(NOTHING_STORED))
    }
}
