//! Incremental, resumable state migrations for Rust.
//!
//! `elevator` applies numbered migration steps ("levels") in ascending order,
//! exactly once each, and records the highest applied level so that a later
//! run picks up where the previous one stopped:
//! - Levels already recorded are skipped, so re-running is always safe
//! - A failing level is logged and not recorded, so the next run retries it
//! - Progress lives in a pluggable store (memory, JSON file, SQLite)
//!
//! # Architecture
//!
//! - **Level** - One migration step: number, description and action
//! - **Discovery** - Picks the level definitions out of a manifest
//! - **Factory** - Builds levels from definitions
//! - **Lift** - Applies levels in order and persists progress
//! - **Storage** - Where the high-water mark is kept
//! - **Shell** - The command-line front end
//!
//! # Example
//!
//! ```rust,ignore
//! use elevator::prelude::*;
//!
//! let mut lift = Lift::new(MemoryLevelDataStorage::new(), ConsoleLogger);
//! lift.add_level(Level::with_action(1, "create users", || Ok(())))?;
//! lift.add_level(Level::with_action(2, "add email", || Ok(())))?;
//! lift.start()?;
//! lift.top()?;
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Apply every pending level of an assembly, recording progress in SQLite
//! elevator --up --assembly demo --database sqlite:levels.db
//!
//! # Same, with a JSON state file
//! elevator --up --assembly demo --state-file state/level.json
//! ```

pub mod discovery;
pub mod error;
pub mod factory;
pub mod level;
pub mod lift;
pub mod logger;
pub mod shell;
pub mod storage;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::discovery::{
        find_levels, find_storages, ElevatorLevel, LevelDefinition, LevelManifest,
        StorageDefinition,
    };
    pub use crate::error::{ElevatorError, Result};
    pub use crate::factory::LevelFactory;
    pub use crate::level::Level;
    pub use crate::lift::{LevelOutcome, Lift};
    pub use crate::logger::{ConsoleLogger, Logger, MemoryLogger, TracingLogger};
    pub use crate::shell::{Catalog, ShellArgs};
    pub use crate::storage::{
        JsonFileLevelDataStorage, LevelDataStorage, LevelRecord, MemoryLevelDataStorage,
        SqliteLevelDataStorage,
    };
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[derive(Default)]
    struct ElevatorLevel1;

    impl ElevatorLevel for ElevatorLevel1 {
        fn level(&self) -> i64 {
            1
        }

        fn description(&self) -> &str {
            "First level"
        }

        fn up(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_manifest_to_lift() {
        let manifest = LevelManifest::new("app").register::<ElevatorLevel1>();
        let factory = LevelFactory::new();
        let levels: Vec<Level> = find_levels(&manifest)
            .into_iter()
            .map(|definition| factory.new_level(definition))
            .collect::<Result<_>>()
            .unwrap();

        let storage = MemoryLevelDataStorage::new();
        let mut lift = Lift::new(storage.clone(), MemoryLogger::new());
        lift.add_levels(levels).unwrap();
        lift.start().unwrap();

        assert_eq!(storage.current_number(), Some(1));
        assert!(lift
            .logger()
            .contains("Arrived at [Level Number=1, Description=First level]"));
    }
}
