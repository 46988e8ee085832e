//! The migration engine.
//!
//! A [`Lift`] holds the registered levels in ascending order and a pointer
//! to the level it currently stands at. [`Lift::start`] places the pointer
//! (at the stored high-water mark, or at the lowest level, which is then
//! applied), and [`Lift::up`] / [`Lift::top`] move it upwards.
//!
//! A level is applied only when the store has no marker yet or the level's
//! number is above the stored one, so moving over levels that were applied
//! by an earlier run has no effect. A level whose action fails is reported
//! through the logger and not persisted; the pointer moves on regardless.

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use tracing::{debug, warn};

use crate::error::{ElevatorError, Result};
use crate::level::Level;
use crate::logger::Logger;
use crate::storage::LevelDataStorage;

const NOT_STARTED: &str = "Lift must be started before going up";

/// What happened at a level the lift moved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelOutcome {
    /// The action ran and the level was persisted.
    Arrived(i64),
    /// The store already records this level (or a higher one).
    AlreadyApplied(i64),
    /// The action failed; nothing was persisted.
    Failed(i64),
}

impl LevelOutcome {
    /// Returns the level number.
    #[must_use]
    pub const fn number(&self) -> i64 {
        match self {
            Self::Arrived(n) | Self::AlreadyApplied(n) | Self::Failed(n) => *n,
        }
    }
}

/// Applies registered levels in ascending order, recording progress in a
/// [`LevelDataStorage`].
pub struct Lift<S: LevelDataStorage, L: Logger> {
    storage: S,
    logger: L,
    levels: BTreeMap<i64, Level>,
    current: Option<i64>,
    started: bool,
}

impl<S: LevelDataStorage, L: Logger> Lift<S, L> {
    /// Creates a lift with no levels.
    pub fn new(storage: S, logger: L) -> Self {
        logger.log("Elevator initialized");
        Self {
            storage,
            logger,
            levels: BTreeMap::new(),
            current: None,
            started: false,
        }
    }

    /// Registers a level.
    ///
    /// Levels should all be added before [`start`](Self::start).
    pub fn add_level(&mut self, level: Level) -> Result<()> {
        if self.levels.contains_key(&level.number()) {
            return Err(ElevatorError::state("Level already exists"));
        }
        if self.started {
            warn!(level = level.number(), "Level added after the lift was started");
        }

        self.logger.log(&format!(
            "Level loaded: {}, {}",
            level.number(),
            level.description()
        ));
        self.levels.insert(level.number(), level);
        Ok(())
    }

    /// Registers several levels, stopping at the first duplicate.
    pub fn add_levels<I>(&mut self, levels: I) -> Result<()>
    where
        I: IntoIterator<Item = Level>,
    {
        for level in levels {
            self.add_level(level)?;
        }
        Ok(())
    }

    /// Starts the lift.
    ///
    /// With a stored marker, the lift is placed at that level without
    /// applying anything. Otherwise it is placed at the lowest level, which
    /// is applied right away.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(ElevatorError::state("Lift is already started"));
        }
        let Some(&lowest) = self.levels.keys().next() else {
            return Err(ElevatorError::state(
                "At least one level must be specified before the lift can be started",
            ));
        };

        if self.storage.has_stored_level_info()? {
            let stored = self.storage.get_current_level()?.number();
            if !self.levels.contains_key(&stored) {
                return Err(ElevatorError::UnknownLevel(stored));
            }
            self.start_at(stored);
            debug!(level = stored, "Resuming from stored level");
        } else {
            self.start_at(lowest);
            self.lift_to_current()?;
        }
        Ok(())
    }

    /// Moves one level up and applies it unless it is already applied.
    ///
    /// A lift with a single level stays where it is and re-checks it.
    pub fn up(&mut self) -> Result<LevelOutcome> {
        let Some(current) = self.current.filter(|_| self.started) else {
            return Err(ElevatorError::state(NOT_STARTED));
        };

        if self.levels.len() > 1 && Some(current) == self.top_number() {
            return Err(ElevatorError::state("On the top level"));
        }
        let next = self
            .levels
            .range((Excluded(current), Unbounded))
            .next()
            .map(|(&number, _)| number);
        if next.is_some() {
            self.current = next;
        }

        self.lift_to_current()
    }

    /// Goes up until the highest level is reached.
    ///
    /// Returns what happened at each level passed, in order.
    pub fn top(&mut self) -> Result<Vec<LevelOutcome>> {
        if !self.started {
            return Err(ElevatorError::state(NOT_STARTED));
        }

        let top = self.top_number();
        let mut outcomes = Vec::new();
        while self.current != top {
            outcomes.push(self.up()?);
        }
        Ok(outcomes)
    }

    /// Returns the level the lift stands at.
    #[must_use]
    pub fn current_level(&self) -> Option<&Level> {
        self.current.and_then(|number| self.levels.get(&number))
    }

    /// Returns the registered levels in ascending order.
    pub fn levels(&self) -> impl Iterator<Item = &Level> {
        self.levels.values()
    }

    /// Returns whether [`start`](Self::start) succeeded.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// Returns the progress store.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns the progress store mutably.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Returns the logger.
    #[must_use]
    pub const fn logger(&self) -> &L {
        &self.logger
    }

    /// Consumes the lift, returning its progress store.
    pub fn into_storage(self) -> S {
        self.storage
    }

    fn top_number(&self) -> Option<i64> {
        self.levels.keys().next_back().copied()
    }

    fn start_at(&mut self, number: i64) {
        self.current = Some(number);
        self.started = true;
        if let Some(level) = self.levels.get(&number) {
            self.logger.log(&format!("Elevator started: Current level {level}"));
        }
    }

    /// Applies and persists the current level if the store is behind it.
    fn lift_to_current(&mut self) -> Result<LevelOutcome> {
        let Some(level) = self.current.and_then(|number| self.levels.get(&number)) else {
            return Err(ElevatorError::state(NOT_STARTED));
        };
        let number = level.number();

        let applied = self.storage.has_stored_level_info()?
            && number <= self.storage.get_current_level()?.number();
        if applied {
            debug!(level = number, "Level already applied, skipping");
            return Ok(LevelOutcome::AlreadyApplied(number));
        }

        match level.up() {
            Ok(()) => {
                self.storage.save_current_level(level)?;
                self.logger.log(&format!("Arrived at {level}"));
                debug!(level = number, "Level applied");
                Ok(LevelOutcome::Arrived(number))
            }
            Err(err) => {
                warn!(level = number, error = %err, "Level failed, not persisted");
                self.logger.log(&format!(
                    "Failed to lift: Level {}, {}",
                    number,
                    level.description()
                ));
                self.logger.log(&format!("{err:?}"));
                Ok(LevelOutcome::Failed(number))
            }
        }
    }
}
