//! Turns level definitions into levels.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::anyhow;
use tracing::debug;

use crate::discovery::LevelDefinition;
use crate::error::{ElevatorError, Result};
use crate::level::Level;

/// Builds [`Level`]s from [`LevelDefinition`]s.
///
/// The factory checks every definition itself, whether or not it went
/// through [`find_levels`](crate::discovery::find_levels) first.
#[derive(Debug, Default, Clone, Copy)]
pub struct LevelFactory;

impl LevelFactory {
    /// Creates a factory.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Constructs one instance of `definition` and wraps it as a level.
    ///
    /// The level's action calls `up` on that same instance every time it
    /// runs.
    pub fn new_level(&self, definition: &LevelDefinition) -> Result<Level> {
        let name = definition.name();

        let Some(constructor) = &definition.constructor else {
            return Err(ElevatorError::construction(
                name,
                format!("Class '{name}' is missing a public constructor with zero args"),
            ));
        };
        let Some(up) = &definition.up else {
            return Err(ElevatorError::construction(
                name,
                format!("Class '{name}' is missing public instance method named 'Up'"),
            ));
        };
        let Some(read_level) = &definition.level else {
            return Err(ElevatorError::construction(
                name,
                format!("Class '{name}' is missing a public field named 'Level'"),
            ));
        };

        let instance = constructor().map_err(|e| ElevatorError::LevelConstruction {
            class: name.to_string(),
            message: format!(
                "Failed to create an instance of '{name}'. Check the code in the public constructor with zero args"
            ),
            source: Some(e.into()),
        })?;

        let number = match read_level(&*instance) {
            Some(Ok(number)) => number,
            Some(Err(reason)) => {
                return Err(ElevatorError::LevelConstruction {
                    class: name.to_string(),
                    message: format!(
                        "Class '{name}' has a 'Level' field that cannot be converted to an integer"
                    ),
                    source: Some(reason.into()),
                });
            }
            None => return Err(mismatch(name)),
        };

        let description = match &definition.description {
            Some(read_description) => {
                read_description(&*instance).ok_or_else(|| mismatch(name))?
            }
            None => String::new(),
        };

        debug!(class = %name, level = number, "Level constructed");

        let instance = Arc::new(Mutex::new(instance));
        let up = Arc::clone(up);
        let class = name.to_string();
        Ok(Level::with_action(number, description, move || {
            let mut instance = instance.lock().unwrap_or_else(PoisonError::into_inner);
            up(&mut **instance).unwrap_or_else(|| {
                Err(anyhow!(
                    "Instance of '{class}' no longer matches its definition"
                ))
            })
        }))
    }
}

fn mismatch(name: &str) -> ElevatorError {
    ElevatorError::InvalidArgument(format!(
        "Instance of '{name}' does not match its definition"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Default)]
    struct CustomElevatorLevel {
        level: i32,
        description: String,
        up_calls: usize,
    }

    fn custom_level() -> LevelDefinition {
        LevelDefinition::builder::<CustomElevatorLevel>("CustomElevatorLevel")
            .constructor(|| {
                Ok(CustomElevatorLevel {
                    level: 5,
                    description: "Custom".to_string(),
                    up_calls: 0,
                })
            })
            .level_field(|l: &CustomElevatorLevel| l.level)
            .description_field(|l: &CustomElevatorLevel| l.description.clone())
            .up_method(|l: &mut CustomElevatorLevel| {
                l.up_calls += 1;
                anyhow::ensure!(l.up_calls <= 2, "called {} times", l.up_calls);
                Ok(())
            })
            .build()
    }

    #[test]
    fn test_requires_public_constructor() {
        let definition = LevelDefinition::builder::<CustomElevatorLevel>(
            "CustomElevatorLevelWithPrivateConstructor",
        )
        .up_method(|_| Ok(()))
        .level_field(|l: &CustomElevatorLevel| l.level)
        .build();

        let err = LevelFactory::new().new_level(&definition).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Class 'CustomElevatorLevelWithPrivateConstructor' is missing a public constructor with zero args"
        );
    }

    #[test]
    fn test_requires_up_method() {
        let definition = LevelDefinition::builder::<CustomElevatorLevel>("Object")
            .default_constructor()
            .level_field(|l: &CustomElevatorLevel| l.level)
            .build();

        let err = LevelFactory::new().new_level(&definition).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Class 'Object' is missing public instance method named 'Up'"
        );
    }

    #[test]
    fn test_requires_level_field() {
        let definition = LevelDefinition::builder::<CustomElevatorLevel>("NoLevel")
            .default_constructor()
            .up_method(|_| Ok(()))
            .build();

        let err = LevelFactory::new().new_level(&definition).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Class 'NoLevel' is missing a public field named 'Level'"
        );
    }

    #[test]
    fn test_constructor_checked_before_up_and_level() {
        let definition = LevelDefinition::builder::<CustomElevatorLevel>("Empty").build();

        let err = LevelFactory::new().new_level(&definition).unwrap_err();
        assert!(err.to_string().contains("public constructor with zero args"));
    }

    #[test]
    fn test_wraps_constructor_failure() {
        let definition =
            LevelDefinition::builder::<CustomElevatorLevel>("CustomElevatorLevelWithError")
                .constructor(|| anyhow::bail!("Something bad happened"))
                .level_field(|l: &CustomElevatorLevel| l.level)
                .up_method(|_| Ok(()))
                .build();

        let err = LevelFactory::new().new_level(&definition).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to create an instance of 'CustomElevatorLevelWithError'. Check the code in the public constructor with zero args"
        );
        let cause = err.source().expect("cause should be attached");
        assert_eq!(cause.to_string(), "Something bad happened");
    }

    #[test]
    fn test_rejects_level_out_of_range() {
        let definition = LevelDefinition::builder::<CustomElevatorLevel>("Huge")
            .default_constructor()
            .level_field(|_: &CustomElevatorLevel| u64::MAX)
            .up_method(|_| Ok(()))
            .build();

        let err = LevelFactory::new().new_level(&definition).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Class 'Huge' has a 'Level' field that cannot be converted to an integer"
        );
    }

    #[test]
    fn test_reads_level_and_description() {
        let level = LevelFactory::new().new_level(&custom_level()).unwrap();
        assert_eq!(level.number(), 5);
        assert_eq!(level.description(), "Custom");
    }

    #[test]
    fn test_description_defaults_to_empty() {
        let definition = LevelDefinition::builder::<CustomElevatorLevel>("ElevatorLevelPlain")
            .default_constructor()
            .level_field(|l: &CustomElevatorLevel| l.level)
            .up_method(|_| Ok(()))
            .build();

        let level = LevelFactory::new().new_level(&definition).unwrap();
        assert_eq!(level.number(), 0);
        assert_eq!(level.description(), "");
    }

    #[test]
    fn test_up_reuses_the_same_instance() {
        let level = LevelFactory::new().new_level(&custom_level()).unwrap();

        level.up().unwrap();
        level.up().unwrap();
        let err = level.up().unwrap_err();
        assert_eq!(err.to_string(), "called 3 times");
    }

    #[test]
    fn test_each_level_gets_its_own_instance() {
        let factory = LevelFactory::new();
        let definition = custom_level();
        let first = factory.new_level(&definition).unwrap();
        let second = factory.new_level(&definition).unwrap();

        first.up().unwrap();
        first.up().unwrap();
        assert!(second.up().is_ok());
    }
}
