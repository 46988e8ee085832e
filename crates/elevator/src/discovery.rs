//! Level discovery.
//!
//! Migrations are described to the elevator through a [`LevelManifest`]: an
//! explicit, named list of [`LevelDefinition`]s (and optionally of progress
//! store constructors). A definition is a loose description of a migration
//! type. It carries a name and whichever members the type exposes, and
//! [`find_levels`] picks out the definitions that follow the elevator level
//! convention.
//!
//! Most code never builds definitions by hand: implementing
//! [`ElevatorLevel`] and registering the type is enough.
//!
//! ```rust,ignore
//! use elevator::prelude::*;
//!
//! #[derive(Default)]
//! pub struct ElevatorLevel1;
//!
//! impl ElevatorLevel for ElevatorLevel1 {
//!     fn level(&self) -> i64 {
//!         1
//!     }
//!
//!     fn description(&self) -> &str {
//!         "First level"
//!     }
//!
//!     fn up(&mut self) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! let manifest = LevelManifest::new("app").register::<ElevatorLevel1>();
//! ```

use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::Result;
use crate::storage::LevelDataStorage;

/// Name prefix every level definition must carry (case-insensitive).
pub const LEVEL_NAME_PREFIX: &str = "elevatorlevel";

/// A constructed, type-erased level instance.
pub type Instance = Box<dyn Any + Send>;

pub(crate) type Constructor = Box<dyn Fn() -> anyhow::Result<Instance> + Send + Sync>;
pub(crate) type LevelReader =
    Box<dyn Fn(&(dyn Any + Send + 'static)) -> Option<std::result::Result<i64, String>> + Send + Sync>;
pub(crate) type DescriptionReader =
    Box<dyn Fn(&(dyn Any + Send + 'static)) -> Option<String> + Send + Sync>;
pub(crate) type UpMethod =
    Arc<dyn Fn(&mut (dyn Any + Send + 'static)) -> Option<anyhow::Result<()>> + Send + Sync>;

/// A migration type, described to the elevator.
pub trait ElevatorLevel: Send + 'static {
    /// The level number.
    fn level(&self) -> i64;

    /// Free-text description; empty unless overridden.
    fn description(&self) -> &str {
        ""
    }

    /// Performs the migration.
    fn up(&mut self) -> anyhow::Result<()>;
}

/// Loose description of a migration type.
///
/// Every member is optional; [`find_levels`] and
/// [`LevelFactory`](crate::factory::LevelFactory) decide whether the
/// definition is usable.
pub struct LevelDefinition {
    pub(crate) name: String,
    pub(crate) constructor: Option<Constructor>,
    pub(crate) level: Option<LevelReader>,
    pub(crate) description: Option<DescriptionReader>,
    pub(crate) up: Option<UpMethod>,
}

impl LevelDefinition {
    /// Starts describing the type `T` under `name`.
    pub fn builder<T: Send + 'static>(name: impl Into<String>) -> LevelDefinitionBuilder<T> {
        LevelDefinitionBuilder {
            definition: Self {
                name: name.into(),
                constructor: None,
                level: None,
                description: None,
                up: None,
            },
            _type: PhantomData,
        }
    }

    /// Describes an [`ElevatorLevel`] type, named after the type itself.
    #[must_use]
    pub fn of<T: ElevatorLevel + Default>() -> Self {
        Self::builder::<T>(short_type_name::<T>())
            .default_constructor()
            .level_field(T::level)
            .description_field(|instance: &T| instance.description().to_string())
            .up_method(T::up)
            .build()
    }

    /// Returns the definition name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether a zero-argument constructor is available.
    #[must_use]
    pub fn has_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    /// Returns whether a `level` member is available.
    #[must_use]
    pub fn has_level(&self) -> bool {
        self.level.is_some()
    }

    /// Returns whether a `description` member is available.
    #[must_use]
    pub fn has_description(&self) -> bool {
        self.description.is_some()
    }

    /// Returns whether an `up` method is available.
    #[must_use]
    pub fn has_up(&self) -> bool {
        self.up.is_some()
    }

    /// Returns whether this definition follows the elevator level convention.
    #[must_use]
    pub fn is_elevator_level(&self) -> bool {
        self.name.to_lowercase().starts_with(LEVEL_NAME_PREFIX)
            && self.has_constructor()
            && self.has_level()
            && self.has_up()
    }
}

impl fmt::Debug for LevelDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LevelDefinition")
            .field("name", &self.name)
            .field("constructor", &self.has_constructor())
            .field("level", &self.has_level())
            .field("description", &self.has_description())
            .field("up", &self.has_up())
            .finish()
    }
}

/// Typed builder for [`LevelDefinition`].
pub struct LevelDefinitionBuilder<T> {
    definition: LevelDefinition,
    _type: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> LevelDefinitionBuilder<T> {
    /// Sets the zero-argument constructor.
    #[must_use]
    pub fn constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.definition.constructor = Some(Box::new(move || -> anyhow::Result<Instance> {
            Ok(Box::new(constructor()?))
        }));
        self
    }

    /// Uses `T::default` as the zero-argument constructor.
    #[must_use]
    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.constructor(|| Ok(T::default()))
    }

    /// Sets the `level` member. Its value must convert to an `i64`.
    #[must_use]
    pub fn level_field<N, F>(mut self, read: F) -> Self
    where
        N: TryInto<i64>,
        N::Error: fmt::Display,
        F: Fn(&T) -> N + Send + Sync + 'static,
    {
        self.definition.level = Some(Box::new(move |instance: &(dyn Any + Send + 'static)| {
            instance
                .downcast_ref::<T>()
                .map(|typed| read(typed).try_into().map_err(|e| e.to_string()))
        }));
        self
    }

    /// Sets the optional `description` member.
    #[must_use]
    pub fn description_field<S, F>(mut self, read: F) -> Self
    where
        S: Into<String>,
        F: Fn(&T) -> S + Send + Sync + 'static,
    {
        self.definition.description = Some(Box::new(move |instance: &(dyn Any + Send + 'static)| {
            instance.downcast_ref::<T>().map(|typed| read(typed).into())
        }));
        self
    }

    /// Sets the `up` method.
    #[must_use]
    pub fn up_method<F>(mut self, up: F) -> Self
    where
        F: Fn(&mut T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.definition.up = Some(Arc::new(move |instance: &mut (dyn Any + Send + 'static)| {
            instance.downcast_mut::<T>().map(|typed| up(typed))
        }));
        self
    }

    /// Finishes the definition.
    #[must_use]
    pub fn build(self) -> LevelDefinition {
        self.definition
    }
}

/// Builds a progress store.
pub type StorageConstructor = Box<dyn Fn() -> Result<Box<dyn LevelDataStorage>> + Send + Sync>;

/// A progress store type exposed by a manifest.
pub struct StorageDefinition {
    name: String,
    constructor: StorageConstructor,
}

impl StorageDefinition {
    /// Creates a storage definition.
    pub fn new<S, F>(name: impl Into<String>, constructor: F) -> Self
    where
        S: LevelDataStorage + 'static,
        F: Fn() -> Result<S> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            constructor: Box::new(move || -> Result<Box<dyn LevelDataStorage>> {
                Ok(Box::new(constructor()?))
            }),
        }
    }

    /// Returns the storage type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constructs the store.
    pub fn create(&self) -> Result<Box<dyn LevelDataStorage>> {
        (self.constructor)()
    }
}

impl fmt::Debug for StorageDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageDefinition")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A named set of definitions, the unit handed to the elevator.
#[derive(Debug)]
pub struct LevelManifest {
    name: String,
    definitions: Vec<LevelDefinition>,
    storages: Vec<StorageDefinition>,
}

impl LevelManifest {
    /// Creates an empty manifest.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definitions: Vec::new(),
            storages: Vec::new(),
        }
    }

    /// Returns the manifest name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a definition.
    #[must_use]
    pub fn definition(mut self, definition: LevelDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Adds the definition of an [`ElevatorLevel`] type.
    #[must_use]
    pub fn register<T: ElevatorLevel + Default>(self) -> Self {
        self.definition(LevelDefinition::of::<T>())
    }

    /// Adds a progress store.
    #[must_use]
    pub fn storage(mut self, storage: StorageDefinition) -> Self {
        self.storages.push(storage);
        self
    }

    /// Returns every definition, matching or not.
    #[must_use]
    pub fn definitions(&self) -> &[LevelDefinition] {
        &self.definitions
    }
}

/// Returns the definitions in `manifest` that qualify as elevator levels.
///
/// A qualifying definition is named `ElevatorLevel...` (any case) and has a
/// constructor, a `level` member and an `up` method. The order of the result
/// is unspecified.
#[must_use]
pub fn find_levels(manifest: &LevelManifest) -> Vec<&LevelDefinition> {
    manifest
        .definitions
        .iter()
        .filter(|definition| definition.is_elevator_level())
        .collect()
}

/// Returns the progress stores exposed by `manifest`, in registration order.
#[must_use]
pub fn find_storages(manifest: &LevelManifest) -> Vec<&StorageDefinition> {
    manifest.storages.iter().collect()
}

fn short_type_name<T>() -> &'static str {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryLevelDataStorage;

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

    #[derive(Default)]
    struct SomethingElse;

    impl ElevatorLevel for SomethingElse {
        fn level(&self) -> i64 {
            2
        }

        fn up(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Shape {
        level: u8,
    }

    fn manifest() -> LevelManifest {
        LevelManifest::new("Elevator.AcceptanceTests")
            .register::<ElevatorLevel1>()
            .register::<SomethingElse>()
            .definition(
                LevelDefinition::builder::<Shape>("elevatorlevelWithoutUp")
                    .default_constructor()
                    .level_field(|s: &Shape| s.level)
                    .build(),
            )
            .definition(
                LevelDefinition::builder::<Shape>("ELEVATORLEVELNoConstructor")
                    .level_field(|s: &Shape| s.level)
                    .up_method(|_| Ok(()))
                    .build(),
            )
            .definition(
                LevelDefinition::builder::<Shape>("ElevatorLevelWithoutLevel")
                    .default_constructor()
                    .up_method(|_| Ok(()))
                    .build(),
            )
            .definition(
                LevelDefinition::builder::<Shape>("ELEVATORLEVEL_no_description")
                    .default_constructor()
                    .level_field(|s: &Shape| s.level)
                    .up_method(|_| Ok(()))
                    .build(),
            )
    }

    #[test]
    fn test_of_uses_type_name() {
        let definition = LevelDefinition::of::<ElevatorLevel1>();
        assert_eq!(definition.name(), "ElevatorLevel1");
        assert!(definition.has_constructor());
        assert!(definition.has_level());
        assert!(definition.has_description());
        assert!(definition.has_up());
    }

    #[test]
    fn test_find_levels_applies_convention() {
        let manifest = manifest();
        let mut names: Vec<&str> = find_levels(&manifest)
            .into_iter()
            .map(LevelDefinition::name)
            .collect();
        names.sort_unstable();

        assert_eq!(names, vec!["ELEVATORLEVEL_no_description", "ElevatorLevel1"]);
    }

    #[test]
    fn test_find_levels_in_empty_manifest() {
        let manifest = LevelManifest::new("Tests.Empty");
        assert!(find_levels(&manifest).is_empty());
        assert!(find_storages(&manifest).is_empty());
    }

    #[test]
    fn test_find_storages() {
        let manifest = LevelManifest::new("app")
            .storage(StorageDefinition::new("Memory", || {
                Ok(MemoryLevelDataStorage::new())
            }));

        let storages = find_storages(&manifest);
        assert_eq!(storages.len(), 1);
        assert_eq!(storages[0].name(), "Memory");

        let storage = storages[0].create().unwrap();
        assert!(!storage.has_stored_level_info().unwrap());
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<ElevatorLevel1>(), "ElevatorLevel1");
        assert_eq!(short_type_name::<Vec<String>>(), "Vec");
    }
}
