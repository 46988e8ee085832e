//! Command-line front end.
//!
//! The shell parses the arguments, looks the requested assembly up in a
//! [`Catalog`] of manifests, picks a progress store and drives a [`Lift`]
//! to the top level. Everything it has to say goes through a [`Logger`].

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;
use tracing::{debug, info, warn};

use crate::discovery::{find_levels, find_storages, LevelManifest};
use crate::error::Result;
use crate::factory::LevelFactory;
use crate::lift::{LevelOutcome, Lift};
use crate::logger::Logger;
use crate::storage::{JsonFileLevelDataStorage, LevelDataStorage, SqliteLevelDataStorage};

/// Incremental, resumable state migrations.
#[derive(Debug, Parser)]
#[command(name = "elevator")]
#[command(author, version, about, long_about = None)]
pub struct ShellArgs {
    /// Apply every level above the stored one.
    #[arg(long)]
    pub up: bool,

    /// Name of the assembly holding the elevator levels.
    #[arg(long, value_name = "NAME")]
    pub assembly: Option<String>,

    /// SQLite database recording the current level.
    #[arg(long, env = "ELEVATOR_DATABASE_URL")]
    pub database: Option<String>,

    /// JSON file recording the current level.
    #[arg(long, env = "ELEVATOR_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

/// The manifests a binary knows about, by assembly name.
#[derive(Debug, Default)]
pub struct Catalog {
    manifests: BTreeMap<String, LevelManifest>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a manifest under its own name.
    #[must_use]
    pub fn with(mut self, manifest: LevelManifest) -> Self {
        self.manifests.insert(manifest.name().to_string(), manifest);
        self
    }

    /// Looks a manifest up.
    #[must_use]
    pub fn get(&self, assembly: &str) -> Option<&LevelManifest> {
        self.manifests.get(assembly)
    }
}

/// Parses `args` (program name first) and runs the shell.
pub fn run_from<I, T, L>(args: I, logger: &L, catalog: &Catalog) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    L: Logger,
{
    let args = ShellArgs::try_parse_from(args)?;
    run(&args, logger, catalog)
}

/// Runs the shell with parsed arguments.
///
/// Missing arguments and unknown assemblies are reported through `logger`
/// and are not errors. Level construction and store failures are.
pub fn run<L: Logger>(args: &ShellArgs, logger: &L, catalog: &Catalog) -> Result<()> {
    if !args.up {
        logger.log("You have to specify direction:");
        logger.log("\televator --up, for going up");
        logger.log("\televator --down, for going down (not supported yet)");
        return Ok(());
    }

    let Some(assembly) = args.assembly.as_deref() else {
        logger.log("You have to specify migration assembly:");
        logger.log("\televator --up --assembly <name>");
        return Ok(());
    };

    let Some(manifest) = catalog.get(assembly) else {
        logger.log(&format!("Could not find assembly '{assembly}'."));
        return Ok(());
    };

    let Some(mut storage) = resolve_storage(args, manifest)? else {
        logger.log(&format!(
            "Could not find a type in assembly '{assembly}' that implements the LevelDataStorage trait."
        ));
        return Ok(());
    };

    let definitions = find_levels(manifest);
    if definitions.is_empty() {
        logger.log(&format!(
            "Could not find any elevator levels in assembly '{assembly}'."
        ));
        return Ok(());
    }

    let factory = LevelFactory::new();
    let levels = definitions
        .into_iter()
        .map(|definition| factory.new_level(definition))
        .collect::<Result<Vec<_>>>()?;
    info!(assembly = %assembly, levels = levels.len(), "Levels discovered");

    storage.initialize()?;

    let mut lift = Lift::new(storage, logger);
    lift.add_levels(levels)?;
    lift.start()?;
    let outcomes = lift.top()?;

    let failed = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, LevelOutcome::Failed(_)))
        .count();
    if failed > 0 {
        warn!(
            assembly = %assembly,
            failed,
            "Some levels failed and will be retried on the next run"
        );
    }

    Ok(())
}

fn resolve_storage(
    args: &ShellArgs,
    manifest: &LevelManifest,
) -> Result<Option<Box<dyn LevelDataStorage>>> {
    if let Some(definition) = find_storages(manifest).into_iter().next() {
        debug!(storage = %definition.name(), "Using storage from assembly");
        return definition.create().map(Some);
    }
    if let Some(url) = &args.database {
        debug!(url = %url, "Using SQLite storage");
        return Ok(Some(Box::new(SqliteLevelDataStorage::new(url.clone())?)));
    }
    if let Some(path) = &args.state_file {
        debug!(path = %path.display(), "Using JSON file storage");
        return Ok(Some(Box::new(JsonFileLevelDataStorage::new(path.clone()))));
    }
    Ok(None)
}
