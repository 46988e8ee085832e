//! elevator CLI
//!
//! Command-line tool for applying elevator levels. Applications with their
//! own levels build a [`Catalog`] and call [`shell::run`] from their binary;
//! this one only knows the bundled `demo` assembly.

mod demo;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use elevator::logger::TracingLogger;
use elevator::shell::{self, Catalog, ShellArgs};

fn main() -> anyhow::Result<()> {
    let args = ShellArgs::parse();

    // Setup logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let catalog = Catalog::new().with(demo::manifest());
    shell::run(&args, &TracingLogger, &catalog)?;

    Ok(())
}
