//! Levels bundled with the binary, under the assembly name `demo`.

use elevator::discovery::{ElevatorLevel, LevelManifest};
use tracing::info;

#[derive(Default)]
pub struct ElevatorLevel1;

impl ElevatorLevel for ElevatorLevel1 {
    fn level(&self) -> i64 {
        1
    }

    fn description(&self) -> &str {
        "First level"
    }

    fn up(&mut self) -> anyhow::Result<()> {
        info!("Arrived at first level!");
        Ok(())
    }
}

#[derive(Default)]
pub struct ElevatorLevel2;

impl ElevatorLevel for ElevatorLevel2 {
    fn level(&self) -> i64 {
        2
    }

    fn description(&self) -> &str {
        "Second level"
    }

    fn up(&mut self) -> anyhow::Result<()> {
        info!("Arrived at second level!");
        Ok(())
    }
}

pub fn manifest() -> LevelManifest {
    LevelManifest::new("demo")
        .register::<ElevatorLevel1>()
        .register::<ElevatorLevel2>()
}
