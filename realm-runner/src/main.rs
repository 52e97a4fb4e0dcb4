use anyhow::Result;
use tracing::{error, info};

mod config;
mod policy;
mod registry_init;
mod runner;

use crate::config::Config;
use crate::runner::Runner;

fn main() -> Result<()> {
    // Parse and validate configuration
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_max_level(config.level()?)
        .init();

    registry_init::initialize_registry();

    info!(
        "Running {} episodes of {} with seed {}",
        config.episodes, config.env_id, config.seed
    );

    let mut runner = Runner::new(config)?;

    match runner.run() {
        Ok(_) => {
            info!("Runner completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Runner failed: {}", e);
            Err(e)
        }
    }
}
