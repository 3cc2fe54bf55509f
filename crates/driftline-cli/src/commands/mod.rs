//! Command implementations

mod init_db;
mod run;
mod stats;

use crate::cli::{Cli, Commands};
use anyhow::Result;
use driftline_core::{CliConfigOverrides, LayeredConfig};

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let mut config = LayeredConfig::with_defaults();
    if let Some(path) = &cli.config {
        config = config.load_from_file(path)?;
    }
    config = config.load_from_env();
    config.update_from_cli(CliConfigOverrides {
        base_url: cli.base_url,
        data_dir: cli.data_dir,
        cache_db: cli.cache_db,
    });

    match cli.command {
        Commands::Run(args) => run::execute(args, &config).await,
        Commands::InitDb(args) => init_db::execute(args, &config).await,
        Commands::Stats => stats::execute(&config).await,
    }
}
