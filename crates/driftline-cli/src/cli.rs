use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// driftline - hourly balloon-constellation trajectory pipeline
#[derive(Parser, Debug)]
#[command(name = "driftline")]
#[command(about = "Acquire, enrich and publish hourly balloon trajectory batches", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Root of the working tree (current batch, archive, output artifact)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the remote hourly data source
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Path of the SQLite coordinate cache database
    #[arg(long, global = true)]
    pub cache_db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one acquisition-to-publish cycle: rotate, download, enrich, push
    Run(RunArgs),

    /// Create the coordinate cache database and optionally seed it
    InitDb(InitDbArgs),

    /// Show coordinate cache statistics
    Stats,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Skip the git publish stage
    #[arg(long)]
    pub no_publish: bool,
}

#[derive(Parser, Debug)]
pub struct InitDbArgs {
    /// JSON file of previously resolved coordinates to import
    #[arg(long)]
    pub seed: Option<PathBuf>,
}
