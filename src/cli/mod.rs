pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "hexrich",
    about = "Browse the taxonomy tree and map species richness on a hex grid",
    version
)]
pub struct Cli {
    /// Path to a TOML config file (defaults to ~/.hexrich/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Expand the classification tree below a root taxon
    Tree(commands::tree::TreeArgs),
    /// Fetch occurrences for selected families and print the richness grid
    Map(commands::map::MapArgs),
}

/// Load the configured or default config, tolerating a missing default file.
pub fn load_effective_config(path: &Option<PathBuf>) -> anyhow::Result<crate::config::Config> {
    use anyhow::Context;

    if let Some(path) = path {
        return crate::config::load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }
    match crate::config::default_config_path() {
        Some(default) if default.exists() => crate::config::load_config(&default)
            .with_context(|| format!("Failed to load config from {}", default.display())),
        _ => Ok(crate::config::default_config()),
    }
}
