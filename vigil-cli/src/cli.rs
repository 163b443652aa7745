use std::path::PathBuf;

use clap::Parser;

/// Drains the shared work queue, running the fixed check battery against
/// each claimed identifier until every check reaches a terminal status.
#[derive(Debug, Parser)]
#[command(name = "vigil", version, about)]
pub struct Args {
    /// Path to a TOML config file. Defaults to ./vigil.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Overrides the instance identity used to attribute claims.
    #[arg(long)]
    pub instance_id: Option<String>,
}
